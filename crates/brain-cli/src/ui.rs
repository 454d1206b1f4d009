//! TUI implementation for brain-terminal

use std::io;
use std::time::{Duration, Instant};

use brain_ai::Role;
use brain_client::{ChatClient, ChatEntry, ClientEvent, EntryState, Submission};
use brain_tui::{
    TerminalGuard, Theme,
    input::{Action, event_to_action},
    widgets::{
        CranialScan, InputBox, LogPanel, MessageList, SeqAnimation, SeqBar, StatusLog, Typewriter,
        markdown::wrap_spans,
        message_list::{self, ChatMessage, MessageStatus},
    },
};
use crossterm::event::{Event, EventStream};
use futures::StreamExt;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};
use tokio::time::MissedTickBehavior;

use crate::config::Settings;
use crate::utils::preview;

/// Redraw interval; also the animation resolution
const TICK_RATE: Duration = Duration::from_millis(50);

/// Lines moved by PgUp/PgDn
const PAGE: usize = 10;

pub const WELCOME_TEXT: &str = "Welcome to the Reality Algorithm Generator

You are about to step into a space where the rules of existence bend, shatter, and reform at your command. In this realm, the boundaries between what is real and what is possible blur, allowing you to manipulate the very fabric of reality itself. The limitations of time, space, and even the laws of physics are but a canvas for your imagination.

Here, every choice you make has the potential to reshape the universe around you. Want to rewrite the laws of gravity? Test the limits of space-time? Or perhaps create entirely new worlds from scratch? The tools are at your fingertips.";

const BOOT_LINES: [&str; 5] = [
    "Loading neural interface...",
    "Calibrating cranial scanner...",
    "Sequencing DNA samples...",
    "Linking reality generator...",
    "Handshake complete",
];

/// Which screen is showing
#[derive(Debug)]
pub enum Stage {
    Welcome(Typewriter),
    Loading { started: Instant },
    Terminal,
}

/// What the event loop should do after a key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    None,
    Submit(String),
    Quit,
}

/// TUI application state.
///
/// The transcript mirrors the client's conversation through `ClientEvent`s
/// while a request is in flight, and is resynced from the client after.
pub struct App {
    stage: Stage,
    boot_duration: Duration,
    theme: Theme,
    messages: Vec<ChatMessage>,
    input: InputBox,
    /// Transcript scroll offset; `usize::MAX` follows the bottom
    scroll: usize,
    /// Inner width of the input box at the last render
    input_width: u16,
    log: StatusLog,
    seq: SeqAnimation,
    started: Instant,
    spinner_start: Instant,
}

impl App {
    pub fn new(settings: &Settings, theme: Theme, now: Instant) -> Self {
        let stage = if settings.skip_intro {
            Stage::Terminal
        } else {
            Stage::Welcome(
                Typewriter::new(WELCOME_TEXT, now).with_interval(settings.typewriter_interval),
            )
        };

        Self {
            stage,
            boot_duration: settings.boot_duration,
            theme,
            messages: Vec::new(),
            input: InputBox::new()
                .with_placeholder("Enter command...")
                .with_disabled_placeholder("Processing..."),
            scroll: usize::MAX,
            input_width: 40,
            log: StatusLog::new(settings.log_capacity),
            seq: SeqAnimation::default(),
            started: now,
            spinner_start: now,
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn log(&self) -> &StatusLog {
        &self.log
    }

    pub fn input(&self) -> &InputBox {
        &self.input
    }

    fn scroll_to_bottom(&mut self) {
        // Resolved during render
        self.scroll = usize::MAX;
    }

    /// Apply a client lifecycle event
    pub fn handle_client_event(&mut self, event: ClientEvent, now: Instant) {
        match event {
            ClientEvent::Submitted { input, .. } => {
                self.messages.push(ChatMessage::user(input.clone()));
                self.messages.push(ChatMessage::streaming());
                self.input.set_disabled(true);
                self.log.push(format!("Command executed: {}", input));
                self.seq.start(now);
                self.spinner_start = now;
                self.scroll_to_bottom();
            }
            ClientEvent::Opened { .. } => {
                self.log.push("Received response from AI");
            }
            ClientEvent::Chunk { delta, .. } => {
                if let Some(last) = self.messages.last_mut() {
                    if last.is_streaming() {
                        last.content.push_str(&delta);
                    }
                }
                self.scroll_to_bottom();
            }
            ClientEvent::Completed { content, .. } => {
                if let Some(last) = self.messages.last_mut() {
                    if last.is_streaming() {
                        last.content = content.clone();
                        last.status = MessageStatus::Done;
                    }
                }
                self.input.set_disabled(false);
                self.log
                    .push(format!("AI response completed: {}", preview(&content, 50)));
                self.scroll_to_bottom();
            }
            ClientEvent::Failed { reason, .. } => {
                if let Some(last) = self.messages.last_mut() {
                    if last.is_streaming() {
                        last.status = MessageStatus::Failed(reason.clone());
                    }
                }
                self.input.set_disabled(false);
                self.log.push(format!("Error: {}", reason));
                self.scroll_to_bottom();
            }
        }
    }

    /// Rebuild the transcript from the client's conversation
    pub fn sync_transcript(&mut self, entries: &[ChatEntry]) {
        self.messages = entries.iter().map(entry_to_message).collect();
        let streaming = entries.last().is_some_and(ChatEntry::is_streaming);
        self.input.set_disabled(streaming);
    }

    /// Handle keyboard action
    pub fn handle_action(&mut self, action: Action) -> UiCommand {
        if action.is_quit() {
            return UiCommand::Quit;
        }
        if matches!(self.stage, Stage::Terminal) {
            return self.handle_terminal_action(action);
        }

        match &mut self.stage {
            Stage::Welcome(typewriter) => {
                if action == Action::Submit {
                    if typewriter.is_done(Instant::now()) {
                        self.stage = Stage::Loading {
                            started: Instant::now(),
                        };
                    } else {
                        typewriter.fast_forward();
                    }
                }
                UiCommand::None
            }
            Stage::Loading { .. } | Stage::Terminal => UiCommand::None,
        }
    }

    fn handle_terminal_action(&mut self, action: Action) -> UiCommand {
        match action {
            Action::Submit => {
                if self.input.is_disabled() || self.input.content().trim().is_empty() {
                    return UiCommand::None;
                }
                UiCommand::Submit(self.input.take())
            }
            Action::Clear => {
                self.log.clear();
                UiCommand::None
            }
            Action::PageUp => {
                self.scroll = self.scroll.saturating_sub(PAGE);
                UiCommand::None
            }
            Action::PageDown => {
                self.scroll = self.scroll.saturating_add(PAGE);
                UiCommand::None
            }
            other => {
                self.input.handle_action(&other, self.input_width);
                UiCommand::None
            }
        }
    }

    /// Advance timed stages
    pub fn tick(&mut self, now: Instant) {
        if let Stage::Loading { started } = self.stage {
            if now.saturating_duration_since(started) >= self.boot_duration {
                self.stage = Stage::Terminal;
                self.started = now;
            }
        }
    }

    /// Render the UI
    pub fn render(&mut self, frame: &mut Frame, now: Instant) {
        let area = frame.area();
        frame.render_widget(Block::default().style(self.theme.base_style()), area);

        if matches!(self.stage, Stage::Terminal) {
            self.render_terminal(frame, area, now);
            return;
        }
        match &self.stage {
            Stage::Welcome(typewriter) => self.render_welcome(frame, area, typewriter, now),
            Stage::Loading { started } => {
                let elapsed = now.saturating_duration_since(*started);
                self.render_loading(frame, area, elapsed);
            }
            Stage::Terminal => {}
        }
    }

    fn render_welcome(&self, frame: &mut Frame, area: Rect, typewriter: &Typewriter, now: Instant) {
        let width = area.width.min(80);
        let column = Rect {
            x: area.x + (area.width - width) / 2,
            width,
            ..area
        };

        let lines = self.welcome_lines(typewriter.visible(now), width as usize);

        // Centered on the full text; the revealed prefix grows into it
        let text_height = self.welcome_lines(typewriter.text(), width as usize).len() as u16;
        let total = text_height + 3;
        let top = area.y + area.height.saturating_sub(total) / 2;

        let text_area = Rect {
            y: top,
            height: text_height.min(area.height),
            ..column
        };
        frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), text_area);

        if typewriter.is_done(now) {
            let y = (top + text_height + 2).min(area.bottom().saturating_sub(1));
            let button = Paragraph::new(Line::from(Span::styled(
                "[ ENTER ]",
                Style::default()
                    .fg(self.theme.bg)
                    .bg(self.theme.fg)
                    .add_modifier(Modifier::BOLD),
            )))
            .alignment(Alignment::Center);
            frame.render_widget(button, Rect { y, height: 1, ..column });
        }
    }

    fn welcome_lines(&self, text: &str, width: usize) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        for (i, paragraph) in text.split('\n').enumerate() {
            if paragraph.is_empty() {
                lines.push(Line::from(""));
                continue;
            }
            let style = if i == 0 {
                self.theme.title_style()
            } else {
                self.theme.base_style()
            };
            let span = Span::styled(paragraph.to_string(), style);
            lines.extend(wrap_spans(vec![span], None, width));
        }
        lines
    }

    fn render_loading(&self, frame: &mut Frame, area: Rect, elapsed: Duration) {
        let ratio = if self.boot_duration.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f64() / self.boot_duration.as_secs_f64()).min(1.0)
        };
        let shown = ((BOOT_LINES.len() as f64) * ratio).ceil() as usize;

        let width = area.width.min(50);
        let height = BOOT_LINES.len() as u16 + 4;
        let column = Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + area.height.saturating_sub(height) / 2,
            width,
            height: height.min(area.height),
        };

        let mut lines = vec![
            Line::from(Span::styled("BOOTING BRAIN TERMINAL", self.theme.title_style())),
            Line::from(""),
        ];
        for line in BOOT_LINES.iter().take(shown.max(1)) {
            lines.push(Line::from(Span::styled(
                format!("> {}", line),
                self.theme.dim_style(),
            )));
        }
        for _ in shown.max(1)..BOOT_LINES.len() {
            lines.push(Line::from(""));
        }
        lines.push(Line::from(""));

        let bar_width = width.saturating_sub(7) as usize;
        let filled = (bar_width as f64 * ratio).round() as usize;
        lines.push(Line::from(vec![
            Span::styled("█".repeat(filled), Style::default().fg(self.theme.gauge)),
            Span::styled(
                "░".repeat(bar_width - filled),
                Style::default().fg(self.theme.gauge_track),
            ),
            Span::styled(
                format!(" {:>3}%", (ratio * 100.0).round() as u32),
                self.theme.dim_style(),
            ),
        ]));

        frame.render_widget(Paragraph::new(lines), column);
    }

    fn render_terminal(&mut self, frame: &mut Frame, area: Rect, now: Instant) {
        let outer = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(self.theme.border_style())
            .title(Line::from(" PRODUCT OF SCIENCE ").centered())
            .title_bottom(Line::from(" BRAIN TERMINAL ").centered())
            .title_style(self.theme.dim_style());
        let inner = outer.inner(area);
        frame.render_widget(outer, area);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .margin(1)
            .spacing(2)
            .split(inner);

        // Left: cranial scan
        let scan_block = self.panel("CRANIAL SCAN");
        let scan_area = scan_block.inner(columns[0]);
        frame.render_widget(scan_block, columns[0]);
        frame.render_widget(
            CranialScan::new(&self.theme, now.saturating_duration_since(self.started)),
            scan_area,
        );

        // Right: analysis, chat, status
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5),
                Constraint::Min(8),
                Constraint::Length(8),
            ])
            .split(columns[1]);

        let seq_block = self.panel("DNA BLOOD ANALYSIS");
        let seq_area = seq_block.inner(rows[0]);
        frame.render_widget(seq_block, rows[0]);
        frame.render_widget(SeqBar::new(self.seq.phase(now), &self.theme), seq_area);

        self.render_chat(frame, rows[1]);

        let log_block = self.panel("SYSTEM STATUS");
        let log_area = log_block.inner(rows[2]);
        frame.render_widget(log_block, rows[2]);
        frame.render_widget(LogPanel::new(&self.log, &self.theme), log_area);
    }

    fn render_chat(&mut self, frame: &mut Frame, area: Rect) {
        let block = self.panel("GENERATE REALITY");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(3)])
            .split(inner);
        let transcript = parts[0];

        let content_height =
            message_list::content_height(&self.messages, &self.theme, transcript.width as usize);
        let max_scroll = content_height.saturating_sub(transcript.height as usize);
        self.scroll = self.scroll.min(max_scroll);

        frame.render_widget(
            MessageList::new(&self.messages, &self.theme)
                .scroll(self.scroll)
                .spinner_start(self.spinner_start),
            transcript,
        );

        self.input_width = parts[1].width;
        self.input.render(parts[1], frame.buffer_mut(), &self.theme);
    }

    fn panel(&self, title: &'static str) -> Block<'static> {
        Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_style())
            .title(Line::from(Span::styled(title, self.theme.title_style())).centered())
    }
}

fn entry_to_message(entry: &ChatEntry) -> ChatMessage {
    let mut message = match entry.role() {
        Role::User => ChatMessage::user(entry.content()),
        Role::Assistant | Role::System => ChatMessage::system(entry.content()),
    };
    message.status = match &entry.state {
        EntryState::Final => MessageStatus::Done,
        EntryState::Streaming => MessageStatus::Streaming,
        EntryState::Failed(reason) => MessageStatus::Failed(reason.clone()),
    };
    message
}

fn on_terminal_event(app: &mut App, event: Option<io::Result<Event>>) -> anyhow::Result<UiCommand> {
    match event {
        Some(Ok(event)) => Ok(event_to_action(event)
            .map(|action| app.handle_action(action))
            .unwrap_or(UiCommand::None)),
        Some(Err(e)) => Err(anyhow::anyhow!("Event error: {}", e)),
        None => Ok(UiCommand::Quit),
    }
}

/// Run the TUI application
pub async fn run_tui(client: &mut ChatClient, settings: &Settings) -> anyhow::Result<()> {
    let theme = Theme::by_name(&settings.theme).unwrap_or_default();
    let mut app = App::new(settings, theme, Instant::now());

    let mut guard = TerminalGuard::new()?;
    let mut client_rx = client.subscribe();
    let handle = client.handle();
    let mut event_stream = EventStream::new();

    let mut tick_interval = tokio::time::interval(TICK_RATE);
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut pending: Option<Submission> = None;

    loop {
        if let Some(submission) = pending.take() {
            let mut quitting = false;
            {
                let mut receive = std::pin::pin!(client.receive(submission));

                // Poll the request alongside input until it settles
                loop {
                    guard
                        .terminal_mut()
                        .draw(|frame| app.render(frame, Instant::now()))?;

                    tokio::select! {
                        biased;

                        event = client_rx.recv() => {
                            if let Ok(event) = event {
                                app.handle_client_event(event, Instant::now());
                            }
                        }

                        result = &mut receive => {
                            if let Err(e) = result {
                                tracing::debug!(error = %e, "request did not complete");
                            }
                            break;
                        }

                        event = event_stream.next() => {
                            if on_terminal_event(&mut app, event)? == UiCommand::Quit {
                                handle.abort();
                                quitting = true;
                            }
                        }

                        _ = tick_interval.tick() => app.tick(Instant::now()),
                    }
                }
            }

            while let Ok(event) = client_rx.try_recv() {
                app.handle_client_event(event, Instant::now());
            }
            app.sync_transcript(client.conversation());

            if quitting {
                return Ok(());
            }
            continue;
        }

        guard
            .terminal_mut()
            .draw(|frame| app.render(frame, Instant::now()))?;

        tokio::select! {
            event = event_stream.next() => {
                match on_terminal_event(&mut app, event)? {
                    UiCommand::Quit => return Ok(()),
                    UiCommand::Submit(text) => {
                        match client.submit(&text) {
                            Ok(submission) => pending = Some(submission),
                            Err(e) => tracing::debug!(error = %e, "submission rejected"),
                        }
                        while let Ok(event) = client_rx.try_recv() {
                            app.handle_client_event(event, Instant::now());
                        }
                    }
                    UiCommand::None => {}
                }
            }

            _ = tick_interval.tick() => app.tick(Instant::now()),
        }
    }
}
