//! Line mode and one-shot mode: plain stdin/stdout without the TUI

use std::io::Write;

use brain_client::{ChatClient, ClientEvent};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;

/// Ctrl+C presses for the whole session.
///
/// One listener lives for the life of the process; while streaming a press
/// aborts the request, at the prompt it ends line mode.
pub type Interrupts = mpsc::UnboundedReceiver<()>;

pub fn listen_for_interrupts() -> Interrupts {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(()).is_err() {
                break;
            }
        }
    });
    rx
}

/// Writes a streaming reply to `out` and failures to `err`
pub struct Printer<O, E> {
    out: O,
    err: E,
    /// Reply text written so far for the current request
    printed: String,
}

impl<O: Write, E: Write> Printer<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self {
            out,
            err,
            printed: String::new(),
        }
    }

    pub fn handle(&mut self, event: &ClientEvent) -> std::io::Result<()> {
        match event {
            ClientEvent::Submitted { .. } => self.printed.clear(),
            ClientEvent::Opened { request_id } => {
                tracing::debug!(%request_id, "reply started");
            }
            ClientEvent::Chunk { delta, .. } => {
                self.out.write_all(delta.as_bytes())?;
                self.out.flush()?;
                self.printed.push_str(delta);
            }
            ClientEvent::Completed { content, .. } => {
                // Fill in anything missed if the event channel lagged
                match content.strip_prefix(self.printed.as_str()) {
                    Some(rest) => self.out.write_all(rest.as_bytes())?,
                    None => {
                        tracing::warn!("missed reply chunks; reprinting the full reply");
                        writeln!(self.out)?;
                        self.out.write_all(content.as_bytes())?;
                    }
                }
                writeln!(self.out)?;
                self.out.flush()?;
            }
            ClientEvent::Failed { reason, .. } => {
                if !self.printed.is_empty() {
                    writeln!(self.out)?;
                    self.out.flush()?;
                }
                writeln!(self.err, "[ERROR] {}", reason)?;
            }
        }
        Ok(())
    }

    /// Show the input prompt
    pub fn prompt(&mut self) -> std::io::Result<()> {
        write!(self.out, "> ")?;
        self.out.flush()
    }

    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}

/// Submit `text` and print the reply as it streams.
///
/// An interrupt aborts the request.
pub async fn send_and_print<O: Write, E: Write>(
    client: &mut ChatClient,
    events: &mut broadcast::Receiver<ClientEvent>,
    interrupts: &mut Interrupts,
    text: &str,
    printer: &mut Printer<O, E>,
) -> anyhow::Result<()> {
    let handle = client.handle();
    let submission = client.submit(text)?;

    let result = {
        let mut receive = std::pin::pin!(client.receive(submission));
        let mut interrupted = false;
        loop {
            tokio::select! {
                biased;

                event = events.recv() => match event {
                    Ok(event) => printer.handle(&event)?,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "client events lagged");
                    }
                    Err(RecvError::Closed) => {}
                },

                result = &mut receive => break result,

                Some(()) = interrupts.recv(), if !interrupted => {
                    interrupted = true;
                    handle.abort();
                }
            }
        }
    };

    while let Ok(event) = events.try_recv() {
        printer.handle(&event)?;
    }
    Ok(result?)
}

/// Run a single submission, exiting with an error if it fails
pub async fn run_once(client: &mut ChatClient, text: &str) -> anyhow::Result<()> {
    let mut events = client.subscribe();
    let mut interrupts = listen_for_interrupts();
    let mut printer = Printer::new(std::io::stdout(), std::io::stderr());
    send_and_print(client, &mut events, &mut interrupts, text, &mut printer).await
}

/// Read prompts from stdin until EOF or Ctrl+C at the prompt
pub async fn run_lines(client: &mut ChatClient) -> anyhow::Result<()> {
    let interactive = std::io::IsTerminal::is_terminal(&std::io::stdin());
    let mut interrupts = listen_for_interrupts();
    let mut printer = Printer::new(std::io::stdout(), std::io::stderr());
    let input = BufReader::new(tokio::io::stdin());
    read_lines(client, input, &mut interrupts, &mut printer, interactive).await
}

/// Submit each non-blank line of `input` in turn
pub async fn read_lines<R, O, E>(
    client: &mut ChatClient,
    input: R,
    interrupts: &mut Interrupts,
    printer: &mut Printer<O, E>,
    interactive: bool,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    O: Write,
    E: Write,
{
    let mut events = client.subscribe();
    let mut lines = input.lines();

    loop {
        if interactive {
            printer.prompt()?;
        }

        let line = tokio::select! {
            line = lines.next_line() => line?,
            Some(()) = interrupts.recv() => {
                tracing::debug!("interrupted at the prompt");
                None
            }
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        if let Err(e) = send_and_print(client, &mut events, interrupts, &line, printer).await {
            tracing::debug!(error = %e, "request failed");
        }
    }

    Ok(())
}
