//! The chat client: owns the conversation and drives one request at a time.

use std::sync::Arc;

use brain_ai::{Message, MessageEvent};
use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_util::sync::{CancellationToken, DropGuard};
use uuid::Uuid;

use crate::{
    conversation::{ChatEntry, Conversation, EntryState},
    error::{Error, Result},
    events::ClientEvent,
    handle::ClientHandle,
    transport::Transport,
};

/// A submitted request, waiting to be received.
///
/// Dropping it without calling [`ChatClient::receive`] abandons the request;
/// the next `submit` then fails the placeholder instead of reporting busy.
#[derive(Debug)]
pub struct Submission {
    pub request_id: Uuid,
    /// History sent to the proxy; always ends with the new user message
    pub messages: Vec<Message>,
    abandon: DropGuard,
}

/// Chat client for one session
pub struct ChatClient {
    conversation: Conversation,
    transport: Arc<dyn Transport>,
    event_tx: broadcast::Sender<ClientEvent>,
    handle: ClientHandle,
    /// Cancelled when the pending submission is dropped unreceived
    abandoned: Option<CancellationToken>,
}

/// Fails the in-flight request if `receive` is dropped before it settles
struct SettleOnDrop<'a> {
    client: &'a mut ChatClient,
    request_id: Uuid,
}

impl Drop for SettleOnDrop<'_> {
    fn drop(&mut self) {
        let in_flight = self
            .client
            .conversation
            .stream_state()
            .is_some_and(|s| s.request_id == self.request_id);
        if in_flight {
            self.client.fail(self.request_id, Error::Dropped);
        }
    }
}

impl ChatClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            conversation: Conversation::new(),
            transport,
            event_tx,
            handle: ClientHandle::new(),
            abandoned: None,
        }
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.event_tx.subscribe()
    }

    pub fn conversation(&self) -> &[ChatEntry] {
        self.conversation.entries()
    }

    pub fn state(&self) -> &Conversation {
        &self.conversation
    }

    pub fn is_streaming(&self) -> bool {
        self.conversation.is_streaming()
    }

    /// Get a cloneable handle for aborting from external code
    pub fn handle(&self) -> ClientHandle {
        self.handle.clone()
    }

    /// Abort the in-flight request
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Record a user message and prepare the request.
    ///
    /// Fails with `EmptyInput` or `ClientBusy` without touching the conversation.
    /// A previous submission that was dropped unreceived is failed first.
    pub fn submit(&mut self, text: &str) -> Result<Submission> {
        if text.trim().is_empty() {
            return Err(Error::EmptyInput);
        }
        if let Some(stream) = self.conversation.stream_state() {
            let abandoned = self
                .abandoned
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled);
            if !abandoned {
                return Err(Error::ClientBusy);
            }
            let request_id = stream.request_id;
            self.fail(request_id, Error::Dropped);
        }

        let request_id = Uuid::new_v4();
        self.conversation.push_user(text);
        let messages = self.conversation.history();
        self.conversation.begin_stream(request_id);
        self.handle.reset();
        let abandoned = CancellationToken::new();
        self.abandoned = Some(abandoned.clone());

        tracing::debug!(%request_id, messages = messages.len(), "submitted");
        let _ = self.event_tx.send(ClientEvent::Submitted {
            request_id,
            input: text.to_string(),
        });

        Ok(Submission {
            request_id,
            messages,
            abandon: abandoned.drop_guard(),
        })
    }

    /// Stream the reply for a submission into the conversation.
    ///
    /// On failure or cancellation the placeholder is marked failed and keeps
    /// any partial content. The same happens if this future is dropped before
    /// the reply settles.
    pub async fn receive(&mut self, submission: Submission) -> Result<()> {
        let Submission {
            request_id,
            messages,
            abandon,
        } = submission;
        match self.conversation.stream_state() {
            Some(stream) if stream.request_id == request_id => {}
            _ => {
                return Err(Error::Stream(format!(
                    "request {} is not in flight",
                    request_id
                )));
            }
        }
        let _ = abandon.disarm();
        self.abandoned = None;

        let mut guard = SettleOnDrop {
            client: self,
            request_id,
        };
        let result = guard.client.stream_reply(request_id, messages).await;
        drop(guard);
        result
    }

    async fn stream_reply(&mut self, request_id: Uuid, messages: Vec<Message>) -> Result<()> {
        let cancel = self.handle.token();
        let opened = self
            .transport
            .open(messages, cancel.clone())
            .await;
        let mut events = match opened {
            Ok(events) => events,
            Err(brain_ai::Error::Aborted) => return Err(self.fail(request_id, Error::Cancelled)),
            Err(e) => return Err(self.fail(request_id, Error::Ai(e))),
        };

        let _ = self.event_tx.send(ClientEvent::Opened { request_id });

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => None,
                event = events.next() => Some(event),
            };

            let event = match next {
                None => return Err(self.fail(request_id, Error::Cancelled)),
                Some(None) => {
                    let err = Error::Stream("stream ended before completion".to_string());
                    return Err(self.fail(request_id, err));
                }
                Some(Some(event)) => event,
            };

            match event {
                MessageEvent::Start => {}
                MessageEvent::TextDelta { delta } => {
                    if delta.is_empty() {
                        continue;
                    }
                    self.conversation.append_chunk(&delta);
                    let _ = self.event_tx.send(ClientEvent::Chunk { request_id, delta });
                }
                MessageEvent::Done { .. } => {
                    if let Some((content, stream)) = self.conversation.settle(EntryState::Final) {
                        tracing::debug!(
                            %request_id,
                            chunks = stream.chunks,
                            bytes = stream.bytes,
                            "reply completed"
                        );
                        let _ = self
                            .event_tx
                            .send(ClientEvent::Completed { request_id, content });
                    }
                    return Ok(());
                }
                MessageEvent::Error { message } => {
                    return Err(self.fail(request_id, Error::Stream(message)));
                }
            }
        }
    }

    /// Submit and receive in one call
    pub async fn send(&mut self, text: &str) -> Result<()> {
        let submission = self.submit(text)?;
        self.receive(submission).await
    }

    fn fail(&mut self, request_id: Uuid, error: Error) -> Error {
        let reason = error.to_string();
        if let Some((_, stream)) = self
            .conversation
            .settle(EntryState::Failed(reason.clone()))
        {
            tracing::warn!(
                %request_id,
                chunks = stream.chunks,
                error = %reason,
                "reply failed"
            );
        }
        let _ = self
            .event_tx
            .send(ClientEvent::Failed { request_id, reason });
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Framing, ProxyTransport};
    use async_trait::async_trait;
    use brain_ai::{MessageEventStream, Role};
    use parking_lot::Mutex;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    enum Script {
        Events(Vec<MessageEvent>),
        Reject,
        /// Streams one chunk, then never ends
        Hang,
        /// Never finishes opening
        Stall,
    }

    struct MockTransport {
        script: Mutex<Vec<Script>>,
        sent: Mutex<Vec<Vec<Message>>>,
    }

    impl MockTransport {
        fn new(script: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn open(
            &self,
            messages: Vec<Message>,
            _cancel: CancellationToken,
        ) -> brain_ai::Result<MessageEventStream> {
            self.sent.lock().push(messages);
            let next = {
                let mut script = self.script.lock();
                if script.is_empty() {
                    Script::Events(vec![MessageEvent::done()])
                } else {
                    script.remove(0)
                }
            };
            match next {
                Script::Events(events) => Ok(Box::pin(tokio_stream::iter(events))),
                Script::Reject => Err(brain_ai::Error::Status {
                    status: 502,
                    message: "upstream request failed".into(),
                }),
                Script::Stall => futures::future::pending().await,
                Script::Hang => Ok(Box::pin(
                    tokio_stream::iter(vec![MessageEvent::Start, MessageEvent::text("par")])
                        .chain(futures::stream::pending()),
                )),
            }
        }
    }

    fn reply(parts: &[&str]) -> Script {
        let mut events = vec![MessageEvent::Start];
        events.extend(parts.iter().map(|p| MessageEvent::text(*p)));
        events.push(MessageEvent::done());
        Script::Events(events)
    }

    #[tokio::test]
    async fn test_send_appends_reply() {
        let transport = MockTransport::new(vec![reply(&["Reality ", "Overview"])]);
        let mut client = ChatClient::new(transport.clone());
        let mut rx = client.subscribe();

        client.send("a world without time").await.unwrap();

        let entries = client.conversation();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].role(), Role::User);
        assert_eq!(entries[0].content(), "a world without time");
        assert_eq!(entries[1].role(), Role::Assistant);
        assert_eq!(entries[1].content(), "Reality Overview");
        assert_eq!(entries[1].state, EntryState::Final);
        assert!(!client.is_streaming());

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event);
        }
        assert!(matches!(kinds[0], ClientEvent::Submitted { .. }));
        assert!(matches!(kinds[1], ClientEvent::Opened { .. }));
        assert!(matches!(kinds[2], ClientEvent::Chunk { ref delta, .. } if delta == "Reality "));
        assert!(matches!(kinds[3], ClientEvent::Chunk { ref delta, .. } if delta == "Overview"));
        assert!(matches!(kinds[4], ClientEvent::Completed { ref content, .. } if content == "Reality Overview"));
        assert_eq!(kinds.len(), 5);
    }

    #[tokio::test]
    async fn test_history_ends_with_user_message() {
        let transport = MockTransport::new(vec![reply(&["one"]), reply(&["two"])]);
        let mut client = ChatClient::new(transport.clone());

        client.send("first").await.unwrap();
        client.send("second").await.unwrap();

        let sent = transport.sent.lock();
        assert_eq!(sent[0], vec![Message::user("first")]);
        assert_eq!(
            sent[1],
            vec![
                Message::user("first"),
                Message::assistant("one"),
                Message::user("second"),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_input_is_noop() {
        let transport = MockTransport::new(vec![]);
        let mut client = ChatClient::new(transport.clone());
        let mut rx = client.subscribe();

        for text in ["", "   ", "\n\t"] {
            assert!(matches!(client.submit(text), Err(Error::EmptyInput)));
        }
        assert!(client.conversation().is_empty());
        assert!(transport.sent.lock().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_busy_while_streaming() {
        let transport = MockTransport::new(vec![reply(&["ok"])]);
        let mut client = ChatClient::new(transport.clone());

        let submission = client.submit("first").unwrap();
        assert!(client.is_streaming());
        assert_eq!(client.conversation().len(), 2);

        let err = client.submit("second").unwrap_err();
        assert!(matches!(err, Error::ClientBusy));
        assert!(err.is_rejection());
        assert_eq!(client.conversation().len(), 2);

        client.receive(submission).await.unwrap();
        assert!(client.submit("second").is_ok());
    }

    #[tokio::test]
    async fn test_user_text_kept_verbatim() {
        let transport = MockTransport::new(vec![reply(&["ok"])]);
        let mut client = ChatClient::new(transport.clone());
        client.send("  spaced input \n").await.unwrap();
        assert_eq!(client.conversation()[0].content(), "  spaced input \n");
    }

    #[tokio::test]
    async fn test_stream_error_marks_failed() {
        let transport = MockTransport::new(vec![
            Script::Events(vec![
                MessageEvent::Start,
                MessageEvent::text("partial"),
                MessageEvent::error("connection reset"),
            ]),
            reply(&["recovered"]),
        ]);
        let mut client = ChatClient::new(transport.clone());
        let mut rx = client.subscribe();

        let err = client.send("x").await.unwrap_err();
        assert!(matches!(err, Error::Stream(ref m) if m == "connection reset"));

        let entries = client.conversation();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].content(), "partial");
        assert!(entries[1].is_failed());
        assert!(!client.is_streaming());

        let mut saw_failed = false;
        while let Ok(event) = rx.try_recv() {
            if let ClientEvent::Failed { reason, .. } = event {
                assert!(reason.contains("connection reset"));
                saw_failed = true;
            }
        }
        assert!(saw_failed);

        // Resubmission works and skips the failed entry.
        client.send("y").await.unwrap();
        assert_eq!(client.conversation().len(), 4);
        assert_eq!(
            transport.sent.lock()[1],
            vec![Message::user("x"), Message::user("y")]
        );
    }

    #[tokio::test]
    async fn test_missing_terminal_event_fails() {
        let transport = MockTransport::new(vec![Script::Events(vec![
            MessageEvent::Start,
            MessageEvent::text("cut"),
        ])]);
        let mut client = ChatClient::new(transport);
        assert!(matches!(client.send("x").await, Err(Error::Stream(_))));
        assert!(client.conversation()[1].is_failed());
    }

    #[tokio::test]
    async fn test_rejected_open_fails_before_chunks() {
        let transport = MockTransport::new(vec![Script::Reject]);
        let mut client = ChatClient::new(transport);
        let mut rx = client.subscribe();

        assert!(matches!(client.send("x").await, Err(Error::Ai(_))));
        assert_eq!(client.conversation()[1].content(), "");
        assert!(client.conversation()[1].is_failed());

        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert!(!events.iter().any(|e| matches!(e, ClientEvent::Opened { .. })));
        assert!(matches!(events.last(), Some(ClientEvent::Failed { .. })));
    }

    #[tokio::test]
    async fn test_abort_cancels_stream() {
        let transport = MockTransport::new(vec![Script::Hang]);
        let mut client = ChatClient::new(transport);
        let handle = client.handle();

        let submission = client.submit("x").unwrap();
        let aborter = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            handle.abort();
        });

        let result = client.receive(submission).await;
        aborter.await.unwrap();

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(client.conversation()[1].content(), "par");
        assert!(client.conversation()[1].is_failed());
        assert!(!client.is_streaming());
    }

    #[tokio::test]
    async fn test_abort_while_idle_does_not_poison_next_request() {
        let transport = MockTransport::new(vec![reply(&["fine"])]);
        let mut client = ChatClient::new(transport);
        client.abort();
        client.send("x").await.unwrap();
        assert_eq!(client.conversation()[1].content(), "fine");
    }

    #[tokio::test]
    async fn test_receive_rejects_stale_submission() {
        let transport = MockTransport::new(vec![reply(&["a"])]);
        let mut client = ChatClient::new(transport);
        let submission = client.submit("x").unwrap();
        let request_id = submission.request_id;
        client.receive(submission).await.unwrap();

        let stale = Submission {
            request_id,
            messages: vec![Message::user("x")],
            abandon: CancellationToken::new().drop_guard(),
        };
        assert!(matches!(client.receive(stale).await, Err(Error::Stream(_))));
        assert_eq!(client.conversation().len(), 2);
    }

    #[tokio::test]
    async fn test_dropped_receive_fails_placeholder() {
        for (script, partial) in [(Script::Stall, ""), (Script::Hang, "par")] {
            let transport = MockTransport::new(vec![script, reply(&["again"])]);
            let mut client = ChatClient::new(transport);
            let mut rx = client.subscribe();

            let submission = client.submit("x").unwrap();
            let timed_out =
                tokio::time::timeout(Duration::from_millis(50), client.receive(submission)).await;
            assert!(timed_out.is_err());

            assert!(!client.is_streaming());
            assert_eq!(client.conversation()[1].content(), partial);
            assert_eq!(
                client.conversation()[1].state,
                EntryState::Failed(Error::Dropped.to_string())
            );
            let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
            assert!(matches!(events.last(), Some(ClientEvent::Failed { .. })));

            client.send("y").await.unwrap();
            assert_eq!(client.conversation()[3].content(), "again");
        }
    }

    #[tokio::test]
    async fn test_unreceived_submission_is_abandoned() {
        let transport = MockTransport::new(vec![reply(&["answer"])]);
        let mut client = ChatClient::new(transport.clone());

        let submission = client.submit("x").unwrap();
        assert!(matches!(client.submit("y"), Err(Error::ClientBusy)));
        assert_eq!(client.conversation().len(), 2);
        drop(submission);

        client.send("y").await.unwrap();
        let entries = client.conversation();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[1].state, EntryState::Failed(Error::Dropped.to_string()));
        assert_eq!(entries[3].content(), "answer");
        assert_eq!(
            transport.sent.lock()[0],
            vec![Message::user("x"), Message::user("y")]
        );
    }

    #[tokio::test]
    async fn test_content_is_concatenation_of_chunks() {
        let pieces = ["Reality", " ", "Overview", "\n", "🌌", "é", ""];
        let mut cases: Vec<Vec<String>> = vec![
            vec![],
            vec!["solo".to_string()],
            vec!["dup".to_string(); 5],
        ];
        // xorshift, so the sequences are the same on every run
        let mut seed: u64 = 0x9e37_79b9_7f4a_7c15;
        for len in [2usize, 7, 31, 128] {
            let mut chunks = Vec::with_capacity(len);
            for _ in 0..len {
                seed ^= seed << 13;
                seed ^= seed >> 7;
                seed ^= seed << 17;
                chunks.push(pieces[(seed % pieces.len() as u64) as usize].to_string());
            }
            cases.push(chunks);
        }

        for chunks in cases {
            let parts: Vec<&str> = chunks.iter().map(String::as_str).collect();
            let mut client = ChatClient::new(MockTransport::new(vec![reply(&parts)]));
            let mut rx = client.subscribe();

            client.send("x").await.unwrap();

            let expected = chunks.concat();
            assert_eq!(client.conversation()[1].content(), expected);
            let streamed: String = std::iter::from_fn(|| rx.try_recv().ok())
                .filter_map(|event| match event {
                    ClientEvent::Chunk { delta, .. } => Some(delta),
                    _ => None,
                })
                .collect();
            assert_eq!(streamed, expected);
        }
    }

    // End to end through a real proxy on loopback with a scripted provider.

    mod loopback {
        use super::*;
        use async_trait::async_trait;
        use brain_ai::providers::CompletionProvider;
        use brain_ai::{Context, Model, StreamOptions};
        use brain_proxy::{AppState, ProxyConfig};

        struct ScriptedProvider {
            events: Vec<MessageEvent>,
        }

        #[async_trait]
        impl CompletionProvider for ScriptedProvider {
            async fn stream(
                &self,
                _model: &Model,
                _context: &Context,
                _options: &StreamOptions,
            ) -> brain_ai::Result<MessageEventStream> {
                Ok(Box::pin(tokio_stream::iter(self.events.clone())))
            }
        }

        async fn spawn_proxy(events: Vec<MessageEvent>) -> String {
            let provider = Arc::new(ScriptedProvider { events });
            let state = Arc::new(AppState::new(ProxyConfig::default(), provider));
            let app = brain_proxy::app(state);
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                let _ = axum::serve(listener, app).await;
            });
            format!("http://{addr}/api/chat")
        }

        fn ok_events() -> Vec<MessageEvent> {
            vec![
                MessageEvent::Start,
                MessageEvent::text("Stabilité: "),
                MessageEvent::text("9/10 🌌"),
                MessageEvent::done(),
            ]
        }

        fn broken_events() -> Vec<MessageEvent> {
            vec![
                MessageEvent::Start,
                MessageEvent::text("half"),
                MessageEvent::error("upstream reset"),
            ]
        }

        #[tokio::test]
        async fn test_both_framings_complete() {
            for framing in [Framing::EventStream, Framing::PlainText] {
                let url = spawn_proxy(ok_events()).await;
                let transport = Arc::new(ProxyTransport::new(url).with_framing(framing));
                let mut client = ChatClient::new(transport);

                client.send("x").await.unwrap();
                assert_eq!(client.conversation()[1].content(), "Stabilité: 9/10 🌌");
                assert_eq!(client.conversation()[1].state, EntryState::Final);
            }
        }

        #[tokio::test]
        async fn test_both_framings_fail_on_upstream_error() {
            for framing in [Framing::EventStream, Framing::PlainText] {
                let url = spawn_proxy(broken_events()).await;
                let transport = Arc::new(ProxyTransport::new(url).with_framing(framing));
                let mut client = ChatClient::new(transport);

                assert!(client.send("x").await.is_err(), "{framing:?}");
                assert!(client.conversation()[1].is_failed());
                assert!(!client.is_streaming());
            }
        }

        #[tokio::test]
        async fn test_proxy_rejection_surfaces_status() {
            let url = spawn_proxy(ok_events()).await;
            let transport = Arc::new(ProxyTransport::new(url));
            // Bypass the client's own empty-input guard to reach the proxy.
            let err = transport
                .open(vec![Message::assistant("no user turn")], CancellationToken::new())
                .await
                .err()
                .unwrap();
            assert!(matches!(err, brain_ai::Error::Status { status: 400, .. }));
        }
    }
}
