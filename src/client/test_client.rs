//! Scripted in-memory [`Client`] for flow and session tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::{self, BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};

use crate::client::{Client, RequestStream, ResponseStream};
use crate::error::{Error, Result};
use crate::protocol::{BackendMessage, FrontendMessage};

struct Step {
    request: FrontendMessage,
    responses: Vec<Result<BackendMessage>>,
}

/// A client that checks each request against a script and answers from it.
///
/// Responses of every matched request are appended to one shared window, and
/// response streams pop from that window one message per poll. A response
/// stream ends when the window is empty, so responses left unread by one
/// exchange are seen by the next one.
pub(crate) struct TestClient {
    script: Arc<Mutex<VecDeque<Step>>>,
    window: Arc<Mutex<VecDeque<Result<BackendMessage>>>>,
    parameter_status: HashMap<String, String>,
    close_error: Mutex<Option<Error>>,
    exchanges: Arc<AtomicUsize>,
    reserves: AtomicUsize,
    closes: AtomicUsize,
}

impl TestClient {
    pub(crate) fn builder() -> TestClientBuilder {
        TestClientBuilder::default()
    }

    /// A client that expects no requests.
    pub(crate) fn no_op() -> Arc<Self> {
        Self::builder().build()
    }

    /// Number of exchanges whose response stream has been polled.
    pub(crate) fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }

    /// Number of `reserve` calls.
    pub(crate) fn reserves(&self) -> usize {
        self.reserves.load(Ordering::SeqCst)
    }

    /// Number of `close` calls.
    pub(crate) fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Panic unless every scripted request has been seen.
    pub(crate) fn verify(&self) {
        let script = self.script.lock().unwrap();
        let remaining: Vec<_> = script.iter().map(|step| step.request.clone()).collect();
        assert!(remaining.is_empty(), "requests never sent: {:?}", remaining);
    }
}

impl Client for TestClient {
    fn exchange(&self, requests: RequestStream) -> ResponseStream {
        let script = Arc::clone(&self.script);
        let window = Arc::clone(&self.window);
        let exchanges = Arc::clone(&self.exchanges);

        stream::once(async move {
            exchanges.fetch_add(1, Ordering::SeqCst);
            let requests: Vec<FrontendMessage> = requests.collect().await;
            for request in requests {
                let step = script
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or_else(|| panic!("unexpected request: {:?}", request));
                assert_eq!(request, step.request);
                window.lock().unwrap().extend(step.responses);
            }

            stream::unfold(window, |window| async move {
                let next = window.lock().unwrap().pop_front()?;
                Some((next, window))
            })
        })
        .flatten()
        .boxed()
    }

    fn parameter_status(&self) -> HashMap<String, String> {
        self.parameter_status.clone()
    }

    fn reserve(self: Arc<Self>) -> BoxFuture<'static, Result<Arc<dyn Client>>> {
        self.reserves.fetch_add(1, Ordering::SeqCst);
        let reserved: Arc<dyn Client> = self;
        future::ok(reserved).boxed()
    }

    fn close(&self) -> BoxFuture<'static, Result<()>> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        let result = match self.close_error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        };
        future::ready(result).boxed()
    }
}

#[derive(Default)]
pub(crate) struct TestClientBuilder {
    steps: VecDeque<Step>,
    parameter_status: HashMap<String, String>,
    close_error: Option<Error>,
}

impl TestClientBuilder {
    /// Expect `request` next; answer it with `responses`.
    pub(crate) fn expect(
        mut self,
        request: impl Into<FrontendMessage>,
        responses: impl IntoIterator<Item = BackendMessage>,
    ) -> Self {
        self.steps.push_back(Step {
            request: request.into(),
            responses: responses.into_iter().map(Ok).collect(),
        });
        self
    }

    /// Expect `request` next; answer it with a transport failure.
    pub(crate) fn expect_failure(mut self, request: impl Into<FrontendMessage>, error: Error) -> Self {
        self.steps.push_back(Step {
            request: request.into(),
            responses: vec![Err(error)],
        });
        self
    }

    pub(crate) fn parameter(mut self, name: &str, value: &str) -> Self {
        self.parameter_status.insert(name.into(), value.into());
        self
    }

    pub(crate) fn close_fails_with(mut self, error: Error) -> Self {
        self.close_error = Some(error);
        self
    }

    pub(crate) fn build(self) -> Arc<TestClient> {
        Arc::new(TestClient {
            script: Arc::new(Mutex::new(self.steps)),
            window: Arc::new(Mutex::new(VecDeque::new())),
            parameter_status: self.parameter_status,
            close_error: Mutex::new(self.close_error),
            exchanges: Arc::new(AtomicUsize::new(0)),
            reserves: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        })
    }
}

/// Shorthand constructors for scripted backend messages.
pub(crate) mod msg {
    use bytes::Bytes;

    use crate::error::ErrorFields;
    use crate::protocol::backend::{
        BackendMessage, CommandComplete, CopyResponse, ErrorResponse, ParameterStatus,
    };
    use crate::protocol::frontend::{FrontendMessage, Query};
    use crate::protocol::types::Format;

    pub(crate) fn query(sql: &str) -> FrontendMessage {
        FrontendMessage::Query(Query::new(sql).unwrap())
    }

    pub(crate) fn parameter_status(name: &str, value: &str) -> BackendMessage {
        BackendMessage::ParameterStatus(ParameterStatus {
            name: name.into(),
            value: value.into(),
        })
    }

    pub(crate) fn command_complete(tag: &str) -> BackendMessage {
        BackendMessage::CommandComplete(CommandComplete::new(tag))
    }

    pub(crate) fn copy_in_response() -> BackendMessage {
        BackendMessage::CopyInResponse(text_copy())
    }

    pub(crate) fn copy_out_response() -> BackendMessage {
        BackendMessage::CopyOutResponse(text_copy())
    }

    fn text_copy() -> CopyResponse {
        CopyResponse {
            overall_format: Format::Text,
            column_formats: Vec::new(),
        }
    }

    pub(crate) fn copy_data(data: &'static [u8]) -> BackendMessage {
        BackendMessage::CopyData(Bytes::from_static(data))
    }

    pub(crate) fn error(code: &str, message: &str) -> BackendMessage {
        BackendMessage::ErrorResponse(ErrorResponse {
            fields: ErrorFields {
                severity: Some("ERROR".into()),
                code: Some(code.into()),
                message: Some(message.into()),
                ..Default::default()
            },
        })
    }
}
