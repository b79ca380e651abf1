//! A local fake model for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use polyagent_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    events: Vec<PresetEvent>,
    event_idx: usize,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };

        if let Some(sleep) = &mut this.sleep {
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;

            let idx = this.event_idx;
            this.event_idx += 1;
            if let Some(event) = this.events.get(idx) {
                let event = match event {
                    PresetEvent::MessageDelta(msg) => {
                        ModelResponseEvent::MessageDelta(msg.clone())
                    }
                    PresetEvent::Finish(reason) => {
                        ModelResponseEvent::Completed(*reason)
                    }
                };
                return Poll::Ready(Ok(Some(event)));
            }

            let has_finish = this
                .events
                .iter()
                .any(|event| matches!(event, PresetEvent::Finish(_)));
            if idx == this.events.len() && !has_finish {
                return Poll::Ready(Ok(Some(ModelResponseEvent::Completed(
                    ModelFinishReason::Stop,
                ))));
            }
            // In case this method is called after completion.
            return Poll::Ready(Ok(None));
        }
        this.sleep = Some(Box::pin(sleep(this.delay)));
        Pin::new(this).poll_next_event(cx)
    }
}

#[derive(Default)]
struct Script {
    responses: VecDeque<PresetResponse>,
    requests: Vec<ModelRequest>,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the script, which is the
/// ordered list of responses the model should give. Every request takes
/// the next response from the front of the script, no matter what the
/// request contains. If the script runs out, an error will be returned.
///
/// Clones share the same script, so a test can keep one handle to inspect
/// the recorded requests after handing another one to the agent.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl TestModelProvider {
    /// Appends a response to the script.
    #[inline]
    pub fn add_response(&mut self, preset: PresetResponse) {
        self.lock().responses.push_back(preset);
    }

    /// Appends a plain text response to the script.
    #[inline]
    pub fn add_text_response<S: Into<String>>(&mut self, text: S) {
        self.add_response(PresetResponse::with_text(text));
    }

    /// Sets how long the response waits before every event. Defaults to
    /// one millisecond.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns the number of responses that have not been consumed yet.
    #[inline]
    pub fn remaining_responses(&self) -> usize {
        self.lock().responses.len()
    }

    /// Returns all requests received so far, in order.
    #[inline]
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        // A panicking test may poison the lock, the script is still usable.
        self.script.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn next_response(&self, req: &ModelRequest) -> Result<PresetResponse, Error> {
        let mut script = self.lock();
        script.requests.push(req.clone());

        let Some(front) = script.responses.front_mut() else {
            return Err(Error {
                message: "no enough responses",
                kind: ErrorKind::RateLimitExceeded,
            });
        };
        if let Some(failures) = front.failures {
            front.failures = match failures {
                0 => Some(0),
                1 => None,
                n => Some(n - 1),
            };
            return Err(Error {
                message: "preset failure",
                kind: ErrorKind::Other,
            });
        }
        script.responses.pop_front().ok_or(Error {
            message: "no enough responses",
            kind: ErrorKind::RateLimitExceeded,
        })
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let result = self.next_response(req).map(|preset| TestModelResponse {
            events: preset.events,
            event_idx: 0,
            delay: self.delay.unwrap_or(Duration::from_millis(1)),
            sleep: None,
        });
        ready(result)
    }
}
