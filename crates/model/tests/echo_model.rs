use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::task::{self, Poll, ready};
use std::time::Duration;

use polyagent_model::{
    ErrorKind, ModelFinishReason, ModelMessage, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

#[derive(Debug)]
struct EchoModelError(ErrorKind);

impl Display for EchoModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "echo model failed: {}", self.0)
    }
}

impl Error for EchoModelError {}

impl ModelProviderError for EchoModelError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Replies to the last user message word by word, one tick per word.
#[derive(Debug)]
struct EchoModelResponse {
    words: VecDeque<String>,
    finished: bool,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl EchoModelResponse {
    fn new(input: &str) -> Self {
        let words = format!("You said {input}")
            .split(' ')
            .map(ToString::to_string)
            .collect();
        Self {
            words,
            finished: false,
            sleep: None,
        }
    }
}

impl ModelResponse for EchoModelResponse {
    type Error = EchoModelError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };
        if this.finished {
            return Poll::Ready(Ok(None));
        }

        let sleep = this
            .sleep
            .get_or_insert_with(|| Box::pin(sleep(Duration::from_millis(1))));
        ready!(sleep.as_mut().poll(cx));
        this.sleep = None;

        let Some(mut word) = this.words.pop_front() else {
            this.finished = true;
            return Poll::Ready(Ok(Some(ModelResponseEvent::Completed(
                ModelFinishReason::Stop,
            ))));
        };
        if !this.words.is_empty() {
            word.push(' ');
        }
        Poll::Ready(Ok(Some(ModelResponseEvent::MessageDelta(word))))
    }
}

struct EchoModelProvider;

impl ModelProvider for EchoModelProvider {
    type Error = EchoModelError;
    type Response = EchoModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let result = match req.last_message() {
            Some(ModelMessage::User(text)) => Ok(EchoModelResponse::new(text)),
            Some(_) => Err(EchoModelError(ErrorKind::Moderated)),
            None => Err(EchoModelError(ErrorKind::Other)),
        };
        ready(result)
    }
}

mod tests {
    use std::future::poll_fn;

    use super::*;

    async fn collect(
        mut resp: EchoModelResponse,
    ) -> (String, Option<ModelFinishReason>) {
        let mut text = String::new();
        let mut finish_reason = None;
        loop {
            let event = poll_fn(|cx| Pin::new(&mut resp).poll_next_event(cx))
                .await
                .unwrap();
            match event {
                Some(ModelResponseEvent::MessageDelta(delta)) => {
                    text.push_str(&delta);
                }
                Some(ModelResponseEvent::Completed(reason)) => {
                    finish_reason = Some(reason);
                }
                None => break,
            }
        }
        (text, finish_reason)
    }

    #[tokio::test]
    async fn test_continuation() {
        let req = ModelRequest {
            messages: vec![
                ModelMessage::System("Be an echo.".to_string()),
                ModelMessage::User("Good morning".to_string()),
            ],
        };
        let resp = EchoModelProvider.send_request(&req).await.unwrap();
        let (text, finish_reason) = collect(resp).await;

        assert_eq!(text, "You said Good morning");
        assert_eq!(finish_reason, Some(ModelFinishReason::Stop));
    }

    #[tokio::test]
    async fn test_error() {
        let result = EchoModelProvider
            .send_request(&ModelRequest::default())
            .await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Other);

        let req = ModelRequest {
            messages: vec![ModelMessage::Assistant("Hi".to_string())],
        };
        let result = EchoModelProvider.send_request(&req).await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Moderated);
    }
}
