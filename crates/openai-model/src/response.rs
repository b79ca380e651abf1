use std::pin::Pin;
use std::task::{Context, Poll, ready};

use polyagent_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
};
use pin_project_lite::pin_project;

use crate::Error;
use crate::io::Sse;
use crate::proto::ChatCompletionChunk;

struct PartialState {
    sse: Sse,
    id: Option<String>,
    // Set when a chunk carries both content and a finish reason. The
    // completion is reported right after the delta.
    pending_finish_reason: Option<ModelFinishReason>,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct OpenAIResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            id: None,
            pending_finish_reason: None,
        };
        Self {
            next_event_fut: Some(Box::pin(next_event(partial_state))),
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        *this.next_event_fut = Some(Box::pin(next_event(partial_state)));
        Poll::Ready(Ok(Some(event)))
    }
}

fn map_finish_reason(reason: &str) -> Result<ModelFinishReason, Error> {
    match reason {
        "length" => Ok(ModelFinishReason::Length),
        "content_filter" => Err(Error::new(
            "the response was filtered by the server",
            ErrorKind::Moderated,
        )),
        _ => Ok(ModelFinishReason::Stop),
    }
}

async fn next_event(mut partial_state: PartialState) -> NextEvent {
    if let Some(reason) = partial_state.pending_finish_reason.take() {
        return Ok((Some(ModelResponseEvent::Completed(reason)), partial_state));
    }

    loop {
        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => {
                return Err(Error::new(err.to_string(), ErrorKind::Other));
            }
        };
        trace!("got sse event: {sse_event}");
        if sse_event == "[DONE]" {
            break;
        }

        let mut chunk = serde_json::from_str::<ChatCompletionChunk>(&sse_event)
            .map_err(|err| {
                Error::new(format!("{err}"), ErrorKind::MalformedResponse)
            })?;
        if partial_state.id.get_or_insert_with(|| chunk.id.clone()) != &chunk.id
        {
            return Err(Error::new(
                "chunk id mismatch",
                ErrorKind::MalformedResponse,
            ));
        }

        if let Some(usage) = chunk.usage {
            debug!(
                "token usage: {} prompt, {} completion",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        let Some(choice) = chunk.choices.pop() else {
            continue;
        };
        let finish_reason = choice
            .finish_reason
            .as_deref()
            .map(map_finish_reason)
            .transpose()?;

        match choice.delta.content.filter(|content| !content.is_empty()) {
            Some(content) => {
                partial_state.pending_finish_reason = finish_reason;
                return Ok((
                    Some(ModelResponseEvent::MessageDelta(content)),
                    partial_state,
                ));
            }
            None => {
                if let Some(reason) = finish_reason {
                    return Ok((
                        Some(ModelResponseEvent::Completed(reason)),
                        partial_state,
                    ));
                }
            }
        }
    }

    Ok((None, partial_state))
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use polyagent_model::ModelProviderError;

    use super::*;
    use crate::io::Chunks;

    async fn collect(
        chunks: Chunks,
    ) -> Result<(String, Option<ModelFinishReason>), Error> {
        let mut resp = pin!(OpenAIResponse::from_sse(Sse::new(chunks)));
        let mut text = String::new();
        let mut finish_reason = None;
        while let Some(event) =
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?
        {
            match event {
                ModelResponseEvent::MessageDelta(delta) => {
                    assert!(finish_reason.is_none());
                    text.push_str(&delta);
                }
                ModelResponseEvent::Completed(reason) => {
                    finish_reason = Some(reason);
                }
            }
        }
        Ok((text, finish_reason))
    }

    #[tokio::test]
    async fn test_simple_events() {
        let chunks = Chunks::from_static(&[include_bytes!(
            "../fixtures/test_response.txt"
        )]);
        let (text, finish_reason) = collect(chunks).await.unwrap();
        assert_eq!(text, "{\"a\": 2, \"b\": 2}");
        assert_eq!(finish_reason, Some(ModelFinishReason::Stop));
    }

    #[tokio::test]
    async fn test_truncated_response() {
        let chunks = Chunks::from_static(&[
            b"data: {\"id\":\"x\",\"choices\":[{\"delta\":{\"content\":\"add\"},\"finish_reason\":null}]}\n\n",
            b"data: {\"id\":\"x\",\"choices\":[{\"delta\":{\"content\":\", gl\"},\"finish_reason\":\"length\"}]}\n\n",
            b"data: [DONE]\n\n",
        ]);
        let (text, finish_reason) = collect(chunks).await.unwrap();
        assert_eq!(text, "add, gl");
        assert_eq!(finish_reason, Some(ModelFinishReason::Length));
    }

    #[tokio::test]
    async fn test_filtered_response() {
        let chunks = Chunks::from_static(&[
            b"data: {\"id\":\"x\",\"choices\":[{\"delta\":{},\"finish_reason\":\"content_filter\"}]}\n\n",
        ]);
        let err = collect(chunks).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Moderated);
    }

    #[tokio::test]
    async fn test_malformed_chunk() {
        let chunks = Chunks::from_static(&[b"data: {\"id\": \n\n"]);
        let err = collect(chunks).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }
}
