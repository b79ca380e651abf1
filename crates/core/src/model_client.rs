use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use polyagent_model::{
    ModelFinishReason, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse, ModelResponseEvent,
};
use tracing::Instrument;

use crate::branch::{Branch, Role};
use crate::error::GenerationError;

type SendRequestResult =
    Result<ModelClientResponse, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn = Arc<dyn Fn(ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// A wrapper around a model provider that provides a type-erased interface
/// for the other modules.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
}

impl ModelClient {
    /// Wraps a model provider.
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err).await
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self { handler_fn }
    }

    /// Sends a request and returns the response.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    #[inline]
    pub async fn send_request(
        &self,
        req: ModelRequest,
    ) -> Result<ModelClientResponse, Box<dyn ModelProviderError>> {
        (self.handler_fn)(req).await
    }

    /// Generates one assistant continuation of `branch`.
    ///
    /// The continuation is appended to the branch as an assistant turn and
    /// stored as the named result `name`. Nothing is appended on failure.
    pub async fn generate(
        &self,
        branch: &mut Branch,
        name: &str,
    ) -> Result<String, GenerationError> {
        let req = ModelRequest {
            messages: branch.to_model_messages(),
        };
        let resp = self
            .send_request(req)
            .await
            .map_err(|err| GenerationError::new(name, err))?;
        if resp.finish_reason == Some(ModelFinishReason::Length) {
            warn!("generation of `{name}` was cut off by the length limit");
        }

        branch.append(Role::Assistant, resp.text.clone());
        branch.set_result(name, resp.text.clone());
        Ok(resp.text)
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug)]
pub struct ModelClientResponse {
    /// The generated text.
    pub text: String,
    /// The reason the model finished generating.
    pub finish_reason: Option<ModelFinishReason>,
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err:?}");
            return Err(Box::new(err));
        }
    };

    let mut text = String::new();
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(event) => event,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(Box::new(err));
            }
        };

        let Some(event) = event else {
            break;
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(delta) => {
                text.push_str(&delta);
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    trace!("finished a request");

    Ok(ModelClientResponse {
        text,
        finish_reason,
    })
}
