//! A model provider for OpenAI-compatible chat completion APIs.
//!
//! Responses are always streamed and only text content is consumed.

#[macro_use]
extern crate tracing;

mod config;
mod error;
mod io;
mod proto;
mod response;

use std::sync::Arc;

use mime::Mime;
use polyagent_model::{ErrorKind, ModelProvider, ModelRequest};
use reqwest::header::{self, HeaderMap};
use reqwest::{Client, RequestBuilder, Response};

pub use config::{OpenAIConfig, OpenAIConfigBuilder};
pub use error::Error;
use io::{Chunks, Sse};
use response::OpenAIResponse;

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// OpenAI-compatible model provider.
///
/// Every [`ModelRequest`] becomes one streamed chat completion request.
/// Cloning is cheap and clones share the HTTP connection pool.
#[derive(Clone, Debug)]
pub struct OpenAIProvider {
    client: Client,
    config: Arc<OpenAIConfig>,
}

impl OpenAIProvider {
    /// Creates a new `OpenAIProvider` with the given configuration.
    #[inline]
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }

    /// Returns the URL requests are sent to.
    #[inline]
    pub fn endpoint(&self) -> String {
        format!("{}{CHAT_COMPLETIONS_PATH}", self.config.base_url)
    }

    fn build_request(&self, req: &ModelRequest) -> RequestBuilder {
        let body = proto::create_request(req, &self.config);
        debug!(
            "requesting a completion of {} message(s) from `{}`",
            req.messages.len(),
            self.config.model
        );
        self.client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .header(header::ACCEPT, "text/event-stream")
            .json(&body)
    }
}

impl ModelProvider for OpenAIProvider {
    type Error = Error;
    type Response = OpenAIResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let send_fut = self.build_request(req).send();
        async move {
            let resp = send_fut.await.map_err(|err| {
                Error::new(format!("failed to send the request: {err}"), ErrorKind::Other)
            })?;
            let resp = check_response(resp).await?;
            Ok(OpenAIResponse::from_sse(Sse::new(Chunks::from_response(resp))))
        }
    }
}

/// Turns error statuses and non-stream bodies into errors.
async fn check_response(resp: Response) -> Result<Response, Error> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let err = Error::from_status(status, &body);
        warn!("{err}");
        return Err(err);
    }
    if !is_event_stream(resp.headers()) {
        return Err(Error::new(
            format!(
                "expected an event stream, got {:?}",
                resp.headers().get(header::CONTENT_TYPE)
            ),
            ErrorKind::MalformedResponse,
        ));
    }
    Ok(resp)
}

fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<Mime>().ok())
        .is_some_and(|mime| {
            mime.type_() == mime::TEXT && mime.subtype() == mime::EVENT_STREAM
        })
}
