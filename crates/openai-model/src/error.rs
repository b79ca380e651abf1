use std::error::Error as StdError;
use std::fmt::{self, Display};

use polyagent_model::{ErrorKind, ModelProviderError};
use reqwest::StatusCode;

use crate::proto::ApiErrorBody;

/// Error type for [`OpenAIProvider`](crate::OpenAIProvider).
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
    status: Option<StatusCode>,
}

impl Error {
    pub(crate) fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
            status: None,
        }
    }

    /// Builds the error for a non-success HTTP response from its status and
    /// body.
    pub(crate) fn from_status(status: StatusCode, body: &str) -> Self {
        let api_error = serde_json::from_str::<ApiErrorBody>(body)
            .ok()
            .map(|body| body.error);
        let code = api_error.as_ref().and_then(|err| err.code.as_deref());

        let kind = match (status, code) {
            (_, Some("content_filter" | "content_policy_violation")) => {
                ErrorKind::Moderated
            }
            (StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS, _) => ErrorKind::Moderated,
            // Running out of quota also answers 429, waiting will not help.
            (StatusCode::TOO_MANY_REQUESTS, Some("insufficient_quota")) => {
                ErrorKind::Other
            }
            (StatusCode::TOO_MANY_REQUESTS, _) => ErrorKind::RateLimitExceeded,
            _ => ErrorKind::Other,
        };

        let detail = match api_error {
            Some(err) => err.message,
            None if body.trim().is_empty() => "empty response body".to_owned(),
            None => body.trim().chars().take(200).collect(),
        };
        Self {
            message: format!("server responded with {status}: {detail}"),
            kind,
            status: Some(status),
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status, if the server answered with an error status.
    #[inline]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = Error::from_status(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"Slow down","type":"requests","code":"rate_limit_exceeded"}}"#,
        );
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert_eq!(err.status(), Some(StatusCode::TOO_MANY_REQUESTS));
        assert_eq!(err.message(), "server responded with 429 Too Many Requests: Slow down");

        let err = Error::from_status(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"You exceeded your quota","code":"insufficient_quota"}}"#,
        );
        assert_eq!(err.kind(), ErrorKind::Other);

        let err = Error::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"Flagged","code":"content_policy_violation"}}"#,
        );
        assert_eq!(err.kind(), ErrorKind::Moderated);

        let err = Error::from_status(StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS, "");
        assert_eq!(err.kind(), ErrorKind::Moderated);
    }

    #[test]
    fn test_unstructured_body() {
        let err = Error::from_status(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>\n");
        assert_eq!(err.kind(), ErrorKind::Other);
        assert!(err.message().ends_with(": <html>bad gateway</html>"));

        let err = Error::from_status(StatusCode::UNAUTHORIZED, "  ");
        assert!(err.message().ends_with(": empty response body"));
    }
}
