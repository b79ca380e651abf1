use polyagent_model::ModelFinishReason;
use serde::{Deserialize, Serialize};

/// The events in a preset response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "message_delta")]
    MessageDelta(String),
    #[serde(rename = "finish")]
    Finish(ModelFinishReason),
}

/// The preset response for one generation request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this response.
    pub events: Vec<PresetEvent>,
    /// If set, the request will fail in the first `failures` attempts.
    /// `Some(0)` means the request will fail infinitely.
    pub failures: Option<u64>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            failures: None,
        }
    }

    /// Creates a `PresetResponse` that streams `text` as a single delta.
    #[inline]
    pub fn with_text<S: Into<String>>(text: S) -> Self {
        Self::with_events([PresetEvent::MessageDelta(text.into())])
    }

    /// Sets failure times before a successful response. `0` means the
    /// response will always be a failure.
    #[inline]
    pub fn with_failures(mut self, failures: u64) -> Self {
        self.failures = Some(failures);
        self
    }

    /// Returns the concatenated text of all message deltas.
    pub fn text(&self) -> String {
        self.events
            .iter()
            .filter_map(|event| match event {
                PresetEvent::MessageDelta(delta) => Some(delta.as_str()),
                PresetEvent::Finish(_) => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_deserialize() {
        let response = PresetResponse::with_events([
            PresetEvent::MessageDelta("add, ".to_string()),
            PresetEvent::MessageDelta("multiply".to_string()),
            PresetEvent::Finish(ModelFinishReason::Length),
        ])
        .with_failures(2);

        let serialized = serde_json::to_string(&response).unwrap();
        let deserialized: PresetResponse =
            serde_json::from_str(&serialized).unwrap();

        assert_eq!(response, deserialized);
        assert_eq!(deserialized.text(), "add, multiply");
    }
}
