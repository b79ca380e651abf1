//! Decides whether a turn needs a tool.

use crate::branch::{Branch, Role};
use crate::error::GenerationError;
use crate::model_client::ModelClient;
use crate::prompts::{NO_TOOL_NEEDED, TOOL_DETERMINATION_PROMPT};

/// Named result on the chat branch holding the raw assessment.
pub const TOOL_USAGE_DIRECTIVE: &str = "tool_usage_directive";

const ASSESSMENT: &str = "assessment";

/// The outcome of an assessment.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Directive {
    /// The chat agent can answer on its own.
    NoToolNeeded,
    /// A free-text description of the task for the tool agent.
    Task(String),
}

impl Directive {
    /// Interprets generated assessment text.
    ///
    /// Any text containing the sentinel means no tool is needed, however
    /// much else surrounds it. Everything else is treated as a task, even if
    /// it is a poor one.
    pub fn from_assessment(text: &str) -> Self {
        if text.contains(NO_TOOL_NEEDED) {
            Directive::NoToolNeeded
        } else {
            Directive::Task(text.to_owned())
        }
    }
}

/// Asks the model whether the latest turn of `chat` needs a tool.
///
/// The question is asked on a hidden copy of the chat, so the turn sequence
/// of `chat` is left as it was. The raw answer is stored on `chat` as the
/// named result [`TOOL_USAGE_DIRECTIVE`].
pub async fn assess(
    client: &ModelClient,
    chat: &mut Branch,
) -> Result<Directive, GenerationError> {
    let text = {
        let chat = chat.with_visibility(false);
        let mut scratch = chat.fork();
        scratch.append(Role::User, TOOL_DETERMINATION_PROMPT);
        client.generate(&mut scratch, ASSESSMENT).await?
    };
    chat.set_result(TOOL_USAGE_DIRECTIVE, text.as_str());

    let directive = Directive::from_assessment(&text);
    debug!("assessment: {directive:?}");
    Ok(directive)
}
