//! Turns a tool task into a list of fully specified tool calls.
//!
//! Planning runs on the long-lived tool branch in three stages:
//!
//! 1. The model lists the relevant tools as comma separated names. Names
//!    that are not registered are ignored.
//! 2. For every listed tool, a fork of the tool branch asks for the call
//!    parameters and then for a short rationale.
//! 3. The parameters are extracted from the generated text. A tool whose
//!    parameters cannot be extracted is left out of the plan.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::Instrument;

use crate::branch::{Branch, Role};
use crate::error::GenerationError;
use crate::extract;
use crate::model_client::ModelClient;
use crate::prompts::{
    LIST_TOOLS_INSTRUCTION, RATIONALE_INSTRUCTION, parameters_instruction,
};
use crate::tool::Registry;

/// Named result on the tool branch holding the listed tool names.
pub const LIST_TOOLS: &str = "list_tools";
/// Named result on the tool branch holding the plan as JSON.
pub const TOOL_INVOCATIONS: &str = "tool_invocations";

const PARAMETERS: &str = "parameters";
const META: &str = "meta";

/// One planned tool call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// Name of the tool.
    pub name: String,
    /// Named arguments, in the order the model gave them.
    pub parameters: Map<String, Value>,
    /// Why the model wants this call.
    #[serde(rename = "meta")]
    pub rationale: String,
}

impl Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "> {} {} {}",
            self.name,
            Value::Object(self.parameters.clone()),
            self.rationale.trim()
        )
    }
}

/// Plans the tool calls for `directive`.
///
/// Only failures of the generation engine abort planning. Unregistered
/// names and unusable parameter sets just shrink the plan.
pub async fn plan(
    client: &ModelClient,
    tool_branch: &mut Branch,
    registry: &Registry,
    directive: &str,
) -> Result<Vec<Invocation>, GenerationError> {
    async {
        tool_branch.append(
            Role::User,
            format!("{directive}\n{LIST_TOOLS_INSTRUCTION}"),
        );
        let listing = client.generate(tool_branch, LIST_TOOLS).await?;
        let names = select_tools(&listing, registry);
        debug!("selected tools: {names:?}");

        let mut invocations = Vec::with_capacity(names.len());
        for name in names {
            let mut draft = tool_branch.fork();
            draft.append(Role::User, parameters_instruction(&name));
            let raw_parameters = client.generate(&mut draft, PARAMETERS).await?;
            draft.append(Role::User, RATIONALE_INSTRUCTION);
            let rationale = client.generate(&mut draft, META).await?;

            match extract::parameters(&raw_parameters) {
                Ok(parameters) => invocations.push(Invocation {
                    name,
                    parameters,
                    rationale,
                }),
                Err(err) => {
                    warn!("dropping `{name}` from the plan: {err}");
                }
            }
        }

        match serde_json::to_string(&invocations) {
            Ok(json) => tool_branch.set_result(TOOL_INVOCATIONS, json),
            Err(err) => warn!("failed to serialize the plan: {err}"),
        }
        Ok::<_, GenerationError>(invocations)
    }
    .instrument(debug_span!("planner"))
    .await
}

/// Picks the registered tool names out of a generated listing, keeping the
/// listed order and the first occurrence of repeated names.
fn select_tools(listing: &str, registry: &Registry) -> Vec<String> {
    let mut names: Vec<String> = vec![];
    for name in listing.split([',', '\n']) {
        let name = name.trim_matches(|c: char| {
            c.is_whitespace() || matches!(c, '`' | '"' | '\'')
        });
        if name.is_empty() || names.iter().any(|n| n == name) {
            continue;
        }
        if !registry.contains(name) {
            debug!("ignoring unregistered tool `{name}`");
            continue;
        }
        names.push(name.to_owned());
    }
    names
}
