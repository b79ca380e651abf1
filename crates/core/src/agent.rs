mod builder;
mod state;

use std::sync::Arc;

use crate::branch::Branch;
use crate::model_client::ModelClient;
use crate::tool::Registry;
pub use builder::AgentBuilder;
pub use state::AgentStage;

type StageObserver = Arc<dyn Fn(AgentStage) + Send + Sync>;

/// An agent instance, which coordinates a chat agent with a tool agent.
///
/// The agent owns two branches. The chat branch is the visible
/// conversation. The tool branch is where the tool agent picks tools and
/// their parameters, and it is wound back to its initial state every few
/// turns so that it does not grow forever.
///
/// Turns are processed one at a time: [`Agent::send`] borrows the agent
/// mutably until the reply is ready.
pub struct Agent {
    model_client: ModelClient,
    registry: Registry,
    system_prompt: String,
    chat: Branch,
    tool_seed: Branch,
    tool_branch: Branch,
    current_stage: AgentStage,
    on_stage_change: Option<StageObserver>,
    turns_since_reset: usize,
    tool_reset_interval: usize,
}

impl Agent {
    /// Returns the stage the agent is in.
    ///
    /// Outside of [`Agent::send`] this is always [`AgentStage::Idle`]. Use
    /// [`AgentBuilder::on_stage_change`] to follow a turn while it runs.
    #[inline]
    pub fn stage(&self) -> AgentStage {
        self.current_stage
    }

    /// Returns the visible conversation.
    #[inline]
    pub fn chat(&self) -> &Branch {
        &self.chat
    }

    /// Returns the tool agent's conversation.
    #[inline]
    pub fn tool_branch(&self) -> &Branch {
        &self.tool_branch
    }

    /// Returns the toolset.
    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the system prompt of the chat agent.
    #[inline]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}
