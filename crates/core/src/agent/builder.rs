use std::sync::Arc;

use polyagent_model::ModelProvider;

use super::{Agent, AgentStage, StageObserver};
use crate::branch::{Branch, Observer, Role};
use crate::model_client::ModelClient;
use crate::prompts::{DEFAULT_SYSTEM_PROMPT, tool_usage_system_prompt};
use crate::tool::{Registry, Tool, ToolObject};

const DEFAULT_TOOL_RESET_INTERVAL: usize = 3;

/// [`Agent`] builder.
pub struct AgentBuilder {
    model_client: ModelClient,
    system_prompt: Option<String>,
    on_transcript: Option<Observer>,
    on_stage_change: Option<StageObserver>,
    registry: Registry,
    tool_reset_interval: usize,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            system_prompt: None,
            on_transcript: None,
            on_stage_change: None,
            registry: Registry::default(),
            tool_reset_interval: DEFAULT_TOOL_RESET_INTERVAL,
        }
    }

    /// Sets the system prompt of the chat agent.
    ///
    /// An empty prompt is replaced by the default one.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Attaches a callback to be invoked for every visible turn of the chat.
    ///
    /// User inputs, tool traces and replies are reported. The system prompt
    /// and the tool assessment are not.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str, Role) + Send + Sync + 'static,
    ) -> Self {
        self.on_transcript = Some(Arc::new(on_transcript));
        self
    }

    /// Attaches a callback to be invoked whenever the agent enters another
    /// stage of a turn.
    #[inline]
    pub fn on_stage_change(
        mut self,
        on_stage_change: impl Fn(AgentStage) + Send + Sync + 'static,
    ) -> Self {
        self.on_stage_change = Some(Arc::new(on_stage_change));
        self
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.registry.register(tool);
        self
    }

    /// Registers a type-erased tool.
    #[inline]
    pub fn with_tool_object(mut self, tool: Arc<dyn ToolObject>) -> Self {
        self.registry.register_object(tool);
        self
    }

    /// Sets after how many turns the tool branch starts over.
    ///
    /// Defaults to 3. Zero is treated as 1.
    #[inline]
    pub fn with_tool_reset_interval(mut self, turns: usize) -> Self {
        self.tool_reset_interval = turns.max(1);
        self
    }

    /// Builds the agent.
    pub fn build(self) -> Agent {
        let AgentBuilder {
            model_client,
            system_prompt,
            on_transcript,
            on_stage_change,
            registry,
            tool_reset_interval,
        } = self;

        let system_prompt = system_prompt
            .filter(|prompt| !prompt.is_empty())
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_owned());

        let mut chat = match on_transcript {
            Some(observer) => Branch::with_observer(observer),
            None => Branch::new(),
        };
        chat.with_visibility(false)
            .append(Role::System, system_prompt.as_str());

        let mut tool_seed = Branch::new();
        tool_seed.set_visible(false);
        tool_seed.append(
            Role::User,
            tool_usage_system_prompt(&registry.toolset_info()),
        );
        let tool_branch = tool_seed.fork();

        debug!("agent built with {} tool(s)", registry.len());
        Agent {
            model_client,
            registry,
            system_prompt,
            chat,
            tool_seed,
            tool_branch,
            current_stage: AgentStage::Idle,
            on_stage_change,
            turns_since_reset: 0,
            tool_reset_interval,
        }
    }
}
