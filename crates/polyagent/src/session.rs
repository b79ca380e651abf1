use polyagent_core::{Agent, AgentBuilder, AgentError, AgentStage, Role};
use polyagent_model::ModelProvider;

use crate::tools::*;

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    agent_builder: AgentBuilder,
    shell_tool: Option<ShellTool>,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let agent_builder = AgentBuilder::with_model_provider(provider);
        Self {
            agent_builder,
            shell_tool: None,
        }
    }

    /// Sets the system prompt for the agent.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.agent_builder = self.agent_builder.with_system_prompt(prompt);
        self
    }

    /// Attaches a callback to be invoked for every visible turn of the chat.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str, Role) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_transcript(on_transcript);
        self
    }

    /// Attaches a callback to be invoked whenever the agent enters another
    /// stage of a turn.
    #[inline]
    pub fn on_stage_change(
        mut self,
        on_stage_change: impl Fn(AgentStage) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_stage_change(on_stage_change);
        self
    }

    /// Enables the shell tool. Every command line the agent wants to run is
    /// passed to `on_shell_request` and runs only once approved.
    ///
    /// Without this callback the session has no shell tool.
    #[inline]
    pub fn on_shell_request(
        mut self,
        on_shell_request: impl Fn(ShellToolApproval) + Send + Sync + 'static,
    ) -> Self {
        self.shell_tool = Some(ShellTool::new(on_shell_request));
        self
    }

    /// Sets after how many turns the tool agent forgets its history.
    #[inline]
    pub fn with_tool_reset_interval(mut self, turns: usize) -> Self {
        self.agent_builder = self.agent_builder.with_tool_reset_interval(turns);
        self
    }

    /// Builds a new session with the built-in tools registered.
    pub fn build(self) -> Session {
        let mut agent_builder = self.agent_builder;
        if let Some(shell_tool) = self.shell_tool {
            agent_builder = agent_builder.with_tool(shell_tool);
        }
        let agent = agent_builder.with_tool(GlobTool::new()).build();

        Session { agent }
    }
}

/// A chat session, like a window that displays messages and has a input box.
///
/// The session holds a fully configured agent that you can use directly, and it
/// is basically a wrapper around [`Agent`].
pub struct Session {
    agent: Agent,
}

impl Session {
    /// Sends a message to the session and waits for the reply.
    pub async fn send_message(
        &mut self,
        message: &str,
    ) -> Result<String, AgentError> {
        info!("user message received");
        self.agent.send(message).await
    }

    /// Returns where the agent is within the current turn.
    #[inline]
    pub fn stage(&self) -> AgentStage {
        self.agent.stage()
    }

    /// Returns the underlying agent.
    #[inline]
    pub fn agent(&self) -> &Agent {
        &self.agent
    }
}
