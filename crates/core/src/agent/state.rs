use tracing::Instrument;

use super::Agent;
use crate::assessor::{self, Directive};
use crate::branch::Role;
use crate::error::AgentError;
use crate::planner::{self, Invocation};
use crate::prompts::{BACK_TO_CONVERSATION, INVOKING_TOOLS};
use crate::tool::Invoker;

const REPLY: &str = "reply";

/// Where the agent is within a turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AgentStage {
    /// Waiting for user input.
    #[default]
    Idle,
    /// Deciding whether a tool is needed.
    Assessing,
    /// Choosing tools and their parameters.
    Planning,
    /// Running the planned tools.
    Executing,
    /// Generating the reply.
    Responding,
}

impl Agent {
    /// Processes one user input and returns the reply.
    ///
    /// Turns already appended to the chat stay there when the turn fails,
    /// including the traces of tools that succeeded before a failing one.
    /// The agent is idle again afterwards either way.
    pub async fn send<S: Into<String>>(
        &mut self,
        input: S,
    ) -> Result<String, AgentError> {
        let input = input.into();
        let result = self
            .process_input(input)
            .instrument(debug_span!("turn"))
            .await;
        if let Err(err) = &result {
            error!("turn failed: {err}");
        }
        self.enter_stage(AgentStage::Idle);
        result
    }

    async fn process_input(&mut self, input: String) -> Result<String, AgentError> {
        self.enter_stage(AgentStage::Assessing);
        self.chat.append(Role::User, input);

        let directive =
            assessor::assess(&self.model_client, &mut self.chat).await?;
        if let Directive::Task(task) = directive {
            self.enter_stage(AgentStage::Planning);
            let plan = planner::plan(
                &self.model_client,
                &mut self.tool_branch,
                &self.registry,
                &task,
            )
            .await?;

            self.enter_stage(AgentStage::Executing);
            self.execute_plan(plan).await?;
        }

        self.enter_stage(AgentStage::Responding);
        let reply = self.model_client.generate(&mut self.chat, REPLY).await?;
        self.finish_turn();
        Ok(reply)
    }

    /// Runs the planned invocations in order and records their traces in
    /// the chat. Stops at the first failure.
    pub(super) async fn execute_plan(
        &mut self,
        plan: Vec<Invocation>,
    ) -> Result<(), AgentError> {
        self.chat.append(Role::Assistant, INVOKING_TOOLS);
        for invocation in plan {
            let tool = self.registry.resolve(&invocation.name)?;
            self.chat.append(Role::Assistant, format!("{invocation}\n"));
            let trace = Invoker.invoke(tool, invocation.parameters).await?;
            self.chat.append(Role::Assistant, trace.to_string());
        }
        self.chat.append(Role::Assistant, BACK_TO_CONVERSATION);
        Ok(())
    }

    fn enter_stage(&mut self, stage: AgentStage) {
        if self.current_stage == stage {
            return;
        }
        trace!("entering stage {stage:?}");
        self.current_stage = stage;
        if let Some(on_stage_change) = &self.on_stage_change {
            on_stage_change(stage);
        }
    }

    fn finish_turn(&mut self) {
        self.turns_since_reset =
            (self.turns_since_reset + 1) % self.tool_reset_interval;
        if self.turns_since_reset == 0 {
            trace!("resetting the tool branch");
            self.tool_branch = self.tool_seed.fork();
        }
    }
}
