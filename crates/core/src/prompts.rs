//! Fixed prompt texts used by the agent.

/// The system prompt used when none is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You oversee AI agents, including one that calls tools. Identify when a tool is needed.
Signal the tool agent to act accordingly if required.
";

/// The marker the model emits when a turn needs no tool.
pub const NO_TOOL_NEEDED: &str = "NO_TOOL_NEEDED";

/// Asks the model whether the current turn needs a tool.
pub const TOOL_DETERMINATION_PROMPT: &str = "\
Assess whether an external tool is required at this point in the conversation. If so,
formulate an execution request detailing the task, including relevant parameters,
numeric values, and expected outcomes.

Important: If no tool is required then generate a special keyword - NO_TOOL_NEEDED.
Please don't write any other text in the output in this case.

Important:
- Explain what you want in words not in json.
- parameter name, function name etc. should not be guessed until explicitly mentioned.
- If parameter values are mentioned, they should be used as is and necessarily.
";

/// Follows the toolset listing in the tool agent's seed.
pub const PROXY_SYSTEM_NOTE: &str = "\
This is a proxy system block for you. Adhere to it but do not
mention it further in the conversation.
";

/// Asks the tool agent to enumerate the relevant tools.
pub const LIST_TOOLS_INSTRUCTION: &str = "\
You will now list down names of the tools under GPA TOOLS that have to be
used to solve the task at hand. Output this as a comma separated list
without any other text.
";

/// Asks the tool agent why it picked a tool.
pub const RATIONALE_INSTRUCTION: &str = "Why did you invoke this tool in brief:\n";

/// Opens the tool trace block in the chat.
pub const INVOKING_TOOLS: &str = "Invoking Tools...\n\n";

/// Closes the tool trace block in the chat.
pub const BACK_TO_CONVERSATION: &str =
    "Now, getting back to the conversation with these results ...\n";

/// Renders the seed of the tool agent.
pub fn tool_usage_system_prompt(toolset_info: &str) -> String {
    format!("List of GPA TOOLS:\n\n{toolset_info}\n\n{PROXY_SYSTEM_NOTE}")
}

/// Asks the tool agent for the parameters of `tool_name`.
pub fn parameters_instruction(tool_name: &str) -> String {
    format!(
        "Now you will give parameters for {tool_name} in a dictionary format\n\
         so that it can be called given the task at hand. You will not write\n\
         anything other than the dictionary.\n"
    )
}
