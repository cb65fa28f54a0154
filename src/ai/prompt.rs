//! Prompt text.
//!
//! Holds the built-in system message and the layout of the user message:
//! assembled terminal context first, then the user's question.

/// System message used when the configuration defines none.
pub const DEFAULT_SYSTEM_MESSAGE: &str = r#"You are an expert terminal assistant running inside the user's tmux session. You are given a snapshot of the terminal (recent pane output, working directory, shell) followed by the user's question.

Guidelines:
1. Ground your answer in the terminal context when it is relevant.
2. Prefer a single, safe, correct shell command for the user's shell.
3. Explain what the command does and any side effects.
4. Warn before anything destructive (deleting files, changing system settings).
5. When a tool is available and you need more information, use it instead of guessing.

Be concise but thorough. Safety first."#;

/// Separator between the context and the user prompt.
pub const PROMPT_SEPARATOR: &str = "\n\n---\n\n";

/// Build the user message: context, separator, prompt. Without context the
/// prompt is sent alone.
pub fn compose_user_message(context: &str, user_prompt: &str) -> String {
    if context.trim().is_empty() {
        return user_prompt.to_string();
    }

    let mut message = String::with_capacity(context.len() + user_prompt.len() + 8);
    message.push_str(context);
    message.push_str(PROMPT_SEPARATOR);
    message.push_str(user_prompt);
    message
}
