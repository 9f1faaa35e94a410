//! Provider context assembly from conversation history.

use chatflow_llm::{ChatMessage, Role};
use chatflow_storage::{Message, MessageRole};

/// Messages shorter than this get rephrased so the model has something to
/// work with.
const SHORT_MESSAGE_LEN: usize = 10;

const SYSTEM_PROMPT: &str = "\
You are an expert, professional AI assistant.

FORMATTING RULES:
- Use Markdown to format your answers
- Use fenced code blocks with a language tag for code
- Bold the important points
- Use numbered lists for step-by-step instructions

RESPONSE STYLE:
- Be direct and concise while staying professional
- Structure your answers clearly
- Comment code you provide
- Give concrete examples where relevant

CONSTRAINTS:
- Never provide malicious code
- Always consider security implications
- Ask for clarification when in doubt
- Stay factual and precise

Adapt the level of detail to the complexity of the question.";

fn role_for(role: MessageRole) -> Role {
    match role {
        MessageRole::User => Role::User,
        MessageRole::Assistant => Role::Assistant,
        MessageRole::System => Role::System,
    }
}

fn system_message() -> ChatMessage {
    let now = chrono::Utc::now().format("%A %d %B %Y %H:%M");
    ChatMessage::system(format!(
        "{}\n\nThe current date and time is {}.",
        SYSTEM_PROMPT, now
    ))
}

/// Build the outbound message list: system prompt first, then the history in
/// order. A trailing user message that is very short is rephrased to ask for
/// a detailed answer.
pub fn build_context(history: &[Message]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(system_message());

    for record in history {
        messages.push(ChatMessage {
            role: role_for(record.role),
            content: record.content.clone(),
        });
    }

    if let Some(last) = messages.last_mut()
        && last.role == Role::User
    {
        let trimmed = last.content.trim();
        if trimmed.len() < SHORT_MESSAGE_LEN {
            last.content = format!("Could you answer this in detail: {}", trimmed);
        }
    }

    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(role: MessageRole, content: &str) -> Message {
        Message::new("conv-1", role, content)
    }

    #[test]
    fn test_system_prompt_comes_first() {
        let history = vec![message(MessageRole::User, "tell me about borrowing")];
        let context = build_context(&history);

        assert_eq!(context.len(), 2);
        assert_eq!(context[0].role, Role::System);
        assert!(context[0].content.contains("The current date and time is"));
    }

    #[test]
    fn test_roles_are_mapped() {
        let history = vec![
            message(MessageRole::User, "first question here"),
            message(MessageRole::Assistant, "an answer"),
            message(MessageRole::User, "a follow-up question"),
        ];
        let context = build_context(&history);

        let roles: Vec<Role> = context.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
    }

    #[test]
    fn test_short_trailing_user_message_is_rephrased() {
        let history = vec![message(MessageRole::User, "hi")];
        let context = build_context(&history);

        assert_eq!(
            context.last().unwrap().content,
            "Could you answer this in detail: hi"
        );
    }

    #[test]
    fn test_long_trailing_message_is_untouched() {
        let history = vec![message(MessageRole::User, "explain lifetimes please")];
        let context = build_context(&history);

        assert_eq!(context.last().unwrap().content, "explain lifetimes please");
    }

    #[test]
    fn test_trailing_assistant_message_is_untouched() {
        let history = vec![
            message(MessageRole::User, "hello there friend"),
            message(MessageRole::Assistant, "yo"),
        ];
        let context = build_context(&history);

        assert_eq!(context.last().unwrap().content, "yo");
    }
}
