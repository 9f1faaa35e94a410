//! Title generation policy: when to (re)name a conversation, how to build
//! the context for it, and how to clean the streamed result.

use chatflow_storage::{Conversation, Message};

/// How many recent messages feed the title context.
pub const TITLE_CONTEXT_MESSAGES: usize = 7;

/// Every Nth message the title is refreshed.
const TITLE_REFRESH_EVERY: usize = 7;

const GREETING_TOKENS: [&str; 6] = ["bonjour", "salut", "hey", "hello", "hi", "coucou"];

const SHORT_CONTEXT_LEN: usize = 10;

/// A title is (re)generated for brand-new conversations, for the first
/// exchange, and then every `TITLE_REFRESH_EVERY` messages.
pub fn should_generate(conversation: &Conversation, message_count: usize) -> bool {
    conversation.has_default_title()
        || message_count <= 2
        || message_count % TITLE_REFRESH_EVERY == 0
}

/// Newline-join the contents of the (already chronological) recent messages.
pub fn title_context(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|message| message.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// A context of one or two lines is usually a bare opener; give the model
/// something to title. Greetings get named as such, other short messages get
/// a generic framing.
pub fn enrich_short_context(context: &str) -> String {
    let line_count = context.lines().count();
    if line_count > 2 {
        return context.to_string();
    }

    let trimmed = context.trim();
    if trimmed.len() >= SHORT_CONTEXT_LEN {
        return context.to_string();
    }

    let lowered = trimmed.to_lowercase();
    for greeting in GREETING_TOKENS {
        if lowered.contains(greeting) {
            return format!(
                "The opening message is a greeting: '{}'. As an assistant I will help \
                 throughout the exchange, answering questions and assisting with tasks.",
                trimmed
            );
        }
    }

    format!(
        "The opening message is short: '{}'. As an assistant I will analyze the request \
         and provide an appropriate answer.",
        trimmed
    )
}

/// Prompt wrapping the conversation context with the titling rules.
pub fn title_prompt(context: &str) -> String {
    format!(
        "Analyze this conversation and generate a professional title following these rules:\n\
         \n\
         MANDATORY RULES:\n\
         - Between 4 and 6 words exactly\n\
         - No unnecessary articles\n\
         - No punctuation\n\
         - Professional, technical register\n\
         - Capture the main topic\n\
         \n\
         Conversation:\n\
         {}\n\
         \n\
         Generate only the title, with no other text or explanation.",
        context
    )
}

/// Strip quotes and terminal punctuation, then trim. An empty result means
/// the conversation keeps its current title.
pub fn clean_title(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '"' | '\'' | '.' | '!' | '?'))
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatflow_storage::MessageRole;

    fn conversation_titled(title: &str) -> Conversation {
        let mut conversation = Conversation::new(None);
        conversation.title = title.to_string();
        conversation
    }

    #[test]
    fn test_default_title_always_triggers() {
        let conversation = Conversation::new(None);
        assert!(should_generate(&conversation, 5));
    }

    #[test]
    fn test_first_exchange_triggers() {
        let conversation = conversation_titled("Existing Title");
        assert!(should_generate(&conversation, 1));
        assert!(should_generate(&conversation, 2));
    }

    #[test]
    fn test_every_seventh_message_triggers() {
        let conversation = conversation_titled("Existing Title");
        assert!(should_generate(&conversation, 7));
        assert!(should_generate(&conversation, 14));
    }

    #[test]
    fn test_other_counts_do_not_trigger() {
        let conversation = conversation_titled("Existing Title");
        for count in [3, 4, 5, 6, 8, 9, 10, 11, 12, 13, 15] {
            assert!(!should_generate(&conversation, count), "count {}", count);
        }
    }

    #[test]
    fn test_title_context_joins_contents() {
        let messages = vec![
            Message::new("c", MessageRole::User, "first"),
            Message::new("c", MessageRole::Assistant, "second"),
        ];
        assert_eq!(title_context(&messages), "first\nsecond");
    }

    #[test]
    fn test_greeting_context_is_enriched() {
        let enriched = enrich_short_context("hello");
        assert!(enriched.contains("greeting"));
        assert!(enriched.contains("'hello'"));
    }

    #[test]
    fn test_short_non_greeting_context_is_framed() {
        let enriched = enrich_short_context("rust?");
        assert!(enriched.contains("short"));
        assert!(enriched.contains("'rust?'"));
    }

    #[test]
    fn test_long_or_multiline_context_is_untouched() {
        let long_line = "a question that is plenty long on its own";
        assert_eq!(enrich_short_context(long_line), long_line);

        let multiline = "one\ntwo\nthree";
        assert_eq!(enrich_short_context(multiline), multiline);
    }

    #[test]
    fn test_clean_title_strips_quotes_and_punctuation() {
        assert_eq!(
            clean_title("\"Rust Streaming Pipeline Design!\""),
            "Rust Streaming Pipeline Design"
        );
        assert_eq!(clean_title("  What's New?  "), "Whats New");
    }

    #[test]
    fn test_clean_title_can_come_up_empty() {
        assert_eq!(clean_title("  \"!?\"  "), "");
        assert_eq!(clean_title(""), "");
    }

    #[test]
    fn test_cleaned_title_never_keeps_forbidden_chars() {
        let cleaned = clean_title("A. 'B' \"C\"! D?");
        for forbidden in ['"', '\'', '.', '!', '?'] {
            assert!(!cleaned.contains(forbidden));
        }
    }
}
