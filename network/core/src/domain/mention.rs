// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mention detection
//!
//! A message addresses an agent by writing `@name` in its text. Only thread
//! participants other than the sender can be addressed.

use crate::domain::thread::{MessageContent, Thread};

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// Every distinct `@name` token in `text`, in order of first appearance.
///
/// An `@` glued to a preceding word character (as in an e-mail address) is
/// not a mention, and trailing dots are treated as punctuation.
pub fn mentioned_names(text: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    let mut prev: Option<char> = None;

    for (idx, c) in text.char_indices() {
        let glued = prev.is_some_and(|p| p.is_ascii_alphanumeric() || p == '_');
        prev = Some(c);
        if c != '@' || glued {
            continue;
        }

        let rest = &text[idx + 1..];
        let end = rest.find(|ch: char| !is_name_char(ch)).unwrap_or(rest.len());
        let name = rest[..end].trim_end_matches('.');
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }

    names
}

/// Participants of `thread` that `content` addresses, excluding `sender`.
pub fn addressed_participants(
    thread: &Thread,
    sender: &str,
    content: &MessageContent,
) -> Vec<String> {
    mentioned_names(&content.text)
        .into_iter()
        .filter(|name| *name != sender && thread.has_participant(name))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::thread::ThreadId;
    use chrono::Utc;
    use std::collections::HashMap;

    #[test]
    fn test_mentioned_names() {
        assert_eq!(mentioned_names("hey @bob, ask @carol."), vec!["bob", "carol"]);
        assert_eq!(mentioned_names("@alice @alice"), vec!["alice"]);
        assert_eq!(mentioned_names("@agent-1_x.v2 go"), vec!["agent-1_x.v2"]);
        assert!(mentioned_names("mail bob@example.com").is_empty());
        assert!(mentioned_names("a lone @ sign").is_empty());
        assert!(mentioned_names("").is_empty());
    }

    #[test]
    fn test_mentioned_names_handles_multibyte_text() {
        assert_eq!(mentioned_names("안녕 @bob 🙂"), vec!["bob"]);
    }

    #[test]
    fn test_addressed_participants_filters_sender_and_outsiders() {
        let thread = Thread {
            id: ThreadId(1),
            instruction: String::new(),
            participants: vec!["alice".to_string(), "bob".to_string()],
            metadata: HashMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let content = MessageContent::text("@alice @bob @mallory");
        assert_eq!(addressed_participants(&thread, "alice", &content), vec!["bob".to_string()]);
    }
}
