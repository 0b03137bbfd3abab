//! Conversation trimming for pass-through chat.

use crate::message::ChatMessage;

/// Tokens kept free for the backend's reply.
pub const REPLY_RESERVE_TOKENS: usize = 768;

/// Rough token estimate for one message of `text`.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4 + 8
}

/// Keep the newest messages that fit in `token_limit`.
///
/// The system prompt and [`REPLY_RESERVE_TOKENS`] are charged against the
/// limit first. Messages are taken newest-first and the walk stops at the
/// first one that would overflow, so the result is always a suffix of
/// `messages` in original order. `None` keeps everything.
pub fn trim_history(
    messages: &[ChatMessage],
    system_prompt: &str,
    token_limit: Option<u64>,
) -> Vec<ChatMessage> {
    let Some(limit) = token_limit else {
        return messages.to_vec();
    };
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);

    let mut used = estimate_tokens(system_prompt);
    let mut keep_from = messages.len();

    for (index, message) in messages.iter().enumerate().rev() {
        let tokens = estimate_tokens(&message.content);
        if used
            .saturating_add(tokens)
            .saturating_add(REPLY_RESERVE_TOKENS)
            > limit
        {
            break;
        }
        used += tokens;
        keep_from = index;
    }

    if keep_from > 0 {
        tracing::debug!(
            dropped = keep_from,
            kept = messages.len() - keep_from,
            estimated_tokens = used,
            "history trimmed"
        );
    }
    messages[keep_from..].to_vec()
}
