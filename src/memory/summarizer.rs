//! Conversation summarizer used by vector memory's `compress_window`.
//!
//! Grounded in `original_source/agent/memory/vector_memory.py`'s
//! `compress_memories`: an optional LLM-backed summarizer turns a batch of
//! conversations into one paragraph; with no provider configured, a plain
//! deterministic fallback lists instruction counts and topics instead.

use std::sync::Arc;

use tracing::warn;

use crate::core::provider::{GenerationOptions, LlmProvider};
use crate::core::types::Message;
use crate::model::ConversationVector;

/// Summarizes a batch of conversations into one paragraph via an LLM,
/// falling back to a naive summary if the provider call fails.
pub struct ConversationSummarizer {
    provider: Arc<dyn LlmProvider>,
    model: String,
}

impl ConversationSummarizer {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        ConversationSummarizer {
            provider,
            model: model.into(),
        }
    }

    pub async fn summarize(&self, conversations: &[ConversationVector]) -> String {
        if conversations.is_empty() {
            return String::new();
        }

        let transcript = build_transcript(conversations);
        let prompt = format!(
            "Summarize this window of conversations in 2-3 sentences. Focus on what the \
             user was trying to accomplish and any recurring preferences.\n\n{}",
            transcript
        );

        let options = GenerationOptions {
            model: Some(self.model.clone()),
            max_tokens: Some(300),
            temperature: Some(0.3),
            ..Default::default()
        };

        match self.provider.generate(&[Message::user(prompt)], &options).await {
            Ok(response) if !response.content.trim().is_empty() => response.content.trim().to_string(),
            Ok(_) => {
                warn!("conversation summarizer: provider returned empty content, using fallback");
                naive_summary(conversations)
            }
            Err(e) => {
                warn!(error = %e, "conversation summarizer: provider call failed, using fallback");
                naive_summary(conversations)
            }
        }
    }
}

fn build_transcript(conversations: &[ConversationVector]) -> String {
    conversations
        .iter()
        .map(|c| format!("User: {}\nAssistant: {}", c.user_message, c.response_preview))
        .collect::<Vec<_>>()
        .join("\n---\n")
}

/// Deterministic fallback with no LLM call: counts and a short topic list.
pub fn naive_summary(conversations: &[ConversationVector]) -> String {
    let total = conversations.len();
    let successes = conversations.iter().filter(|c| c.success).count();
    let sample: Vec<&str> = conversations
        .iter()
        .take(3)
        .map(|c| c.user_message.as_str())
        .collect();
    format!(
        "{} conversation(s), {} successful. Examples: {}",
        total,
        successes,
        sample.join("; ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<ConversationVector> {
        vec![
            ConversationVector {
                id: "1".into(),
                user_message: "open safari".into(),
                response_preview: "opened Safari".into(),
                session_id: "s".into(),
                emotion: None,
                success: true,
                timestamp: "2026-07-27T00:00:00Z".into(),
                embedding: vec![],
            },
            ConversationVector {
                id: "2".into(),
                user_message: "take a screenshot".into(),
                response_preview: "saved screenshot.png".into(),
                session_id: "s".into(),
                emotion: None,
                success: true,
                timestamp: "2026-07-27T00:05:00Z".into(),
                embedding: vec![],
            },
        ]
    }

    #[test]
    fn naive_summary_counts_successes() {
        let summary = naive_summary(&sample());
        assert!(summary.contains("2 conversation(s)"));
        assert!(summary.contains("2 successful"));
    }

    #[test]
    fn naive_summary_handles_empty() {
        assert!(naive_summary(&[]).contains("0 conversation(s)"));
    }
}
