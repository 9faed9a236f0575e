//! Interleaving prior turns into a single text-generation prompt.

use data_connector::{ChatTurn, HistoryStore};
use tracing::warn;

/// Prior turns for a prompt whose window includes the current question.
pub async fn load_context(history: &dyn HistoryStore, session_id: &str, window: usize) -> Vec<ChatTurn> {
    let prior = window.saturating_sub(1);
    if prior == 0 {
        return Vec::new();
    }
    match history.recent(session_id, prior).await {
        Ok(turns) => turns,
        Err(e) => {
            warn!(session_id, error = %e, "Failed to load conversation context");
            Vec::new()
        }
    }
}

/// Without prior turns the question is sent as is.
pub fn build_text_prompt(prior: &[ChatTurn], question: &str) -> String {
    if prior.is_empty() {
        return question.to_string();
    }
    let mut lines: Vec<String> = prior
        .iter()
        .map(|turn| format!("{}: {}", turn.role.label(), turn.content))
        .collect();
    lines.push(format!("User: {question}"));
    format!(
        "Conversation context:\n{}\n\nPlease respond to the latest message.",
        lines.join("\n")
    )
}
