//! Short-term conversation memory.

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

/// Turns rendered into the prompt when no other size is configured.
pub const DEFAULT_WINDOW_TURNS: usize = 5;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Capitalized label used in the rendered window.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Render the last [`DEFAULT_WINDOW_TURNS`] turns.
pub fn render(turns: &[Turn]) -> String {
    render_window(turns, DEFAULT_WINDOW_TURNS)
}

/// Render the last `max_turns` turns as `"<Role>: <text>"` lines, oldest first.
pub fn render_window(turns: &[Turn], max_turns: usize) -> String {
    let start = turns.len().saturating_sub(max_turns);
    turns[start..]
        .iter()
        .map(|turn| format!("{}: {}\n", turn.role.label(), turn.text))
        .collect()
}

/// Append-only turn history shared by the requests of one process.
///
/// Every append and read goes through one lock, so concurrent requests
/// never observe a partially written history. A whole exchange (user turn,
/// window read, assistant turn) is serialized by [`Session::begin_exchange`].
#[derive(Debug, Default)]
pub struct Session {
    turns: Mutex<Vec<Turn>>,
    exchange: Mutex<()>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the returned guard for the duration of one exchange; other
    /// exchanges on this session wait until it is dropped.
    pub async fn begin_exchange(&self) -> MutexGuard<'_, ()> {
        self.exchange.lock().await
    }

    pub async fn append(&self, turn: Turn) {
        self.turns.lock().await.push(turn);
    }

    pub async fn push_user(&self, text: impl Into<String>) {
        self.append(Turn::user(text)).await;
    }

    pub async fn push_assistant(&self, text: impl Into<String>) {
        self.append(Turn::assistant(text)).await;
    }

    /// Copy of the full history.
    pub async fn snapshot(&self) -> Vec<Turn> {
        self.turns.lock().await.clone()
    }

    /// Rendered window over the most recent `max_turns` turns.
    pub async fn window_text(&self, max_turns: usize) -> String {
        render_window(&self.turns.lock().await, max_turns)
    }

    pub async fn len(&self) -> usize {
        self.turns.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.turns.lock().await.is_empty()
    }

    pub async fn clear(&self) {
        self.turns.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn history(n: usize) -> Vec<Turn> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Turn::user(format!("q{i}"))
                } else {
                    Turn::assistant(format!("a{i}"))
                }
            })
            .collect()
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&[]), "");
    }

    #[test]
    fn test_render_uses_last_five_in_order() {
        let rendered = render(&history(12));
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(
            lines,
            vec!["Assistant: a7", "User: q8", "Assistant: a9", "User: q10", "Assistant: a11"]
        );
    }

    #[test]
    fn test_render_short_history() {
        let rendered = render(&[Turn::user("প্রশ্ন")]);
        assert_eq!(rendered, "User: প্রশ্ন\n");
    }

    #[test]
    fn test_render_allows_consecutive_roles() {
        let turns = vec![Turn::user("a"), Turn::user("b"), Turn::assistant("c")];
        assert_eq!(render(&turns), "User: a\nUser: b\nAssistant: c\n");
    }

    #[test]
    fn test_render_window_custom_size() {
        assert_eq!(render_window(&history(4), 1), "Assistant: a3\n");
        assert_eq!(render_window(&history(4), 0), "");
    }

    #[tokio::test]
    async fn test_session_append_and_window() {
        let session = Session::new();
        assert!(session.is_empty().await);

        for turn in history(7) {
            session.append(turn).await;
        }
        assert_eq!(session.len().await, 7);
        assert_eq!(session.window_text(5).await, render(&history(7)));

        session.clear().await;
        assert!(session.is_empty().await);
    }

    #[tokio::test]
    async fn test_session_concurrent_appends() {
        let session = Arc::new(Session::new());
        let mut handles = Vec::new();
        for i in 0..20 {
            let session = Arc::clone(&session);
            handles.push(tokio::spawn(async move {
                session.push_user(format!("q{i}")).await;
                session.push_assistant(format!("a{i}")).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let turns = session.snapshot().await;
        assert_eq!(turns.len(), 40);
        assert_eq!(turns.iter().filter(|t| t.role == Role::User).count(), 20);
    }
}
