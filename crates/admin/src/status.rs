//! Operator status messages.
//!
//! Every admin outcome lands here as a [`StatusMessage`]. Dismissal timing
//! is the front end's concern; the board only holds the messages.

use serde::Serialize;

/// How long a non-error message stays visible.
const DEFAULT_DURATION_MS: u64 = 4000;

/// Errors linger so the operator has time to read the explanation.
const ERROR_DURATION_MS: u64 = 8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Success,
    Error,
    Warning,
    Info,
}

/// A single status message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub id: u64,
    pub kind: StatusKind,
    pub title: String,
    pub detail: Option<String>,
    pub duration_ms: u64,
}

impl StatusMessage {
    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }
}

/// Ordered message board with monotonic ids.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    messages: Vec<StatusMessage>,
    next_id: u64,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Posts a message and returns its id.
    pub fn post(
        &mut self,
        kind: StatusKind,
        title: impl Into<String>,
        detail: Option<String>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let duration_ms = match kind {
            StatusKind::Error => ERROR_DURATION_MS,
            _ => DEFAULT_DURATION_MS,
        };
        self.messages.push(StatusMessage {
            id,
            kind,
            title: title.into(),
            detail,
            duration_ms,
        });
        id
    }

    pub fn success(&mut self, title: impl Into<String>) -> u64 {
        self.post(StatusKind::Success, title, None)
    }

    pub fn info(&mut self, title: impl Into<String>) -> u64 {
        self.post(StatusKind::Info, title, None)
    }

    pub fn warning(&mut self, title: impl Into<String>, detail: impl Into<String>) -> u64 {
        self.post(StatusKind::Warning, title, Some(detail.into()))
    }

    pub fn error(&mut self, title: impl Into<String>, detail: impl Into<String>) -> u64 {
        self.post(StatusKind::Error, title, Some(detail.into()))
    }

    /// Dismisses a message. Returns `true` if it was on the board.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != id);
        self.messages.len() != before
    }

    pub fn get(&self, id: u64) -> Option<&StatusMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Messages oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &StatusMessage> {
        self.messages.iter()
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(StatusMessage::is_error)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Removes every message. Ids keep increasing afterwards.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_order_kept() {
        let mut board = StatusBoard::new();
        let a = board.success("first");
        let b = board.error("second", "why");
        let c = board.info("third");
        assert_eq!((a, b, c), (0, 1, 2));

        let titles: Vec<&str> = board.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, ["first", "second", "third"]);
    }

    #[test]
    fn errors_linger_longer() {
        let mut board = StatusBoard::new();
        let ok = board.success("ok");
        let warn = board.warning("careful", "detail");
        let err = board.error("failed", "detail");

        assert_eq!(board.get(ok).unwrap().duration_ms, DEFAULT_DURATION_MS);
        assert_eq!(board.get(warn).unwrap().duration_ms, DEFAULT_DURATION_MS);
        assert_eq!(board.get(err).unwrap().duration_ms, ERROR_DURATION_MS);
        assert!(ERROR_DURATION_MS > DEFAULT_DURATION_MS);
    }

    #[test]
    fn detail_is_carried() {
        let mut board = StatusBoard::new();
        let id = board.error("Upload failed", "bucket missing");
        let msg = board.get(id).unwrap();
        assert_eq!(msg.kind, StatusKind::Error);
        assert_eq!(msg.detail.as_deref(), Some("bucket missing"));
        let ok = board.success("x");
        assert!(board.get(ok).unwrap().detail.is_none());
    }

    #[test]
    fn dismiss_and_has_errors() {
        let mut board = StatusBoard::new();
        board.success("a");
        let err = board.error("b", "c");
        assert!(board.has_errors());

        assert!(board.dismiss(err));
        assert!(!board.dismiss(err));
        assert!(!board.has_errors());
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn clear_keeps_id_sequence() {
        let mut board = StatusBoard::new();
        board.success("a");
        board.success("b");
        board.clear();
        assert!(board.is_empty());
        assert_eq!(board.info("c"), 2);
    }

    #[test]
    fn serializes_kind_lowercase() {
        let mut board = StatusBoard::new();
        let id = board.warning("w", "d");
        let json = serde_json::to_value(board.get(id).unwrap()).unwrap();
        assert_eq!(json["kind"], "warning");
        assert_eq!(json["title"], "w");
    }
}
