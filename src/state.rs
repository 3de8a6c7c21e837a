//! UI-agnostic conversation state types
//!
//! These are shared by the controller, the backend wire format and the
//! terminal surface, and don't depend on any specific UI framework.

use serde::{Deserialize, Serialize};

/// One utterance in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: ChatRole,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// The role of a turn's speaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Append-only sequence of turns.
///
/// Turns are never reordered or edited once pushed; callers only ever get
/// shared references back out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TurnLog(Vec<Turn>);

impl TurnLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.0.push(turn);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.0.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Turn] {
        &self.0
    }

    /// Copy of the log's turns, for handing to a request payload.
    pub fn to_vec(&self) -> Vec<Turn> {
        self.0.clone()
    }
}

impl<'a> IntoIterator for &'a TurnLog {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_string(&Turn::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn log_keeps_insertion_order() {
        let mut log = TurnLog::new();
        log.push(Turn::user("one"));
        log.push(Turn::assistant("two"));
        log.push(Turn::user("three"));

        let contents: Vec<&str> = log.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, ["one", "two", "three"]);
        assert_eq!(log.last(), Some(&Turn::user("three")));
    }

    #[test]
    fn log_serializes_as_plain_array() {
        let mut log = TurnLog::new();
        log.push(Turn::user("where is IT?"));
        let json = serde_json::to_value(&log).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["role"], "user");
    }
}
