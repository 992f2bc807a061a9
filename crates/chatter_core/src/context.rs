//! Conversation context - session facts extracted from user input.
//!
//! The matcher captures facts about the user (their name, favourite music,
//! their hobby) into this store; `render` substitutes them into response
//! templates wherever the matching placeholder token appears.

use std::collections::HashMap;
use std::sync::RwLock;
use tracing::warn;

/// Recognized context keys paired with the placeholder token each one fills
/// in response templates. `render` applies substitutions in this order.
const CONTEXT_KEYS: &[(&str, &str)] = &[
    ("name", "[name]"),
    ("music", "[music]"),
    ("cake", "[cake]"),
    ("hobby", "[hobby]"),
    ("interested", "[reason]"),
];

/// Session-scoped fact store with response template substitution.
///
/// Facts live for the lifetime of the chat session, are never deleted, and
/// the last write for a key wins.
pub struct ContextStore {
    facts: RwLock<HashMap<String, String>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self {
            facts: RwLock::new(HashMap::new()),
        }
    }

    /// The context keys the matcher is allowed to capture into.
    pub fn recognized_keys() -> impl Iterator<Item = &'static str> {
        CONTEXT_KEYS.iter().map(|(key, _)| *key)
    }

    /// Store or overwrite a fact. An empty key or value is rejected; the
    /// rejection is logged and nothing else happens.
    pub fn set_fact(&self, key: &str, value: &str) {
        if key.is_empty() || value.is_empty() {
            warn!("Invalid context fact: key={:?} value={:?}", key, value);
            return;
        }
        let mut facts = self.facts.write().expect("RwLock poisoned");
        facts.insert(key.to_string(), value.to_string());
    }

    /// Current value of a fact, if one has been captured.
    pub fn fact(&self, key: &str) -> Option<String> {
        let facts = self.facts.read().expect("RwLock poisoned");
        facts.get(key).cloned()
    }

    /// Substitute placeholders in a response template.
    ///
    /// For every recognized key in order: a stored fact replaces each
    /// occurrence of its placeholder; with no stored fact the placeholder is
    /// removed together with one preceding space. Templates without
    /// placeholders come back unchanged.
    pub fn render(&self, template: &str) -> String {
        let facts = self.facts.read().expect("RwLock poisoned");
        let mut rendered = template.to_string();
        for (key, placeholder) in CONTEXT_KEYS {
            match facts.get(*key) {
                Some(value) => rendered = rendered.replace(placeholder, value),
                None => rendered = rendered.replace(&format!(" {placeholder}"), ""),
            }
        }
        rendered
    }
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_overwrites_facts() {
        let store = ContextStore::new();
        store.set_fact("name", "Anna");
        assert_eq!(store.fact("name"), Some("Anna".to_string()));

        store.set_fact("name", "Erik");
        assert_eq!(store.fact("name"), Some("Erik".to_string()));
    }

    #[test]
    fn rejects_empty_key_or_value() {
        let store = ContextStore::new();
        store.set_fact("", "Anna");
        store.set_fact("name", "");
        assert_eq!(store.fact("name"), None);
    }

    #[test]
    fn render_substitutes_stored_fact() {
        let store = ContextStore::new();
        store.set_fact("name", "Anna");
        assert_eq!(store.render("Hello [name]!"), "Hello Anna!");
    }

    #[test]
    fn render_substitutes_every_occurrence() {
        let store = ContextStore::new();
        store.set_fact("name", "Anna");
        assert_eq!(store.render("[name], oh [name]!"), "Anna, oh Anna!");
    }

    #[test]
    fn render_removes_placeholder_and_preceding_space_without_fact() {
        let store = ContextStore::new();
        assert_eq!(store.render("Hello [name]"), "Hello");
        assert_eq!(store.render("Hello [name], how are you?"), "Hello, how are you?");
    }

    #[test]
    fn render_keeps_leading_placeholder_without_preceding_space() {
        let store = ContextStore::new();
        assert_eq!(store.render("[name] is here"), "[name] is here");
    }

    #[test]
    fn render_handles_multiple_keys() {
        let store = ContextStore::new();
        store.set_fact("hobby", "chess");
        assert_eq!(
            store.render("So [name], [hobby] because [reason]?"),
            "So, chess because?"
        );
    }

    #[test]
    fn render_leaves_plain_text_unchanged() {
        let store = ContextStore::new();
        assert_eq!(store.render("No placeholders here."), "No placeholders here.");
    }

    #[test]
    fn recognized_keys_are_ordered() {
        let keys: Vec<&str> = ContextStore::recognized_keys().collect();
        assert_eq!(keys, vec!["name", "music", "cake", "hobby", "interested"]);
    }
}
