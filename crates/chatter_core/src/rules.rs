//! Rule table - the ordered conversation rules with compiled patterns.
//!
//! Rules are loaded in bulk at startup. Readers always see a complete
//! snapshot: an append swaps in a new list atomically, never mutating one a
//! matching call may still be iterating.

use regex::{Regex, RegexBuilder};
use std::sync::{Arc, RwLock};
use tracing::warn;

/// One conversation rule as produced by the loader.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Conversation category, e.g. "greetings" or "name".
    pub rtype: String,
    /// Regex source matched case-insensitively against each input line.
    pub pattern: String,
    /// Candidate replies; one is picked at random per match.
    pub responses: Vec<String>,
}

/// A rule with its compile outcome, recorded once at load time.
///
/// A pattern that fails to compile leaves `regex` at `None`: the rule never
/// matches for the remainder of the run and is not recompiled.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: Rule,
    pub regex: Option<Regex>,
}

impl CompiledRule {
    fn compile(rule: Rule) -> Self {
        let regex = match RegexBuilder::new(&rule.pattern)
            .case_insensitive(true)
            .build()
        {
            Ok(regex) => Some(regex),
            Err(err) => {
                warn!(
                    "Disabling rule {:?} with invalid pattern {:?}: {err}",
                    rule.rtype, rule.pattern
                );
                None
            }
        };
        Self { rule, regex }
    }

    /// Whether the rule survived pattern compilation.
    pub fn is_active(&self) -> bool {
        self.regex.is_some()
    }
}

/// Append-only rule collection with snapshot reads.
pub struct RuleTable {
    rules: RwLock<Arc<Vec<CompiledRule>>>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Bulk-append rules, compiling each pattern once.
    ///
    /// Concurrent readers keep iterating their current snapshot; the new
    /// list becomes visible only once the swap completes.
    pub fn load(&self, rules: Vec<Rule>) {
        let compiled: Vec<CompiledRule> = rules.into_iter().map(CompiledRule::compile).collect();
        let mut guard = self.rules.write().expect("RwLock poisoned");
        let mut next = Vec::with_capacity(guard.len() + compiled.len());
        next.extend(guard.iter().cloned());
        next.extend(compiled);
        *guard = Arc::new(next);
    }

    /// Stable snapshot for iteration by the matcher.
    pub fn all(&self) -> Arc<Vec<CompiledRule>> {
        Arc::clone(&self.rules.read().expect("RwLock poisoned"))
    }

    pub fn len(&self) -> usize {
        self.rules.read().expect("RwLock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pattern: &str) -> Rule {
        Rule {
            rtype: "test".to_string(),
            pattern: pattern.to_string(),
            responses: vec!["ok".to_string()],
        }
    }

    #[test]
    fn compiles_case_insensitive_patterns() {
        let table = RuleTable::new();
        table.load(vec![rule(r"hello\s(\w+)")]);

        let rules = table.all();
        let regex = rules[0].regex.as_ref().unwrap();
        assert!(regex.is_match("well HELLO There"));
    }

    #[test]
    fn invalid_pattern_is_marked_inactive() {
        let table = RuleTable::new();
        table.load(vec![rule(r"(unclosed"), rule(r"fine")]);

        let rules = table.all();
        assert!(!rules[0].is_active());
        assert!(rules[1].is_active());
    }

    #[test]
    fn load_appends_in_order() {
        let table = RuleTable::new();
        table.load(vec![rule("a"), rule("b")]);
        table.load(vec![rule("c")]);

        let all = table.all();
        let patterns: Vec<&str> = all.iter().map(|c| c.rule.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["a", "b", "c"]);
    }

    #[test]
    fn snapshot_is_stable_across_later_loads() {
        let table = RuleTable::new();
        table.load(vec![rule("a")]);

        let snapshot = table.all();
        table.load(vec![rule("b")]);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(table.len(), 2);
    }
}
