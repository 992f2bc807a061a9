//! Matcher - evaluates every rule against user input and selects replies.
//!
//! Each line of a message runs against the full rule table. A matching rule
//! can capture a context fact, trigger an asynchronous dictionary lookup, or
//! contribute one randomly chosen response; the non-empty contributions are
//! joined into a single reply string.

use crate::context::ContextStore;
use crate::dictionary::DefinitionSource;
use crate::rules::{CompiledRule, Rule, RuleTable};
use rand::Rng;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error};

/// Pattern substring that marks a rule as a dictionary-definition request.
const DEFINITION_KEY: &str = "definition";

/// Outcome of processing one user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Joined replies of all matching rules; empty when nothing matched.
    pub text: String,
    /// True when a definition rule matched and a lookup is in flight.
    pub pending_definition: bool,
}

enum RuleHit {
    Reply(String),
    PendingDefinition,
    Miss,
}

pub struct Matcher {
    table: Arc<RuleTable>,
    context: Arc<ContextStore>,
    definitions: Arc<dyn DefinitionSource>,
    definition_tx: broadcast::Sender<String>,
}

impl Matcher {
    pub fn new(
        table: Arc<RuleTable>,
        context: Arc<ContextStore>,
        definitions: Arc<dyn DefinitionSource>,
    ) -> Self {
        let (definition_tx, _) = broadcast::channel(8);
        Self {
            table,
            context,
            definitions,
            definition_tx,
        }
    }

    /// Subscribe to definition replies.
    ///
    /// Every lookup triggered by `process` emits exactly one value here;
    /// a subscriber takes the first one it receives as the reply. Subscribe
    /// before calling `process` so an instant lookup cannot be missed.
    pub fn subscribe_definitions(&self) -> broadcast::Receiver<String> {
        self.definition_tx.subscribe()
    }

    /// Match one user message against every rule.
    ///
    /// Lines are matched independently so one message can trigger several
    /// rule types; all non-empty replies are joined with single spaces.
    /// Matching itself is synchronous; only a triggered lookup runs in the
    /// background.
    pub fn process(&self, message: &str) -> MatchOutcome {
        let rules = self.table.all();
        let mut parts: Vec<String> = Vec::new();
        let mut pending_definition = false;

        for line in message.lines() {
            for compiled in rules.iter() {
                match self.match_rule(compiled, line) {
                    RuleHit::Reply(reply) => parts.push(reply),
                    RuleHit::PendingDefinition => pending_definition = true,
                    RuleHit::Miss => {}
                }
            }
        }

        MatchOutcome {
            text: parts.join(" "),
            pending_definition,
        }
    }

    fn match_rule(&self, compiled: &CompiledRule, line: &str) -> RuleHit {
        let Some(regex) = compiled.regex.as_ref() else {
            return RuleHit::Miss;
        };
        let Some(captures) = regex.captures(line) else {
            return RuleHit::Miss;
        };

        if let Some(captured) = captures.get(1) {
            self.capture_context(&compiled.rule.pattern, captured.as_str());

            if compiled.rule.pattern.contains(DEFINITION_KEY) {
                self.request_definition(captured.as_str());
                return RuleHit::PendingDefinition;
            }
        }

        match random_response(&compiled.rule) {
            Some(reply) => RuleHit::Reply(reply),
            None => RuleHit::Miss,
        }
    }

    /// Store the captured text under every recognized key the pattern
    /// source names.
    fn capture_context(&self, pattern: &str, captured: &str) {
        for key in ContextStore::recognized_keys() {
            if pattern.contains(key) {
                debug!("Capturing context {key:?} = {captured:?}");
                self.context.set_fact(key, captured);
            }
        }
    }

    /// Kick off an asynchronous dictionary lookup; the result lands on the
    /// definition broadcast channel.
    fn request_definition(&self, word: &str) {
        let word = word.to_string();
        let definitions = Arc::clone(&self.definitions);
        let tx = self.definition_tx.clone();

        tokio::spawn(async move {
            let reply = definitions.lookup(&word).await;
            // No receiver means the pipeline moved on; drop the reply.
            let _ = tx.send(reply);
        });
    }
}

fn random_response(rule: &Rule) -> Option<String> {
    if rule.responses.is_empty() {
        error!("Rule {:?} has no responses", rule.rtype);
        return None;
    }
    let index = rand::thread_rng().gen_range(0..rule.responses.len());
    rule.responses.get(index).cloned()
}
