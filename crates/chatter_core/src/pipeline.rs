//! Event pipeline - throttles, debounces and replies to user submissions.
//!
//! Accepted submissions are echoed to the transcript immediately; the reply
//! is computed after a quiet period on a cancellable background task, so a
//! superseding submission silently replaces a pending one. A definition
//! rule match makes the reply await the first value from the dictionary
//! hand-off channel instead of the matcher's own text.
//!
//! Within one line the echo always renders before the reply. Across lines
//! replies may complete out of submission order when an earlier line waits
//! on a slow lookup; that reordering is accepted.

use crate::config::ChatConfig;
use crate::context::ContextStore;
use crate::matcher::Matcher;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

pub struct ChatPipeline {
    config: ChatConfig,
    matcher: Arc<Matcher>,
    context: Arc<ContextStore>,
    transcript: mpsc::Sender<String>,
}

impl ChatPipeline {
    pub fn new(
        config: ChatConfig,
        matcher: Arc<Matcher>,
        context: Arc<ContextStore>,
        transcript: mpsc::Sender<String>,
    ) -> Self {
        Self {
            config,
            matcher,
            context,
            transcript,
        }
    }

    /// Consume submissions until the input channel closes.
    ///
    /// Closing the channel shuts the pipeline down: a pending reply task is
    /// aborted and in-flight lookups are abandoned.
    pub async fn run(self, mut input: mpsc::Receiver<String>) {
        let throttle = Duration::from_millis(self.config.throttle_ms);
        let mut last_accepted: Option<Instant> = None;
        let mut pending: Option<JoinHandle<()>> = None;

        while let Some(message) = input.recv().await {
            if message.is_empty() {
                continue;
            }
            if let Some(accepted) = last_accepted {
                if accepted.elapsed() < throttle {
                    debug!("Throttled submission {:?}", message);
                    continue;
                }
            }
            last_accepted = Some(Instant::now());

            self.publish(format!("{}{}", self.config.user_label, message))
                .await;

            if let Some(task) = pending.take() {
                task.abort();
            }
            pending = Some(self.spawn_reply(message));
        }

        if let Some(task) = pending.take() {
            task.abort();
        }
        debug!("Input closed; pipeline finished");
    }

    /// Schedule the reply for an accepted submission after the quiet period.
    fn spawn_reply(&self, message: String) -> JoinHandle<()> {
        let config = self.config.clone();
        let matcher = Arc::clone(&self.matcher);
        let context = Arc::clone(&self.context);
        let transcript = self.transcript.clone();

        tokio::spawn(async move {
            sleep(Duration::from_millis(config.debounce_ms)).await;

            // Subscribe before matching so an instant lookup cannot emit
            // into the void.
            let mut definitions = matcher.subscribe_definitions();
            let outcome = matcher.process(&message);

            let reply = if !outcome.text.is_empty() {
                context.render(&outcome.text)
            } else if outcome.pending_definition {
                match definitions.recv().await {
                    Ok(definition) => definition,
                    Err(err) => {
                        warn!("Definition hand-off closed: {err}");
                        config.fallback_reply.clone()
                    }
                }
            } else {
                config.fallback_reply.clone()
            };

            let line = format!("{}{}", config.bot_label, reply);
            if transcript.send(line).await.is_err() {
                debug!("Transcript sink closed; dropping reply");
            }
        })
    }

    async fn publish(&self, line: String) {
        if self.transcript.send(line).await.is_err() {
            debug!("Transcript sink closed; dropping line");
        }
    }
}
