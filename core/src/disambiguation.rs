//! Interactive choice between several equally valid parsed values.
//!
//! Each caller has at most one outstanding prompt. Posting a new prompt for
//! the same caller supersedes the old one, and a reply is delivered only to
//! the prompt that is current when it arrives.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use edict_fuzzy::Named;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;

use crate::caller::Caller;
use crate::caller::CallerId;
use crate::caller::Message;
use crate::config::EdictConfig;
use crate::parser::ValueParser;
use crate::tree::ParameterSpec;
use crate::value::Value;

struct PendingSelection {
    token: u64,
    options: Vec<String>,
    reply: oneshot::Sender<String>,
    deadline: Instant,
}

enum Wait {
    Reply(String),
    TimedOut,
    /// Replaced by a newer prompt, or the channel is shutting down.
    Abandoned,
}

#[derive(Default)]
pub struct DisambiguationChannel {
    pending: Mutex<HashMap<CallerId, PendingSelection>>,
    next_token: AtomicU64,
    shutdown: CancellationToken,
}

impl DisambiguationChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<CallerId, PendingSelection>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `caller` has a prompt that is still waiting for a reply.
    pub fn has_pending(&self, caller: &CallerId) -> bool {
        self.slots()
            .get(caller)
            .is_some_and(|slot| slot.deadline > Instant::now() && !slot.reply.is_closed())
    }

    /// Choices of the prompt currently waiting on `caller`, if any.
    pub fn pending_options(&self, caller: &CallerId) -> Option<Vec<String>> {
        self.slots().get(caller).map(|slot| slot.options.clone())
    }

    /// Hands `reply` to the prompt waiting on `caller`.
    ///
    /// Returns false when nothing was waiting, in which case the text should
    /// be treated as ordinary input.
    pub fn post_reply(&self, caller: &CallerId, reply: &str) -> bool {
        let Some(slot) = self.slots().remove(caller) else {
            return false;
        };
        slot.reply.send(reply.trim().to_string()).is_ok()
    }

    /// Abandons every outstanding prompt; later prompts fail immediately.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.slots().clear();
    }

    /// Asks `caller` to pick one of `options` for `param`.
    ///
    /// Returns `None` when no valid choice was made within the configured
    /// attempts, or when the prompt was superseded.
    pub async fn pick(
        &self,
        caller: &Arc<dyn Caller>,
        param: &ParameterSpec,
        options: Vec<Value>,
        parser: &dyn ValueParser,
        config: &EdictConfig,
    ) -> Option<Value> {
        if options.is_empty() {
            return None;
        }
        if config.always_pick_first_option {
            return options.into_iter().next();
        }

        let rendered: Vec<String> = options.iter().map(|value| parser.render(value)).collect();
        let timeout = config.option_pick_timeout();
        let attempts = config.option_pick_attempts.max(1);

        caller.send(Message::text(format!(
            "Pick a {} ({})",
            param.name(),
            param.value_type()
        )));
        caller.send(Message::text(format!(
            "This query will expire in {} seconds.",
            timeout.as_secs()
        )));

        for attempt in 1..=attempts {
            let prompt = || {
                caller.send(Message::Prompt {
                    title: "Please pick a valid option.".to_string(),
                    options: rendered.clone(),
                })
            };
            match self.await_reply(caller.id(), &rendered, timeout, prompt).await {
                Wait::Reply(text) => match match_choice(&text, &rendered) {
                    Some(index) => return options.into_iter().nth(index),
                    None => debug!(attempt, reply = %text, "reply matched no option"),
                },
                Wait::TimedOut => debug!(attempt, "option pick timed out"),
                Wait::Abandoned => {
                    debug!(param = param.name(), "option pick abandoned");
                    return None;
                }
            }
        }

        caller.send(Message::error(format!(
            "You did not enter a correct option within {attempts} tries."
        )));
        caller.send(Message::error(
            "Please double-check your arguments & option picking.",
        ));
        None
    }

    /// Opens the reply slot for `caller`, runs `prompt`, then waits.
    ///
    /// The slot exists before the prompt is shown, so a fast reply cannot be
    /// mistaken for a new command.
    async fn await_reply(
        &self,
        caller: CallerId,
        options: &[String],
        timeout: Duration,
        prompt: impl FnOnce(),
    ) -> Wait {
        if self.shutdown.is_cancelled() {
            return Wait::Abandoned;
        }

        let (tx, rx) = oneshot::channel();
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let replaced = self.slots().insert(
            caller.clone(),
            PendingSelection {
                token,
                options: options.to_vec(),
                reply: tx,
                deadline: Instant::now() + timeout,
            },
        );
        // Dropping the old sender wakes its waiter as abandoned.
        if let Some(stale) = replaced {
            warn!(caller = %caller, token = stale.token, "replacing an unanswered prompt");
            drop(stale);
        }
        prompt();

        let outcome = tokio::select! {
            _ = self.shutdown.cancelled() => Wait::Abandoned,
            received = tokio::time::timeout(timeout, rx) => match received {
                Ok(Ok(reply)) => Wait::Reply(reply),
                Ok(Err(_)) => Wait::Abandoned,
                Err(_) => Wait::TimedOut,
            },
        };

        // Clear our slot unless a newer prompt already took it over.
        let mut slots = self.slots();
        if slots.get(&caller).is_some_and(|slot| slot.token == token) {
            slots.remove(&caller);
        }
        outcome
    }
}

/// Index of the option named by `reply`: its rendered text (any case) or
/// its 1-based number.
fn match_choice(reply: &str, options: &[String]) -> Option<usize> {
    let reply = reply.trim();
    if let Some(index) = options
        .iter()
        .position(|option| option.eq_ignore_ascii_case(reply))
    {
        return Some(index);
    }
    match reply.trim_end_matches(')').parse::<usize>() {
        Ok(number) if (1..=options.len()).contains(&number) => Some(number - 1),
        _ => None,
    }
}
