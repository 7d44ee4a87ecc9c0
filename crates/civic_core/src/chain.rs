//! Priority-ordered chain of policies.
//!
//! Policies are appended in construction order. The most recently appended
//! entry has the highest priority; each entry falls back to the one appended
//! before it. The chain is stored as a plain list and walked from the end, so
//! the priority order is visible as data.
//!
//! ```text
//! append(A).append(B).append(C)   =>   C -> B -> A -> wait
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::gateway::Action;
use crate::policy::{Policy, TurnContext};
use crate::snapshot::Snapshot;

/// Precondition gating whether a policy runs at all.
pub type Guard = Arc<dyn Fn(&Snapshot) -> bool + Send + Sync>;

/// Hook invoked after the chain has finished a turn.
pub type CompletionHook = Arc<dyn Fn(&Snapshot, Completion) + Send + Sync>;

/// Name used for the terminal fallback in logs and outcomes.
pub const WAIT_FALLBACK: &str = "wait";

/// What a completion hook learns about the turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// The hooked policy itself acted.
    pub local: bool,
    /// Some policy in the chain acted (the wait fallback does not count).
    pub chain: bool,
}

/// A policy plus its optional guard and completion hook.
pub struct ChainEntry {
    policy: Box<dyn Policy>,
    guard: Option<Guard>,
    on_complete: Option<CompletionHook>,
}

impl ChainEntry {
    /// Wrap a policy with no guard and no hook.
    pub fn new(policy: impl Policy + 'static) -> Self {
        Self::from_boxed(Box::new(policy))
    }

    /// Wrap an already boxed policy.
    #[must_use]
    pub fn from_boxed(policy: Box<dyn Policy>) -> Self {
        Self {
            policy,
            guard: None,
            on_complete: None,
        }
    }

    /// Only run the policy when `guard` holds for the snapshot.
    pub fn with_guard(mut self, guard: impl Fn(&Snapshot) -> bool + Send + Sync + 'static) -> Self {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Call `hook` once the chain has finished the turn.
    pub fn on_complete(
        mut self,
        hook: impl Fn(&Snapshot, Completion) + Send + Sync + 'static,
    ) -> Self {
        self.on_complete = Some(Arc::new(hook));
        self
    }

    /// Policy name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.policy.name()
    }

    /// Whether a guard is attached.
    #[must_use]
    pub fn is_guarded(&self) -> bool {
        self.guard.is_some()
    }
}

impl fmt::Debug for ChainEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainEntry")
            .field("policy", &self.policy)
            .field("guarded", &self.guard.is_some())
            .field("hooked", &self.on_complete.is_some())
            .finish()
    }
}

/// Result of evaluating the chain for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Policy that acted; `None` when the wait fallback was used.
    pub policy: Option<String>,
    /// The primary action issued.
    pub action: Action,
    /// Extra action issued right after the primary one.
    pub follow_up: Option<Action>,
}

impl TurnOutcome {
    /// Whether a policy (rather than the fallback) acted.
    #[must_use]
    pub fn executed(&self) -> bool {
        self.policy.is_some()
    }
}

/// Ordered, fallback-linked set of policies evaluated once per turn.
#[derive(Debug, Default)]
pub struct PolicyChain {
    entries: Vec<ChainEntry>,
}

impl PolicyChain {
    /// Empty chain. Evaluating it always waits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a policy; it becomes the new highest-priority entry.
    #[must_use]
    pub fn append(self, policy: impl Policy + 'static) -> Self {
        self.append_entry(ChainEntry::new(policy))
    }

    /// Append a configured entry; it becomes the new highest-priority entry.
    #[must_use]
    pub fn append_entry(mut self, entry: ChainEntry) -> Self {
        self.push(entry);
        self
    }

    /// In-place form of [`PolicyChain::append_entry`].
    pub fn push(&mut self, entry: ChainEntry) {
        self.entries.push(entry);
    }

    /// Number of policies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the chain has no policies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Policy names, highest priority first.
    pub fn priority_order(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().rev().map(ChainEntry::name)
    }

    /// Run one turn.
    ///
    /// Walks entries from highest to lowest priority until one acts. A guarded
    /// entry whose guard fails is skipped without running its logic. When no
    /// policy acts the chain issues [`Action::Wait`], so the turn counter always
    /// advances. Completion hooks of every visited entry run afterwards,
    /// lowest priority first.
    pub fn evaluate(&self, snapshot: &Snapshot, ctx: &mut TurnContext<'_>) -> Result<TurnOutcome> {
        let mut visited: Vec<(usize, bool)> = Vec::new();
        let mut winner: Option<usize> = None;

        for (index, entry) in self.entries.iter().enumerate().rev() {
            let name = entry.name();
            let applicable = entry.guard.as_ref().map_or(true, |guard| guard(snapshot));
            let acted = if applicable {
                let reported = entry.policy.try_execute(snapshot, ctx)?;
                match (reported, ctx.issued().is_some()) {
                    (true, false) => {
                        warn!(policy = name, "Policy reported success without acting");
                        false
                    }
                    (false, true) => {
                        warn!(policy = name, "Policy acted but reported failure");
                        true
                    }
                    (reported, _) => reported,
                }
            } else {
                debug!(policy = name, "Guard rejected policy");
                false
            };

            visited.push((index, acted));
            if acted {
                winner = Some(index);
                break;
            }
            debug!(policy = name, "Policy not applicable, falling back");
        }

        let outcome = match winner {
            Some(index) => TurnOutcome {
                policy: Some(self.entries[index].name().to_string()),
                action: ctx.issued().cloned().unwrap_or(Action::Wait),
                follow_up: ctx.follow_up_action().cloned(),
            },
            None => {
                debug!("No policy applied, invoking wait as fallback");
                ctx.issue(WAIT_FALLBACK, Action::Wait)?;
                TurnOutcome {
                    policy: None,
                    action: Action::Wait,
                    follow_up: None,
                }
            }
        };

        let chain = winner.is_some();
        for &(index, local) in visited.iter().rev() {
            if let Some(hook) = &self.entries[index].on_complete {
                hook(snapshot, Completion { local, chain });
            }
        }

        Ok(outcome)
    }
}

impl fmt::Display for PolicyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (rank, entry) in self.entries.iter().rev().enumerate() {
            let guard = if entry.is_guarded() { " (guarded)" } else { "" };
            writeln!(f, "{}. {}{}", rank + 1, entry.name(), guard)?;
        }
        write!(f, "{}. {}", self.entries.len() + 1, WAIT_FALLBACK)
    }
}
