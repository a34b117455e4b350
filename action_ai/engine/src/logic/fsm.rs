//! Generic FSM runtime: keyed states, pluggable handlers and intent emission
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::logic::context::{StanceContext, StanceEvent};
use crate::logic::intent::Intent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

/// Trait bound for enum-like state keys used by the FSM.
/// Must be hashable, cloneable, serializable and printable for logs/telemetry
pub trait StateKeyLike:
    Eq + Hash + Clone + Display + Send + Sync + Serialize + for<'de> Deserialize<'de> + 'static
{
}
impl<T> StateKeyLike for T where
    T: Eq + Hash + Clone + Display + Send + Sync + Serialize + for<'de> Deserialize<'de> + 'static
{
}

/// Registry mapping a state key to its handler implementation.
pub struct FsmRegistry<K: StateKeyLike> {
    pub(crate) handlers: HashMap<K, Box<dyn StateHandler<K>>>,
}

/// Decision returned by a state handler.
/// Stay(intents) keeps the current state, Transition switches to `to`.
pub enum TransitionDecision<K> {
    Stay(Vec<Intent>),
    Transition {
        to: K,
        reason: String,
        intents: Vec<Intent>,
    },
}

/// Per-state event handler: reads and updates the shared context and returns a decision
pub trait StateHandler<K: StateKeyLike>: Send + Sync {
    fn on_event(&mut self, ctx: &mut StanceContext, event: &StanceEvent) -> TransitionDecision<K>;
}

impl<K: StateKeyLike> FsmRegistry<K> {
    pub(crate) fn new() -> Self {
        FsmRegistry {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a given state key
    pub(crate) fn register(&mut self, state: K, handler: Box<dyn StateHandler<K>>) {
        self.handlers.insert(state, handler);
    }

    /// Route an event to the current state's handler and return next_state, intents
    /// If a transition occurs, LogTransition is inserted
    /// Caller is responsible for persisting next_state and executing the intents.
    pub(crate) fn handle<F>(
        &mut self,
        ctx: &mut StanceContext,
        event: &StanceEvent,
        get_state: F,
    ) -> (K, Vec<Intent>)
    where
        F: Fn(&StanceContext) -> &K,
    {
        let state = get_state(ctx).clone();
        if let Some(handler) = self.handlers.get_mut(&state) {
            match handler.on_event(ctx, event) {
                TransitionDecision::Stay(intents) => (state, intents),
                TransitionDecision::Transition {
                    to,
                    reason,
                    mut intents,
                } => {
                    intents.insert(
                        0,
                        Intent::LogTransition {
                            from: state.to_string(),
                            to: to.to_string(),
                            triggered_by: Some(event.clone()),
                            reason,
                        },
                    );
                    (to, intents)
                }
            }
        } else {
            // No handler registered: remain in place and emit a NoOp
            (state, vec![Intent::NoOp])
        }
    }
}
