//! Exclusive access to one shared-cache in-memory database.
//!
//! Shared-cache connections report lock conflicts as `SQLITE_LOCKED`,
//! which the busy timeout never retries. Sessions and schema work on an
//! in-memory database therefore take turns through a gate instead.
//!
//! # Invariants
//! - At most one `GatePass` per gate exists at a time.
//! - A waiter gives up after the timeout instead of blocking forever.
//! - Every handle to the same URI resolves to the same gate while any
//!   handle is alive.

use crate::runtime::{RuntimeError, RuntimeResult};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, PoisonError, Weak};
use std::time::Duration;

static MEMORY_GATES: Lazy<Mutex<HashMap<String, Weak<SessionGate>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Gate shared by every user of the in-memory database named `uri`.
pub(super) fn memory_gate(uri: &str) -> Arc<SessionGate> {
    let mut gates = MEMORY_GATES
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    gates.retain(|_, gate| gate.strong_count() > 0);
    if let Some(gate) = gates.get(uri).and_then(Weak::upgrade) {
        return gate;
    }
    let gate = Arc::new(SessionGate::default());
    gates.insert(uri.to_string(), Arc::downgrade(&gate));
    gate
}

#[derive(Debug, Default)]
pub(super) struct SessionGate {
    held: Mutex<bool>,
    released: Condvar,
}

impl SessionGate {
    /// Waits up to `timeout` for exclusive access.
    pub(super) fn acquire(self: &Arc<Self>, timeout: Duration) -> RuntimeResult<GatePass> {
        let held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut held, wait) = self
            .released
            .wait_timeout_while(held, timeout, |held| *held)
            .unwrap_or_else(PoisonError::into_inner);
        if *held {
            debug_assert!(wait.timed_out());
            return Err(RuntimeError::Driver(
                format!(
                    "in-memory database stayed busy for {} ms",
                    timeout.as_millis()
                )
                .into(),
            ));
        }
        *held = true;
        Ok(GatePass {
            gate: Arc::clone(self),
        })
    }

    fn release(&self) {
        *self.held.lock().unwrap_or_else(PoisonError::into_inner) = false;
        self.released.notify_one();
    }
}

/// Exclusive access token; dropping it lets the next waiter in.
#[derive(Debug)]
pub(super) struct GatePass {
    gate: Arc<SessionGate>,
}

impl Drop for GatePass {
    fn drop(&mut self) {
        self.gate.release();
    }
}
