//! Thread Guard
//!
//! The player is confined to one caller thread. Every public method checks
//! the calling thread first; a mismatch is an error, or a one-time warning
//! when the player is configured to tolerate it.
//!
//! Construction may run on a different thread than the caller thread. The
//! guard holds every check until construction has finished.

use crate::error::{PlaybackError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, ThreadId};

/// One-shot signal opened when construction finishes
#[derive(Debug, Clone, Default)]
pub struct ConstructionGate {
    state: Arc<(Mutex<bool>, Condvar)>,
}

impl ConstructionGate {
    /// Closed gate and the opener that opens it when dropped
    pub fn new() -> (Self, GateOpener) {
        let gate = Self::default();
        let opener = GateOpener { gate: gate.clone() };
        (gate, opener)
    }

    pub fn is_open(&self) -> bool {
        *self.state.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the gate opens
    pub fn wait(&self) {
        let (lock, condvar) = &*self.state;
        let mut open = lock.lock().unwrap_or_else(PoisonError::into_inner);
        while !*open {
            open = condvar.wait(open).unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn open(&self) {
        let (lock, condvar) = &*self.state;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        condvar.notify_all();
    }
}

/// Opens its gate when dropped, including on early error returns
#[derive(Debug)]
pub struct GateOpener {
    gate: ConstructionGate,
}

impl Drop for GateOpener {
    fn drop(&mut self) {
        self.gate.open();
    }
}

/// Confines a player to its caller thread
#[derive(Debug)]
pub struct ThreadGuard {
    owner: ThreadId,
    owner_name: String,
    fail_on_wrong_thread: bool,
    warned: AtomicBool,
    gate: ConstructionGate,
}

impl ThreadGuard {
    pub fn new(owner: ThreadId, fail_on_wrong_thread: bool, gate: ConstructionGate) -> Self {
        let owner_name = if owner == thread::current().id() {
            thread_name(&thread::current())
        } else {
            format!("{owner:?}")
        };
        Self {
            owner,
            owner_name,
            fail_on_wrong_thread,
            warned: AtomicBool::new(false),
            gate,
        }
    }

    /// Guard owned by the calling thread
    pub fn current(fail_on_wrong_thread: bool, gate: ConstructionGate) -> Self {
        Self::new(thread::current().id(), fail_on_wrong_thread, gate)
    }

    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    /// Check the calling thread, after construction has finished
    pub fn verify(&self) -> Result<()> {
        self.gate.wait();
        let current = thread::current();
        if current.id() == self.owner {
            return Ok(());
        }

        let current_name = thread_name(&current);
        if self.fail_on_wrong_thread {
            return Err(PlaybackError::WrongThread {
                current: current_name,
                expected: self.owner_name.clone(),
            });
        }
        if !self.warned.swap(true, Ordering::SeqCst) {
            tracing::warn!(
                current = %current_name,
                expected = %self.owner_name,
                "Player accessed on the wrong thread"
            );
        }
        Ok(())
    }
}

fn thread_name(thread: &thread::Thread) -> String {
    thread
        .name()
        .map_or_else(|| format!("{:?}", thread.id()), str::to_string)
}
