//! One-shot guard for bootstrap actions.
//!
//! [`RunOnce`] is a tri-state flag (`NotStarted` -> `Running` -> `Done`)
//! moved forward by a single compare-and-set. Exactly one caller wins the
//! right to run the action; a failed action returns the flag to
//! `NotStarted` so a later caller may try again.

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};

const NOT_STARTED: u8 = 0;
const RUNNING: u8 = 1;
const DONE: u8 = 2;

/// Observable state of a [`RunOnce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnceState {
    /// The action has not run (or its last attempt failed).
    NotStarted,
    /// Some caller is running the action.
    Running,
    /// The action completed successfully.
    Done,
}

/// What a call to [`RunOnce::run`] did.
#[derive(Debug, PartialEq, Eq)]
pub enum OnceOutcome<T> {
    /// This caller ran the action and it succeeded.
    Ran(T),
    /// Another caller is running the action right now.
    InProgress,
    /// The action already completed.
    AlreadyDone,
}

/// Guard ensuring an action completes at most once.
#[derive(Debug)]
pub struct RunOnce {
    state: AtomicU8,
}

impl RunOnce {
    /// Create a guard in the `NotStarted` state.
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(NOT_STARTED),
        }
    }

    /// Current state.
    pub fn state(&self) -> OnceState {
        match self.state.load(Ordering::Acquire) {
            NOT_STARTED => OnceState::NotStarted,
            RUNNING => OnceState::Running,
            _ => OnceState::Done,
        }
    }

    /// Whether the action has completed.
    pub fn is_done(&self) -> bool {
        self.state() == OnceState::Done
    }

    /// Run `action` unless it has already run or is running.
    ///
    /// # Errors
    ///
    /// Returns the action's error; the guard goes back to `NotStarted`.
    pub async fn run<F, Fut, T, E>(&self, action: F) -> Result<OnceOutcome<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self
            .state
            .compare_exchange(NOT_STARTED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {}
            Err(RUNNING) => return Ok(OnceOutcome::InProgress),
            Err(_) => return Ok(OnceOutcome::AlreadyDone),
        }

        match action().await {
            Ok(value) => {
                self.state.store(DONE, Ordering::Release);
                Ok(OnceOutcome::Ran(value))
            }
            Err(e) => {
                self.state.store(NOT_STARTED, Ordering::Release);
                Err(e)
            }
        }
    }
}

impl Default for RunOnce {
    fn default() -> Self {
        Self::new()
    }
}
