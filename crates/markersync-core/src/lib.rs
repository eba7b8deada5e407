//! Reconciliation engine and tick orchestration for the live map marker sync.
//!
//! Each tick projects the record store's live entities onto one overlay
//! namespace: read a snapshot, diff it against the namespace's markers by
//! marker ID, then create, update, and delete until the two agree.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `markersync.yaml` into
//!   strongly-typed structs.
//! - [`diff`] -- [`plan_reconciliation`], the pure set-difference planner.
//! - [`engine`] -- [`ReconciliationEngine`] and [`TickOutcome`].
//! - [`control`] -- [`SchedulerControl`], shared pause/resume/stop state.
//! - [`scheduler`] -- [`run_scheduler`], the fixed-cadence tick loop.
//! - [`lifecycle`] -- [`Lifecycle`], readiness gate, bootstrap, teardown.
//! - [`once`] -- [`RunOnce`], a one-shot guard for bootstrap actions.
//!
//! [`plan_reconciliation`]: diff::plan_reconciliation
//! [`ReconciliationEngine`]: engine::ReconciliationEngine
//! [`TickOutcome`]: engine::TickOutcome
//! [`SchedulerControl`]: control::SchedulerControl
//! [`run_scheduler`]: scheduler::run_scheduler
//! [`Lifecycle`]: lifecycle::Lifecycle
//! [`RunOnce`]: once::RunOnce

pub mod config;
pub mod control;
pub mod diff;
pub mod engine;
pub mod lifecycle;
pub mod once;
pub mod scheduler;
