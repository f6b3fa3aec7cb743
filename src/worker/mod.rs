//! Worker process abstraction - one long-lived bot per OS process
//!
//! A worker owns its lifecycle state and is the only writer of store
//! records keyed under its own id. Lifecycle verbs arrive from the control
//! RPC server over a command channel; the heartbeat task publishes status
//! into the Shared State Store on a fixed interval.

pub mod bot;
pub mod heartbeat;

pub use bot::{BotWorker, WorkerCommand, run_lifecycle};
