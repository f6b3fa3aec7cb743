//! Control-plane RPC - synchronous request/response over TCP
//!
//! One envelope in, one reply out, per call. No call state survives a
//! round trip, so every call is independently retryable; `start`/`stop`
//! are idempotent on the worker side to make retries after an ambiguous
//! timeout safe.

pub mod client;
pub mod protocol;
pub mod server;

pub use client::ControlClient;
pub use protocol::{CommandEnvelope, CommandReply, CommandVerb, ErrorKind};
pub use server::ControlServer;
