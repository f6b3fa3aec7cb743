//! Control protocol - envelopes, verbs, and replies.
//!
//! The verb set is closed: dispatch is a compile-time match, and a verb
//! outside the set decodes into a typed `UnsupportedCommand`, never a
//! missing-key failure.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::error::{Error, Result};
use crate::core::types::{WorkerId, WorkerStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandVerb {
    List,
    Start,
    Stop,
    Ping,
    Status,
    Reload,
    DryReset,
}

impl CommandVerb {
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_value(Value::String(raw.to_string()))
            .map_err(|_| Error::UnsupportedCommand(raw.to_string()))
    }
}

impl std::fmt::Display for CommandVerb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CommandVerb::List => "list",
            CommandVerb::Start => "start",
            CommandVerb::Stop => "stop",
            CommandVerb::Ping => "ping",
            CommandVerb::Status => "status",
            CommandVerb::Reload => "reload",
            CommandVerb::DryReset => "dry_reset",
        };
        write!(f, "{s}")
    }
}

/// The unit sent over the control channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub target: WorkerId,
    pub verb: CommandVerb,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl CommandEnvelope {
    pub fn new(target: WorkerId, verb: CommandVerb) -> Self {
        Self {
            target,
            verb,
            args: Map::new(),
        }
    }

    /// Decode a wire line, separating "verb outside the protocol" from
    /// plain garbage.
    pub fn decode(line: &str) -> Result<Self> {
        let raw: RawEnvelope = serde_json::from_str(line)?;
        let verb = CommandVerb::parse(&raw.verb)?;
        Ok(Self {
            target: raw.target,
            verb,
            args: raw.args,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    target: WorkerId,
    verb: String,
    #[serde(default)]
    args: Map<String, Value>,
}

/// Wire error kinds, mirroring the core taxonomy so a client can
/// rehydrate typed errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ServiceUnavailable,
    UnknownWorker,
    UnsupportedCommand,
    DataIntegrity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandReply {
    Ack { ok: bool },
    Workers { ids: Vec<WorkerId> },
    State { status: WorkerStatus },
    Error { error: ErrorKind, message: String },
}

impl CommandReply {
    pub fn from_error(e: &Error) -> Self {
        let (error, message) = match e {
            Error::UnknownWorker(id) => (ErrorKind::UnknownWorker, format!("unknown worker {id}")),
            Error::UnsupportedCommand(verb) => (
                ErrorKind::UnsupportedCommand,
                format!("unsupported command: {verb}"),
            ),
            Error::ServiceUnavailable(_) | Error::Timeout(_) => {
                (ErrorKind::ServiceUnavailable, e.to_string())
            }
            other => (ErrorKind::DataIntegrity, other.to_string()),
        };
        CommandReply::Error { error, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trip() {
        let mut envelope = CommandEnvelope::new(WorkerId::new(4).unwrap(), CommandVerb::Start);
        envelope
            .args
            .insert("force".into(), Value::Bool(false));
        let line = serde_json::to_string(&envelope).unwrap();
        let back = CommandEnvelope::decode(&line).unwrap();
        assert_eq!(back.target, envelope.target);
        assert_eq!(back.verb, CommandVerb::Start);
        assert_eq!(back.args.len(), 1);
    }

    #[test]
    fn unknown_verb_is_a_typed_error() {
        let line = r#"{"target": 2, "verb": "self_destruct"}"#;
        match CommandEnvelope::decode(line) {
            Err(Error::UnsupportedCommand(verb)) => assert_eq!(verb, "self_destruct"),
            other => panic!("expected UnsupportedCommand, got {other:?}"),
        }
    }

    #[test]
    fn zero_target_fails_decode() {
        let line = r#"{"target": 0, "verb": "ping"}"#;
        assert!(CommandEnvelope::decode(line).is_err());
    }

    #[test]
    fn error_reply_keeps_the_taxonomy() {
        let reply = CommandReply::from_error(&Error::UnknownWorker(WorkerId::new(9).unwrap()));
        match reply {
            CommandReply::Error { error, .. } => assert_eq!(error, ErrorKind::UnknownWorker),
            other => panic!("unexpected reply: {other:?}"),
        }
    }
}
