//! Remote debugging protocol packets for environment actors.
//!
//! Requests are addressed to an actor (`to`) and carry a request `type`.
//! Responses name the answering actor in `from`; failures carry an `error`
//! name and a human-readable `message`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod router;

// ============================================================================
// Packet Types
// ============================================================================

/// Request packet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestPacket {
    /// Target actor id
    pub to: String,
    /// Request type (e.g. "bindings")
    #[serde(rename = "type")]
    pub kind: String,
    /// Remaining request parameters
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl RequestPacket {
    pub fn new(to: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            kind: kind.into(),
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}

/// Error packet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPacket {
    /// Actor the failed request was addressed to
    pub from: String,
    /// Protocol error name (see [`error_names`])
    pub error: String,
    pub message: String,
}

/// Actor name used in replies to packets that could not be parsed far
/// enough to know their target.
pub const ROOT_ACTOR: &str = "root";

// ============================================================================
// Error Names
// ============================================================================

pub mod error_names {
    /// Request addressed to an actor that does not exist (or was released)
    pub const NO_SUCH_ACTOR: &str = "noSuchActor";
    /// Request type the actor does not handle
    pub const UNRECOGNIZED_PACKET_TYPE: &str = "unrecognizedPacketType";
    /// Packet is not a valid request
    pub const MALFORMED_PACKET: &str = "malformedPacket";
    /// Required request parameter is absent
    pub const MISSING_PARAMETER: &str = "missingParameter";
    /// Value could not be decoded
    pub const INVALID_VALUE: &str = "invalidValue";
    /// Binding cannot be assigned in its current state
    pub const IMMUTABLE_BINDING: &str = "immutableBinding";
    /// Request would resume debuggee execution
    pub const THREAD_WOULD_RUN: &str = "threadWouldRun";
    /// Environment lacks the capability the request needs
    pub const NOT_SUPPORTED: &str = "notSupported";
    /// Assignment target does not exist
    pub const UNKNOWN_BINDING: &str = "unknownBinding";
    /// Scope snapshot could not be built
    pub const INVALID_SNAPSHOT: &str = "invalidSnapshot";
    /// Anything else
    pub const UNKNOWN_ERROR: &str = "unknownError";
}
