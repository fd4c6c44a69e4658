//! # `runtime:scope_inspector` - Scope Inspection Extension
//!
//! Exposes the lexical environments of a paused debuggee to a remote
//! debugging client.
//!
//! ## Overview
//!
//! Every environment (block, function call, `with`, object/global) is exposed
//! through an [`EnvironmentActor`] with a stable actor id. On request the
//! actor produces a *form*: the environment's classification, its bindings
//! (for declarative environments), the reflected object (for object and
//! `with` environments), the callee's display name (for function calls), and
//! the form of its parent, transitively up to the outermost scope.
//!
//! **Key Features:**
//! - **Binding Resolution**: parameters in declaration order, then every
//!   other bound name, with writability derived from optimized-out and
//!   uninitialized markers
//! - **Scope Chains**: parent forms embedded in one response, cut at a
//!   configurable depth (256 by default) with a reference to the next scope
//! - **One Actor per Environment**: the [`ThreadActor`] registry hands out the
//!   same actor until it is released
//! - **Assignment**: `assign` requests write through to the interpreter when
//!   the environment supports it
//!
//! ## Protocol
//!
//! | Request    | Parameters       | Reply                          |
//! |------------|------------------|--------------------------------|
//! | `form`     |                  | `{from, form}`                 |
//! | `bindings` |                  | `{from, bindings}`             |
//! | `assign`   | `name`, `value`  | `{from}`                       |
//! | `release`  |                  | `{from}`                       |
//!
//! Failures reply `{from, error, message}` with the names in
//! [`protocol::error_names`].
//!
//! ## Usage
//!
//! ```rust
//! use ext_scope_inspector::{route_packet, InspectorConfig, ScopeSnapshot, ThreadActor};
//! use serde_json::json;
//!
//! let mut thread = ThreadActor::new(InspectorConfig::default());
//! let env = ScopeSnapshot::from_value(json!({
//!     "type": "declarative",
//!     "callee": { "displayName": "foo", "parameterNames": ["x"] },
//!     "bindings": { "y": 5 }
//! }))
//! .unwrap();
//! let actor = thread.create_environment_actor(env);
//!
//! let reply = route_packet(&mut thread, json!({ "to": actor.actor_id(), "type": "form" }));
//! assert_eq!(reply["form"]["type"], "function");
//! assert_eq!(reply["form"]["function"]["displayName"], "foo");
//! ```
//!
//! Hosts embedding the extension reach the same router through the
//! `op_scope_inspector_load_snapshot` and `op_scope_inspector_request` ops.
//!
//! ## Error Codes
//!
//! Errors carry codes 9800-9899 in their message, e.g.
//! `[9801] No such actor: conn0.thread1.environment4`.

use deno_core::{op2, Extension, OpState};
use deno_error::JsError;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub mod actor;
pub mod bindings;
pub mod config;
pub mod environment;
pub mod form;
pub mod grip;
pub mod protocol;
pub mod snapshot;
pub mod thread;
pub mod value;

pub use actor::{ActorId, EnvironmentActor};
pub use bindings::{resolve_bindings, Bindings, DescriptorForm, PropertyDescriptor};
pub use config::{InspectorConfig, DEFAULT_MAX_PARENT_DEPTH};
pub use environment::{
    CalleeScript, Environment, EnvironmentId, EnvironmentType, MutationError, VariableLookup,
    VariableMutation,
};
pub use form::{EnvironmentForm, FunctionForm, ParentForm};
pub use grip::{DefaultGripEncoder, Grip, GripEncoder};
pub use protocol::router::route_packet;
pub use snapshot::{ScopeSnapshot, SnapshotEnvironment};
pub use thread::ThreadActor;
pub use value::{DebuggeeValue, ObjectRef};

// ============================================================================
// Error Types (Error codes 9800-9899)
// ============================================================================

/// Error codes for scope inspector operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ScopeInspectorErrorCode {
    /// Generic inspector error
    Generic = 9800,
    /// Request addressed to an unknown or released actor
    NoSuchActor = 9801,
    /// Request type not handled by the actor
    UnrecognizedPacketType = 9802,
    /// Packet could not be parsed as a request
    MalformedPacket = 9803,
    /// Required request parameter missing
    MissingParameter = 9804,
    /// Value could not be decoded
    InvalidValue = 9805,
    /// Binding is not writable
    ImmutableBinding = 9806,
    /// Operation would run debuggee code
    ThreadWouldRun = 9807,
    /// Environment lacks the needed capability
    NotSupported = 9808,
    /// Assignment target does not exist
    UnknownBinding = 9809,
    /// Scope snapshot could not be built
    InvalidSnapshot = 9810,
    /// Configuration could not be loaded
    Config = 9811,
}

/// Scope inspector errors
#[derive(Debug, Error, JsError)]
pub enum ScopeInspectorError {
    #[error("[{code}] Inspector error: {message}")]
    #[class(generic)]
    Generic { code: u32, message: String },

    #[error("[{code}] No such actor: {message}")]
    #[class(generic)]
    NoSuchActor { code: u32, message: String },

    #[error("[{code}] Unrecognized packet type: {message}")]
    #[class(generic)]
    UnrecognizedPacketType { code: u32, message: String },

    #[error("[{code}] Malformed packet: {message}")]
    #[class(generic)]
    MalformedPacket { code: u32, message: String },

    #[error("[{code}] Missing parameter: {message}")]
    #[class(generic)]
    MissingParameter { code: u32, message: String },

    #[error("[{code}] Invalid value: {message}")]
    #[class(generic)]
    InvalidValue { code: u32, message: String },

    #[error("[{code}] Immutable binding: {message}")]
    #[class(generic)]
    ImmutableBinding { code: u32, message: String },

    #[error("[{code}] Thread would run: {message}")]
    #[class(generic)]
    ThreadWouldRun { code: u32, message: String },

    #[error("[{code}] Not supported: {message}")]
    #[class(generic)]
    NotSupported { code: u32, message: String },

    #[error("[{code}] Unknown binding: {message}")]
    #[class(generic)]
    UnknownBinding { code: u32, message: String },

    #[error("[{code}] Invalid snapshot: {message}")]
    #[class(generic)]
    InvalidSnapshot { code: u32, message: String },

    #[error("[{code}] Configuration error: {message}")]
    #[class(generic)]
    Config { code: u32, message: String },
}

impl ScopeInspectorError {
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            code: ScopeInspectorErrorCode::Generic as u32,
            message: message.into(),
        }
    }

    pub fn no_such_actor(message: impl Into<String>) -> Self {
        Self::NoSuchActor {
            code: ScopeInspectorErrorCode::NoSuchActor as u32,
            message: message.into(),
        }
    }

    pub fn unrecognized_packet_type(message: impl Into<String>) -> Self {
        Self::UnrecognizedPacketType {
            code: ScopeInspectorErrorCode::UnrecognizedPacketType as u32,
            message: message.into(),
        }
    }

    pub fn malformed_packet(message: impl Into<String>) -> Self {
        Self::MalformedPacket {
            code: ScopeInspectorErrorCode::MalformedPacket as u32,
            message: message.into(),
        }
    }

    pub fn missing_parameter(message: impl Into<String>) -> Self {
        Self::MissingParameter {
            code: ScopeInspectorErrorCode::MissingParameter as u32,
            message: message.into(),
        }
    }

    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue {
            code: ScopeInspectorErrorCode::InvalidValue as u32,
            message: message.into(),
        }
    }

    pub fn immutable_binding(message: impl Into<String>) -> Self {
        Self::ImmutableBinding {
            code: ScopeInspectorErrorCode::ImmutableBinding as u32,
            message: message.into(),
        }
    }

    pub fn thread_would_run(message: impl Into<String>) -> Self {
        Self::ThreadWouldRun {
            code: ScopeInspectorErrorCode::ThreadWouldRun as u32,
            message: message.into(),
        }
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported {
            code: ScopeInspectorErrorCode::NotSupported as u32,
            message: message.into(),
        }
    }

    pub fn unknown_binding(message: impl Into<String>) -> Self {
        Self::UnknownBinding {
            code: ScopeInspectorErrorCode::UnknownBinding as u32,
            message: message.into(),
        }
    }

    pub fn invalid_snapshot(message: impl Into<String>) -> Self {
        Self::InvalidSnapshot {
            code: ScopeInspectorErrorCode::InvalidSnapshot as u32,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ScopeInspectorErrorCode::Config as u32,
            message: message.into(),
        }
    }

    /// Error name used in protocol error packets
    pub fn protocol_name(&self) -> &'static str {
        use protocol::error_names::*;
        match self {
            Self::NoSuchActor { .. } => NO_SUCH_ACTOR,
            Self::UnrecognizedPacketType { .. } => UNRECOGNIZED_PACKET_TYPE,
            Self::MalformedPacket { .. } => MALFORMED_PACKET,
            Self::MissingParameter { .. } => MISSING_PARAMETER,
            Self::InvalidValue { .. } => INVALID_VALUE,
            Self::ImmutableBinding { .. } => IMMUTABLE_BINDING,
            Self::ThreadWouldRun { .. } => THREAD_WOULD_RUN,
            Self::NotSupported { .. } => NOT_SUPPORTED,
            Self::UnknownBinding { .. } => UNKNOWN_BINDING,
            Self::InvalidSnapshot { .. } => INVALID_SNAPSHOT,
            Self::Generic { .. } | Self::Config { .. } => UNKNOWN_ERROR,
        }
    }

    /// Message without the code prefix
    pub fn message(&self) -> &str {
        match self {
            Self::Generic { message, .. }
            | Self::NoSuchActor { message, .. }
            | Self::UnrecognizedPacketType { message, .. }
            | Self::MalformedPacket { message, .. }
            | Self::MissingParameter { message, .. }
            | Self::InvalidValue { message, .. }
            | Self::ImmutableBinding { message, .. }
            | Self::ThreadWouldRun { message, .. }
            | Self::NotSupported { message, .. }
            | Self::UnknownBinding { message, .. }
            | Self::InvalidSnapshot { message, .. }
            | Self::Config { message, .. } => message,
        }
    }
}

// ============================================================================
// State Management
// ============================================================================

/// Scope inspector state stored in OpState
pub struct ScopeInspectorState {
    thread: ThreadActor,
}

impl ScopeInspectorState {
    pub fn new(config: InspectorConfig) -> Self {
        Self {
            thread: ThreadActor::new(config),
        }
    }

    pub fn thread(&self) -> &ThreadActor {
        &self.thread
    }

    pub fn thread_mut(&mut self) -> &mut ThreadActor {
        &mut self.thread
    }
}

impl Default for ScopeInspectorState {
    fn default() -> Self {
        Self::new(InspectorConfig::default())
    }
}

/// Initialize (or reset) scope inspector state in OpState
pub fn init_scope_inspector_state(op_state: &mut OpState, config: InspectorConfig) {
    debug!(
        actor_prefix = %config.actor_prefix,
        max_parent_depth = ?config.max_parent_depth,
        "Initializing scope inspector state"
    );
    op_state.put(ScopeInspectorState::new(config));
}

// ============================================================================
// Extension Info
// ============================================================================

#[derive(Serialize)]
struct ExtensionInfo {
    name: &'static str,
    version: &'static str,
    status: &'static str,
    request_types: Vec<&'static str>,
}

// ============================================================================
// Operations
// ============================================================================

#[op2]
#[serde]
fn op_scope_inspector_info() -> ExtensionInfo {
    ExtensionInfo {
        name: "ext_scope_inspector",
        version: env!("CARGO_PKG_VERSION"),
        status: "active",
        request_types: vec!["form", "bindings", "assign", "release"],
    }
}

/// Replace the configuration. Existing actors are dropped.
#[op2(fast)]
fn op_scope_inspector_configure(
    state: &mut OpState,
    #[string] config_toml: String,
) -> Result<(), ScopeInspectorError> {
    let config = InspectorConfig::from_toml_str(&config_toml)?;
    init_scope_inspector_state(state, config);
    Ok(())
}

/// Register a scope-chain snapshot and return the innermost scope's actor id.
#[op2]
#[string]
fn op_scope_inspector_load_snapshot(
    state: &mut OpState,
    #[serde] snapshot: serde_json::Value,
) -> Result<String, ScopeInspectorError> {
    let env = ScopeSnapshot::from_value(snapshot)?;
    let inspector = state.borrow_mut::<ScopeInspectorState>();
    let actor = inspector.thread.create_environment_actor(env);
    Ok(actor.actor_id().to_string())
}

/// Route one protocol request packet and return the reply packet.
#[op2]
#[serde]
fn op_scope_inspector_request(
    state: &mut OpState,
    #[serde] packet: serde_json::Value,
) -> serde_json::Value {
    let inspector = state.borrow_mut::<ScopeInspectorState>();
    route_packet(&mut inspector.thread, packet)
}

/// Release every environment actor (the debuggee resumed).
#[op2(fast)]
fn op_scope_inspector_release_pool(state: &mut OpState) -> u32 {
    let inspector = state.borrow_mut::<ScopeInspectorState>();
    inspector.thread.release_pause_pool() as u32
}

// ============================================================================
// Extension Registration
// ============================================================================

deno_core::extension!(
    ext_scope_inspector,
    ops = [
        op_scope_inspector_info,
        op_scope_inspector_configure,
        op_scope_inspector_load_snapshot,
        op_scope_inspector_request,
        op_scope_inspector_release_pool
    ],
    state = |state| {
        init_scope_inspector_state(state, InspectorConfig::default());
    }
);

pub fn scope_inspector_extension() -> Extension {
    ext_scope_inspector::init()
}

// ============================================================================
// Tests
// ============================================================================
