//! The interpreter-facing side of scope inspection.
//!
//! An [`Environment`] is a handle to a live lexical scope owned by the
//! interpreter. The inspector only observes it: it reads classification,
//! walks the parent chain, and reads or writes bindings through the optional
//! [`VariableLookup`] and [`VariableMutation`] capabilities.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::DebuggeeValue;

/// Identity of an environment for the lifetime of a debugging session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentId(pub u64);

impl fmt::Display for EnvironmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "env#{}", self.0)
    }
}

/// Interpreter classification of an environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EnvironmentType {
    /// Holds its own bindings (blocks, function calls, modules)
    Declarative,
    /// Reflects the properties of an object as bindings (e.g. the global)
    Object,
    /// Created by a `with` statement
    With,
    /// Any type string the interpreter reports that the inspector does not
    /// interpret; passed through unchanged.
    Other(String),
}

impl EnvironmentType {
    pub fn as_str(&self) -> &str {
        match self {
            EnvironmentType::Declarative => "declarative",
            EnvironmentType::Object => "object",
            EnvironmentType::With => "with",
            EnvironmentType::Other(s) => s.as_str(),
        }
    }

    /// Object and `with` environments expose a reflected object.
    pub fn reflects_object(&self) -> bool {
        matches!(self, EnvironmentType::Object | EnvironmentType::With)
    }
}

impl From<String> for EnvironmentType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "declarative" => EnvironmentType::Declarative,
            "object" => EnvironmentType::Object,
            "with" => EnvironmentType::With,
            _ => EnvironmentType::Other(s),
        }
    }
}

impl From<EnvironmentType> for String {
    fn from(t: EnvironmentType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for EnvironmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Script of the function whose call created an environment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CalleeScript {
    /// Name the client shows for the function; `None` for anonymous functions
    pub display_name: Option<String>,
    /// Formal parameter names in declaration order
    pub parameter_names: Vec<String>,
}

/// Reading bindings by name.
///
/// Lookups never fail: a binding the interpreter cannot produce comes back as
/// one of the unavailable markers ([`DebuggeeValue::OptimizedOut`] and
/// friends), and an unknown name as [`DebuggeeValue::Undefined`].
pub trait VariableLookup {
    fn get_variable(&self, name: &str) -> DebuggeeValue;
}

/// Why the interpreter refused a write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    /// The write would execute debuggee code (e.g. a setter) while paused
    #[error("assignment would run debuggee code")]
    DebuggeeWouldRun,

    #[error("no binding named {0}")]
    NoSuchBinding(String),
}

/// Writing bindings by name.
pub trait VariableMutation {
    fn set_variable(&self, name: &str, value: DebuggeeValue) -> Result<(), MutationError>;
}

/// A live lexical scope in the debuggee.
pub trait Environment {
    fn id(&self) -> EnvironmentId;

    fn env_type(&self) -> EnvironmentType;

    /// Refinement such as "function" or "block", reported verbatim.
    fn scope_kind(&self) -> Option<String>;

    /// Enclosing environment, or `None` at the outermost scope.
    fn parent(&self) -> Option<Rc<dyn Environment>>;

    /// Present only for function-call environments.
    fn callee_script(&self) -> Option<CalleeScript>;

    /// Present only for object and `with` environments.
    fn object(&self) -> Option<DebuggeeValue>;

    /// Every name bound directly in this environment.
    fn names(&self) -> Vec<String>;

    /// `None` when the environment cannot look up variables, e.g. while it is
    /// still being initialized or after its frame was optimized away.
    fn variable_lookup(&self) -> Option<&dyn VariableLookup> {
        None
    }

    fn variable_mutation(&self) -> Option<&dyn VariableMutation> {
        None
    }
}
