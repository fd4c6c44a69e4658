//! In-memory environments built from JSON scope-chain snapshots.
//!
//! Hosts that capture a paused frame's scopes as data (and tests) describe a
//! chain like this, innermost scope first:
//!
//! ```json
//! {
//!   "type": "declarative",
//!   "scopeKind": "function",
//!   "callee": { "displayName": "foo", "parameterNames": ["x"] },
//!   "bindings": { "x": { "type": "undefined" }, "y": 5 },
//!   "parent": { "type": "object", "object": { "type": "object", "id": 1, "class": "Window" } }
//! }
//! ```
//!
//! Binding values use the grip shapes accepted by [`DebuggeeValue::from_json`].

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::environment::{
    CalleeScript, Environment, EnvironmentId, EnvironmentType, MutationError, VariableLookup,
    VariableMutation,
};
use crate::value::DebuggeeValue;
use crate::ScopeInspectorError;

/// Ids handed to snapshots that do not name one. Starts high so it stays
/// clear of explicit ids.
static NEXT_SNAPSHOT_ID: AtomicU64 = AtomicU64::new(1 << 32);

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeSnapshot {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(rename = "type")]
    pub env_type: EnvironmentType,
    #[serde(default)]
    pub scope_kind: Option<String>,
    #[serde(default)]
    pub callee: Option<CalleeSnapshot>,
    #[serde(default)]
    pub object: Option<Value>,
    #[serde(default)]
    pub bindings: Map<String, Value>,
    /// Whether the environment answers variable lookups
    #[serde(default = "default_true")]
    pub lookup: bool,
    /// Whether the environment accepts assignments
    #[serde(default = "default_true")]
    pub mutable: bool,
    #[serde(default)]
    pub parent: Option<Box<ScopeSnapshot>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalleeSnapshot {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub parameter_names: Vec<String>,
}

impl ScopeSnapshot {
    /// Parse a snapshot and build its environment chain.
    pub fn from_value(value: Value) -> Result<Rc<SnapshotEnvironment>, ScopeInspectorError> {
        let snapshot: ScopeSnapshot = serde_json::from_value(value)
            .map_err(|e| ScopeInspectorError::invalid_snapshot(e.to_string()))?;
        snapshot.build(None)
    }

    /// Parse a snapshot without a `parent` key and attach it under an
    /// existing environment.
    pub fn with_parent(
        value: Value,
        parent: Rc<SnapshotEnvironment>,
    ) -> Result<Rc<SnapshotEnvironment>, ScopeInspectorError> {
        let snapshot: ScopeSnapshot = serde_json::from_value(value)
            .map_err(|e| ScopeInspectorError::invalid_snapshot(e.to_string()))?;
        if snapshot.parent.is_some() {
            return Err(ScopeInspectorError::invalid_snapshot(
                "Snapshot already names a parent",
            ));
        }
        snapshot.build(Some(parent))
    }

    /// Build the chain outermost-first so every environment can hold its
    /// parent.
    fn build(
        self,
        outer: Option<Rc<SnapshotEnvironment>>,
    ) -> Result<Rc<SnapshotEnvironment>, ScopeInspectorError> {
        let mut chain = Vec::new();
        let mut next = Some(Box::new(self));
        while let Some(mut snapshot) = next {
            next = snapshot.parent.take();
            chain.push(snapshot);
        }

        let mut parent = outer;
        for snapshot in chain.into_iter().rev() {
            parent = Some(Rc::new((*snapshot).into_environment(parent)?));
        }

        parent.ok_or_else(|| ScopeInspectorError::invalid_snapshot("Empty snapshot"))
    }

    fn into_environment(
        self,
        parent: Option<Rc<SnapshotEnvironment>>,
    ) -> Result<SnapshotEnvironment, ScopeInspectorError> {
        let id = self
            .id
            .unwrap_or_else(|| NEXT_SNAPSHOT_ID.fetch_add(1, Ordering::Relaxed));

        let object = self
            .object
            .as_ref()
            .map(DebuggeeValue::from_json)
            .transpose()?;

        let bindings = self
            .bindings
            .iter()
            .map(|(name, value)| Ok((name.clone(), DebuggeeValue::from_json(value)?)))
            .collect::<Result<BTreeMap<_, _>, ScopeInspectorError>>()?;

        Ok(SnapshotEnvironment {
            id: EnvironmentId(id),
            env_type: self.env_type,
            scope_kind: self.scope_kind,
            callee: self.callee.map(|c| CalleeScript {
                display_name: c.display_name,
                parameter_names: c.parameter_names,
            }),
            object,
            parent,
            bindings: RefCell::new(bindings),
            lookup: self.lookup,
            mutable: self.mutable,
        })
    }
}

/// Environment backed by snapshot data. Assignments update the snapshot.
#[derive(Debug)]
pub struct SnapshotEnvironment {
    id: EnvironmentId,
    env_type: EnvironmentType,
    scope_kind: Option<String>,
    callee: Option<CalleeScript>,
    object: Option<DebuggeeValue>,
    parent: Option<Rc<SnapshotEnvironment>>,
    bindings: RefCell<BTreeMap<String, DebuggeeValue>>,
    lookup: bool,
    mutable: bool,
}

impl SnapshotEnvironment {
    fn is_parameter(&self, name: &str) -> bool {
        self.callee
            .as_ref()
            .is_some_and(|c| c.parameter_names.iter().any(|p| p == name))
    }
}

impl Drop for SnapshotEnvironment {
    // Unlink uniquely owned ancestors one at a time so long chains do not
    // drop recursively.
    fn drop(&mut self) {
        let mut next = self.parent.take();
        while let Some(parent) = next {
            next = match Rc::try_unwrap(parent) {
                Ok(mut env) => env.parent.take(),
                Err(_) => None,
            };
        }
    }
}

impl Environment for SnapshotEnvironment {
    fn id(&self) -> EnvironmentId {
        self.id
    }

    fn env_type(&self) -> EnvironmentType {
        self.env_type.clone()
    }

    fn scope_kind(&self) -> Option<String> {
        self.scope_kind.clone()
    }

    fn parent(&self) -> Option<Rc<dyn Environment>> {
        self.parent
            .as_ref()
            .map(|p| p.clone() as Rc<dyn Environment>)
    }

    fn callee_script(&self) -> Option<CalleeScript> {
        self.callee.clone()
    }

    fn object(&self) -> Option<DebuggeeValue> {
        self.object.clone()
    }

    fn names(&self) -> Vec<String> {
        let bindings = self.bindings.borrow();
        let mut names: Vec<String> = bindings.keys().cloned().collect();
        if let Some(callee) = &self.callee {
            for param in &callee.parameter_names {
                if !bindings.contains_key(param) {
                    names.push(param.clone());
                }
            }
        }
        names
    }

    fn variable_lookup(&self) -> Option<&dyn VariableLookup> {
        if self.lookup {
            Some(self)
        } else {
            None
        }
    }

    fn variable_mutation(&self) -> Option<&dyn VariableMutation> {
        if self.mutable {
            Some(self)
        } else {
            None
        }
    }
}

impl VariableLookup for SnapshotEnvironment {
    fn get_variable(&self, name: &str) -> DebuggeeValue {
        self.bindings
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or(DebuggeeValue::Undefined)
    }
}

impl VariableMutation for SnapshotEnvironment {
    fn set_variable(&self, name: &str, value: DebuggeeValue) -> Result<(), MutationError> {
        let mut bindings = self.bindings.borrow_mut();
        if !bindings.contains_key(name) && !self.is_parameter(name) {
            return Err(MutationError::NoSuchBinding(name.to_string()));
        }
        bindings.insert(name.to_string(), value);
        Ok(())
    }
}
