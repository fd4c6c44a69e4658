//! Binding resolution for declarative environments.
//!
//! Parameters are resolved first, in declaration order, into `arguments`.
//! Every other bound name lands in `variables`. Nothing here fails: bindings
//! the interpreter cannot produce show up as non-writable descriptors whose
//! value grip carries the unavailable marker.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::{debug, trace};

use crate::environment::Environment;
use crate::grip::Grip;
use crate::thread::ThreadActor;
use crate::value::DebuggeeValue;

/// Property-descriptor view of one binding.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyDescriptor {
    Data {
        value: DebuggeeValue,
        writable: bool,
    },
    Accessor {
        get: Option<DebuggeeValue>,
        set: Option<DebuggeeValue>,
    },
}

impl PropertyDescriptor {
    /// Descriptor for a formal parameter. Only optimized-out parameters are
    /// read-only.
    pub fn for_parameter(value: DebuggeeValue) -> Self {
        let writable = !value.is_optimized_out();
        PropertyDescriptor::Data { value, writable }
    }

    /// Descriptor for a non-parameter binding. Any unavailable marker makes it
    /// read-only.
    pub fn for_variable(value: DebuggeeValue) -> Self {
        let writable = !value.is_unavailable();
        PropertyDescriptor::Data { value, writable }
    }

    /// Encode for the wire. Missing accessor halves encode as `undefined`.
    pub fn encode(&self, thread: &ThreadActor) -> DescriptorForm {
        match self {
            PropertyDescriptor::Data { value, writable } => DescriptorForm::Data {
                value: thread.create_value_grip(value),
                writable: *writable,
                configurable: false,
                enumerable: true,
            },
            PropertyDescriptor::Accessor { get, set } => {
                let grip = |half: &Option<DebuggeeValue>| {
                    thread.create_value_grip(half.as_ref().unwrap_or(&DebuggeeValue::Undefined))
                };
                DescriptorForm::Accessor {
                    get: grip(get),
                    set: grip(set),
                    configurable: false,
                    enumerable: true,
                }
            }
        }
    }
}

/// Wire form of a [`PropertyDescriptor`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DescriptorForm {
    Data {
        value: Grip,
        writable: bool,
        configurable: bool,
        enumerable: bool,
    },
    Accessor {
        get: Grip,
        set: Grip,
        configurable: bool,
        enumerable: bool,
    },
}

impl DescriptorForm {
    pub fn is_writable(&self) -> bool {
        matches!(self, DescriptorForm::Data { writable: true, .. })
    }
}

/// Bindings block of an environment form.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Bindings {
    /// One single-key entry per parameter, in declaration order
    pub arguments: Vec<BTreeMap<String, DescriptorForm>>,
    pub variables: BTreeMap<String, DescriptorForm>,
}

impl Bindings {
    /// Descriptor of the named parameter, if it is one.
    pub fn argument(&self, name: &str) -> Option<&DescriptorForm> {
        self.arguments.iter().find_map(|entry| entry.get(name))
    }

    pub fn variable(&self, name: &str) -> Option<&DescriptorForm> {
        self.variables.get(name)
    }
}

/// Resolve every binding of `env`.
///
/// Environments without variable lookup produce empty bindings.
pub fn resolve_bindings(env: &dyn Environment, thread: &ThreadActor) -> Bindings {
    let mut bindings = Bindings::default();

    let Some(lookup) = env.variable_lookup() else {
        debug!(env = %env.id(), "Environment has no variable lookup; reporting no bindings");
        return bindings;
    };

    let parameter_names = env
        .callee_script()
        .map(|script| script.parameter_names)
        .unwrap_or_default();

    let mut parameters = HashSet::with_capacity(parameter_names.len());
    for name in parameter_names {
        let descriptor = PropertyDescriptor::for_parameter(lookup.get_variable(&name));
        trace!(env = %env.id(), name = %name, ?descriptor, "Resolved parameter");
        bindings
            .arguments
            .push(BTreeMap::from([(name.clone(), descriptor.encode(thread))]));
        parameters.insert(name);
    }

    for name in env.names() {
        if parameters.contains(&name) {
            continue;
        }
        let descriptor = PropertyDescriptor::for_variable(lookup.get_variable(&name));
        trace!(env = %env.id(), name = %name, ?descriptor, "Resolved variable");
        bindings.variables.insert(name, descriptor.encode(thread));
    }

    bindings
}
