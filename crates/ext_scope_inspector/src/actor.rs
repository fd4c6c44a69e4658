//! Environment actors.
//!
//! An [`EnvironmentActor`] exposes one [`Environment`] to the client under a
//! stable [`ActorId`]. Actors are minted and registered by the
//! [`ThreadActor`]; every operation takes the thread actor explicitly since it
//! owns the grip encoder and the environment-to-actor registry.

use std::borrow::Borrow;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bindings::{resolve_bindings, Bindings, PropertyDescriptor};
use crate::environment::{Environment, MutationError};
use crate::form::{environment_form, EnvironmentForm};
use crate::thread::ThreadActor;
use crate::value::DebuggeeValue;
use crate::ScopeInspectorError;

/// Protocol identity of an actor, unique within its connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ActorId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lists the bindings of a lexical environment and assigns new values to
/// them.
pub struct EnvironmentActor {
    actor_id: ActorId,
    environment: Rc<dyn Environment>,
}

impl fmt::Debug for EnvironmentActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentActor")
            .field("actor_id", &self.actor_id)
            .field("environment", &self.environment.id())
            .finish()
    }
}

impl EnvironmentActor {
    pub(crate) fn new(actor_id: ActorId, environment: Rc<dyn Environment>) -> Self {
        Self {
            actor_id,
            environment,
        }
    }

    pub fn actor_id(&self) -> &ActorId {
        &self.actor_id
    }

    pub fn environment(&self) -> &Rc<dyn Environment> {
        &self.environment
    }

    /// Wire form of the environment, including its whole parent chain.
    pub fn form(&self, thread: &mut ThreadActor) -> EnvironmentForm {
        environment_form(self, thread)
    }

    pub fn bindings(&self, thread: &ThreadActor) -> Bindings {
        resolve_bindings(self.environment.as_ref(), thread)
    }

    /// Assign `value` to the binding `name`.
    ///
    /// Writability follows the descriptor reported by [`Self::bindings`]:
    /// optimized-out parameters and unavailable variables are immutable.
    pub fn assign(&self, name: &str, value: DebuggeeValue) -> Result<(), ScopeInspectorError> {
        if let Some(lookup) = self.environment.variable_lookup() {
            let current = lookup.get_variable(name);
            let is_parameter = self
                .environment
                .callee_script()
                .is_some_and(|script| script.parameter_names.iter().any(|p| p == name));
            let descriptor = if is_parameter {
                PropertyDescriptor::for_parameter(current)
            } else {
                PropertyDescriptor::for_variable(current)
            };
            if !matches!(descriptor, PropertyDescriptor::Data { writable: true, .. }) {
                return Err(ScopeInspectorError::immutable_binding(format!(
                    "Binding {} cannot be assigned while unavailable",
                    name
                )));
            }
        }

        let mutation = self.environment.variable_mutation().ok_or_else(|| {
            ScopeInspectorError::not_supported(format!(
                "Environment {} does not support assignment",
                self.environment.id()
            ))
        })?;

        mutation.set_variable(name, value).map_err(|e| match e {
            MutationError::DebuggeeWouldRun => ScopeInspectorError::thread_would_run(
                "Assigning a value would cause the debuggee to run",
            ),
            MutationError::NoSuchBinding(name) => {
                ScopeInspectorError::unknown_binding(format!("No binding named {}", name))
            }
        })?;

        debug!(actor = %self.actor_id, name = %name, "Assigned binding");
        Ok(())
    }

    /// Clear the environment's association with this actor and drop the
    /// actor from the pool. A later request for the same environment mints a
    /// fresh actor.
    pub fn destroy(&self, thread: &mut ThreadActor) {
        thread.forget_environment(self.environment.id(), &self.actor_id);
        thread.unmanage(&self.actor_id);
        debug!(actor = %self.actor_id, env = %self.environment.id(), "Destroyed environment actor");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InspectorConfig;
    use crate::environment::{CalleeScript, EnvironmentId, EnvironmentType, VariableLookup, VariableMutation};
    use crate::snapshot::ScopeSnapshot;
    use serde_json::json;

    fn thread() -> ThreadActor {
        ThreadActor::new(InspectorConfig::default())
    }

    /// Environment whose every write would trigger a setter.
    struct SetterBackedEnvironment;

    impl Environment for SetterBackedEnvironment {
        fn id(&self) -> EnvironmentId {
            EnvironmentId(900)
        }
        fn env_type(&self) -> EnvironmentType {
            EnvironmentType::Declarative
        }
        fn scope_kind(&self) -> Option<String> {
            None
        }
        fn parent(&self) -> Option<Rc<dyn Environment>> {
            None
        }
        fn callee_script(&self) -> Option<CalleeScript> {
            None
        }
        fn object(&self) -> Option<DebuggeeValue> {
            None
        }
        fn names(&self) -> Vec<String> {
            vec!["x".to_string()]
        }
        fn variable_lookup(&self) -> Option<&dyn VariableLookup> {
            Some(self)
        }
        fn variable_mutation(&self) -> Option<&dyn VariableMutation> {
            Some(self)
        }
    }

    impl VariableLookup for SetterBackedEnvironment {
        fn get_variable(&self, _name: &str) -> DebuggeeValue {
            DebuggeeValue::Number(1.0)
        }
    }

    impl VariableMutation for SetterBackedEnvironment {
        fn set_variable(&self, _name: &str, _value: DebuggeeValue) -> Result<(), MutationError> {
            Err(MutationError::DebuggeeWouldRun)
        }
    }

    #[test]
    fn test_destroy_clears_association() {
        let mut thread = thread();
        let env = ScopeSnapshot::from_value(json!({ "type": "declarative" })).unwrap();
        let env_id = env.id();

        let actor = thread.create_environment_actor(env.clone());
        assert_eq!(thread.actor_for(env_id), Some(actor.actor_id()));

        actor.destroy(&mut thread);
        assert_eq!(thread.actor_for(env_id), None);
        assert!(thread.get_actor(actor.actor_id().as_str()).is_none());

        let fresh = thread.create_environment_actor(env);
        assert_ne!(fresh.actor_id(), actor.actor_id());
    }

    #[test]
    fn test_destroy_twice_is_harmless() {
        let mut thread = thread();
        let env = ScopeSnapshot::from_value(json!({ "type": "declarative" })).unwrap();
        let actor = thread.create_environment_actor(env.clone());

        actor.destroy(&mut thread);
        let replacement = thread.create_environment_actor(env.clone());
        // The stale actor must not unregister its replacement.
        actor.destroy(&mut thread);

        assert_eq!(thread.actor_for(env.id()), Some(replacement.actor_id()));
        assert_eq!(thread.actor_count(), 1);
    }

    #[test]
    fn test_assign_updates_binding() {
        let thread = thread();
        let env = ScopeSnapshot::from_value(json!({
            "type": "declarative",
            "bindings": { "y": 5 }
        }))
        .unwrap();
        let actor = EnvironmentActor::new(ActorId::new("a1"), env);

        actor.assign("y", DebuggeeValue::Number(6.0)).unwrap();

        let bindings = actor.bindings(&thread);
        assert_eq!(
            serde_json::to_value(bindings.variable("y").unwrap()).unwrap()["value"],
            json!(6)
        );
    }

    #[test]
    fn test_assign_rejects_unavailable_binding() {
        let env = ScopeSnapshot::from_value(json!({
            "type": "declarative",
            "bindings": { "tdz": { "type": "null", "uninitialized": true } }
        }))
        .unwrap();
        let actor = EnvironmentActor::new(ActorId::new("a1"), env);

        let err = actor.assign("tdz", DebuggeeValue::Null).unwrap_err();
        assert_eq!(err.protocol_name(), "immutableBinding");
    }

    #[test]
    fn test_assign_matches_parameter_writability() {
        let thread = thread();
        let env = ScopeSnapshot::from_value(json!({
            "type": "declarative",
            "callee": { "displayName": "f", "parameterNames": ["p", "q", "gone"] },
            "bindings": {
                "p": { "type": "null", "uninitialized": true },
                "q": { "type": "null", "missingArguments": true },
                "gone": { "type": "null", "optimizedOut": true }
            }
        }))
        .unwrap();
        let actor = EnvironmentActor::new(ActorId::new("a1"), env);

        let before = actor.bindings(&thread);
        assert!(before.argument("p").unwrap().is_writable());
        assert!(before.argument("q").unwrap().is_writable());
        assert!(!before.argument("gone").unwrap().is_writable());

        actor.assign("p", DebuggeeValue::Number(1.0)).unwrap();
        actor.assign("q", "late".into()).unwrap();
        let err = actor.assign("gone", DebuggeeValue::Null).unwrap_err();
        assert_eq!(err.protocol_name(), "immutableBinding");

        let after = actor.bindings(&thread);
        assert_eq!(
            serde_json::to_value(after.argument("p").unwrap()).unwrap()["value"],
            json!(1)
        );
        assert_eq!(
            serde_json::to_value(after.argument("q").unwrap()).unwrap()["value"],
            json!("late")
        );
    }

    #[test]
    fn test_assign_unknown_binding() {
        let env = ScopeSnapshot::from_value(json!({ "type": "declarative" })).unwrap();
        let actor = EnvironmentActor::new(ActorId::new("a1"), env);

        let err = actor.assign("nope", DebuggeeValue::Null).unwrap_err();
        assert_eq!(err.protocol_name(), "unknownBinding");
    }

    #[test]
    fn test_assign_without_mutation_support() {
        let env = ScopeSnapshot::from_value(json!({
            "type": "declarative",
            "mutable": false,
            "bindings": { "y": 5 }
        }))
        .unwrap();
        let actor = EnvironmentActor::new(ActorId::new("a1"), env);

        let err = actor.assign("y", DebuggeeValue::Null).unwrap_err();
        assert_eq!(err.protocol_name(), "notSupported");
    }

    #[test]
    fn test_assign_that_would_run_debuggee() {
        let actor = EnvironmentActor::new(ActorId::new("a1"), Rc::new(SetterBackedEnvironment));

        let err = actor.assign("x", DebuggeeValue::Number(2.0)).unwrap_err();
        assert_eq!(err.protocol_name(), "threadWouldRun");
    }

    #[test]
    fn test_actor_id_display_and_serde() {
        let id = ActorId::new("conn0.thread1.environment3");
        assert_eq!(id.to_string(), "conn0.thread1.environment3");
        assert_eq!(serde_json::to_value(&id).unwrap(), json!("conn0.thread1.environment3"));
    }
}
