//! Environment forms: the wire snapshot of an environment actor.
//!
//! A form embeds the form of its parent, which embeds its own parent, up to
//! the outermost scope or until
//! [`InspectorConfig::max_parent_depth`](crate::config::InspectorConfig) is
//! reached. The chain is collected first and the forms are then assembled
//! outermost-first, so building a form does not recurse.

use std::rc::Rc;

use serde::Serialize;
use tracing::trace;

use crate::actor::{ActorId, EnvironmentActor};
use crate::bindings::{resolve_bindings, Bindings};
use crate::environment::{Environment, EnvironmentType};
use crate::grip::Grip;
use crate::thread::ThreadActor;
use crate::value::DebuggeeValue;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentForm {
    pub actor: ActorId,
    /// "function" or "block" for declarative environments, otherwise the
    /// interpreter's own type string
    #[serde(rename = "type")]
    pub env_type: String,
    pub scope_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<ParentForm>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<Grip>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionForm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bindings: Option<Bindings>,
}

impl EnvironmentForm {
    /// Number of embedded parent forms below this one.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self;
        while let Some(ParentForm::Embedded(parent)) = current.parent.as_deref() {
            depth += 1;
            current = parent;
        }
        depth
    }
}

/// Parent of a form: embedded in full, or cut short by
/// [`InspectorConfig::max_parent_depth`](crate::config::InspectorConfig).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParentForm {
    Embedded(EnvironmentForm),
    Truncated(TruncatedParent),
}

/// Reference to a parent whose form the client must request separately.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TruncatedParent {
    pub actor: ActorId,
    pub truncated: bool,
}

/// Callee of a function-call environment. Only the display name is exposed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Build the form of `actor`, creating actors for its ancestors as needed.
pub fn environment_form(actor: &EnvironmentActor, thread: &mut ThreadActor) -> EnvironmentForm {
    let max_depth = thread.config().max_parent_depth;

    let mut ancestors: Vec<(ActorId, Rc<dyn Environment>)> = Vec::new();
    let mut parent = None;

    let mut next = actor.environment().parent();
    while let Some(env) = next {
        let parent_actor = thread.create_environment_actor(env.clone());
        if max_depth.is_some_and(|max| ancestors.len() >= max) {
            parent = Some(Box::new(ParentForm::Truncated(TruncatedParent {
                actor: parent_actor.actor_id().clone(),
                truncated: true,
            })));
            break;
        }
        ancestors.push((parent_actor.actor_id().clone(), env.clone()));
        next = env.parent();
    }

    trace!(actor = %actor.actor_id(), ancestors = ancestors.len(), "Building environment form");

    for (actor_id, env) in ancestors.into_iter().rev() {
        let form = single_form(actor_id, env.as_ref(), thread, parent.take());
        parent = Some(Box::new(ParentForm::Embedded(form)));
    }

    single_form(
        actor.actor_id().clone(),
        actor.environment().as_ref(),
        thread,
        parent,
    )
}

fn single_form(
    actor: ActorId,
    env: &dyn Environment,
    thread: &ThreadActor,
    parent: Option<Box<ParentForm>>,
) -> EnvironmentForm {
    let env_type = env.env_type();
    let callee = env.callee_script();

    let type_name = match &env_type {
        EnvironmentType::Declarative if callee.is_some() => "function".to_string(),
        EnvironmentType::Declarative => "block".to_string(),
        other => other.as_str().to_string(),
    };

    let object = if env_type.reflects_object() {
        let obj = env.object().unwrap_or(DebuggeeValue::Undefined);
        Some(thread.create_value_grip(&obj))
    } else {
        None
    };

    let bindings = match env_type {
        EnvironmentType::Declarative => Some(resolve_bindings(env, thread)),
        _ => None,
    };

    EnvironmentForm {
        actor,
        env_type: type_name,
        scope_kind: env.scope_kind(),
        parent,
        object,
        function: callee.map(|script| FunctionForm {
            display_name: script.display_name,
        }),
        bindings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InspectorConfig, DEFAULT_MAX_PARENT_DEPTH};
    use crate::snapshot::ScopeSnapshot;
    use serde_json::json;

    fn thread() -> ThreadActor {
        ThreadActor::new(InspectorConfig::default())
    }

    fn form_of(snapshot: serde_json::Value, thread: &mut ThreadActor) -> EnvironmentForm {
        let env = ScopeSnapshot::from_value(snapshot).unwrap();
        let actor = thread.create_environment_actor(env);
        actor.form(thread)
    }

    #[test]
    fn test_block_and_function_classification() {
        let mut thread = thread();
        let block = form_of(json!({ "type": "declarative", "scopeKind": "block" }), &mut thread);
        assert_eq!(block.env_type, "block");
        assert!(block.function.is_none());
        assert!(block.bindings.is_some());

        let function = form_of(
            json!({
                "type": "declarative",
                "scopeKind": "function",
                "callee": { "displayName": "foo", "parameterNames": [] }
            }),
            &mut thread,
        );
        assert_eq!(function.env_type, "function");
        assert_eq!(function.function.unwrap().display_name.as_deref(), Some("foo"));
    }

    #[test]
    fn test_non_declarative_types_pass_through() {
        let mut thread = thread();
        for raw in ["object", "with", "global", "module"] {
            let form = form_of(
                json!({ "type": raw, "object": { "type": "object", "id": 4, "class": "Object" } }),
                &mut thread,
            );
            assert_eq!(form.env_type, raw);
            assert!(form.bindings.is_none());
        }
    }

    #[test]
    fn test_object_only_for_object_and_with() {
        let mut thread = thread();
        let obj = json!({ "type": "object", "id": 4, "class": "Object" });

        let with = form_of(json!({ "type": "with", "object": obj }), &mut thread);
        assert!(with.object.is_some());

        let global = form_of(json!({ "type": "global", "object": obj }), &mut thread);
        assert!(global.object.is_none());
    }

    #[test]
    fn test_missing_object_encodes_undefined() {
        let mut thread = thread();
        let form = form_of(json!({ "type": "with" }), &mut thread);

        let wire = serde_json::to_value(&form).unwrap();
        assert_eq!(wire["object"], json!({ "type": "undefined" }));
    }

    #[test]
    fn test_object_scenario() {
        let mut thread = thread();
        let form = form_of(
            json!({ "type": "object", "object": { "type": "object", "id": 9, "class": "Window" } }),
            &mut thread,
        );

        let wire = serde_json::to_value(&form).unwrap();
        assert_eq!(
            wire,
            json!({
                "actor": form.actor.as_str(),
                "type": "object",
                "scopeKind": null,
                "object": { "type": "object", "actor": "conn0.obj9", "class": "Window" }
            })
        );
        assert!(wire.get("bindings").is_none());
        assert!(wire.get("parent").is_none());
    }

    #[test]
    fn test_function_scenario() {
        let mut thread = thread();
        let form = form_of(
            json!({
                "type": "declarative",
                "scopeKind": "function",
                "callee": { "displayName": "foo", "parameterNames": ["x"] },
                "bindings": { "x": { "type": "undefined" }, "y": 5 }
            }),
            &mut thread,
        );

        assert_eq!(
            serde_json::to_value(&form).unwrap(),
            json!({
                "actor": form.actor.as_str(),
                "type": "function",
                "scopeKind": "function",
                "function": { "displayName": "foo" },
                "bindings": {
                    "arguments": [
                        { "x": { "value": { "type": "undefined" }, "writable": true, "configurable": false, "enumerable": true } }
                    ],
                    "variables": {
                        "y": { "value": 5, "writable": true, "configurable": false, "enumerable": true }
                    }
                }
            })
        );
    }

    #[test]
    fn test_parent_chain_is_embedded() {
        let mut thread = thread();
        let form = form_of(
            json!({
                "type": "declarative",
                "parent": {
                    "type": "declarative",
                    "callee": { "displayName": "outer", "parameterNames": [] },
                    "parent": {
                        "type": "object",
                        "object": { "type": "object", "id": 1, "class": "Window" }
                    }
                }
            }),
            &mut thread,
        );

        assert_eq!(form.depth(), 2);
        let Some(ParentForm::Embedded(first)) = form.parent.as_deref() else {
            panic!("expected embedded parent");
        };
        assert_eq!(first.env_type, "function");
        let Some(ParentForm::Embedded(second)) = first.parent.as_deref() else {
            panic!("expected embedded grandparent");
        };
        assert_eq!(second.env_type, "object");
        assert!(second.parent.is_none());
        assert_eq!(thread.actor_count(), 3);
    }

    #[test]
    fn test_chain_of_n_parents() {
        let mut snapshot = json!({ "type": "declarative" });
        for _ in 0..50 {
            snapshot = json!({ "type": "declarative", "parent": snapshot });
        }
        let mut thread = thread();
        let form = form_of(snapshot, &mut thread);
        assert_eq!(form.depth(), 50);
    }

    #[test]
    fn test_parent_actor_is_reused() {
        let mut thread = thread();
        let parent = ScopeSnapshot::from_value(json!({ "type": "declarative", "id": 500 })).unwrap();
        let parent_actor = thread.create_environment_actor(parent.clone());

        let child = ScopeSnapshot::with_parent(json!({ "type": "declarative" }), parent).unwrap();
        let form = thread.create_environment_actor(child).form(&mut thread);

        let Some(ParentForm::Embedded(embedded)) = form.parent.as_deref() else {
            panic!("expected embedded parent");
        };
        assert_eq!(&embedded.actor, parent_actor.actor_id());
    }

    #[test]
    fn test_form_is_idempotent() {
        let mut thread = thread();
        let env = ScopeSnapshot::from_value(json!({
            "type": "declarative",
            "callee": { "displayName": "f", "parameterNames": ["a"] },
            "bindings": { "a": 1, "b": "two", "c": { "type": "null", "optimizedOut": true } },
            "parent": { "type": "declarative", "bindings": { "d": true } }
        }))
        .unwrap();
        let actor = thread.create_environment_actor(env);

        let first = serde_json::to_value(actor.form(&mut thread)).unwrap();
        let second = serde_json::to_value(actor.form(&mut thread)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_default_depth_truncates_deep_chains() {
        let mut thread = thread();
        let mut env = ScopeSnapshot::from_value(json!({ "type": "object" })).unwrap();
        for _ in 0..1000 {
            env = ScopeSnapshot::with_parent(json!({ "type": "declarative" }), env).unwrap();
        }
        let form = thread.create_environment_actor(env).form(&mut thread);

        assert_eq!(form.depth(), DEFAULT_MAX_PARENT_DEPTH);
        // One actor for the innermost scope, one per embedded parent, and one
        // for the truncated reference.
        assert_eq!(thread.actor_count(), DEFAULT_MAX_PARENT_DEPTH + 2);
    }

    #[test]
    fn test_max_parent_depth_truncates() {
        let config = InspectorConfig {
            max_parent_depth: Some(1),
            ..InspectorConfig::default()
        };
        let mut thread = ThreadActor::new(config);
        let form = form_of(
            json!({
                "type": "declarative",
                "parent": { "type": "declarative", "parent": { "type": "declarative" } }
            }),
            &mut thread,
        );

        assert_eq!(form.depth(), 1);
        let Some(ParentForm::Embedded(first)) = form.parent.as_deref() else {
            panic!("expected embedded parent");
        };
        let Some(ParentForm::Truncated(cut)) = first.parent.as_deref() else {
            panic!("expected truncated grandparent");
        };
        assert!(cut.truncated);
        // The truncated parent still has a live actor the client can ask.
        assert!(thread.get_actor(cut.actor.as_str()).is_some());
    }

    #[test]
    fn test_zero_depth_truncates_immediately() {
        let config = InspectorConfig {
            max_parent_depth: Some(0),
            ..InspectorConfig::default()
        };
        let mut thread = ThreadActor::new(config);
        let form = form_of(json!({ "type": "declarative", "parent": { "type": "object" } }), &mut thread);

        let wire = serde_json::to_value(&form).unwrap();
        assert_eq!(wire["parent"]["truncated"], json!(true));
        assert!(wire["parent"].get("type").is_none());
    }
}
