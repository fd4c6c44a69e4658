//! Request routing for environment actors.
//!
//! Looks up the addressed actor in the thread actor's pool and dispatches on
//! the request type. Failures become error packets addressed from the target
//! actor so the client can match them to the request.

use serde_json::{json, Value};
use tracing::{debug, trace, warn};

use crate::actor::EnvironmentActor;
use crate::protocol::{ErrorPacket, RequestPacket, ROOT_ACTOR};
use crate::thread::ThreadActor;
use crate::value::DebuggeeValue;
use crate::ScopeInspectorError;

/// Route a raw packet and always produce a reply packet.
pub fn route_packet(thread: &mut ThreadActor, packet: Value) -> Value {
    let request: RequestPacket = match serde_json::from_value(packet) {
        Ok(request) => request,
        Err(e) => {
            warn!("Malformed request packet: {}", e);
            let err = ScopeInspectorError::malformed_packet(e.to_string());
            return error_packet(ROOT_ACTOR, &err);
        }
    };

    let target = request.to.clone();
    match route_request(thread, &request) {
        Ok(reply) => reply,
        Err(err) => {
            warn!(actor = %target, request = %request.kind, "Request failed: {}", err);
            error_packet(&target, &err)
        }
    }
}

/// Route a parsed request to the addressed environment actor.
pub fn route_request(
    thread: &mut ThreadActor,
    request: &RequestPacket,
) -> Result<Value, ScopeInspectorError> {
    debug!("Routing {} request to {}", request.kind, request.to);
    trace!("Request params: {:?}", request.params);

    let actor = thread.get_actor(&request.to).ok_or_else(|| {
        ScopeInspectorError::no_such_actor(format!("No such actor: {}", request.to))
    })?;

    match request.kind.as_str() {
        "form" => {
            let form = actor.form(thread);
            Ok(json!({ "from": actor.actor_id(), "form": form }))
        }
        "bindings" => {
            let bindings = actor.bindings(thread);
            Ok(json!({ "from": actor.actor_id(), "bindings": bindings }))
        }
        "assign" => handle_assign(&actor, request),
        "release" => {
            actor.destroy(thread);
            Ok(json!({ "from": actor.actor_id() }))
        }
        other => Err(ScopeInspectorError::unrecognized_packet_type(format!(
            "Actor {} does not recognize the packet type {}",
            request.to, other
        ))),
    }
}

fn handle_assign(
    actor: &EnvironmentActor,
    request: &RequestPacket,
) -> Result<Value, ScopeInspectorError> {
    let name = request
        .param("name")
        .and_then(Value::as_str)
        .ok_or_else(|| ScopeInspectorError::missing_parameter("Missing name parameter"))?;
    let value = request
        .param("value")
        .ok_or_else(|| ScopeInspectorError::missing_parameter("Missing value parameter"))?;

    actor.assign(name, DebuggeeValue::from_json(value)?)?;
    Ok(json!({ "from": actor.actor_id() }))
}

fn error_packet(from: &str, err: &ScopeInspectorError) -> Value {
    let packet = ErrorPacket {
        from: from.to_string(),
        error: err.protocol_name().to_string(),
        message: err.message().to_string(),
    };
    json!(packet)
}

// ============================================================================
// Tests
// ============================================================================
