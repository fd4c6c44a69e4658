//! Thread-level coordinator for environment actors.
//!
//! The [`ThreadActor`] owns the pause-scoped actor pool, the registry that
//! maps each environment to its single live actor, and the grip encoder used
//! for every value that leaves the inspector.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::actor::{ActorId, EnvironmentActor};
use crate::config::InspectorConfig;
use crate::environment::{Environment, EnvironmentId};
use crate::grip::{DefaultGripEncoder, Grip, GripEncoder};
use crate::value::DebuggeeValue;

pub struct ThreadActor {
    config: InspectorConfig,
    encoder: Box<dyn GripEncoder>,
    /// Live actors by id
    pool: HashMap<ActorId, Rc<EnvironmentActor>>,
    /// Environment to live actor association
    registry: HashMap<EnvironmentId, ActorId>,
    next_actor: u64,
}

impl ThreadActor {
    pub fn new(config: InspectorConfig) -> Self {
        let encoder = DefaultGripEncoder::new(config.object_actor_prefix.clone());
        Self::with_encoder(config, Box::new(encoder))
    }

    pub fn with_encoder(config: InspectorConfig, encoder: Box<dyn GripEncoder>) -> Self {
        Self {
            config,
            encoder,
            pool: HashMap::new(),
            registry: HashMap::new(),
            next_actor: 1,
        }
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    /// Return the live actor for `env`, minting and registering one if the
    /// environment has none.
    ///
    /// An actor registered under the same id for a different environment
    /// object is destroyed and replaced.
    pub fn create_environment_actor(&mut self, env: Rc<dyn Environment>) -> Rc<EnvironmentActor> {
        let env_id = env.id();
        if let Some(actor) = self
            .registry
            .get(&env_id)
            .and_then(|actor_id| self.pool.get(actor_id))
            .cloned()
        {
            if Rc::ptr_eq(actor.environment(), &env) {
                trace!(env = %env_id, actor = %actor.actor_id(), "Reusing environment actor");
                return actor;
            }
            warn!(
                env = %env_id,
                actor = %actor.actor_id(),
                "Environment id reused by a different environment, replacing actor"
            );
            actor.destroy(self);
        }

        let actor_id = ActorId::new(format!(
            "{}.environment{}",
            self.config.actor_prefix, self.next_actor
        ));
        self.next_actor += 1;

        let actor = Rc::new(EnvironmentActor::new(actor_id.clone(), env));
        self.pool.insert(actor_id.clone(), actor.clone());
        self.registry.insert(env_id, actor_id.clone());
        debug!(env = %env_id, actor = %actor_id, "Created environment actor");

        actor
    }

    pub fn create_value_grip(&self, value: &DebuggeeValue) -> Grip {
        self.encoder.encode(value)
    }

    pub fn get_actor(&self, actor_id: &str) -> Option<Rc<EnvironmentActor>> {
        self.pool.get(actor_id).cloned()
    }

    /// Actor currently associated with `env`, if any.
    pub fn actor_for(&self, env: EnvironmentId) -> Option<&ActorId> {
        self.registry.get(&env)
    }

    pub fn actor_count(&self) -> usize {
        self.pool.len()
    }

    /// Destroy every environment actor. Called when the debuggee resumes and
    /// pause-lifetime actors expire. Returns how many were destroyed.
    pub fn release_pause_pool(&mut self) -> usize {
        let actors: Vec<Rc<EnvironmentActor>> = self.pool.values().cloned().collect();
        for actor in &actors {
            actor.destroy(self);
        }
        debug!(released = actors.len(), "Released pause pool");
        actors.len()
    }

    /// Drop the association of `env` if it still points at `actor_id`.
    pub(crate) fn forget_environment(&mut self, env: EnvironmentId, actor_id: &ActorId) {
        if self.registry.get(&env) == Some(actor_id) {
            self.registry.remove(&env);
        }
    }

    pub(crate) fn unmanage(&mut self, actor_id: &ActorId) {
        self.pool.remove(actor_id);
    }
}
