//! Identity registry
//!
//! TigerStyle: Single write path, atomic check-then-insert, no deletion.
//!
//! Object identity is the allocation address of the `Arc` holding the
//! object. The registry keeps a strong handle to every registered object,
//! so an address can never be recycled while its entry exists.

use crate::id::{EntityId, EntityIdFactory};
use burrow_core::constants::ENTITY_REGISTRY_CAPACITY_INITIAL;
use burrow_core::error::{Error, Result};
use burrow_core::metrics;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tracing::debug;

/// Type-erased handle to a registered object
pub type EntityHandle = Arc<dyn Any + Send + Sync>;

/// Allocation address used as the identity key
fn identity_of<T: ?Sized>(entity: &Arc<T>) -> usize {
    Arc::as_ptr(entity) as *const () as usize
}

#[derive(Default)]
struct RegistryState {
    ids_by_identity: HashMap<usize, EntityId>,
    entities_by_id: HashMap<EntityId, EntityHandle>,
}

/// Registry mapping live objects to their entity ids
pub struct EntityRegistry {
    ids: EntityIdFactory,
    state: RwLock<RegistryState>,
}

impl EntityRegistry {
    /// Create an empty registry whose first id follows `largest_used`
    pub fn new(largest_used: u64) -> Self {
        Self::with_id_factory(EntityIdFactory::starting_after(largest_used))
    }

    /// Create an empty registry on top of an existing id factory
    pub fn with_id_factory(ids: EntityIdFactory) -> Self {
        Self {
            ids,
            state: RwLock::new(RegistryState {
                ids_by_identity: HashMap::with_capacity(ENTITY_REGISTRY_CAPACITY_INITIAL),
                entities_by_id: HashMap::with_capacity(ENTITY_REGISTRY_CAPACITY_INITIAL),
            }),
        }
    }

    /// Register an object, returning its id
    ///
    /// The first call for an object allocates a fresh id. Every later call
    /// for the same allocation returns that id. Concurrent first calls for
    /// one object allocate exactly once.
    ///
    /// # Errors
    /// Returns `EntityIdsExhausted` if no fresh id is left.
    pub fn register<T: Any + Send + Sync>(&self, entity: &Arc<T>) -> Result<EntityId> {
        let handle: EntityHandle = entity.clone();
        self.register_handle(&handle)
    }

    /// Register an object through a type-erased handle
    pub fn register_handle(&self, entity: &EntityHandle) -> Result<EntityId> {
        let identity = identity_of(entity);

        if let Some(id) = self.read_state().ids_by_identity.get(&identity) {
            return Ok(*id);
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have won between the read and the write lock
        if let Some(id) = state.ids_by_identity.get(&identity) {
            return Ok(*id);
        }

        let id = self.ids.next_id()?;
        state.ids_by_identity.insert(identity, id);
        state.entities_by_id.insert(id, Arc::clone(entity));

        debug_assert_eq!(state.ids_by_identity.len(), state.entities_by_id.len());
        drop(state);

        metrics::record_entity_registered();
        debug!(entity_id = %id, "Entity registered");
        Ok(id)
    }

    /// Register an object through a weak handle
    ///
    /// # Errors
    /// Returns `InvalidEntity` if the object has already been dropped.
    pub fn register_weak<T: Any + Send + Sync>(&self, entity: &Weak<T>) -> Result<EntityId> {
        let strong = entity
            .upgrade()
            .ok_or_else(|| Error::invalid_entity("cannot register a dropped object"))?;
        self.register(&strong)
    }

    /// Id of an object, without registering it
    pub fn id_of<T: ?Sized>(&self, entity: &Arc<T>) -> Option<EntityId> {
        self.read_state()
            .ids_by_identity
            .get(&identity_of(entity))
            .copied()
    }

    /// Whether an object has been registered
    pub fn contains<T: ?Sized>(&self, entity: &Arc<T>) -> bool {
        self.id_of(entity).is_some()
    }

    /// Look up a registered object by id, downcast to `T`
    ///
    /// Returns `None` for unknown ids and for objects of another type.
    pub fn lookup<T: Any + Send + Sync>(&self, id: EntityId) -> Option<Arc<T>> {
        self.lookup_handle(id)?.downcast::<T>().ok()
    }

    /// Look up a registered object by id
    pub fn lookup_handle(&self, id: EntityId) -> Option<EntityHandle> {
        self.read_state().entities_by_id.get(&id).cloned()
    }

    /// Number of distinct registered objects
    pub fn count(&self) -> usize {
        self.read_state().ids_by_identity.len()
    }

    /// Largest id handed out so far
    pub fn largest_used(&self) -> u64 {
        self.ids.largest_used()
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, RegistryState> {
        // No operation leaves the maps half-updated, so a poisoned lock is safe to reuse
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new(burrow_core::ENTITY_ID_LARGEST_USED_DEFAULT)
    }
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("count", &self.count())
            .field("largest_used", &self.largest_used())
            .finish()
    }
}
