//! Entity references
//!
//! TigerStyle: A reference is its id. Equality, hashing and ordering never
//! look at the referenced object.

use crate::id::EntityId;
use crate::registry::{EntityHandle, EntityRegistry};
use burrow_core::error::{Error, Result};
use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

/// Reference to an entity
///
/// Holds the entity id and, when created from a live object, a cached
/// handle to it.
pub struct Reference<T: ?Sized> {
    id: EntityId,
    entity: Option<Arc<T>>,
}

/// Type-erased entity reference
pub type EntityRef = Reference<dyn Any + Send + Sync>;

impl<T: ?Sized> Reference<T> {
    /// Reference carrying a cached handle
    pub fn new(id: EntityId, entity: Arc<T>) -> Self {
        Self {
            id,
            entity: Some(entity),
        }
    }

    /// Reference carrying only the id
    pub fn detached(id: EntityId) -> Self {
        Self { id, entity: None }
    }

    /// Entity id
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Cached handle, if any
    pub fn entity(&self) -> Option<&Arc<T>> {
        self.entity.as_ref()
    }

    /// Whether the reference carries a cached handle
    pub fn is_loaded(&self) -> bool {
        self.entity.is_some()
    }

    /// Drop the cached handle, keeping the id
    pub fn detach(self) -> Self {
        Self::detached(self.id)
    }
}

impl EntityRef {
    /// Downcast to a typed reference
    ///
    /// Returns `None` if the cached handle is of another type. A detached
    /// reference downcasts to a detached typed reference.
    pub fn downcast<T: Any + Send + Sync>(self) -> Option<Reference<T>> {
        match self.entity {
            Some(entity) => entity
                .downcast::<T>()
                .ok()
                .map(|typed| Reference::new(self.id, typed)),
            None => Some(Reference::detached(self.id)),
        }
    }
}

impl<T: ?Sized> Clone for Reference<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            entity: self.entity.clone(),
        }
    }
}

impl<T: ?Sized> PartialEq for Reference<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T: ?Sized> Eq for Reference<T> {}

impl<T: ?Sized> Hash for Reference<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T: ?Sized> PartialOrd for Reference<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: ?Sized> Ord for Reference<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl<T: ?Sized> fmt::Debug for Reference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("id", &self.id)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl<T: ?Sized> fmt::Display for Reference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ref({})", self.id)
    }
}

// =============================================================================
// Reference Factory
// =============================================================================

/// Creates references to entities
///
/// Two calls for the same object produce references that compare equal.
/// References to distinct objects never compare equal.
pub trait ReferenceFactory: Send + Sync {
    /// Create a reference to an object, registering it if needed
    fn create_reference(&self, entity: &EntityHandle) -> Result<EntityRef>;
}

/// Typed helpers over any `ReferenceFactory`
pub trait ReferenceFactoryExt: ReferenceFactory {
    /// Create a typed reference to an object
    fn create_typed_reference<T: Any + Send + Sync>(&self, entity: &Arc<T>) -> Result<Reference<T>> {
        let handle: EntityHandle = entity.clone();
        let erased = self.create_reference(&handle)?;
        Ok(Reference::new(erased.id(), Arc::clone(entity)))
    }

    /// Create a typed reference through a weak handle
    ///
    /// # Errors
    /// Returns `InvalidEntity` if the object has been dropped.
    fn create_reference_weak<T: Any + Send + Sync>(&self, entity: &Weak<T>) -> Result<Reference<T>> {
        let strong = entity
            .upgrade()
            .ok_or_else(|| Error::invalid_entity("cannot reference a dropped object"))?;
        self.create_typed_reference(&strong)
    }
}

impl<F: ReferenceFactory + ?Sized> ReferenceFactoryExt for F {}

/// Reference factory backed by an `EntityRegistry`
#[derive(Debug, Clone)]
pub struct RegistryReferenceFactory {
    registry: Arc<EntityRegistry>,
}

impl RegistryReferenceFactory {
    pub fn new(registry: Arc<EntityRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<EntityRegistry> {
        &self.registry
    }
}

impl ReferenceFactory for RegistryReferenceFactory {
    fn create_reference(&self, entity: &EntityHandle) -> Result<EntityRef> {
        let id = self.registry.register_handle(entity)?;
        Ok(Reference::new(id, Arc::clone(entity)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Order {
        total_cents: u64,
    }

    fn factory() -> RegistryReferenceFactory {
        RegistryReferenceFactory::new(Arc::new(EntityRegistry::default()))
    }

    #[test]
    fn test_reference_equality_is_by_id() {
        let loaded = Reference::new(EntityId::from_raw(3), Arc::new(1u8));
        let detached = Reference::<u8>::detached(EntityId::from_raw(3));
        assert_eq!(loaded, detached);
        assert_ne!(loaded, Reference::detached(EntityId::from_raw(4)));

        let set: HashSet<_> = [loaded.clone(), detached].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_clone_does_not_require_clone_target() {
        let order = Arc::new(Order { total_cents: 250 });
        let reference = Reference::new(EntityId::from_raw(1), order);
        let copy = reference.clone();
        assert_eq!(copy.entity().unwrap().total_cents, 250);
    }

    #[test]
    fn test_ordering_follows_id() {
        let a = Reference::<u8>::detached(EntityId::from_raw(1));
        let b = Reference::<u8>::detached(EntityId::from_raw(2));
        assert!(a < b);
    }

    #[test]
    fn test_erased_reference_downcasts() {
        let factory = factory();
        let order = Arc::new(Order { total_cents: 10 });
        let handle: EntityHandle = order.clone();

        let erased = factory.create_reference(&handle).unwrap();
        let typed = erased.clone().downcast::<Order>().unwrap();
        assert_eq!(typed.id(), erased.id());
        assert!(Arc::ptr_eq(typed.entity().unwrap(), &order));
        assert!(erased.downcast::<String>().is_none());
    }

    #[test]
    fn test_detached_downcast_stays_detached() {
        let erased = EntityRef::detached(EntityId::from_raw(9));
        let typed = erased.downcast::<Order>().unwrap();
        assert!(!typed.is_loaded());
    }

    #[test]
    fn test_typed_reference_matches_erased_reference() {
        let factory = factory();
        let order = Arc::new(Order { total_cents: 10 });
        let handle: EntityHandle = order.clone();

        let typed = factory.create_typed_reference(&order).unwrap();
        let erased = factory.create_reference(&handle).unwrap();
        assert_eq!(typed.id(), erased.id());
        assert_eq!(factory.registry().count(), 1);
    }

    #[test]
    fn test_dropped_weak_reference_fails() {
        let factory = factory();
        let weak = Arc::downgrade(&Arc::new(Order { total_cents: 1 }));
        assert!(matches!(
            factory.create_reference_weak(&weak),
            Err(Error::InvalidEntity { .. })
        ));
    }
}
