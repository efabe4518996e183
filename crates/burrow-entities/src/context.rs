//! Entity context
//!
//! Explicit bundle of the registry, reference factory, policy table and
//! interceptor. Passed to whoever needs entity identity instead of living
//! in ambient per-thread state.

use crate::intercept::{DomainType, IdentityDelegate, Interceptor, Managed, ReferenceIdentity};
use crate::policy::PolicyTable;
use crate::reference::{ReferenceFactory, RegistryReferenceFactory};
use crate::registry::EntityRegistry;
use burrow_core::config::EntityConfig;
use burrow_core::error::Result;
use std::sync::Arc;

/// Entity identity services
#[derive(Clone)]
pub struct EntityContext {
    pub registry: Arc<EntityRegistry>,
    pub references: Arc<dyn ReferenceFactory>,
    pub policies: Arc<PolicyTable>,
    pub interceptor: Interceptor,
}

impl EntityContext {
    /// Build the default stack from configuration
    pub fn from_config(config: &EntityConfig) -> Self {
        let registry = Arc::new(EntityRegistry::new(config.id_largest_used));
        let references: Arc<dyn ReferenceFactory> =
            Arc::new(RegistryReferenceFactory::new(Arc::clone(&registry)));
        let delegate: Arc<dyn IdentityDelegate> =
            Arc::new(ReferenceIdentity::new(Arc::clone(&references)));
        Self::with_delegate(
            registry,
            references,
            Arc::new(PolicyTable::new(config.ancestry_tie_break)),
            delegate,
        )
    }

    /// Build from explicit parts
    pub fn with_delegate(
        registry: Arc<EntityRegistry>,
        references: Arc<dyn ReferenceFactory>,
        policies: Arc<PolicyTable>,
        delegate: Arc<dyn IdentityDelegate>,
    ) -> Self {
        let interceptor = Interceptor::new(Arc::clone(&policies), delegate);
        Self {
            registry,
            references,
            policies,
            interceptor,
        }
    }

    /// Wrap a domain value through the interceptor
    pub fn manage<T: DomainType>(&self, value: Arc<T>) -> Result<Managed<T>> {
        self.interceptor.wrap(value)
    }
}

impl Default for EntityContext {
    fn default() -> Self {
        Self::from_config(&EntityConfig::default())
    }
}

impl std::fmt::Debug for EntityContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityContext")
            .field("registry", &self.registry)
            .field("policies", &self.policies.installed_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::TypeDescriptor;
    use crate::reference::ReferenceFactoryExt;

    #[derive(Debug)]
    struct Shipment;

    impl DomainType for Shipment {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::of::<Self>().entity()
        }
    }

    #[test]
    fn test_from_config_continues_after_largest_id() {
        let ctx = EntityContext::from_config(&EntityConfig {
            id_largest_used: 500,
            ..Default::default()
        });
        let reference = ctx
            .references
            .create_typed_reference(&Arc::new(Shipment))
            .unwrap();
        assert_eq!(reference.id().as_u64(), 501);
    }

    #[test]
    fn test_managed_values_register_through_shared_registry() {
        let ctx = EntityContext::default();
        let shipment = Arc::new(Shipment);

        let a = ctx.manage(Arc::clone(&shipment)).unwrap();
        let b = ctx.manage(Arc::clone(&shipment)).unwrap();
        assert_eq!(a, b);
        assert!(ctx.registry.contains(&shipment));
        assert_eq!(ctx.registry.count(), 1);
    }
}
