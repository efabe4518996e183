//! Identity interception
//!
//! TigerStyle: Delegate exactly once per call, or not at all.
//!
//! `Managed<T>` is the runtime form of an intercepted domain value. Its
//! `PartialEq` and `Hash` follow the installed `TypePolicy` of `T`:
//! delegated operations go through the `IdentityDelegate`, everything
//! else goes to the type's own implementation.

use crate::policy::{Decision, InstallOutcome, PolicyTable, TypeDescriptor, TypeKey, TypePolicy};
use crate::reference::ReferenceFactory;
use crate::registry::EntityHandle;
use burrow_core::error::Result;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;
use tracing::error;

/// Type taking part in identity interception
pub trait DomainType: Sized + Send + Sync + 'static {
    /// Static description of the type
    fn descriptor() -> TypeDescriptor;

    /// Descriptors of every ancestor named in `descriptor()`, transitively
    ///
    /// Declared before the type on install, so a subtype can be wrapped
    /// before its supertypes are.
    fn ancestors() -> Vec<TypeDescriptor> {
        Vec::new()
    }

    /// The type's own equality, used when its policy is `UseCustom`
    ///
    /// Defaults to allocation identity.
    fn custom_eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }

    /// The type's own hash, used when its policy is `UseCustom`
    fn custom_hash(&self) -> u64 {
        self as *const Self as usize as u64
    }
}

/// Identity delegation seam
///
/// Called once per delegated equality or hash computation.
pub trait IdentityDelegate: Send + Sync {
    /// Whether two objects are the same entity
    fn entity_eq(&self, entity: &EntityHandle, other: &EntityHandle) -> Result<bool>;

    /// Hash of an object's entity identity
    fn entity_hash(&self, entity: &EntityHandle) -> Result<u64>;
}

/// Delegate comparing entity references
pub struct ReferenceIdentity {
    references: Arc<dyn ReferenceFactory>,
}

impl ReferenceIdentity {
    pub fn new(references: Arc<dyn ReferenceFactory>) -> Self {
        Self { references }
    }
}

impl IdentityDelegate for ReferenceIdentity {
    fn entity_eq(&self, entity: &EntityHandle, other: &EntityHandle) -> Result<bool> {
        let left = self.references.create_reference(entity)?;
        let right = self.references.create_reference(other)?;
        Ok(left == right)
    }

    fn entity_hash(&self, entity: &EntityHandle) -> Result<u64> {
        Ok(self.references.create_reference(entity)?.id().as_u64())
    }
}

impl fmt::Debug for ReferenceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceIdentity").finish_non_exhaustive()
    }
}

// =============================================================================
// Interceptor
// =============================================================================

/// Installs interception for domain types and wraps their values
#[derive(Clone)]
pub struct Interceptor {
    policies: Arc<PolicyTable>,
    delegate: Arc<dyn IdentityDelegate>,
}

impl Interceptor {
    pub fn new(policies: Arc<PolicyTable>, delegate: Arc<dyn IdentityDelegate>) -> Self {
        Self { policies, delegate }
    }

    pub fn policies(&self) -> &Arc<PolicyTable> {
        &self.policies
    }

    /// Declare `T` with its ancestors and install it; idempotent
    ///
    /// # Errors
    /// - `TypeRedeclared` if an ancestor was declared differently before
    /// - `TypeNotDeclared` if a supertype is neither in `T::ancestors()`
    ///   nor declared elsewhere
    pub fn install<T: DomainType>(&self) -> Result<InstallOutcome> {
        for ancestor in T::ancestors() {
            self.policies.declare(ancestor)?;
        }
        self.install_descriptor(T::descriptor())
    }

    /// Declare and install a type from its descriptor
    ///
    /// Used for contract types, which have no values to wrap.
    pub fn install_descriptor(&self, descriptor: TypeDescriptor) -> Result<InstallOutcome> {
        let key = descriptor.key();
        self.policies.declare(descriptor)?;
        self.policies.install(&key)
    }

    /// Wrap a value of `T`, installing `T` on first use
    pub fn wrap<T: DomainType>(&self, value: Arc<T>) -> Result<Managed<T>> {
        let policy = match self.policies.query(&TypeKey::of::<T>()) {
            Some(policy) => policy,
            None => self.install::<T>()?.policy(),
        };
        Ok(Managed {
            value,
            policy,
            delegate: Arc::clone(&self.delegate),
        })
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("installed", &self.policies.installed_count())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Managed Values
// =============================================================================

/// Intercepted domain value
pub struct Managed<T: DomainType> {
    value: Arc<T>,
    policy: TypePolicy,
    delegate: Arc<dyn IdentityDelegate>,
}

impl<T: DomainType> Managed<T> {
    pub fn value(&self) -> &Arc<T> {
        &self.value
    }

    pub fn policy(&self) -> TypePolicy {
        self.policy
    }

    pub fn into_inner(self) -> Arc<T> {
        self.value
    }

    /// Equality following the installed policy
    pub fn try_eq(&self, other: &Self) -> Result<bool> {
        match self.policy.equality {
            Decision::DelegateToIdentity => self.delegate.entity_eq(&self.handle(), &other.handle()),
            Decision::UseCustom | Decision::NotApplicable => Ok(self.value.custom_eq(&other.value)),
        }
    }

    /// Hash following the installed policy
    pub fn try_identity_hash(&self) -> Result<u64> {
        match self.policy.hashing {
            Decision::DelegateToIdentity => self.delegate.entity_hash(&self.handle()),
            Decision::UseCustom | Decision::NotApplicable => Ok(self.value.custom_hash()),
        }
    }

    fn handle(&self) -> EntityHandle {
        self.value.clone()
    }

    fn allocation_identity(&self) -> u64 {
        Arc::as_ptr(&self.value) as usize as u64
    }
}

impl<T: DomainType> PartialEq for Managed<T> {
    fn eq(&self, other: &Self) -> bool {
        self.try_eq(other).unwrap_or_else(|e| {
            // Allocation identity agrees with entity identity for live objects
            error!(type_name = std::any::type_name::<T>(), error = %e, "Identity equality failed");
            Arc::ptr_eq(&self.value, &other.value)
        })
    }
}

impl<T: DomainType> Eq for Managed<T> {}

impl<T: DomainType> Hash for Managed<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let hash = self.try_identity_hash().unwrap_or_else(|e| {
            error!(type_name = std::any::type_name::<T>(), error = %e, "Identity hash failed");
            self.allocation_identity()
        });
        state.write_u64(hash);
    }
}

impl<T: DomainType> Deref for Managed<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: DomainType> Clone for Managed<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            policy: self.policy,
            delegate: Arc::clone(&self.delegate),
        }
    }
}

impl<T: DomainType + fmt::Debug> fmt::Debug for Managed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Managed")
            .field("value", &self.value)
            .field("policy", &self.policy)
            .finish()
    }
}
