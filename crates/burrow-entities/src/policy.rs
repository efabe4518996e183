//! Identity delegation policy
//!
//! TigerStyle: Decide once per type, memoize, never re-process.
//!
//! Every domain type is described by a `TypeDescriptor` declared at
//! startup. Installing a type decides, independently for equality and for
//! hashing, whether the operation is delegated to entity identity, left to
//! the type's own implementation, or not intercepted at all.
//!
//! ```text
//!   declare(descriptor) ──► descriptors
//!                                │
//!   install(key) ── walk ancestry (iterative, post-order)
//!                                │
//!                                ▼
//!                       resolutions (memo = "already processed")
//! ```

use burrow_core::config::AncestryTieBreak;
use burrow_core::constants::TYPE_ANCESTRY_DEPTH_MAX;
use burrow_core::error::{Error, Result};
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

// =============================================================================
// Type Description
// =============================================================================

/// Key of a domain type
///
/// Equality and hashing use the `TypeId` only; the name is for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key of `T`, which may be a trait object type such as `dyn Auditable`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Shape of a domain type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeShape {
    /// Type with state and behavior
    Concrete,
    /// Behavior-less contract; cannot carry an intercepted implementation
    Contract,
}

/// Static description of a domain type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    key: TypeKey,
    shape: TypeShape,
    managed: bool,
    custom_eq: bool,
    custom_hash: bool,
    supertypes: Vec<TypeKey>,
}

impl TypeDescriptor {
    /// Plain concrete type with no supertypes
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::with_key(TypeKey::of::<T>(), TypeShape::Concrete)
    }

    /// Plain contract type with no supertypes
    pub fn contract<T: ?Sized + 'static>() -> Self {
        Self::with_key(TypeKey::of::<T>(), TypeShape::Contract)
    }

    pub fn with_key(key: TypeKey, shape: TypeShape) -> Self {
        Self {
            key,
            shape,
            managed: false,
            custom_eq: false,
            custom_hash: false,
            supertypes: Vec::new(),
        }
    }

    /// Mark the type as identity-managed
    pub fn entity(mut self) -> Self {
        self.managed = true;
        self
    }

    /// The type implements its own equality
    pub fn with_custom_eq(mut self) -> Self {
        self.custom_eq = true;
        self
    }

    /// The type implements its own hashing
    pub fn with_custom_hash(mut self) -> Self {
        self.custom_hash = true;
        self
    }

    /// Append a supertype; declaration order is significant
    pub fn extends<S: ?Sized + 'static>(self) -> Self {
        self.extends_key(TypeKey::of::<S>())
    }

    pub fn extends_key(mut self, key: TypeKey) -> Self {
        self.supertypes.push(key);
        self
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn shape(&self) -> TypeShape {
        self.shape
    }

    pub fn is_managed(&self) -> bool {
        self.managed
    }

    pub fn declares_custom_eq(&self) -> bool {
        self.custom_eq
    }

    pub fn declares_custom_hash(&self) -> bool {
        self.custom_hash
    }

    pub fn supertypes(&self) -> &[TypeKey] {
        &self.supertypes
    }
}

// =============================================================================
// Decisions
// =============================================================================

/// Per-operation interception decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Route the operation to entity identity
    DelegateToIdentity,
    /// The type's own implementation stays in effect
    UseCustom,
    /// Not an identity-managed type; untouched
    NotApplicable,
}

impl Decision {
    pub fn is_delegated(self) -> bool {
        self == Self::DelegateToIdentity
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DelegateToIdentity => write!(f, "delegate-to-identity"),
            Self::UseCustom => write!(f, "use-custom"),
            Self::NotApplicable => write!(f, "not-applicable"),
        }
    }
}

/// Intercepted operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Equality,
    Hashing,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equality => write!(f, "equality"),
            Self::Hashing => write!(f, "hashing"),
        }
    }
}

/// Decisions for both intercepted operations of one type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypePolicy {
    pub equality: Decision,
    pub hashing: Decision,
}

impl TypePolicy {
    /// Policy of a type that is not identity-managed
    pub const PLAIN: Self = Self {
        equality: Decision::NotApplicable,
        hashing: Decision::NotApplicable,
    };

    pub fn decision(&self, operation: Operation) -> Decision {
        match operation {
            Operation::Equality => self.equality,
            Operation::Hashing => self.hashing,
        }
    }

    /// Whether interception applies to at least one operation
    pub fn is_managed(&self) -> bool {
        *self != Self::PLAIN
    }

    /// Policy of an identity-managed type from its own declarations
    fn managed(custom_eq: bool, custom_hash: bool) -> Self {
        let pick = |custom| {
            if custom {
                Decision::UseCustom
            } else {
                Decision::DelegateToIdentity
            }
        };
        Self {
            equality: pick(custom_eq),
            hashing: pick(custom_hash),
        }
    }

    /// Inherited policy, with the subtype's own custom methods applied
    ///
    /// A subtype may only move a decision to `UseCustom`.
    fn inherited_by(mut self, descriptor: &TypeDescriptor) -> Self {
        if descriptor.declares_custom_eq() {
            self.equality = Decision::UseCustom;
        }
        if descriptor.declares_custom_hash() {
            self.hashing = Decision::UseCustom;
        }
        self
    }
}

/// Diamond-ancestry diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConflict {
    /// Type whose ancestors disagree
    pub type_key: TypeKey,
    pub operation: Operation,
    /// Ancestor whose decision was applied
    pub chosen: TypeKey,
    /// Ancestor whose decision was ignored
    pub rejected: TypeKey,
}

impl PolicyConflict {
    pub fn to_error(&self) -> Error {
        Error::PolicyConflict {
            type_name: self.type_key.name().to_string(),
            operation: self.operation.to_string(),
            chosen: self.chosen.name().to_string(),
            rejected: self.rejected.name().to_string(),
        }
    }
}

/// Type that was marked identity-managed but could not be intercepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedType {
    pub type_key: TypeKey,
    pub reason: String,
}

/// Result of installing a type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Policy decided by this call
    Installed(TypePolicy),
    /// Policy was decided earlier; nothing changed
    AlreadyInstalled(TypePolicy),
    /// Interception is not possible for this type; it is left untouched
    Skipped { reason: String },
}

impl InstallOutcome {
    /// Effective policy; skipped types behave as plain types
    pub fn policy(&self) -> TypePolicy {
        match self {
            Self::Installed(policy) | Self::AlreadyInstalled(policy) => *policy,
            Self::Skipped { .. } => TypePolicy::PLAIN,
        }
    }
}

#[derive(Debug, Clone)]
enum Resolution {
    Decided(TypePolicy),
    Skipped(String),
}

impl Resolution {
    fn policy(&self) -> TypePolicy {
        match self {
            Self::Decided(policy) => *policy,
            Self::Skipped(_) => TypePolicy::PLAIN,
        }
    }
}

#[derive(Debug, Default)]
struct Diagnostics {
    conflicts: Vec<PolicyConflict>,
    skipped: Vec<SkippedType>,
}

// =============================================================================
// Policy Table
// =============================================================================

/// Per-type policy table
///
/// Policies are decided lazily on first install and memoized. Installs are
/// serialized; queries for decided types only take a read lock.
#[derive(Debug)]
pub struct PolicyTable {
    tie_break: AncestryTieBreak,
    descriptors: RwLock<HashMap<TypeKey, TypeDescriptor>>,
    resolutions: RwLock<HashMap<TypeKey, Resolution>>,
    diagnostics: Mutex<Diagnostics>,
    install_lock: Mutex<()>,
}

impl PolicyTable {
    pub fn new(tie_break: AncestryTieBreak) -> Self {
        Self {
            tie_break,
            descriptors: RwLock::new(HashMap::new()),
            resolutions: RwLock::new(HashMap::new()),
            diagnostics: Mutex::new(Diagnostics::default()),
            install_lock: Mutex::new(()),
        }
    }

    pub fn tie_break(&self) -> AncestryTieBreak {
        self.tie_break
    }

    /// Add a descriptor to the registration table
    ///
    /// # Errors
    /// Returns `TypeRedeclared` if a different descriptor exists for the key.
    pub fn declare(&self, descriptor: TypeDescriptor) -> Result<()> {
        let mut descriptors = self
            .descriptors
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        match descriptors.get(&descriptor.key()) {
            Some(existing) if *existing == descriptor => Ok(()),
            Some(_) => Err(Error::TypeRedeclared {
                type_name: descriptor.key().name().to_string(),
            }),
            None => {
                debug!(type_name = %descriptor.key(), managed = descriptor.is_managed(), "Type declared");
                descriptors.insert(descriptor.key(), descriptor);
                Ok(())
            }
        }
    }

    /// Whether a descriptor exists for the key
    pub fn is_declared(&self, key: &TypeKey) -> bool {
        self.read_descriptors().contains_key(key)
    }

    /// Decide the policy for a declared type, once
    ///
    /// Ancestors are decided first. A type that inherits from a decided
    /// managed type takes its decision and is never processed on its own.
    ///
    /// # Errors
    /// - `TypeNotDeclared` if the type or one of its ancestors has no
    ///   descriptor; nothing is memoized for the type, so a later install
    ///   after the ancestor is declared decides it normally
    /// - `InvalidTypeHierarchy` on cycles or ancestry deeper than the limit
    /// - `PolicyConflict` on diamond disagreement under `AncestryTieBreak::Reject`
    pub fn install(&self, key: &TypeKey) -> Result<InstallOutcome> {
        if let Some(resolution) = self.read_resolutions().get(key) {
            return Ok(already(resolution));
        }

        let _guard = self
            .install_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Decided while waiting for the install lock
        if let Some(resolution) = self.read_resolutions().get(key) {
            return Ok(already(resolution));
        }

        let descriptors = self.read_descriptors().clone();
        if !descriptors.contains_key(key) {
            return Err(Error::TypeNotDeclared {
                type_name: key.name().to_string(),
            });
        }

        let resolution = self.resolve_ancestry(key, &descriptors)?;
        Ok(match resolution {
            Resolution::Decided(policy) => InstallOutcome::Installed(policy),
            Resolution::Skipped(reason) => InstallOutcome::Skipped { reason },
        })
    }

    /// Install the type and return its effective policy
    pub fn decide(&self, key: &TypeKey) -> Result<TypePolicy> {
        self.install(key).map(|outcome| outcome.policy())
    }

    /// Effective policy of an installed type
    ///
    /// Returns `None` for types not yet installed.
    pub fn query(&self, key: &TypeKey) -> Option<TypePolicy> {
        self.read_resolutions().get(key).map(Resolution::policy)
    }

    /// Number of installed types
    pub fn installed_count(&self) -> usize {
        self.read_resolutions().len()
    }

    /// Diamond conflicts seen so far
    pub fn conflicts(&self) -> Vec<PolicyConflict> {
        self.lock_diagnostics().conflicts.clone()
    }

    /// Types skipped so far
    pub fn skipped(&self) -> Vec<SkippedType> {
        self.lock_diagnostics().skipped.clone()
    }

    /// Resolve `target` and every undecided declared ancestor, post-order
    ///
    /// Caller holds the install lock.
    fn resolve_ancestry(
        &self,
        target: &TypeKey,
        descriptors: &HashMap<TypeKey, TypeDescriptor>,
    ) -> Result<Resolution> {
        // (type, supertypes already pushed)
        let mut stack: Vec<(TypeKey, bool)> = vec![(*target, false)];
        let mut on_path: HashSet<TypeKey> = HashSet::new();

        while let Some((key, expanded)) = stack.pop() {
            if self.read_resolutions().contains_key(&key) {
                continue;
            }
            // Fails before any descendant of the missing ancestor is memoized
            let descriptor = descriptors.get(&key).ok_or_else(|| Error::TypeNotDeclared {
                type_name: key.name().to_string(),
            })?;

            if expanded {
                let resolution = self.resolve_one(descriptor)?;
                on_path.remove(&key);
                self.resolutions
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(key, resolution);
                continue;
            }

            if !on_path.insert(key) {
                return Err(Error::InvalidTypeHierarchy {
                    type_name: key.name().to_string(),
                    reason: "type is its own ancestor".to_string(),
                });
            }
            if on_path.len() > TYPE_ANCESTRY_DEPTH_MAX {
                return Err(Error::InvalidTypeHierarchy {
                    type_name: target.name().to_string(),
                    reason: format!("ancestry deeper than {}", TYPE_ANCESTRY_DEPTH_MAX),
                });
            }

            stack.push((key, true));
            // Reversed so the first declared supertype is resolved first
            for supertype in descriptor.supertypes().iter().rev() {
                stack.push((*supertype, false));
            }
        }

        self.read_resolutions()
            .get(target)
            .cloned()
            .ok_or_else(|| Error::internal(format!("policy for {} was not resolved", target)))
    }

    /// Decide one type whose declared ancestors are all resolved
    fn resolve_one(&self, descriptor: &TypeDescriptor) -> Result<Resolution> {
        let key = descriptor.key();

        if let Some((ancestor, inherited)) = self.inherited_policy(descriptor)? {
            let policy = inherited.inherited_by(descriptor);
            debug!(
                type_name = %key,
                ancestor = %ancestor,
                equality = %policy.equality,
                hashing = %policy.hashing,
                "Policy inherited"
            );
            return Ok(Resolution::Decided(policy));
        }

        if !descriptor.is_managed() {
            return Ok(Resolution::Decided(TypePolicy::PLAIN));
        }

        if descriptor.shape() == TypeShape::Contract {
            let reason = "contract types carry no implementation to intercept".to_string();
            let error = Error::InterceptionUnsupportedType {
                type_name: key.name().to_string(),
                reason: reason.clone(),
            };
            warn!(type_name = %key, error = %error, "Skipping identity interception");
            self.lock_diagnostics().skipped.push(SkippedType {
                type_key: key,
                reason: reason.clone(),
            });
            return Ok(Resolution::Skipped(reason));
        }

        let policy =
            TypePolicy::managed(descriptor.declares_custom_eq(), descriptor.declares_custom_hash());
        info!(
            type_name = %key,
            equality = %policy.equality,
            hashing = %policy.hashing,
            "Identity interception installed"
        );
        Ok(Resolution::Decided(policy))
    }

    /// First managed ancestor in declared order, with conflicts recorded
    fn inherited_policy(&self, descriptor: &TypeDescriptor) -> Result<Option<(TypeKey, TypePolicy)>> {
        let resolutions = self.read_resolutions();
        let mut chosen: Option<(TypeKey, TypePolicy)> = None;
        let mut conflicts = Vec::new();

        for supertype in descriptor.supertypes() {
            let policy = match resolutions.get(supertype) {
                Some(resolution) => resolution.policy(),
                None => TypePolicy::PLAIN,
            };
            if !policy.is_managed() {
                continue;
            }
            match chosen {
                None => chosen = Some((*supertype, policy)),
                Some((winner, winning)) => {
                    for operation in [Operation::Equality, Operation::Hashing] {
                        if winning.decision(operation) != policy.decision(operation) {
                            conflicts.push(PolicyConflict {
                                type_key: descriptor.key(),
                                operation,
                                chosen: winner,
                                rejected: *supertype,
                            });
                        }
                    }
                }
            }
        }
        drop(resolutions);

        if let Some(first) = conflicts.first() {
            if self.tie_break == AncestryTieBreak::Reject {
                return Err(first.to_error());
            }
            for conflict in &conflicts {
                warn!(
                    type_name = %conflict.type_key,
                    operation = %conflict.operation,
                    chosen = %conflict.chosen,
                    rejected = %conflict.rejected,
                    "Ancestors disagree on identity policy; first declared wins"
                );
            }
            self.lock_diagnostics().conflicts.extend(conflicts);
        }

        Ok(chosen)
    }

    fn read_descriptors(&self) -> std::sync::RwLockReadGuard<'_, HashMap<TypeKey, TypeDescriptor>> {
        self.descriptors.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_resolutions(&self) -> std::sync::RwLockReadGuard<'_, HashMap<TypeKey, Resolution>> {
        self.resolutions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_diagnostics(&self) -> std::sync::MutexGuard<'_, Diagnostics> {
        self.diagnostics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::new(AncestryTieBreak::default())
    }
}

fn already(resolution: &Resolution) -> InstallOutcome {
    match resolution {
        Resolution::Decided(policy) => InstallOutcome::AlreadyInstalled(*policy),
        Resolution::Skipped(reason) => InstallOutcome::Skipped {
            reason: reason.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Decision::*;

    struct Plain;
    struct Customer;
    struct Invoice;
    struct Ledger;
    struct Premium;
    struct Auditable;
    struct Left;
    struct Right;
    struct Joined;
    trait Marked {}

    fn table() -> PolicyTable {
        PolicyTable::default()
    }

    #[test]
    fn test_plain_type_is_not_applicable() {
        let table = table();
        table.declare(TypeDescriptor::of::<Plain>()).unwrap();
        assert_eq!(table.decide(&TypeKey::of::<Plain>()).unwrap(), TypePolicy::PLAIN);
    }

    #[test]
    fn test_entity_without_custom_methods_delegates_both() {
        let table = table();
        table.declare(TypeDescriptor::of::<Customer>().entity()).unwrap();
        let policy = table.decide(&TypeKey::of::<Customer>()).unwrap();
        assert_eq!(policy.equality, DelegateToIdentity);
        assert_eq!(policy.hashing, DelegateToIdentity);
    }

    #[test]
    fn test_decisions_are_independent() {
        let table = table();
        table
            .declare(TypeDescriptor::of::<Invoice>().entity().with_custom_eq())
            .unwrap();
        table
            .declare(TypeDescriptor::of::<Ledger>().entity().with_custom_hash())
            .unwrap();

        let invoice = table.decide(&TypeKey::of::<Invoice>()).unwrap();
        assert_eq!((invoice.equality, invoice.hashing), (UseCustom, DelegateToIdentity));

        let ledger = table.decide(&TypeKey::of::<Ledger>()).unwrap();
        assert_eq!((ledger.equality, ledger.hashing), (DelegateToIdentity, UseCustom));
    }

    #[test]
    fn test_install_is_idempotent() {
        let table = table();
        table.declare(TypeDescriptor::of::<Customer>().entity()).unwrap();
        let key = TypeKey::of::<Customer>();

        let first = table.install(&key).unwrap();
        let second = table.install(&key).unwrap();
        assert!(matches!(first, InstallOutcome::Installed(_)));
        assert_eq!(second, InstallOutcome::AlreadyInstalled(first.policy()));
        assert_eq!(table.installed_count(), 1);
    }

    #[test]
    fn test_subtype_inherits_and_may_only_turn_custom() {
        let table = table();
        table
            .declare(TypeDescriptor::of::<Invoice>().entity().with_custom_eq())
            .unwrap();
        table
            .declare(TypeDescriptor::of::<Premium>().extends::<Invoice>().with_custom_hash())
            .unwrap();

        let policy = table.decide(&TypeKey::of::<Premium>()).unwrap();
        assert_eq!(policy.equality, UseCustom);
        assert_eq!(policy.hashing, UseCustom);
        assert!(table.query(&TypeKey::of::<Invoice>()).is_some());
    }

    #[test]
    fn test_subtype_of_plain_type_is_decided_on_its_own() {
        let table = table();
        table.declare(TypeDescriptor::of::<Plain>()).unwrap();
        table
            .declare(TypeDescriptor::of::<Customer>().entity().extends::<Plain>())
            .unwrap();
        let policy = table.decide(&TypeKey::of::<Customer>()).unwrap();
        assert_eq!(policy, TypePolicy::managed(false, false));
    }

    #[test]
    fn test_undeclared_type_fails() {
        let table = table();
        assert!(matches!(
            table.install(&TypeKey::of::<Plain>()),
            Err(Error::TypeNotDeclared { .. })
        ));
    }

    #[test]
    fn test_undeclared_ancestor_fails_without_memoizing() {
        let table = table();
        table
            .declare(TypeDescriptor::of::<Premium>().extends::<Invoice>())
            .unwrap();

        match table.install(&TypeKey::of::<Premium>()) {
            Err(Error::TypeNotDeclared { type_name }) => assert!(type_name.ends_with("Invoice")),
            other => panic!("expected TypeNotDeclared, got {:?}", other),
        }
        assert!(table.query(&TypeKey::of::<Premium>()).is_none());
        assert_eq!(table.installed_count(), 0);

        table.declare(TypeDescriptor::of::<Invoice>().entity()).unwrap();
        let policy = table.decide(&TypeKey::of::<Premium>()).unwrap();
        assert_eq!(policy, TypePolicy::managed(false, false));
    }

    #[test]
    fn test_redeclare() {
        let table = table();
        table.declare(TypeDescriptor::of::<Customer>().entity()).unwrap();
        table.declare(TypeDescriptor::of::<Customer>().entity()).unwrap();
        assert!(matches!(
            table.declare(TypeDescriptor::of::<Customer>()),
            Err(Error::TypeRedeclared { .. })
        ));
    }

    #[test]
    fn test_contract_entity_is_skipped() {
        let table = table();
        table
            .declare(TypeDescriptor::contract::<dyn Marked>().entity())
            .unwrap();
        let key = TypeKey::of::<dyn Marked>();

        let outcome = table.install(&key).unwrap();
        assert!(matches!(outcome, InstallOutcome::Skipped { .. }));
        assert_eq!(table.query(&key), Some(TypePolicy::PLAIN));
        assert_eq!(table.skipped().len(), 1);

        // Skipped once, reported as skipped on every later install
        assert!(matches!(table.install(&key).unwrap(), InstallOutcome::Skipped { .. }));
        assert_eq!(table.skipped().len(), 1);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let table = table();
        table
            .declare(TypeDescriptor::of::<Left>().extends::<Right>())
            .unwrap();
        table
            .declare(TypeDescriptor::of::<Right>().extends::<Left>())
            .unwrap();
        assert!(matches!(
            table.install(&TypeKey::of::<Left>()),
            Err(Error::InvalidTypeHierarchy { .. })
        ));
    }

    fn declare_diamond(table: &PolicyTable) {
        table.declare(TypeDescriptor::of::<Auditable>()).unwrap();
        table
            .declare(TypeDescriptor::of::<Left>().entity().extends::<Auditable>())
            .unwrap();
        table
            .declare(
                TypeDescriptor::of::<Right>()
                    .entity()
                    .with_custom_hash()
                    .extends::<Auditable>(),
            )
            .unwrap();
        table
            .declare(TypeDescriptor::of::<Joined>().extends::<Left>().extends::<Right>())
            .unwrap();
    }

    #[test]
    fn test_diamond_first_declared_wins() {
        let table = table();
        declare_diamond(&table);

        let policy = table.decide(&TypeKey::of::<Joined>()).unwrap();
        assert_eq!(policy, TypePolicy::managed(false, false));

        let conflicts = table.conflicts();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].operation, Operation::Hashing);
        assert_eq!(conflicts[0].chosen, TypeKey::of::<Left>());
        assert_eq!(conflicts[0].rejected, TypeKey::of::<Right>());
    }

    #[test]
    fn test_diamond_rejected_when_configured() {
        let table = PolicyTable::new(AncestryTieBreak::Reject);
        declare_diamond(&table);

        let result = table.install(&TypeKey::of::<Joined>());
        assert!(matches!(result, Err(Error::PolicyConflict { .. })));
        assert_eq!(table.query(&TypeKey::of::<Joined>()), None);
        // Ancestors were decided on the way
        assert!(table.query(&TypeKey::of::<Left>()).is_some());
    }

    #[test]
    fn test_shared_ancestor_resolved_once() {
        let table = table();
        table.declare(TypeDescriptor::of::<Customer>().entity()).unwrap();
        table
            .declare(TypeDescriptor::of::<Left>().extends::<Customer>())
            .unwrap();
        table
            .declare(TypeDescriptor::of::<Right>().extends::<Customer>())
            .unwrap();
        table
            .declare(
                TypeDescriptor::of::<Joined>()
                    .extends::<Left>()
                    .extends::<Right>()
                    .extends::<Customer>(),
            )
            .unwrap();

        let policy = table.decide(&TypeKey::of::<Joined>()).unwrap();
        assert_eq!(policy, TypePolicy::managed(false, false));
        assert!(table.conflicts().is_empty());
        assert_eq!(table.installed_count(), 4);
    }
}
