//! Burrow Entities
//!
//! Entity identity for domain objects: a registry assigning stable ids,
//! references built from those ids, and the policy deciding when equality
//! and hashing of a domain type follow entity identity.
//!
//! # Overview
//!
//! ```text
//!  Arc<T> ──register──► EntityRegistry ──► EntityId
//!                            ▲
//!  ReferenceFactory ─────────┘   Reference<T> == Reference<T>  ⇔  same id
//!
//!  TypeDescriptor ──declare/install──► PolicyTable ──query──► Managed<T>
//! ```

pub mod context;
pub mod id;
pub mod intercept;
pub mod policy;
pub mod reference;
pub mod registry;

pub use context::EntityContext;
pub use id::{EntityId, EntityIdFactory};
pub use intercept::{DomainType, IdentityDelegate, Interceptor, Managed, ReferenceIdentity};
pub use policy::{
    Decision, InstallOutcome, Operation, PolicyConflict, PolicyTable, SkippedType, TypeDescriptor,
    TypeKey, TypePolicy, TypeShape,
};
pub use reference::{
    EntityRef, Reference, ReferenceFactory, ReferenceFactoryExt, RegistryReferenceFactory,
};
pub use registry::{EntityHandle, EntityRegistry};
