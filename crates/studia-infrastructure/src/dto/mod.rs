//! Data Transfer Objects (DTOs) for persistence.
//!
//! These DTOs represent the versioned schema of the store document. They are
//! private to the infrastructure layer and handle the evolution of the
//! storage format over time.
//!
//! We follow semantic versioning for schema changes:
//! - **MAJOR (X.0.0)**: Breaking changes (field removal, type changes)
//! - **MINOR (1.X.0)**: Backward-compatible additions (new optional fields)

mod store;

pub use store::{
    StoreDocumentV1_0_0, StoreDocumentV1_1_0, StoreSnapshot, StoredAccount, create_store_migrator,
};
