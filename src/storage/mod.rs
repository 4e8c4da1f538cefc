mod credentials;
mod schema;
mod snapshots;
mod types;

pub use credentials::{CredentialStore, MemoryCredentialStore};
pub use schema::Database;
pub use types::{DatabaseError, SnapshotInfo};
