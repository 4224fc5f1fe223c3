//! # User and Session Storage
//!
//! Persistence collaborators of the admin API: the [`UserStorage`] and
//! [`SessionStorage`] traits used by service handlers, the
//! [`SessionResolver`] consumed by the auth stage, and an in-memory backend.
//!
//! ```rust
//! use babel_session_storage::{InMemoryStorage, SessionResolver};
//!
//! # async fn example() -> Result<(), babel_session_storage::StorageError> {
//! let storage = InMemoryStorage::new();
//! assert!(storage.resolve("unknown-token").await?.is_none());
//! # Ok(())
//! # }
//! ```

mod traits;
pub use traits::*;

pub mod password;
pub mod prelude;
pub mod records;

#[cfg(feature = "in-memory")]
pub mod in_memory;

pub use password::{PasswordHasher, PasswordParams};
pub use records::{
    NewUser, Pagination, SessionMeta, SessionRecord, UserFilter, UserPage, UserRecord, UserRole,
    UserStats, UserUpdate,
};

#[cfg(feature = "in-memory")]
pub use in_memory::{InMemoryConfig, InMemoryStats, InMemoryStorage};
