//! Common imports for code that talks to storage

pub use crate::password::{PasswordHasher, PasswordParams};
pub use crate::records::{
    NewUser, SessionMeta, SessionRecord, UserFilter, UserPage, UserRecord, UserRole, UserStats,
    UserUpdate,
};
pub use crate::traits::{
    SessionResolver, SessionStorage, StorageError, StorageResult, UserStorage,
};

#[cfg(feature = "in-memory")]
pub use crate::in_memory::{InMemoryConfig, InMemoryStorage};
