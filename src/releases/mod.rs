// ABOUTME: Release lifecycle: creation, promotion, rollback, and retention.
// ABOUTME: History is persisted per target through a Storage collaborator.

mod error;
mod history;
mod lock;
mod manager;
mod storage;

pub use error::{ReleaseError, ReleaseErrorKind};
pub use history::{ReleaseHistory, ReleaseState};
pub use lock::{DeployLock, LockInfo};
pub use manager::ReleasesManager;
pub use storage::{LocalStorage, MemoryStorage, Storage, StorageError};
