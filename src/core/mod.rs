pub mod config;
pub mod error;
pub mod ticket;
pub mod types;

pub use config::{CleanupConfig, CompactionConfig, LockConfig, StoreConfig};
pub use error::{Result, StoreError};
pub use ticket::{Ticket, VersionClock};
pub use types::{Entity, EntityId, Scope};
