//! Event-to-entity mapping layer.
//!
//! Each tracked contract event is decoded once at the runtime boundary into
//! a typed [`events::ChainEvent`] and applied to the entity store by exactly
//! one handler. Handlers are deterministic and idempotent: replaying a log
//! (same transaction hash and log index) never duplicates an event record or
//! double-counts a derived field.

pub mod events;
pub mod handlers;
pub mod metadata;
pub mod resolve;
pub mod store;

pub use events::{decode_log, ChainEvent, EventCtx};
pub use handlers::{apply_event, MappingContext};
pub use metadata::{MetadataPolicy, TokenMetadata, TokenMetadataSource};
pub use store::{EntityStore, MemoryStore, PgStore};
