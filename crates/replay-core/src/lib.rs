// # replay-core
//
// Core library for the replay catalog synchronizer.
//
// ## Architecture Overview
//
// This library keeps a persisted catalog of replay files in sync with a
// replay directory:
// - **CatalogStore**: Trait for the persisted catalog (list/insert/remove)
// - **ParticipantResolver**: Trait for looking up the players of a round
// - **TriggerSource**: Trait for producers of synchronization requests
// - **CatalogEngine**: Serializes requests into passes and runs them
// - **ComponentRegistry**: Factory registry for resolvers and stores
//
// ## Design Principles
//
// 1. **Single flight**: At most one pass runs at a time; requests arriving
//    during a pass coalesce into one rerun
// 2. **Independent commits**: Pruning is committed before discovery starts
// 3. **All-or-nothing discovery**: New entries are committed as one batch
// 4. **Library-First**: The daemon is a thin wrapper around this crate

pub mod access;
pub mod catalog;
pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod traits;
pub mod trigger;

// Re-export core types for convenience
pub use access::AccessPolicy;
pub use catalog::{FileCatalogStore, MemoryCatalogStore};
pub use config::{CatalogConfig, CatalogStoreConfig, EngineConfig, ResolverConfig};
pub use descriptor::RoundDescriptor;
pub use engine::{CatalogEngine, EngineEvent, EngineState, PassReport, SyncRequester};
pub use error::{Error, Result};
pub use registry::ComponentRegistry;
pub use resolver::FixedParticipantResolver;
pub use traits::{CatalogStore, ParticipantResolver, ReplayEntry, SyncRequest, TriggerSource};
pub use trigger::IntervalTrigger;
