//! Core traits for the replay catalog
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`CatalogStore`]: Persisted catalog of replay entries
//! - [`ParticipantResolver`]: Round → participants lookup
//! - [`TriggerSource`]: Producers of synchronization requests

pub mod catalog_store;
pub mod participant_resolver;
pub mod trigger_source;

pub use catalog_store::{CatalogStore, CatalogStoreFactory, EntryPredicate, ReplayEntry};
pub use participant_resolver::{ParticipantResolver, ParticipantResolverFactory};
pub use trigger_source::{SyncRequest, TriggerSource};
