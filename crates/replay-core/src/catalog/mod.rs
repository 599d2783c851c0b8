// # Catalog Store Implementations
//
// This module provides implementations of the CatalogStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::{FileCatalogStore, FileCatalogStoreFactory};
pub use memory::{MemoryCatalogStore, MemoryCatalogStoreFactory};
