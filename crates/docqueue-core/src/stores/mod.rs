//! Message store implementations.
//!
//! This module contains concrete implementations of the [`MessageStore`](crate::store::MessageStore)
//! trait for different document backends.

pub mod filesystem;
pub mod memory;

pub use filesystem::FilesystemStore;
pub use memory::InMemoryStore;
