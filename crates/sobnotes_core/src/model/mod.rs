//! Note domain model.
//!
//! # Responsibility
//! - Define the note record shared by store, search and controller.
//! - Keep editor-facing normalization (tags, titles) inside core.
//!
//! # Invariants
//! - Notes have no durable ID; identity is the position in the owning
//!   collection.
//! - Deletion is a hard removal from the collection.

pub mod note;
