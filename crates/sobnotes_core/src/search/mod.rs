//! In-memory note search.
//!
//! # Responsibility
//! - Filter the note collection for type-as-you-search list views.
//! - Keep matching rules inside core so every presentation agrees.

pub mod filter;
