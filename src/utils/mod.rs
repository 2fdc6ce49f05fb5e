//! Shared helpers that aren't tied to a single component
pub mod trace;
