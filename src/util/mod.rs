//! Shared helpers: atomic writes and text formatting.

pub mod atomic;
pub mod text;
