//! Data models for the substitutions backend.
//!
//! Field names serialize as camelCase to match the web client.

mod quota;
mod revision;
mod substitution;
mod teacher;

pub use quota::*;
pub use revision::*;
pub use substitution::*;
pub use teacher::*;
