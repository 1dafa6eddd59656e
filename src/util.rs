//! Shared utility modules used across Folio components.

pub mod hash;
pub mod varint;
