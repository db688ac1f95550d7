//! Allocation backends.
//!
//! Slot tables, the buffer allocator, the upload ring and the alias block pool.
//! **These are the only modules that write through mapped pointers.**

pub(crate) mod alias;
pub(crate) mod buffer;
pub(crate) mod handles;
pub(crate) mod ring;
