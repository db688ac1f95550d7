//! Public API for framearena.
//!
//! This module contains all user-facing types.
//! Most users only need [`TransientResourceArena`](arena::TransientResourceArena)
//! and the [`BufferAllocator`](crate::BufferAllocator) it is built on.

pub mod arena;
pub mod config;
pub mod error;
pub mod pass;
pub mod stats;
pub mod tag;
