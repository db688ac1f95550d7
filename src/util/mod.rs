//! Small shared helpers.

pub mod layout;
pub mod size;
