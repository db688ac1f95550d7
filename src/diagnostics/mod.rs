//! Diagnostics for allocation failures and leak defense.
//!
//! ## Diagnostic Codes
//!
//! | Code  | Meaning                        |
//! |-------|--------------------------------|
//! | FR0xx | Buffer allocator               |
//! | FR1xx | Frame ring buffer              |
//! | FR2xx | Transient resource arena       |
//! | FR9xx | Leak defense                   |
//!
//! Allocators emit through a [`DiagnosticSink`]; the default [`GlobalSink`]
//! forwards to [`emit_with_context`], which uses `log` when that feature is enabled.

pub mod emit;
pub mod kind;
pub mod macros;
pub mod tracy;

pub use emit::{emit, emit_with_context, is_suppressed, suppress_diagnostics, CollectingSink, DiagnosticSink, GlobalSink};
pub use kind::{Diagnostic, DiagnosticKind};

pub use kind::{FR001, FR002, FR003, FR004, FR005, FR101, FR102, FR201, FR202, FR203, FR204, FR901, FR902, FR903};
