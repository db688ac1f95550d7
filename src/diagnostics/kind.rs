//! Diagnostic kinds and the predefined diagnostic table.

/// The severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A warning - an operation failed and was rolled back, or a leak was repaired.
    Warning,
    /// Informational context.
    Note,
}

impl DiagnosticKind {
    /// Get the display prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Note => "note",
        }
    }
}

/// A diagnostic message with code, message, and optional context.
///
/// Diagnostic codes follow the pattern:
/// - `FR0xx` - Buffer allocator
/// - `FR1xx` - Frame ring buffer
/// - `FR2xx` - Transient resource arena
/// - `FR9xx` - Leak defense (bookkeeping disagreed with native state)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level.
    pub kind: DiagnosticKind,
    /// Diagnostic code (e.g., "FR001").
    pub code: &'static str,
    /// Primary message.
    pub message: &'static str,
    /// Optional additional context.
    pub note: Option<&'static str>,
    /// Optional fix suggestion.
    pub help: Option<&'static str>,
}

impl Diagnostic {
    /// Create a new warning diagnostic.
    pub const fn warning(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Create a new note diagnostic.
    pub const fn note(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Note,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Add a note to this diagnostic.
    pub const fn with_note(mut self, note: &'static str) -> Self {
        self.note = Some(note);
        self
    }

    /// Add a help message to this diagnostic.
    pub const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

// =============================================================================
// Predefined diagnostics (FR0xx - Buffer allocator)
// =============================================================================

/// FR001: Zero-sized buffer request.
pub const FR001: Diagnostic = Diagnostic::warning(
    "FR001",
    "buffer creation rejected: size is zero"
).with_help("request at least one byte");

/// FR002: Device not initialized.
pub const FR002: Diagnostic = Diagnostic::warning(
    "FR002",
    "device is not initialized"
).with_note("no native objects can be created until the device context is initialized");

/// FR003: Native buffer creation failed.
pub const FR003: Diagnostic = Diagnostic::warning(
    "FR003",
    "buffer creation failed, partial resources rolled back"
).with_note("every native object created earlier in the same call has been destroyed");

/// FR004: Initial data upload could not map memory.
pub const FR004: Diagnostic = Diagnostic::warning(
    "FR004",
    "could not map buffer memory for initial data, buffer destroyed"
).with_help("request HOST_VISIBLE memory when passing initial data");

/// FR005: Buffers still live at allocator shutdown.
pub const FR005: Diagnostic = Diagnostic::note(
    "FR005",
    "buffers still live at allocator shutdown were destroyed"
);

// =============================================================================
// Predefined diagnostics (FR1xx - Frame ring buffer)
// =============================================================================

/// FR101: Ring buffer initialization failed.
pub const FR101: Diagnostic = Diagnostic::warning(
    "FR101",
    "frame ring buffer initialization failed"
).with_note("bytes per frame and frame count must be non-zero and the buffer must be mappable");

/// FR102: Ring buffer frame region exhausted.
pub const FR102: Diagnostic = Diagnostic::warning(
    "FR102",
    "frame ring buffer region exhausted, allocation failed"
).with_note("ring allocations never spill into other frame regions")
 .with_help("skip the upload this frame or raise upload_bytes_per_frame in FrameArenaConfig");

// =============================================================================
// Predefined diagnostics (FR2xx - Transient resource arena)
// =============================================================================

/// FR201: Arena used before init.
pub const FR201: Diagnostic = Diagnostic::warning(
    "FR201",
    "transient arena used before init"
).with_help("call TransientResourceArena::init first");

/// FR202: Invalid transient image description.
pub const FR202: Diagnostic = Diagnostic::warning(
    "FR202",
    "transient image description rejected"
).with_note("format, width, height and usage must all be non-zero");

/// FR203: Transient image creation failed.
pub const FR203: Diagnostic = Diagnostic::warning(
    "FR203",
    "transient image creation failed, partial resources rolled back"
).with_note("alias block references taken during the call were released");

/// FR204: Transient buffer creation failed.
pub const FR204: Diagnostic = Diagnostic::warning(
    "FR204",
    "transient buffer creation failed"
);

// =============================================================================
// Predefined diagnostics (FR9xx - Leak defense)
// =============================================================================

/// FR901: Zombie image slot.
pub const FR901: Diagnostic = Diagnostic::warning(
    "FR901",
    "zombie image slot: marked unused but still holds native handles"
).with_note("this indicates an earlier partial-failure bug; the handles were force-destroyed");

/// FR902: Orphaned alias block.
pub const FR902: Diagnostic = Diagnostic::warning(
    "FR902",
    "alias memory block still allocated after every image was destroyed"
).with_note("the block's reference count disagreed with the live images; memory was force-freed");

/// FR903: Untracked native image.
pub const FR903: Diagnostic = Diagnostic::warning(
    "FR903",
    "native image created by the arena was never torn down"
).with_note("found in the creation side-table after the slot sweep; force-destroyed");
