//! Diagnostic macros.

/// Emit a predefined diagnostic by code through a sink, with optional formatted context.
///
/// # Example
///
/// ```rust,ignore
/// fr_emit!(self.sink, FR001);
/// fr_emit!(self.sink, FR901, "slot {} image {:?}", index, image);
/// ```
#[macro_export]
macro_rules! fr_emit {
    ($sink:expr, $code:ident) => {{
        $crate::diagnostics::DiagnosticSink::emit(&*$sink, &$crate::diagnostics::$code, "");
    }};
    ($sink:expr, $code:ident, $($arg:tt)+) => {{
        $crate::diagnostics::DiagnosticSink::emit(&*$sink, &$crate::diagnostics::$code, &format!($($arg)+));
    }};
}

/// Emit an ad-hoc diagnostic to the global emitter.
///
/// # Example
///
/// ```rust,ignore
/// fr_diagnostic!(
///     Warning,
///     code = "FR999",
///     message = "something unusual happened",
///     help = "check the configuration"
/// );
/// ```
#[macro_export]
macro_rules! fr_diagnostic {
    (
        $kind:ident,
        code = $code:expr,
        message = $msg:expr
        $(, note = $note:expr)?
        $(, help = $help:expr)?
    ) => {{
        let diag = $crate::diagnostics::Diagnostic {
            kind: $crate::diagnostics::DiagnosticKind::$kind,
            code: $code,
            message: $msg,
            note: None $(.or(Some($note)))?,
            help: None $(.or(Some($help)))?,
        };
        $crate::diagnostics::emit(&diag);
    }};
}
