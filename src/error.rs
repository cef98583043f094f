//! Provide error types for the message bridge.
//!
//! None of these errors ever reaches the parser that raised the original
//! diagnostic. They are recovered inside the bridge and surface only as the
//! fixed fallback messages below, or through the `log` facade.

use std::{ffi::CStr, fmt::Display};

/// Forwarded when the template and arguments cannot be rendered.
pub const FORMATTING_FAILED_MESSAGE: &CStr = c"Error formatting message";
/// Forwarded when the message buffer cannot be allocated.
pub const ALLOCATION_FAILED_MESSAGE: &CStr = c"Memory allocation failed for error message";

/// Reasons the dry-run sizing pass rejects a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    /// `offset` is the byte offset of the `%` that starts the directive.
    UnknownConversion { offset: usize, conversion: char },
    IncompleteDirective { offset: usize },
    MissingArgument { index: usize },
    ArgumentMismatch { index: usize, conversion: char },
    /// The rendered text would contain a NUL byte.
    InteriorNul,
    /// The rendered length, a width or a precision does not fit in a C `int`.
    Overflow,
}

impl Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Format Error: ")?;
        match self {
            Self::UnknownConversion { offset, conversion } => {
                write!(f, "unknown conversion '%{conversion}' at {offset}")
            }
            Self::IncompleteDirective { offset } => {
                write!(f, "incomplete directive at {offset}")
            }
            Self::MissingArgument { index } => write!(f, "missing argument #{index}"),
            Self::ArgumentMismatch { index, conversion } => {
                write!(f, "argument #{index} cannot be used with '%{conversion}'")
            }
            Self::InteriorNul => write!(f, "rendered message contains a NUL byte"),
            Self::Overflow => write!(f, "rendered message is too long"),
        }
    }
}

impl std::error::Error for FormatError {}

/// Failures of a single error event on its way to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    FormattingFailure(FormatError),
    /// `size` includes the terminator byte.
    AllocationFailure { size: usize },
}

impl BridgeError {
    /// The fixed message forwarded in place of the one that failed.
    pub fn fallback_message(&self) -> &'static CStr {
        match self {
            Self::FormattingFailure(_) => FORMATTING_FAILED_MESSAGE,
            Self::AllocationFailure { .. } => ALLOCATION_FAILED_MESSAGE,
        }
    }
}

impl Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FormattingFailure(err) => write!(f, "{err}"),
            Self::AllocationFailure { size } => {
                write!(f, "failed to allocate {size} bytes for an error message")
            }
        }
    }
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FormattingFailure(err) => Some(err),
            Self::AllocationFailure { .. } => None,
        }
    }
}

impl From<FormatError> for BridgeError {
    fn from(value: FormatError) -> Self {
        Self::FormattingFailure(value)
    }
}

/// Rejected memory hook configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    MissingFree,
    MissingMalloc,
}

impl Display for MemoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingFree => write!(f, "a free function is required"),
            Self::MissingMalloc => write!(f, "a malloc function is required"),
        }
    }
}

impl std::error::Error for MemoryError {}
