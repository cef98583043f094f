//! The SAX handler table through which a parser reports events.
//!
//! The table belongs to the parser. Each slot is optional; the parser skips
//! events whose slot is `None`. Every callback receives the opaque user
//! context the parser was created with, untouched.

use std::ffi::c_void;

use crate::format::FormatArg;

/// Value of [`SaxHandler::initialized`] for tables that opt into the SAX2
/// extensions, including the structured error slot.
pub const SAX2_MAGIC: u32 = 0xDEEDBEAF;

/// Called when the document start being processed.
#[doc(alias = "startDocumentSAXFunc")]
pub type StartDocumentSAXFunc = unsafe fn(ctx: *mut c_void);
/// Called when the document end has been detected.
#[doc(alias = "endDocumentSAXFunc")]
pub type EndDocumentSAXFunc = unsafe fn(ctx: *mut c_void);
/// Called when an opening tag has been processed.
///
/// The elements of `atts` are `(attribute_name, attribute_value)`.
#[doc(alias = "startElementSAXFunc")]
pub type StartElementSAXFunc =
    unsafe fn(ctx: *mut c_void, name: &str, atts: &[(String, Option<String>)]);
/// Called when the end of an element has been detected.
#[doc(alias = "endElementSAXFunc")]
pub type EndElementSAXFunc = unsafe fn(ctx: *mut c_void, name: &str);
/// Called when an entity reference is detected.
#[doc(alias = "referenceSAXFunc")]
pub type ReferenceSAXFunc = unsafe fn(ctx: *mut c_void, name: &str);
/// Receiving some chars from the parser. A run of text may be split over
/// several calls.
#[doc(alias = "charactersSAXFunc")]
pub type CharactersSAXFunc = unsafe fn(ctx: *mut c_void, chars: &str);
/// Receiving some ignorable whitespaces from the parser.
#[doc(alias = "ignorableWhitespaceSAXFunc")]
pub type IgnorableWhitespaceSAXFunc = unsafe fn(ctx: *mut c_void, chars: &str);
/// A processing instruction has been parsed.
#[doc(alias = "processingInstructionSAXFunc")]
pub type ProcessingInstructionSAXFunc =
    unsafe fn(ctx: *mut c_void, target: &str, data: Option<&str>);
/// A comment has been parsed.
#[doc(alias = "commentSAXFunc")]
pub type CommentSAXFunc = unsafe fn(ctx: *mut c_void, value: &str);
/// Called when a pcdata block has been parsed.
#[doc(alias = "cdataBlockSAXFunc")]
pub type CDATABlockSAXFunc = unsafe fn(ctx: *mut c_void, value: &[u8]);

/// Display and format a warning messages, callback.
///
/// `msg` is a `printf`-style template and `args` its arguments.
#[doc(alias = "warningSAXFunc")]
pub type WarningSAXFunc = unsafe fn(ctx: *mut c_void, msg: &str, args: &[FormatArg<'_>]);
/// Display and format an error messages, callback.
///
/// `msg` is a `printf`-style template and `args` its arguments.
#[doc(alias = "errorSAXFunc")]
pub type ErrorSAXFunc = unsafe fn(ctx: *mut c_void, msg: &str, args: &[FormatArg<'_>]);
/// Display and format fatal error messages, callback.
/// # Note
/// so far fatalError() SAX callbacks are not used, error() get all the callbacks for errors.
#[doc(alias = "fatalErrorSAXFunc")]
pub type FatalErrorSAXFunc = unsafe fn(ctx: *mut c_void, msg: &str, args: &[FormatArg<'_>]);
/// Receives a fully populated error record instead of a template.
#[doc(alias = "xmlStructuredErrorFunc")]
pub type StructuredErrorFunc = unsafe fn(ctx: *mut c_void, error: &SaxError);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SaxErrorLevel {
    #[default]
    None,
    Warning,
    Error,
    Fatal,
}

/// The record passed to [`SaxHandler::serror`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaxError {
    pub code: i32,
    pub level: SaxErrorLevel,
    pub message: String,
    pub file: Option<String>,
    pub line: usize,
    pub column: usize,
}

/// A SAX handler is bunch of callbacks called by the parser when processing
/// of the input generate data or structure information.
///
/// When both `error` and `serror` are set on a SAX2 table, the parser
/// reports errors through `serror` only.
#[doc(alias = "xmlSAXHandler")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SaxHandler {
    pub start_document: Option<StartDocumentSAXFunc>,
    pub end_document: Option<EndDocumentSAXFunc>,
    pub start_element: Option<StartElementSAXFunc>,
    pub end_element: Option<EndElementSAXFunc>,
    pub reference: Option<ReferenceSAXFunc>,
    pub characters: Option<CharactersSAXFunc>,
    pub ignorable_whitespace: Option<IgnorableWhitespaceSAXFunc>,
    pub processing_instruction: Option<ProcessingInstructionSAXFunc>,
    pub comment: Option<CommentSAXFunc>,
    pub cdata_block: Option<CDATABlockSAXFunc>,
    pub warning: Option<WarningSAXFunc>,
    pub error: Option<ErrorSAXFunc>,
    pub fatal_error: Option<FatalErrorSAXFunc>, // unused error() get all the errors
    pub initialized: u32,
    // The following fields are extensions available only on version 2
    pub serror: Option<StructuredErrorFunc>,
}

impl SaxHandler {
    /// An empty table that opts into the SAX2 extensions.
    pub fn sax2() -> Self {
        Self {
            initialized: SAX2_MAGIC,
            ..Default::default()
        }
    }

    pub fn is_sax2(&self) -> bool {
        self.initialized == SAX2_MAGIC
    }

    /// The structured error slot, if the table is SAX2 and has one.
    pub fn structured_error(&self) -> Option<StructuredErrorFunc> {
        self.serror.filter(|_| self.is_sax2())
    }
}
