//! HTML-facing side of the bridge.
//!
//! This module contains the error-slot configurator and the option flags the
//! HTML parser consumes. With the `html` feature it also provides a parse
//! session that collects the parser's SAX events for hosts that prefer a
//! list of events over raw callbacks.

mod error_handler;
#[cfg(feature = "html")]
mod event;
mod options;
#[cfg(feature = "html")]
mod parser;

pub use error_handler::*;
#[cfg(feature = "html")]
pub use event::*;
pub use options::*;
#[cfg(feature = "html")]
pub use parser::*;

/// The HTML parser uses the plain SAX handler table.
#[doc(alias = "htmlSAXHandler")]
pub type HtmlSaxHandler = crate::parser::SaxHandler;
