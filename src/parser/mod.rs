//! Types shared with the external SAX parser.
//!
//! The parser itself lives outside this crate. What it needs from us is the
//! handler table layout it calls into.

mod sax;

pub use sax::*;
