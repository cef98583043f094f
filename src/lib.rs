//! Forward a SAX parser's formatted error reports to a host callback.
//!
//! The parser reports errors through the `error` slot of its handler table
//! as a `printf`-style template plus arguments. [`html::html_parser_set_error_handler`]
//! installs a slot that renders the message into an exactly sized buffer,
//! hands it to the host function registered with
//! [`globals::set_host_error_handler`] and frees it again.
#![allow(clippy::missing_safety_doc)]
#![warn(unused_mut)]
#![warn(unused_imports)]
#![warn(unused_variables)]
#![warn(unused_unsafe)]

pub mod bridge;
pub mod encoding;
pub mod error;
#[cfg(feature = "ffi")]
pub mod ffi;
pub mod format;
pub mod globals;
pub mod html;
pub mod memory;
pub mod message;
pub mod parser;
