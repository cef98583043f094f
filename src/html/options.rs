//! Option flags handed to the HTML parser.
//!
//! The values are the parser's own `htmlParserOption` bits, so the mask can
//! be passed straight to the parser's setup call. Nothing in this crate
//! interprets them.

use std::ops::{BitOr, BitOrAssign};

/// A set of `HTML_PARSE_*` flags.
#[doc(alias = "htmlParserOption")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HtmlParserOptions(i32);

impl HtmlParserOptions {
    /// Relaxed parsing
    pub const RECOVER: Self = Self(1 << 0);
    /// Do not default a doctype if not found
    pub const NO_DEFAULT_DTD: Self = Self(1 << 2);
    /// Suppress error reports
    pub const NO_ERROR: Self = Self(1 << 5);
    /// Suppress warning reports
    pub const NO_WARNING: Self = Self(1 << 6);
    /// Pedantic error reporting
    pub const PEDANTIC: Self = Self(1 << 7);
    /// Remove blank nodes
    pub const NO_BLANKS: Self = Self(1 << 8);
    /// Forbid network access
    pub const NO_NET: Self = Self(1 << 11);
    /// Do not add implied html/body... elements
    pub const NO_IMPLIED: Self = Self(1 << 13);
    /// Compact small text nodes
    pub const COMPACT: Self = Self(1 << 16);
    /// Ignore internal document encoding hint
    pub const IGNORE_ENCODING: Self = Self(1 << 21);

    const ALL: i32 = Self::RECOVER.0
        | Self::NO_DEFAULT_DTD.0
        | Self::NO_ERROR.0
        | Self::NO_WARNING.0
        | Self::PEDANTIC.0
        | Self::NO_BLANKS.0
        | Self::NO_NET.0
        | Self::NO_IMPLIED.0
        | Self::COMPACT.0
        | Self::IGNORE_ENCODING.0;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> i32 {
        self.0
    }

    /// `None` if `bits` contains a bit that is not a known option.
    pub const fn from_bits(bits: i32) -> Option<Self> {
        if bits & !Self::ALL != 0 {
            None
        } else {
            Some(Self(bits))
        }
    }

    /// Drops unknown bits.
    pub const fn from_bits_truncate(bits: i32) -> Self {
        Self(bits & Self::ALL)
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for HtmlParserOptions {
    /// Lenient, offline parsing without blank nodes.
    fn default() -> Self {
        Self::NO_NET | Self::NO_BLANKS | Self::RECOVER
    }
}

impl BitOr for HtmlParserOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl BitOrAssign for HtmlParserOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl TryFrom<i32> for HtmlParserOptions {
    type Error = anyhow::Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::from_bits(value).ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid convert from value '{value:#x}' to {}",
                std::any::type_name::<Self>()
            )
        })
    }
}

impl From<HtmlParserOptions> for i32 {
    fn from(value: HtmlParserOptions) -> Self {
        value.bits()
    }
}
