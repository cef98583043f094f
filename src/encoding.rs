//! Character encoding identifiers understood by the parser.
//!
//! The parser is told the input encoding as one of these identifiers. Hosts
//! usually have an encoding *label* instead (`"utf-8"`, `"Shift_JIS"`,
//! `"latin1"`), so labels are resolved here, with `encoding_rs` covering
//! the WHATWG label aliases.

use encoding_rs::{
    EUC_JP, Encoding, ISO_2022_JP, ISO_8859_2, ISO_8859_3, ISO_8859_4, ISO_8859_5, ISO_8859_6,
    ISO_8859_7, ISO_8859_8, SHIFT_JIS, UTF_8, UTF_16BE, UTF_16LE, WINDOWS_1252, WINDOWS_1254,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(i32)]
pub enum CharEncoding {
    Error = -1,
    None = 0,
    #[default]
    UTF8,
    UTF16LE,
    UTF16BE,
    UCS4LE,
    UCS4BE,
    EBCDIC,
    UCS4_2143,
    UCS4_3412,
    UCS2,
    ISO8859_1,
    ISO8859_2,
    ISO8859_3,
    ISO8859_4,
    ISO8859_5,
    ISO8859_6,
    ISO8859_7,
    ISO8859_8,
    ISO8859_9,
    ISO2022JP,
    ShiftJIS,
    EUCJP,
    ASCII,
}

impl CharEncoding {
    pub fn get_name(&self) -> Option<&'static str> {
        match *self {
            Self::UTF8 => Some("UTF-8"),
            Self::UTF16LE => Some("UTF-16"),
            Self::UTF16BE => Some("UTF-16"),
            Self::EBCDIC => Some("EBCDIC"),
            Self::UCS4LE => Some("ISO-10646-UCS-4"),
            Self::UCS4BE => Some("ISO-10646-UCS-4"),
            Self::UCS4_2143 => Some("ISO-10646-UCS-4"),
            Self::UCS4_3412 => Some("ISO-10646-UCS-4"),
            Self::UCS2 => Some("ISO-10646-UCS-2"),
            Self::ISO8859_1 => Some("ISO-8859-1"),
            Self::ISO8859_2 => Some("ISO-8859-2"),
            Self::ISO8859_3 => Some("ISO-8859-3"),
            Self::ISO8859_4 => Some("ISO-8859-4"),
            Self::ISO8859_5 => Some("ISO-8859-5"),
            Self::ISO8859_6 => Some("ISO-8859-6"),
            Self::ISO8859_7 => Some("ISO-8859-7"),
            Self::ISO8859_8 => Some("ISO-8859-8"),
            Self::ISO8859_9 => Some("ISO-8859-9"),
            Self::ISO2022JP => Some("ISO-2022-JP"),
            Self::ShiftJIS => Some("Shift-JIS"),
            Self::EUCJP => Some("EUC-JP"),
            Self::ASCII => Some("ASCII"),
            _ => None,
        }
    }

    /// Resolve an encoding label.
    ///
    /// Labels the parser has no identifier for resolve to UTF-8, so callers
    /// always get something the parser accepts.
    pub fn from_label(label: &str) -> Self {
        let name = label.trim().to_ascii_uppercase();
        match name.as_str() {
            "" => return Self::UTF8,
            "ASCII" | "US-ASCII" => return Self::ASCII,
            "UCS-4" | "UCS4" | "ISO-10646-UCS-4" | "UTF-32LE" => return Self::UCS4LE,
            "UTF-32BE" => return Self::UCS4BE,
            "UCS-2" | "UCS2" | "ISO-10646-UCS-2" => return Self::UCS2,
            "EBCDIC" => return Self::EBCDIC,
            _ => {}
        }

        let Some(encoding) = Encoding::for_label(name.as_bytes()) else {
            log::debug!(
                target: "saxbridge::encoding",
                "unknown encoding label {label:?}, using UTF-8"
            );
            return Self::UTF8;
        };
        Self::from_encoding(encoding)
    }

    /// Map an `encoding_rs` encoding onto the parser's identifiers.
    pub fn from_encoding(encoding: &'static Encoding) -> Self {
        if encoding == UTF_8 {
            Self::UTF8
        } else if encoding == UTF_16LE {
            Self::UTF16LE
        } else if encoding == UTF_16BE {
            Self::UTF16BE
        } else if encoding == WINDOWS_1252 {
            // WHATWG folds "iso-8859-1" and "latin1" into windows-1252.
            Self::ISO8859_1
        } else if encoding == ISO_8859_2 {
            Self::ISO8859_2
        } else if encoding == ISO_8859_3 {
            Self::ISO8859_3
        } else if encoding == ISO_8859_4 {
            Self::ISO8859_4
        } else if encoding == ISO_8859_5 {
            Self::ISO8859_5
        } else if encoding == ISO_8859_6 {
            Self::ISO8859_6
        } else if encoding == ISO_8859_7 {
            Self::ISO8859_7
        } else if encoding == ISO_8859_8 {
            Self::ISO8859_8
        } else if encoding == WINDOWS_1254 {
            Self::ISO8859_9
        } else if encoding == ISO_2022_JP {
            Self::ISO2022JP
        } else if encoding == SHIFT_JIS {
            Self::ShiftJIS
        } else if encoding == EUC_JP {
            Self::EUCJP
        } else {
            log::debug!(
                target: "saxbridge::encoding",
                "{} has no parser identifier, using UTF-8",
                encoding.name()
            );
            Self::UTF8
        }
    }
}

impl From<CharEncoding> for i32 {
    fn from(value: CharEncoding) -> Self {
        value as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_resolve_to_parser_identifiers() {
        assert_eq!(CharEncoding::from_label("utf-8"), CharEncoding::UTF8);
        assert_eq!(CharEncoding::from_label("UTF-16LE"), CharEncoding::UTF16LE);
        assert_eq!(CharEncoding::from_label("utf-16be"), CharEncoding::UTF16BE);
        assert_eq!(CharEncoding::from_label("UTF-32BE"), CharEncoding::UCS4BE);
        assert_eq!(CharEncoding::from_label("us-ascii"), CharEncoding::ASCII);
        assert_eq!(CharEncoding::from_label("latin1"), CharEncoding::ISO8859_1);
        assert_eq!(CharEncoding::from_label("ISO-8859-1"), CharEncoding::ISO8859_1);
        assert_eq!(CharEncoding::from_label("Shift_JIS"), CharEncoding::ShiftJIS);
        assert_eq!(CharEncoding::from_label("euc-jp"), CharEncoding::EUCJP);
        assert_eq!(CharEncoding::from_label("iso-2022-jp"), CharEncoding::ISO2022JP);
    }

    #[test]
    fn unsupported_labels_fall_back_to_utf8() {
        assert_eq!(CharEncoding::from_label("koi8-r"), CharEncoding::UTF8);
        assert_eq!(CharEncoding::from_label("no-such-encoding"), CharEncoding::UTF8);
        assert_eq!(CharEncoding::from_label(""), CharEncoding::UTF8);
    }

    #[test]
    fn identifiers_match_the_parser_numbering() {
        assert_eq!(i32::from(CharEncoding::UTF8), 1);
        assert_eq!(i32::from(CharEncoding::ISO8859_1), 10);
        assert_eq!(i32::from(CharEncoding::ASCII), 22);
        assert_eq!(CharEncoding::ShiftJIS.get_name(), Some("Shift-JIS"));
    }
}
