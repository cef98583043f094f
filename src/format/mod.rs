//! Render `printf`-style templates used by parser diagnostics.
//!
//! The parser reports errors as a C format string plus arguments. Here the
//! arguments arrive already evaluated as [`FormatArg`] values, and the
//! template is interpreted the way glibc's `vsnprintf` interprets it.
//!
//! Rendering always runs twice over the same input: [`measure`] performs a
//! dry run that only counts bytes, and [`format_into`] writes into a buffer
//! of exactly that size. Both passes share [`render`], so they cannot
//! disagree about the length.

mod number;

use std::fmt;

use crate::error::FormatError;

/// An already-evaluated argument for a template directive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FormatArg<'a> {
    Int(i64),
    UInt(u64),
    Double(f64),
    Char(char),
    /// `None` corresponds to a NULL `char *`.
    Str(Option<&'a str>),
}

macro_rules! impl_from_for_format_arg {
    ( $variant:ident, $target:ty, $( $t:ty ),* ) => {
        $(
            impl From<$t> for FormatArg<'_> {
                fn from(value: $t) -> Self {
                    Self::$variant(value as $target)
                }
            }
        )*
    };
}
impl_from_for_format_arg!(Int, i64, i8, i16, i32, i64, isize);
impl_from_for_format_arg!(UInt, u64, u8, u16, u32, u64, usize);
impl_from_for_format_arg!(Double, f64, f32, f64);

impl From<char> for FormatArg<'_> {
    fn from(value: char) -> Self {
        Self::Char(value)
    }
}

impl<'a> From<&'a str> for FormatArg<'a> {
    fn from(value: &'a str) -> Self {
        Self::Str(Some(value))
    }
}

impl<'a> From<&'a String> for FormatArg<'a> {
    fn from(value: &'a String) -> Self {
        Self::Str(Some(value.as_str()))
    }
}

impl<'a> From<Option<&'a str>> for FormatArg<'a> {
    fn from(value: Option<&'a str>) -> Self {
        Self::Str(value)
    }
}

/// Byte destination of a rendering pass.
pub(crate) trait Sink {
    fn put(&mut self, bytes: &[u8]);

    fn fill(&mut self, byte: u8, count: usize) {
        for _ in 0..count {
            self.put(&[byte]);
        }
    }
}

/// Dry-run sink: counts bytes and remembers whether a NUL went by.
#[derive(Debug, Default)]
pub(crate) struct ByteCounter {
    len: usize,
    nul: bool,
}

impl Sink for ByteCounter {
    fn put(&mut self, bytes: &[u8]) {
        self.len = self.len.saturating_add(bytes.len());
        self.nul |= bytes.contains(&0);
    }

    fn fill(&mut self, byte: u8, count: usize) {
        self.len = self.len.saturating_add(count);
        self.nul |= byte == 0 && count > 0;
    }
}

/// Writes into a pre-sized buffer. Excess bytes are dropped instead of
/// overrunning the buffer.
pub(crate) struct SliceWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> SliceWriter<'a> {
    pub(crate) fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn written(&self) -> usize {
        self.pos
    }
}

impl Sink for SliceWriter<'_> {
    fn put(&mut self, bytes: &[u8]) {
        let n = bytes.len().min(self.buf.len() - self.pos);
        self.buf[self.pos..self.pos + n].copy_from_slice(&bytes[..n]);
        self.pos += n;
    }

    fn fill(&mut self, byte: u8, count: usize) {
        let n = count.min(self.buf.len() - self.pos);
        self.buf[self.pos..self.pos + n].fill(byte);
        self.pos += n;
    }
}

impl Sink for Vec<u8> {
    fn put(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }

    fn fill(&mut self, byte: u8, count: usize) {
        self.resize(self.len() + count, byte);
    }
}

/// Lets `core::fmt` machinery write straight into a [`Sink`].
pub(crate) struct SinkWriter<'a, S: Sink>(pub(crate) &'a mut S);

impl<S: Sink> fmt::Write for SinkWriter<'_, S> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.put(s.as_bytes());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Flags {
    pub(crate) left: bool,
    pub(crate) plus: bool,
    pub(crate) space: bool,
    pub(crate) alternate: bool,
    pub(crate) zero: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Length {
    Char,
    Short,
    Int,
    Long,
}

/// One parsed `%...` directive.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Directive {
    pub(crate) flags: Flags,
    pub(crate) width: usize,
    pub(crate) precision: Option<usize>,
    pub(crate) length: Length,
    pub(crate) conversion: u8,
}

struct ArgCursor<'a, 'b> {
    args: &'b [FormatArg<'a>],
    next: usize,
}

impl<'a> ArgCursor<'a, '_> {
    fn next(&mut self) -> Result<(usize, FormatArg<'a>), FormatError> {
        let index = self.next;
        let arg = self
            .args
            .get(index)
            .copied()
            .ok_or(FormatError::MissingArgument { index })?;
        self.next += 1;
        Ok((index, arg))
    }

    /// `*` width and precision take a C `int`.
    fn next_int(&mut self) -> Result<i32, FormatError> {
        match self.next()? {
            (_, FormatArg::Int(v)) => Ok(v as i32),
            (_, FormatArg::UInt(v)) => Ok(v as i32),
            (index, _) => Err(FormatError::ArgumentMismatch {
                index,
                conversion: '*',
            }),
        }
    }
}

fn parse_decimal(bytes: &[u8], pos: &mut usize) -> Result<usize, FormatError> {
    let mut value = 0usize;
    while let Some(&b) = bytes.get(*pos).filter(|b| b.is_ascii_digit()) {
        value = value * 10 + (b - b'0') as usize;
        if value > i32::MAX as usize {
            return Err(FormatError::Overflow);
        }
        *pos += 1;
    }
    Ok(value)
}

/// Parse the directive starting at the `%` found at `start`.
///
/// Returns the directive and the position right after its conversion byte.
fn parse_directive(
    template: &str,
    start: usize,
    args: &mut ArgCursor<'_, '_>,
) -> Result<(Directive, usize), FormatError> {
    let bytes = template.as_bytes();
    let mut pos = start + 1;
    let mut flags = Flags::default();
    while let Some(&b) = bytes.get(pos) {
        match b {
            b'-' => flags.left = true,
            b'+' => flags.plus = true,
            b' ' => flags.space = true,
            b'#' => flags.alternate = true,
            b'0' => flags.zero = true,
            _ => break,
        }
        pos += 1;
    }

    let width = if bytes.get(pos) == Some(&b'*') {
        pos += 1;
        let width = args.next_int()?;
        if width < 0 {
            flags.left = true;
        }
        width.unsigned_abs() as usize
    } else {
        parse_decimal(bytes, &mut pos)?
    };
    if width > i32::MAX as usize {
        return Err(FormatError::Overflow);
    }

    let mut precision = None;
    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        if bytes.get(pos) == Some(&b'*') {
            pos += 1;
            let prec = args.next_int()?;
            precision = (prec >= 0).then_some(prec as usize);
        } else {
            precision = Some(parse_decimal(bytes, &mut pos)?);
        }
    }

    let mut length = Length::Int;
    match bytes.get(pos) {
        Some(b'h') if bytes.get(pos + 1) == Some(&b'h') => {
            length = Length::Char;
            pos += 2;
        }
        Some(b'h') => {
            length = Length::Short;
            pos += 1;
        }
        Some(b'l') if bytes.get(pos + 1) == Some(&b'l') => {
            length = Length::Long;
            pos += 2;
        }
        Some(b'l' | b'q' | b'j' | b'z' | b'Z' | b't' | b'L') => {
            length = Length::Long;
            pos += 1;
        }
        _ => {}
    }

    let Some(&conversion) = bytes.get(pos) else {
        return Err(FormatError::IncompleteDirective { offset: start });
    };
    if !conversion.is_ascii() {
        let conversion = template[pos..].chars().next().unwrap_or_default();
        return Err(FormatError::UnknownConversion {
            offset: start,
            conversion,
        });
    }
    let directive = Directive {
        flags,
        width,
        precision,
        length,
        conversion,
    };
    Ok((directive, pos + 1))
}

fn emit<S: Sink>(
    out: &mut S,
    directive: &Directive,
    start: usize,
    args: &mut ArgCursor<'_, '_>,
) -> Result<(), FormatError> {
    let conversion = directive.conversion;
    let mismatch = |index| FormatError::ArgumentMismatch {
        index,
        conversion: conversion as char,
    };
    match conversion {
        b'%' => out.put(b"%"),
        b'd' | b'i' => {
            let value = match args.next()? {
                (_, FormatArg::Int(v)) => v,
                (_, FormatArg::UInt(v)) => v as i64,
                (index, _) => return Err(mismatch(index)),
            };
            let value = match directive.length {
                Length::Char => value as i8 as i64,
                Length::Short => value as i16 as i64,
                Length::Int => value as i32 as i64,
                Length::Long => value,
            };
            number::write_integer(out, value < 0, value.unsigned_abs(), directive);
        }
        b'u' | b'o' | b'x' | b'X' => {
            let value = match args.next()? {
                (_, FormatArg::Int(v)) => v as u64,
                (_, FormatArg::UInt(v)) => v,
                (index, _) => return Err(mismatch(index)),
            };
            let value = match directive.length {
                Length::Char => value as u8 as u64,
                Length::Short => value as u16 as u64,
                Length::Int => value as u32 as u64,
                Length::Long => value,
            };
            number::write_integer(out, false, value, directive);
        }
        b'c' => {
            let mut utf8 = [0; 4];
            let bytes: &[u8] = match args.next()? {
                (_, FormatArg::Char(c)) => c.encode_utf8(&mut utf8).as_bytes(),
                (_, FormatArg::Int(v)) => {
                    utf8[0] = v as u8;
                    &utf8[..1]
                }
                (_, FormatArg::UInt(v)) => {
                    utf8[0] = v as u8;
                    &utf8[..1]
                }
                (index, _) => return Err(mismatch(index)),
            };
            pad_field(out, directive, bytes.len(), |out| out.put(bytes));
        }
        b's' => {
            let text = match args.next()? {
                (_, FormatArg::Str(Some(s))) => truncate_on_char_boundary(s, directive.precision),
                (_, FormatArg::Str(None)) => {
                    if directive.precision.is_some_and(|p| p < 6) {
                        ""
                    } else {
                        "(null)"
                    }
                }
                (index, _) => return Err(mismatch(index)),
            };
            pad_field(out, directive, text.len(), |out| out.put(text.as_bytes()));
        }
        b'p' => {
            let value = match args.next()? {
                (_, FormatArg::Int(v)) => v as u64,
                (_, FormatArg::UInt(v)) => v,
                (index, _) => return Err(mismatch(index)),
            };
            number::write_pointer(out, value, directive);
        }
        b'f' | b'F' | b'e' | b'E' | b'g' | b'G' | b'a' | b'A' => {
            let value = match args.next()? {
                (_, FormatArg::Double(v)) => v,
                (index, _) => return Err(mismatch(index)),
            };
            number::write_float(out, value, directive);
        }
        _ => {
            return Err(FormatError::UnknownConversion {
                offset: start,
                conversion: conversion as char,
            });
        }
    }
    Ok(())
}

fn truncate_on_char_boundary(s: &str, precision: Option<usize>) -> &str {
    match precision {
        Some(mut cut) if cut < s.len() => {
            while !s.is_char_boundary(cut) {
                cut -= 1;
            }
            &s[..cut]
        }
        _ => s,
    }
}

/// Emit `len` bytes produced by `body`, padded with spaces to the field width.
pub(crate) fn pad_field<S: Sink>(
    out: &mut S,
    directive: &Directive,
    len: usize,
    body: impl FnOnce(&mut S),
) {
    let pad = directive.width.saturating_sub(len);
    if !directive.flags.left {
        out.fill(b' ', pad);
    }
    body(out);
    if directive.flags.left {
        out.fill(b' ', pad);
    }
}

/// Run the template once against `out`.
pub(crate) fn render<S: Sink>(
    template: &str,
    args: &[FormatArg<'_>],
    out: &mut S,
) -> Result<(), FormatError> {
    let bytes = template.as_bytes();
    let mut args = ArgCursor { args, next: 0 };
    let mut pos = 0;
    while pos < bytes.len() {
        let Some(rel) = bytes[pos..].iter().position(|&b| b == b'%') else {
            out.put(&bytes[pos..]);
            break;
        };
        out.put(&bytes[pos..pos + rel]);
        let start = pos + rel;
        let (directive, next) = parse_directive(template, start, &mut args)?;
        emit(out, &directive, start, &mut args)?;
        pos = next;
    }
    Ok(())
}

/// Dry run: the exact number of bytes `template` renders to, without the
/// terminator.
pub fn measure(template: &str, args: &[FormatArg<'_>]) -> Result<usize, FormatError> {
    let mut counter = ByteCounter::default();
    render(template, args, &mut counter)?;
    if counter.nul {
        return Err(FormatError::InteriorNul);
    }
    if counter.len > i32::MAX as usize {
        return Err(FormatError::Overflow);
    }
    Ok(counter.len)
}

/// Render into `buf`, returning the number of bytes written.
///
/// `buf` should be at least [`measure`] bytes long. Output that does not fit
/// is cut off. No terminator is written.
pub fn format_into(
    template: &str,
    args: &[FormatArg<'_>],
    buf: &mut [u8],
) -> Result<usize, FormatError> {
    let mut writer = SliceWriter::new(buf);
    render(template, args, &mut writer)?;
    Ok(writer.written())
}

/// Render into a fresh byte vector of exactly the measured size.
pub fn format_bytes(template: &str, args: &[FormatArg<'_>]) -> Result<Vec<u8>, FormatError> {
    let len = measure(template, args)?;
    let mut buf = Vec::with_capacity(len);
    render(template, args, &mut buf)?;
    Ok(buf)
}
