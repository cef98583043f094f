//! Integer and floating-point conversions.
//!
//! Floating-point digits come from `core::fmt`, whose `{:.N}` and `{:.Ne}`
//! output is exactly rounded. The adapters below reshape that output into
//! C notation while streaming, so no intermediate string is allocated.

use std::fmt::{self, Write};

use super::{Directive, Sink, SinkWriter, pad_field};

fn digits(mut value: u64, radix: u64, upper: bool, buf: &mut [u8; 24]) -> usize {
    let table = if upper {
        b"0123456789ABCDEF"
    } else {
        b"0123456789abcdef"
    };
    let mut start = buf.len();
    loop {
        start -= 1;
        buf[start] = table[(value % radix) as usize];
        value /= radix;
        if value == 0 {
            break;
        }
    }
    start
}

/// `%d %i %u %o %x %X`.
///
/// `negative` and `magnitude` carry the sign separately so that `i64::MIN`
/// does not need special casing.
pub(super) fn write_integer<S: Sink>(
    out: &mut S,
    negative: bool,
    magnitude: u64,
    directive: &Directive,
) {
    let conversion = directive.conversion;
    let flags = directive.flags;
    let radix = match conversion {
        b'o' => 8,
        b'x' | b'X' => 16,
        _ => 10,
    };
    let mut buf = [0; 24];
    let start = digits(magnitude, radix, conversion == b'X', &mut buf);
    let mut body = &buf[start..];
    if directive.precision == Some(0) && magnitude == 0 {
        body = &[];
    }

    let mut zeros = directive
        .precision
        .map_or(0, |prec| prec.saturating_sub(body.len()));
    if conversion == b'o' && flags.alternate && zeros == 0 && body.first() != Some(&b'0') {
        zeros = 1;
    }

    let prefix: &[u8] = match conversion {
        b'd' | b'i' if negative => b"-",
        b'd' | b'i' if flags.plus => b"+",
        b'd' | b'i' if flags.space => b" ",
        b'x' if flags.alternate && magnitude != 0 => b"0x",
        b'X' if flags.alternate && magnitude != 0 => b"0X",
        _ => b"",
    };

    let len = prefix.len() + zeros + body.len();
    let mut pad = directive.width.saturating_sub(len);
    if flags.zero && !flags.left && directive.precision.is_none() {
        zeros += pad;
        pad = 0;
    }
    if !flags.left {
        out.fill(b' ', pad);
    }
    out.put(prefix);
    out.fill(b'0', zeros);
    out.put(body);
    if flags.left {
        out.fill(b' ', pad);
    }
}

/// `%p`, following glibc: `(nil)` for null, `0x` and lowercase hex otherwise.
pub(super) fn write_pointer<S: Sink>(out: &mut S, value: u64, directive: &Directive) {
    if value == 0 {
        pad_field(out, directive, 5, |out| out.put(b"(nil)"));
        return;
    }
    let mut buf = [0; 24];
    let start = digits(value, 16, false, &mut buf);
    let body = &buf[start..];
    pad_field(out, directive, body.len() + 2, |out| {
        out.put(b"0x");
        out.put(body);
    });
}

/// Counts what a `fmt::Write` consumer would receive.
#[derive(Default)]
struct CountWriter(usize);

impl Write for CountWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 += s.len();
        Ok(())
    }
}

/// Reads the decimal exponent out of Rust's `{:e}` output and drops the rest.
#[derive(Default)]
struct ExponentCapture {
    seen_e: bool,
    negative: bool,
    value: i32,
}

impl Write for ExponentCapture {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            match c {
                'e' => self.seen_e = true,
                '-' if self.seen_e => self.negative = true,
                '0'..='9' if self.seen_e => {
                    self.value = self.value * 10 + (c as u8 - b'0') as i32;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl ExponentCapture {
    fn exponent(&self) -> i32 {
        if self.negative { -self.value } else { self.value }
    }
}

/// Turns Rust's `1.5e3` into C's `1.5e+03`.
struct ExponentWriter<'a, W: Write> {
    inner: &'a mut W,
    upper: bool,
    /// Insert a radix point even when no fraction digits follow (`%#.0e`).
    force_point: bool,
    capture: Option<ExponentCapture>,
}

impl<'a, W: Write> ExponentWriter<'a, W> {
    fn new(inner: &'a mut W, upper: bool, force_point: bool) -> Self {
        Self {
            inner,
            upper,
            force_point,
            capture: None,
        }
    }

    fn finish(self) -> fmt::Result {
        let exponent = self.capture.as_ref().map_or(0, ExponentCapture::exponent);
        let e = if self.upper { 'E' } else { 'e' };
        let sign = if exponent < 0 { '-' } else { '+' };
        write!(self.inner, "{e}{sign}{:02}", exponent.unsigned_abs())
    }
}

impl<W: Write> Write for ExponentWriter<'_, W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if let Some(capture) = self.capture.as_mut() {
            return capture.write_str(s);
        }
        match s.find('e') {
            Some(at) => {
                self.inner.write_str(&s[..at])?;
                if self.force_point {
                    self.inner.write_char('.')?;
                }
                let mut capture = ExponentCapture {
                    seen_e: true,
                    ..Default::default()
                };
                capture.write_str(&s[at + 1..])?;
                self.capture = Some(capture);
                Ok(())
            }
            None => self.inner.write_str(s),
        }
    }
}

/// Drops trailing fraction zeros (and a bare radix point) for `%g`.
///
/// Zeros are held back as a count and only released once a non-zero digit
/// proves they are not trailing.
struct TrailingZeros<'a, W: Write> {
    inner: &'a mut W,
    in_fraction: bool,
    pending_point: bool,
    pending_zeros: usize,
}

impl<'a, W: Write> TrailingZeros<'a, W> {
    fn new(inner: &'a mut W) -> Self {
        Self {
            inner,
            in_fraction: false,
            pending_point: false,
            pending_zeros: 0,
        }
    }
}

impl<W: Write> Write for TrailingZeros<'_, W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if !self.in_fraction {
                if c == '.' {
                    self.in_fraction = true;
                    self.pending_point = true;
                } else {
                    self.inner.write_char(c)?;
                }
                continue;
            }
            match c {
                '0' => self.pending_zeros += 1,
                '1'..='9' => {
                    if self.pending_point {
                        self.inner.write_char('.')?;
                        self.pending_point = false;
                    }
                    for _ in 0..self.pending_zeros {
                        self.inner.write_char('0')?;
                    }
                    self.pending_zeros = 0;
                    self.inner.write_char(c)?;
                }
                _ => {
                    self.in_fraction = false;
                    self.pending_point = false;
                    self.pending_zeros = 0;
                    self.inner.write_char(c)?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Notation {
    Fixed { precision: usize },
    Exponent { precision: usize },
}

#[derive(Clone, Copy)]
struct FloatBody {
    magnitude: f64,
    notation: Notation,
    upper: bool,
    alternate: bool,
    strip_zeros: bool,
}

impl FloatBody {
    fn write_to<W: Write>(&self, w: &mut W) -> fmt::Result {
        if self.strip_zeros {
            self.write_notation(&mut TrailingZeros::new(w))
        } else {
            self.write_notation(w)
        }
    }

    fn write_notation<W: Write>(&self, w: &mut W) -> fmt::Result {
        match self.notation {
            Notation::Fixed { precision } => {
                write!(w, "{:.*}", precision, self.magnitude)?;
                if self.alternate && precision == 0 {
                    w.write_char('.')?;
                }
                Ok(())
            }
            Notation::Exponent { precision } => {
                let mut ew = ExponentWriter::new(w, self.upper, self.alternate && precision == 0);
                write!(ew, "{:.*e}", precision, self.magnitude)?;
                ew.finish()
            }
        }
    }
}

/// The pieces of a `%a` conversion: `0x<lead>.<fraction><zeros>p<exponent>`.
struct HexFloat {
    lead: u64,
    fraction: u64,
    digits: usize,
    zeros: usize,
    exponent: i32,
}

impl HexFloat {
    const FRACTION_DIGITS: usize = 13;

    fn new(magnitude: f64, precision: Option<usize>) -> Self {
        let bits = magnitude.to_bits();
        let biased = ((bits >> 52) & 0x7ff) as i32;
        let mut fraction = bits & ((1 << 52) - 1);
        // glibc keeps subnormals unnormalized, with a leading 0.
        let (mut lead, exponent) = match (biased, fraction) {
            (0, 0) => (0, 0),
            (0, _) => (0, -1022),
            _ => (1, biased - 1023),
        };
        let Some(precision) = precision else {
            let mut digits = Self::FRACTION_DIGITS;
            while digits > 0 && fraction & 0xf == 0 {
                fraction >>= 4;
                digits -= 1;
            }
            return Self {
                lead,
                fraction,
                digits,
                zeros: 0,
                exponent,
            };
        };
        if precision >= Self::FRACTION_DIGITS {
            return Self {
                lead,
                fraction,
                digits: Self::FRACTION_DIGITS,
                zeros: precision - Self::FRACTION_DIGITS,
                exponent,
            };
        }
        let shift = (Self::FRACTION_DIGITS - precision) * 4;
        let full = (lead << 52) | fraction;
        let mut kept = full >> shift;
        let rest = full & ((1 << shift) - 1);
        let half = 1 << (shift - 1);
        if rest > half || (rest == half && kept & 1 == 1) {
            kept += 1;
        }
        // A carry out of the fraction lands in the leading digit (0x2p+0).
        lead = kept >> (precision * 4);
        fraction = kept & ((1 << (precision * 4)) - 1);
        Self {
            lead,
            fraction,
            digits: precision,
            zeros: 0,
            exponent,
        }
    }

    fn write_to<W: Write>(&self, w: &mut W, upper: bool, point: bool) -> fmt::Result {
        let table = if upper {
            b"0123456789ABCDEF"
        } else {
            b"0123456789abcdef"
        };
        w.write_char(table[self.lead as usize] as char)?;
        if point {
            w.write_char('.')?;
        }
        for i in (0..self.digits).rev() {
            w.write_char(table[((self.fraction >> (i * 4)) & 0xf) as usize] as char)?;
        }
        for _ in 0..self.zeros {
            w.write_char('0')?;
        }
        write!(w, "{}{:+}", if upper { 'P' } else { 'p' }, self.exponent)
    }
}

/// `%a %A` for a finite value.
fn write_hex_float<S: Sink>(out: &mut S, sign: &[u8], magnitude: f64, directive: &Directive) {
    let flags = directive.flags;
    let upper = directive.conversion == b'A';
    let prefix: &[u8] = if upper { b"0X" } else { b"0x" };
    let body = HexFloat::new(magnitude, directive.precision);
    let point = body.digits + body.zeros > 0 || flags.alternate;

    let mut counter = CountWriter::default();
    let _ = body.write_to(&mut counter, upper, point);
    let len = sign.len() + prefix.len() + counter.0;
    let pad = directive.width.saturating_sub(len);
    if !flags.left && !flags.zero {
        out.fill(b' ', pad);
    }
    out.put(sign);
    out.put(prefix);
    if !flags.left && flags.zero {
        out.fill(b'0', pad);
    }
    let _ = body.write_to(&mut SinkWriter(&mut *out), upper, point);
    if flags.left {
        out.fill(b' ', pad);
    }
}

/// `%f %F %e %E %g %G %a %A`.
pub(super) fn write_float<S: Sink>(out: &mut S, value: f64, directive: &Directive) {
    let flags = directive.flags;
    let conversion = directive.conversion;
    let upper = conversion.is_ascii_uppercase();
    let sign: &[u8] = if value.is_sign_negative() {
        b"-"
    } else if flags.plus {
        b"+"
    } else if flags.space {
        b" "
    } else {
        b""
    };

    if !value.is_finite() {
        let text: &[u8] = match (value.is_nan(), upper) {
            (true, false) => b"nan",
            (true, true) => b"NAN",
            (false, false) => b"inf",
            (false, true) => b"INF",
        };
        pad_field(out, directive, sign.len() + text.len(), |out| {
            out.put(sign);
            out.put(text);
        });
        return;
    }

    let magnitude = value.abs();
    if matches!(conversion, b'a' | b'A') {
        write_hex_float(out, sign, magnitude, directive);
        return;
    }
    let precision = directive.precision.unwrap_or(6);
    let (notation, strip_zeros) = match conversion {
        b'f' | b'F' => (Notation::Fixed { precision }, false),
        b'e' | b'E' => (Notation::Exponent { precision }, false),
        _ => {
            let p = precision.max(1);
            let mut capture = ExponentCapture::default();
            // Writing into the capture cannot fail.
            let _ = write!(capture, "{:.*e}", p - 1, magnitude);
            let x = capture.exponent() as i64;
            let notation = if (p as i64) > x && x >= -4 {
                Notation::Fixed {
                    precision: (p as i64 - 1 - x) as usize,
                }
            } else {
                Notation::Exponent { precision: p - 1 }
            };
            (notation, !flags.alternate)
        }
    };
    let body = FloatBody {
        magnitude,
        notation,
        upper,
        alternate: flags.alternate,
        strip_zeros,
    };

    let mut counter = CountWriter::default();
    let _ = body.write_to(&mut counter);
    let len = sign.len() + counter.0;
    let pad = directive.width.saturating_sub(len);
    if flags.left {
        out.put(sign);
        let _ = body.write_to(&mut SinkWriter(&mut *out));
        out.fill(b' ', pad);
    } else if flags.zero {
        out.put(sign);
        out.fill(b'0', pad);
        let _ = body.write_to(&mut SinkWriter(&mut *out));
    } else {
        out.fill(b' ', pad);
        out.put(sign);
        let _ = body.write_to(&mut SinkWriter(&mut *out));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trimmed(s: &str) -> String {
        let mut out = String::new();
        TrailingZeros::new(&mut out).write_str(s).unwrap();
        out
    }

    #[test]
    fn trailing_zero_removal() {
        assert_eq!(trimmed("1.2500"), "1.25");
        assert_eq!(trimmed("100.000"), "100");
        assert_eq!(trimmed("100"), "100");
        assert_eq!(trimmed("1.000e"), "1e");
        assert_eq!(trimmed("0.000100"), "0.0001");
    }

    fn hex(value: f64, precision: Option<usize>) -> String {
        let mut out = String::new();
        let body = HexFloat::new(value, precision);
        let point = body.digits + body.zeros > 0;
        body.write_to(&mut out, false, point).unwrap();
        out
    }

    #[test]
    fn hex_float_digits() {
        assert_eq!(hex(1.0, None), "1p+0");
        assert_eq!(hex(3.0, None), "1.8p+1");
        assert_eq!(hex(0.1, None), "1.999999999999ap-4");
        assert_eq!(hex(0.0, None), "0p+0");
        assert_eq!(hex(f64::from_bits(1), None), "0.0000000000001p-1022");
        assert_eq!(hex(f64::MAX, None), "1.fffffffffffffp+1023");
        assert_eq!(hex(1.0, Some(3)), "1.000p+0");
        assert_eq!(hex(0.1, Some(20)), "1.999999999999a0000000p-4");
    }

    #[test]
    fn hex_float_rounding() {
        // 1.5 sits halfway between 0x1 and 0x2 and rounds to even.
        assert_eq!(hex(1.5, Some(0)), "2p+0");
        assert_eq!(hex(1.03125, Some(1)), "1.0p+0");
        assert_eq!(hex(1.09375, Some(1)), "1.2p+0");
        assert_eq!(hex(0.1, Some(2)), "1.9ap-4");
        assert_eq!(hex(1.96875, Some(1)), "2.0p+0");
    }

    #[test]
    fn exponent_rewrite() {
        let mut out = String::new();
        let mut ew = ExponentWriter::new(&mut out, false, false);
        write!(ew, "{:.2e}", 0.000123456).unwrap();
        ew.finish().unwrap();
        assert_eq!(out, "1.23e-04");

        let mut out = String::new();
        let mut ew = ExponentWriter::new(&mut out, true, true);
        write!(ew, "{:.0e}", 5.0e120).unwrap();
        ew.finish().unwrap();
        assert_eq!(out, "5.E+120");
    }
}
