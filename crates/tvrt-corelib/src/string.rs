//! String and value helpers used by generated code for builtins.

use std::cmp::Ordering;
use std::io::{self, Write};

use tvrt_host::{Heap, LuaStr, Value};

use crate::error::{ErrorKind, RuntimeError, SrcLoc};

/// Like [`type_name`] but tells integers and floats apart.
pub fn tag_name(v: &Value) -> &'static str {
    match v {
        Value::Int(_) => "integer",
        Value::Float(_) => "float",
        _ => v.tag().type_name(),
    }
}

pub fn type_name(v: &Value) -> &'static str {
    v.tag().type_name()
}

pub fn tag_check_error(
    loc: SrcLoc<'_>,
    expected: &'static str,
    received: &Value,
    description: &str,
) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::TagCheck {
            expected,
            received: tag_name(received),
            description: description.to_string(),
        },
        loc,
    )
}

pub fn arity_error(loc: SrcLoc<'_>, function: &str, expected: u32, received: u32) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::Arity {
            function: function.to_string(),
            expected,
            received,
        },
        loc,
    )
}

pub fn string_concat(
    heap: &mut Heap,
    parts: &[&LuaStr],
    loc: SrcLoc<'_>,
) -> Result<LuaStr, RuntimeError> {
    let total = parts
        .iter()
        .try_fold(0usize, |acc, s| acc.checked_add(s.len()))
        .filter(|&n| n <= isize::MAX as usize)
        .ok_or_else(|| RuntimeError::new(ErrorKind::StringLengthOverflow, loc))?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(total)
        .map_err(|_| RuntimeError::new(ErrorKind::OutOfMemory, loc))?;
    for s in parts {
        buf.extend_from_slice(s.as_bytes());
    }
    Ok(heap.new_str(&buf))
}

pub fn string_char(heap: &mut Heap, c: i64, loc: SrcLoc<'_>) -> Result<LuaStr, RuntimeError> {
    let b = u8::try_from(c).map_err(|_| RuntimeError::new(ErrorKind::CharOutOfRange, loc))?;
    Ok(heap.new_str(&[b]))
}

fn start_pos(pos: i64, len: usize) -> usize {
    let len_i = len as i64;
    if pos > 0 {
        pos as usize
    } else if pos == 0 || pos < -len_i {
        1
    } else {
        (len_i + pos + 1) as usize
    }
}

fn end_pos(pos: i64, len: usize) -> usize {
    let len_i = len as i64;
    if pos > len_i {
        len
    } else if pos >= 0 {
        pos as usize
    } else if pos < -len_i {
        0
    } else {
        (len_i + pos + 1) as usize
    }
}

/// `s:sub(i, j)`; negative positions count from the end.
pub fn string_sub(heap: &mut Heap, s: &LuaStr, i: i64, j: i64) -> LuaStr {
    let len = s.len();
    let start = start_pos(i, len);
    let end = end_pos(j, len);
    if start > end {
        return heap.new_str(b"");
    }
    heap.new_str(&s.as_bytes()[start - 1..end])
}

fn segment(s: &[u8]) -> &[u8] {
    match s.iter().position(|&b| b == 0) {
        Some(n) => &s[..n],
        None => s,
    }
}

/// Ordering used by `<` on strings. Embedded NULs split the strings into segments
/// compared one after another.
pub fn string_cmp(a: &[u8], b: &[u8]) -> Ordering {
    let (mut a, mut b) = (a, b);
    loop {
        let sa = segment(a);
        let sb = segment(b);
        match sa.cmp(sb) {
            Ordering::Equal => {}
            other => return other,
        }
        // equal segments have equal lengths
        let n = sa.len();
        if n == b.len() {
            return if n == a.len() {
                Ordering::Equal
            } else {
                Ordering::Greater
            };
        } else if n == a.len() {
            return Ordering::Less;
        }
        a = &a[n + 1..];
        b = &b[n + 1..];
    }
}

const FLOAT_PRECISION: usize = 14;

/// `printf("%.14g", x)`.
fn format_float_g(x: f64) -> String {
    if x.is_nan() {
        return if x.is_sign_negative() { "-nan" } else { "nan" }.to_string();
    }
    if x.is_infinite() {
        return if x < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    if x == 0.0 {
        return if x.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    let sci = format!("{:.*e}", FLOAT_PRECISION - 1, x);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    if exp < -4 || exp >= FLOAT_PRECISION as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", strip_fraction_zeros(mantissa), exp.unsigned_abs())
    } else {
        let decimals = (FLOAT_PRECISION as i32 - 1 - exp) as usize;
        strip_fraction_zeros(&format!("{x:.decimals$}")).to_string()
    }
}

fn strip_fraction_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn looks_like_int(s: &str) -> bool {
    s.bytes().all(|b| b == b'-' || b.is_ascii_digit())
}

pub fn tostring(heap: &mut Heap, v: &Value, loc: SrcLoc<'_>) -> Result<LuaStr, RuntimeError> {
    match v {
        Value::Int(i) => {
            let mut buf = itoa::Buffer::new();
            Ok(heap.new_str(buf.format(*i).as_bytes()))
        }
        Value::Float(f) => {
            let mut text = format_float_g(*f);
            if looks_like_int(&text) {
                text.push_str(".0");
            }
            Ok(heap.new_str(text.as_bytes()))
        }
        Value::Str(s) => Ok(s.clone()),
        Value::Bool(b) => {
            let text: &[u8] = if *b { b"true" } else { b"false" };
            Ok(heap.new_str(text))
        }
        _ => Err(RuntimeError::new(
            ErrorKind::ToStringUnsupported {
                type_name: type_name(v),
            },
            loc,
        )),
    }
}

/// Raw bytes to stdout, no newline.
pub fn io_write(s: &LuaStr) -> io::Result<()> {
    let mut out = io::stdout().lock();
    out.write_all(s.as_bytes())?;
    out.flush()
}
