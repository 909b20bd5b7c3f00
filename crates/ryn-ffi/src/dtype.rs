//! Textual form of element-type descriptors.
//!
//! Grammar: `("int" | "uint" | "float" | "handle") [bits] ["x" lanes]`.
//! Absent numbers keep the defaults (bits = 32, lanes = 1); `handle`
//! defaults to 64 bits and prints no bit suffix.

use ryn_abi::{rn_dtype, RN_DTYPE_FLOAT, RN_DTYPE_HANDLE, RN_DTYPE_INT, RN_DTYPE_UINT};

use crate::tag::Tag;
use crate::trap::{trap, TrapCode};

pub fn dtype_new(code: u8, bits: u8, lanes: u16) -> rn_dtype {
    rn_dtype { code, bits, lanes }
}

/// Leading decimal run of `s`, if any, plus the rest.
fn scan_digits(s: &str) -> Result<(Option<u32>, &str), String> {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    if end == 0 {
        return Ok((None, s));
    }
    match s[..end].parse::<u32>() {
        Ok(n) => Ok((Some(n), &s[end..])),
        Err(_) => Err(format!("bad number in type suffix {}", s)),
    }
}

/// Parse the canonical text form. Unknown prefixes are fatal.
pub fn dtype_parse(s: &str) -> rn_dtype {
    match dtype_try_parse(s) {
        Ok(t) => t,
        Err(msg) => trap(TrapCode::DtypeParse, &msg),
    }
}

/// Non-trapping variant for boundaries that report instead of unwinding.
pub fn dtype_try_parse(s: &str) -> Result<rn_dtype, String> {
    // `uint` must be tested before `int`: the prefix checks are anchored to
    // the full prefix length.
    let (code, default_bits, rest) = if let Some(r) = s.strip_prefix("uint") {
        (RN_DTYPE_UINT, 32u8, r)
    } else if let Some(r) = s.strip_prefix("int") {
        (RN_DTYPE_INT, 32u8, r)
    } else if let Some(r) = s.strip_prefix("float") {
        (RN_DTYPE_FLOAT, 32u8, r)
    } else if let Some(r) = s.strip_prefix("handle") {
        // Handles are 64 bit unless told otherwise.
        (RN_DTYPE_HANDLE, 64u8, r)
    } else {
        return Err(format!("unknown type {}", s));
    };
    let mut bits = default_bits;
    let mut lanes: u16 = 1;
    let (first, rest) = scan_digits(rest)?;
    if let Some(b) = first {
        bits = b as u8;
        if let Some(tail) = rest.strip_prefix('x') {
            let (second, _) = scan_digits(tail)?;
            if let Some(l) = second {
                lanes = l as u16;
            }
        }
    }
    Ok(rn_dtype { code, bits, lanes })
}

/// Canonical text form. The lane suffix is printed only for vector types.
pub fn dtype_format(t: rn_dtype) -> String {
    let mut s = String::from(Tag::from_raw(i32::from(t.code)).name());
    if t.code == RN_DTYPE_HANDLE {
        return s;
    }
    s.push_str(&t.bits.to_string());
    if t.lanes != 1 {
        s.push('x');
        s.push_str(&t.lanes.to_string());
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults() {
        assert_eq!(dtype_parse("int"), dtype_new(RN_DTYPE_INT, 32, 1));
        assert_eq!(dtype_parse("uint"), dtype_new(RN_DTYPE_UINT, 32, 1));
        assert_eq!(dtype_parse("float"), dtype_new(RN_DTYPE_FLOAT, 32, 1));
        assert_eq!(dtype_parse("handle"), dtype_new(RN_DTYPE_HANDLE, 64, 1));
    }

    #[test]
    fn parse_bits_and_lanes() {
        assert_eq!(dtype_parse("int8"), dtype_new(RN_DTYPE_INT, 8, 1));
        assert_eq!(dtype_parse("uint1"), dtype_new(RN_DTYPE_UINT, 1, 1));
        assert_eq!(dtype_parse("float32x4"), dtype_new(RN_DTYPE_FLOAT, 32, 4));
        assert_eq!(dtype_parse("int64x8"), dtype_new(RN_DTYPE_INT, 64, 8));
    }

    #[test]
    fn uint_is_not_parsed_as_int() {
        assert_eq!(dtype_parse("uint16").code, RN_DTYPE_UINT);
    }

    #[test]
    fn lanes_need_a_leading_bit_width() {
        // No bit width means the lane suffix is not scanned either.
        assert_eq!(dtype_parse("intx4"), dtype_new(RN_DTYPE_INT, 32, 1));
        assert_eq!(dtype_parse("int8x"), dtype_new(RN_DTYPE_INT, 8, 1));
    }

    #[test]
    fn format_forms() {
        assert_eq!(dtype_format(dtype_new(RN_DTYPE_FLOAT, 32, 4)), "float32x4");
        assert_eq!(dtype_format(dtype_new(RN_DTYPE_INT, 32, 1)), "int32");
        assert_eq!(dtype_format(dtype_new(RN_DTYPE_HANDLE, 64, 1)), "handle");
        // Handle drops the bit suffix no matter what is stored.
        assert_eq!(dtype_format(dtype_new(RN_DTYPE_HANDLE, 32, 1)), "handle");
    }

    #[test]
    #[should_panic(expected = "unknown type bool")]
    fn unknown_prefix_traps() {
        dtype_parse("bool");
    }

    #[test]
    fn try_parse_reports_instead_of_trapping() {
        assert!(dtype_try_parse("float64").is_ok());
        assert!(dtype_try_parse("complex64").is_err());
    }
}
