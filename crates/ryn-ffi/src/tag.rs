//! The closed set of value tags.

use ryn_abi::{
    RN_TAG_ARRAY_HANDLE, RN_TAG_BYTES, RN_TAG_DTYPE, RN_TAG_FLOAT, RN_TAG_FUNC_HANDLE,
    RN_TAG_HANDLE, RN_TAG_INT, RN_TAG_MODULE_HANDLE, RN_TAG_NODE_HANDLE, RN_TAG_NULL, RN_TAG_STR,
    RN_TAG_UINT,
};

use crate::trap::{trap, TrapCode};

/// Discriminant of one value slot. Mirrors the raw `RN_TAG_*` codes
/// one-for-one; the enum exists so host-side code matches exhaustively.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tag {
    Int = RN_TAG_INT,
    UInt = RN_TAG_UINT,
    Float = RN_TAG_FLOAT,
    Handle = RN_TAG_HANDLE,
    Null = RN_TAG_NULL,
    Dtype = RN_TAG_DTYPE,
    ArrayHandle = RN_TAG_ARRAY_HANDLE,
    NodeHandle = RN_TAG_NODE_HANDLE,
    ModuleHandle = RN_TAG_MODULE_HANDLE,
    FuncHandle = RN_TAG_FUNC_HANDLE,
    Str = RN_TAG_STR,
    Bytes = RN_TAG_BYTES,
}

impl Tag {
    /// Decode a wire tag. An out-of-set code means a corrupted slot, not a
    /// caller mistake, so this is a defensive fatal check.
    pub fn from_raw(code: i32) -> Tag {
        match code {
            RN_TAG_INT => Tag::Int,
            RN_TAG_UINT => Tag::UInt,
            RN_TAG_FLOAT => Tag::Float,
            RN_TAG_HANDLE => Tag::Handle,
            RN_TAG_NULL => Tag::Null,
            RN_TAG_DTYPE => Tag::Dtype,
            RN_TAG_ARRAY_HANDLE => Tag::ArrayHandle,
            RN_TAG_NODE_HANDLE => Tag::NodeHandle,
            RN_TAG_MODULE_HANDLE => Tag::ModuleHandle,
            RN_TAG_FUNC_HANDLE => Tag::FuncHandle,
            RN_TAG_STR => Tag::Str,
            RN_TAG_BYTES => Tag::Bytes,
            _ => trap(TrapCode::Corrupt, &format!("unknown type tag {}", code)),
        }
    }

    pub const fn raw(self) -> i32 {
        self as i32
    }

    pub const fn name(self) -> &'static str {
        match self {
            Tag::Int => "int",
            Tag::UInt => "uint",
            Tag::Float => "float",
            Tag::Handle => "handle",
            Tag::Null => "NULL",
            Tag::Dtype => "dtype",
            Tag::ArrayHandle => "ArrayHandle",
            Tag::NodeHandle => "NodeHandle",
            Tag::ModuleHandle => "ModuleHandle",
            Tag::FuncHandle => "FunctionHandle",
            Tag::Str => "str",
            Tag::Bytes => "bytes",
        }
    }
}

/// Shared tag guard: every typed read goes through this check.
pub(crate) fn check_tag(got: Tag, want: Tag) {
    if got != want {
        trap(
            TrapCode::TypeMismatch,
            &format!("expected {} but get {}", want.name(), got.name()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_codes_round_trip() {
        for code in 0..=11 {
            assert_eq!(Tag::from_raw(code).raw(), code);
        }
    }

    #[test]
    #[should_panic(expected = "unknown type tag 99")]
    fn unknown_tag_traps() {
        Tag::from_raw(99);
    }

    #[test]
    #[should_panic(expected = "expected int but get float")]
    fn mismatch_names_both_sides() {
        check_tag(Tag::Float, Tag::Int);
    }
}
