//! Raw ABI layout for the packed calling convention.
//!
//! One argument or return slot on the wire is an `rn_value` paired with an
//! `i32` tag from the `RN_TAG_*` set. The tag alone decides which union
//! member is valid and whether the payload is heap-owned; these definitions
//! are shared verbatim between compiled artifacts, host bindings, and the
//! runtime core, so layout changes here are ABI breaks.

#![allow(non_camel_case_types)]

use core::ffi::c_void;

// Tag codes. POD tags store their payload inline in `rn_value`; the
// handle-family tags store a pointer whose ownership depends on which side
// of the boundary holds it.
pub const RN_TAG_INT: i32 = 0;
pub const RN_TAG_UINT: i32 = 1; // stored in the int64 arm
pub const RN_TAG_FLOAT: i32 = 2;
pub const RN_TAG_HANDLE: i32 = 3;
pub const RN_TAG_NULL: i32 = 4;
pub const RN_TAG_DTYPE: i32 = 5;
pub const RN_TAG_ARRAY_HANDLE: i32 = 6;
pub const RN_TAG_NODE_HANDLE: i32 = 7;
pub const RN_TAG_MODULE_HANDLE: i32 = 8;
pub const RN_TAG_FUNC_HANDLE: i32 = 9;
pub const RN_TAG_STR: i32 = 10;
pub const RN_TAG_BYTES: i32 = 11;

// Element kind codes for `rn_dtype.code`.
pub const RN_DTYPE_INT: u8 = 0;
pub const RN_DTYPE_UINT: u8 = 1;
pub const RN_DTYPE_FLOAT: u8 = 2;
pub const RN_DTYPE_HANDLE: u8 = 3;

/// Element-type descriptor: kind, bit width, vector lane count.
///
/// Serialized textually as `<name><bits>[x<lanes>]` (e.g. `float32x4`);
/// `handle` carries no bit suffix and defaults to 64 bits.
#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct rn_dtype {
    pub code: u8,
    pub bits: u8,
    pub lanes: u16,
}

/// Fixed-size value slot. Which arm is valid is decided solely by the tag
/// travelling next to it.
#[repr(C)]
#[derive(Copy, Clone)]
pub union rn_value {
    pub v_int64: i64,
    pub v_float64: f64,
    pub v_handle: *mut c_void,
    pub v_dtype: rn_dtype,
}

impl rn_value {
    /// All-zero slot, the payload paired with `RN_TAG_NULL`.
    pub const fn zeroed() -> rn_value {
        rn_value { v_int64: 0 }
    }
}

/// Immutable length-prefixed byte buffer. Passed by pointer under
/// `RN_TAG_BYTES`; never owned by a slot.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct rn_bytes {
    pub data: *const u8,
    pub len: usize,
}

impl rn_bytes {
    pub fn from_slice(s: &[u8]) -> rn_bytes {
        rn_bytes {
            data: s.as_ptr(),
            len: s.len(),
        }
    }

    /// View the buffer as a slice.
    ///
    /// # Safety
    /// `data` must point to `len` readable bytes for the returned lifetime.
    pub unsafe fn as_slice<'a>(&self) -> &'a [u8] {
        core::slice::from_raw_parts(self.data, self.len)
    }
}

/// Opaque tensor descriptor. Only ever passed by pointer, under
/// `RN_TAG_ARRAY_HANDLE`; the dispatch layer never inspects it.
#[repr(C)]
pub struct rn_array {
    _private: [u8; 0],
}
