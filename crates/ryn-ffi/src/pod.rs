//! POD reads shared between the borrowed view and the owning slot.
//!
//! Every reader validates the tag first; the union access after a passed
//! check is sound because the writer that stored the tag stored the
//! matching arm in the same operation.

use core::ffi::c_void;

use ryn_abi::{rn_array, rn_value};

use crate::tag::{check_tag, Tag};
use crate::trap::{trap, TrapCode};

pub(crate) fn read_i64(value: &rn_value, tag: Tag) -> i64 {
    check_tag(tag, Tag::Int);
    unsafe { value.v_int64 }
}

pub(crate) fn read_u64(value: &rn_value, tag: Tag) -> u64 {
    check_tag(tag, Tag::Int);
    unsafe { value.v_int64 as u64 }
}

/// Narrowing read. The check is against the target's max only; a negative
/// in-range value narrows by cast.
pub(crate) fn read_narrow(value: &rn_value, tag: Tag, max: i64, target: &str) -> i64 {
    let v = read_i64(value, tag);
    if v > max {
        trap(
            TrapCode::RangeCheck,
            &format!("value {} out of range for {}", v, target),
        );
    }
    v
}

pub(crate) fn read_bool(value: &rn_value, tag: Tag) -> bool {
    read_i64(value, tag) != 0
}

pub(crate) fn read_f64(value: &rn_value, tag: Tag) -> f64 {
    check_tag(tag, Tag::Float);
    unsafe { value.v_float64 }
}

pub(crate) fn read_handle(value: &rn_value, tag: Tag) -> *mut c_void {
    if tag == Tag::Null {
        return core::ptr::null_mut();
    }
    if tag == Tag::ArrayHandle {
        return unsafe { value.v_handle };
    }
    check_tag(tag, Tag::Handle);
    unsafe { value.v_handle }
}

pub(crate) fn read_array(value: &rn_value, tag: Tag) -> *mut rn_array {
    if tag == Tag::Null {
        return core::ptr::null_mut();
    }
    check_tag(tag, Tag::ArrayHandle);
    unsafe { value.v_handle.cast() }
}
