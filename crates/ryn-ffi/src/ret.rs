//! The owning return slot.
//!
//! Unlike the argument view, a `RetValue` owns heap storage for the
//! handle-family payloads. The tag and the stored arm change together in
//! one operation, and `clear` releases exactly the box matching the
//! current tag before forcing the tag back to `Null`, so a payload can
//! never be released twice.

use core::ffi::c_void;

use ryn_abi::{rn_array, rn_dtype, rn_value};

use crate::args::ArgValue;
use crate::dtype::{dtype_format, dtype_parse};
use crate::module::Module;
use crate::node::NodeRef;
use crate::packed::PackedFn;
use crate::pod;
use crate::tag::{check_tag, Tag};
use crate::trap::{trap, TrapCode};

pub struct RetValue {
    value: rn_value,
    tag: Tag,
}

impl Default for RetValue {
    fn default() -> RetValue {
        RetValue {
            value: rn_value::zeroed(),
            tag: Tag::Null,
        }
    }
}

impl Drop for RetValue {
    fn drop(&mut self) {
        self.clear();
    }
}

impl RetValue {
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Store a value, releasing or reusing the previous payload as the tag
    /// dictates.
    pub fn set<T: IntoRet>(&mut self, v: T) {
        v.store(self);
    }

    /// Release the payload box matching the current tag, exactly once,
    /// then force the tag to `Null`. No-op when already `Null`.
    pub fn clear(&mut self) {
        match self.tag {
            Tag::Str => unsafe {
                drop(Box::from_raw(self.value.v_handle as *mut String));
            },
            Tag::FuncHandle => unsafe {
                drop(Box::from_raw(self.value.v_handle as *mut PackedFn));
            },
            Tag::ModuleHandle => unsafe {
                drop(Box::from_raw(self.value.v_handle as *mut Module));
            },
            Tag::NodeHandle => unsafe {
                drop(Box::from_raw(self.value.v_handle as *mut NodeRef));
            },
            _ => {}
        }
        self.tag = Tag::Null;
    }

    /// Move the payload out, leaving this slot `Null`. The moved-from slot
    /// releases nothing afterwards.
    pub fn take(&mut self) -> RetValue {
        core::mem::take(self)
    }

    /// Hand the payload and tag across the raw boundary, transferring any
    /// heap ownership to the receiver. Strings cannot cross this way; they
    /// need the dedicated text-transfer path.
    pub fn move_to_raw(&mut self) -> (rn_value, i32) {
        if self.tag == Tag::Str {
            trap(
                TrapCode::InvalidTransfer,
                "string return value cannot cross the raw boundary",
            );
        }
        let out = (self.value, self.tag.raw());
        self.tag = Tag::Null;
        out
    }

    /// The raw slot, for POD payloads only.
    pub fn value(&self) -> rn_value {
        if matches!(
            self.tag,
            Tag::Str | Tag::FuncHandle | Tag::ModuleHandle | Tag::NodeHandle
        ) {
            trap(
                TrapCode::TypeMismatch,
                "value can only be used for POD data",
            );
        }
        self.value
    }

    pub fn as_i64(&self) -> i64 {
        pod::read_i64(&self.value, self.tag)
    }

    pub fn as_u64(&self) -> u64 {
        pod::read_u64(&self.value, self.tag)
    }

    pub fn as_i32(&self) -> i32 {
        pod::read_narrow(&self.value, self.tag, i32::MAX as i64, "int32") as i32
    }

    pub fn as_bool(&self) -> bool {
        pod::read_bool(&self.value, self.tag)
    }

    pub fn as_f64(&self) -> f64 {
        pod::read_f64(&self.value, self.tag)
    }

    pub fn as_handle(&self) -> *mut c_void {
        pod::read_handle(&self.value, self.tag)
    }

    pub fn as_array(&self) -> *mut rn_array {
        pod::read_array(&self.value, self.tag)
    }

    pub fn as_string(&self) -> String {
        if self.tag == Tag::Dtype {
            return dtype_format(unsafe { self.value.v_dtype });
        }
        self.str_ref().clone()
    }

    pub fn as_dtype(&self) -> rn_dtype {
        if self.tag == Tag::Str {
            return dtype_parse(self.str_ref());
        }
        check_tag(self.tag, Tag::Dtype);
        unsafe { self.value.v_dtype }
    }

    pub fn as_fn(&self) -> PackedFn {
        check_tag(self.tag, Tag::FuncHandle);
        unsafe { &*(self.value.v_handle as *const PackedFn) }.clone()
    }

    pub fn as_module(&self) -> Module {
        check_tag(self.tag, Tag::ModuleHandle);
        unsafe { &*(self.value.v_handle as *const Module) }.clone()
    }

    pub fn as_node_ref(&self) -> NodeRef {
        check_tag(self.tag, Tag::NodeHandle);
        unsafe { &*(self.value.v_handle as *const NodeRef) }.clone()
    }

    fn str_ref(&self) -> &String {
        check_tag(self.tag, Tag::Str);
        unsafe { &*(self.value.v_handle as *const String) }
    }

    /// Wire pair for the packer. A `Str` slot is re-packed as a borrowed
    /// pointer to its boxed string rather than copied.
    pub(crate) fn raw_parts(&self) -> (rn_value, Tag) {
        (self.value, self.tag)
    }

    /// Deep copy from an argument view, dispatched on the source tag.
    pub fn assign_arg(&mut self, a: &ArgValue<'_>) {
        match a.tag() {
            Tag::Str | Tag::Bytes => {
                let s = a.as_string();
                self.switch_class::<String>(Tag::Str, s);
            }
            Tag::FuncHandle => self.switch_class::<PackedFn>(Tag::FuncHandle, a.as_fn()),
            Tag::ModuleHandle => self.switch_class::<Module>(Tag::ModuleHandle, a.as_module()),
            // The shared handle itself is copied; the extension object's
            // reference count goes up by one.
            Tag::NodeHandle => self.switch_class::<NodeRef>(Tag::NodeHandle, a.as_node_ref()),
            other => {
                self.switch_pod(other);
                self.value = a.raw_value();
            }
        }
    }

    /// Switch to a POD tag, releasing the old payload if the tag changes.
    /// The caller stores the new arm immediately after.
    fn switch_pod(&mut self, tag: Tag) {
        if self.tag != tag {
            self.clear();
            self.tag = tag;
        }
    }

    /// Switch to a boxed tag. When the tag already matches, the existing
    /// box is reused and only its payload replaced.
    fn switch_class<T>(&mut self, tag: Tag, v: T) {
        if self.tag != tag {
            self.clear();
            self.value.v_handle = Box::into_raw(Box::new(v)).cast();
            self.tag = tag;
        } else {
            unsafe {
                *(self.value.v_handle as *mut T) = v;
            }
        }
    }
}

impl Clone for RetValue {
    fn clone(&self) -> RetValue {
        let mut rv = RetValue::default();
        match self.tag {
            Tag::Str => rv.switch_class::<String>(Tag::Str, self.str_ref().clone()),
            Tag::FuncHandle => rv.switch_class::<PackedFn>(Tag::FuncHandle, self.as_fn()),
            Tag::ModuleHandle => rv.switch_class::<Module>(Tag::ModuleHandle, self.as_module()),
            Tag::NodeHandle => rv.switch_class::<NodeRef>(Tag::NodeHandle, self.as_node_ref()),
            other => {
                rv.tag = other;
                rv.value = self.value;
            }
        }
        rv
    }
}

/// Values a packed-function body can store into its return slot.
pub trait IntoRet {
    fn store(self, rv: &mut RetValue);
}

macro_rules! impl_into_ret_int {
    ($($t:ty),*) => {
        $(
            impl IntoRet for $t {
                fn store(self, rv: &mut RetValue) {
                    rv.switch_pod(Tag::Int);
                    rv.value.v_int64 = self as i64;
                }
            }
        )*
    };
}

impl_into_ret_int!(i8, i16, i32, i64, u8, u16, u32);

impl IntoRet for bool {
    fn store(self, rv: &mut RetValue) {
        rv.switch_pod(Tag::Int);
        rv.value.v_int64 = i64::from(self);
    }
}

impl IntoRet for f64 {
    fn store(self, rv: &mut RetValue) {
        rv.switch_pod(Tag::Float);
        rv.value.v_float64 = self;
    }
}

impl IntoRet for f32 {
    fn store(self, rv: &mut RetValue) {
        rv.switch_pod(Tag::Float);
        rv.value.v_float64 = f64::from(self);
    }
}

impl IntoRet for *mut c_void {
    fn store(self, rv: &mut RetValue) {
        rv.switch_pod(Tag::Handle);
        rv.value.v_handle = self;
    }
}

impl IntoRet for rn_dtype {
    fn store(self, rv: &mut RetValue) {
        rv.switch_pod(Tag::Dtype);
        rv.value.v_dtype = self;
    }
}

impl IntoRet for String {
    fn store(self, rv: &mut RetValue) {
        rv.switch_class::<String>(Tag::Str, self);
    }
}

impl IntoRet for &str {
    fn store(self, rv: &mut RetValue) {
        rv.switch_class::<String>(Tag::Str, self.to_string());
    }
}

impl IntoRet for PackedFn {
    fn store(self, rv: &mut RetValue) {
        rv.switch_class::<PackedFn>(Tag::FuncHandle, self);
    }
}

impl IntoRet for Module {
    fn store(self, rv: &mut RetValue) {
        rv.switch_class::<Module>(Tag::ModuleHandle, self);
    }
}

impl IntoRet for NodeRef {
    fn store(self, rv: &mut RetValue) {
        rv.switch_class::<NodeRef>(Tag::NodeHandle, self);
    }
}

impl IntoRet for &ArgValue<'_> {
    fn store(self, rv: &mut RetValue) {
        rv.assign_arg(self);
    }
}

macro_rules! impl_from_ret {
    ($($t:ty),*) => {
        $(
            impl From<$t> for RetValue {
                fn from(v: $t) -> RetValue {
                    let mut rv = RetValue::default();
                    rv.set(v);
                    rv
                }
            }
        )*
    };
}

impl_from_ret!(i64, f64, bool, String, &str, rn_dtype, PackedFn, Module, NodeRef);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pod_set_and_read() {
        let mut rv = RetValue::default();
        rv.set(41i64);
        assert_eq!(rv.tag(), Tag::Int);
        assert_eq!(rv.as_i64(), 41);
        rv.set(2.5f64);
        assert_eq!(rv.tag(), Tag::Float);
        assert_eq!(rv.as_f64(), 2.5);
    }

    #[test]
    fn same_tag_write_reuses_the_box() {
        let mut rv = RetValue::default();
        rv.set("first".to_string());
        let (v0, _) = rv.raw_parts();
        rv.set("second, somewhat longer".to_string());
        let (v1, _) = rv.raw_parts();
        assert_eq!(unsafe { v0.v_handle }, unsafe { v1.v_handle });
        assert_eq!(rv.as_string(), "second, somewhat longer");
    }

    #[test]
    fn cross_tag_write_replaces_the_box() {
        let mut rv = RetValue::default();
        rv.set("text".to_string());
        rv.set(7i64);
        assert_eq!(rv.tag(), Tag::Int);
        assert_eq!(rv.as_i64(), 7);
    }

    #[test]
    fn take_resets_the_source() {
        let mut rv = RetValue::default();
        rv.set("moved".to_string());
        let out = rv.take();
        assert_eq!(rv.tag(), Tag::Null);
        assert_eq!(out.as_string(), "moved");
    }

    #[test]
    fn clone_is_a_deep_copy() {
        let mut rv = RetValue::default();
        rv.set("shared?".to_string());
        let copy = rv.clone();
        let (a, _) = rv.raw_parts();
        let (b, _) = copy.raw_parts();
        assert_ne!(unsafe { a.v_handle }, unsafe { b.v_handle });
        assert_eq!(copy.as_string(), "shared?");
    }

    #[test]
    #[should_panic(expected = "value can only be used for POD data")]
    fn value_rejects_boxed_tags() {
        let mut rv = RetValue::default();
        rv.set("boxed".to_string());
        rv.value();
    }

    #[test]
    #[should_panic(expected = "expected float but get int")]
    fn wrong_pod_read_traps() {
        let mut rv = RetValue::default();
        rv.set(1i64);
        rv.as_f64();
    }
}
