//! Caller-owned argument lists and the borrowed views over their slots.

use core::ffi::c_void;
use core::marker::PhantomData;

use ryn_abi::{rn_array, rn_bytes, rn_dtype, rn_value};

use crate::dtype::{dtype_format, dtype_parse};
use crate::module::Module;
use crate::node::{FromNodeRef, NodeRef};
use crate::packed::PackedFn;
use crate::pod;
use crate::tag::{check_tag, Tag};
use crate::trap::{trap, TrapCode};

/// Arguments into a packed function: parallel value and tag arrays, both
/// borrowed from the caller's frame. Never owns anything.
#[derive(Clone, Copy)]
pub struct Args<'a> {
    values: &'a [rn_value],
    tags: &'a [i32],
}

impl<'a> Args<'a> {
    /// The two slices must be the same length, and each tag must describe
    /// the arm stored in the matching value slot.
    pub fn new(values: &'a [rn_value], tags: &'a [i32]) -> Args<'a> {
        debug_assert_eq!(values.len(), tags.len());
        Args { values, tags }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Borrow the i-th argument. Indexing past the count is fatal.
    pub fn get(&self, i: usize) -> ArgValue<'a> {
        if i >= self.values.len() {
            trap(
                TrapCode::BoundsCheck,
                &format!(
                    "not enough argument passed, {} passed but request arg[{}]",
                    self.values.len(),
                    i
                ),
            );
        }
        ArgValue::new(self.values[i], self.tags[i])
    }
}

/// Read-only typed accessor over one argument slot. Copies POD payloads
/// out and clones boxed payloads; never takes ownership of either.
#[derive(Clone, Copy)]
pub struct ArgValue<'a> {
    value: rn_value,
    tag: Tag,
    _frame: PhantomData<&'a rn_value>,
}

impl<'a> ArgValue<'a> {
    pub fn new(value: rn_value, raw_tag: i32) -> ArgValue<'a> {
        ArgValue {
            value,
            tag: Tag::from_raw(raw_tag),
            _frame: PhantomData,
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// The wire pair, for re-packing into another call.
    pub fn raw_value(&self) -> rn_value {
        self.value
    }

    pub fn as_i64(&self) -> i64 {
        pod::read_i64(&self.value, self.tag)
    }

    /// The unsigned read shares the signed 64-bit slot; see the packer's
    /// guard for the other half of the contract.
    pub fn as_u64(&self) -> u64 {
        pod::read_u64(&self.value, self.tag)
    }

    pub fn as_i32(&self) -> i32 {
        pod::read_narrow(&self.value, self.tag, i32::MAX as i64, "int32") as i32
    }

    pub fn as_i16(&self) -> i16 {
        pod::read_narrow(&self.value, self.tag, i16::MAX as i64, "int16") as i16
    }

    pub fn as_i8(&self) -> i8 {
        pod::read_narrow(&self.value, self.tag, i8::MAX as i64, "int8") as i8
    }

    pub fn as_bool(&self) -> bool {
        pod::read_bool(&self.value, self.tag)
    }

    pub fn as_f64(&self) -> f64 {
        pod::read_f64(&self.value, self.tag)
    }

    pub fn as_f32(&self) -> f32 {
        pod::read_f64(&self.value, self.tag) as f32
    }

    pub fn as_handle(&self) -> *mut c_void {
        pod::read_handle(&self.value, self.tag)
    }

    pub fn as_array(&self) -> *mut rn_array {
        pod::read_array(&self.value, self.tag)
    }

    pub fn as_string(&self) -> String {
        match self.tag {
            Tag::Dtype => dtype_format(unsafe { self.value.v_dtype }),
            Tag::Bytes => {
                let bytes = unsafe { &*(self.value.v_handle as *const rn_bytes) };
                match String::from_utf8(unsafe { bytes.as_slice() }.to_vec()) {
                    Ok(s) => s,
                    Err(_) => trap(TrapCode::Corrupt, "byte buffer is not valid utf-8"),
                }
            }
            _ => {
                check_tag(self.tag, Tag::Str);
                unsafe { &*(self.value.v_handle as *const String) }.clone()
            }
        }
    }

    pub fn as_dtype(&self) -> rn_dtype {
        if self.tag == Tag::Str {
            return dtype_parse(&self.as_string());
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

    /// Clone the shared extension handle out of the slot.
    pub fn as_node_ref(&self) -> NodeRef {
        check_tag(self.tag, Tag::NodeHandle);
        unsafe { &*(self.value.v_handle as *const NodeRef) }.clone()
    }

    /// Whether the slot holds a node whose payload is a `T`.
    pub fn is_node<T: 'static>(&self) -> bool {
        self.tag == Tag::NodeHandle
            && unsafe { &*(self.value.v_handle as *const NodeRef) }.is::<T>()
    }

    /// Convert through the externally-registered node conversion.
    pub fn as_node<T: FromNodeRef>(&self) -> T {
        check_tag(self.tag, Tag::NodeHandle);
        T::from_node_ref(unsafe { &*(self.value.v_handle as *const NodeRef) })
    }
}
