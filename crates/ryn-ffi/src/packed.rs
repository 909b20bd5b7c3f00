//! Type-erased functions and the typed call layer on top of them.
//!
//! The untyped body signature is the whole calling convention: read any
//! subset of the arguments, write at most one result into the slot. The
//! typed [`PackedFn::call`] lowers a tuple of strongly-typed arguments
//! into the wire arrays on the caller's stack, left to right, with no
//! allocation for POD values and borrowed pointers for everything else.

use core::ffi::c_void;
use std::sync::Arc;

use ryn_abi::{rn_array, rn_bytes, rn_dtype, rn_value};

use crate::args::{ArgValue, Args};
use crate::module::Module;
use crate::node::NodeRef;
use crate::ret::RetValue;
use crate::tag::Tag;
use crate::trap::{trap, TrapCode};

pub type FnBody = Arc<dyn Fn(Args<'_>, &mut RetValue)>;

/// A type-erased function. Cheap to clone; a default-constructed one is
/// null and must be detected with [`PackedFn::is_null`], never by calling.
#[derive(Clone, Default)]
pub struct PackedFn {
    body: Option<FnBody>,
}

impl PackedFn {
    pub fn new(body: impl Fn(Args<'_>, &mut RetValue) + 'static) -> PackedFn {
        PackedFn {
            body: Some(Arc::new(body)),
        }
    }

    pub const fn null() -> PackedFn {
        PackedFn { body: None }
    }

    pub fn is_null(&self) -> bool {
        self.body.is_none()
    }

    pub fn body(&self) -> Option<&FnBody> {
        self.body.as_ref()
    }

    /// Call in packed format, forwarding the arguments untouched.
    pub fn call_packed(&self, args: Args<'_>, rv: &mut RetValue) {
        match &self.body {
            Some(f) => f(args, rv),
            None => trap(TrapCode::NullCall, "call on null packed function"),
        }
    }

    /// Call with unpacked arguments. The tuple is packed into stack arrays
    /// sized to its arity; the returned slot converts to the concrete
    /// result type through its accessors.
    ///
    /// ```
    /// use ryn_ffi::{PackedFn, RetValue};
    ///
    /// let add = PackedFn::new(|args, rv: &mut RetValue| {
    ///     rv.set(args.get(0).as_i64() + args.get(1).as_i64());
    /// });
    /// assert_eq!(add.call((2i64, 3i64)).as_i64(), 5);
    /// ```
    pub fn call<A: PackArgs>(&self, args: A) -> RetValue {
        args.invoke(self)
    }
}

/// One argument's lowering into a wire slot. `fill` stores the payload and
/// returns the tag; for the borrowed kinds the stored pointer aims at
/// `self`, so the packed value must not outlive it.
pub trait PackArg {
    fn fill(&self, slot: &mut rn_value) -> i32;
}

macro_rules! impl_pack_int {
    ($($t:ty),*) => {
        $(
            impl PackArg for $t {
                fn fill(&self, slot: &mut rn_value) -> i32 {
                    slot.v_int64 = *self as i64;
                    Tag::Int.raw()
                }
            }
        )*
    };
}

impl_pack_int!(i8, i16, i32, i64, u8, u16, u32);

impl PackArg for u64 {
    fn fill(&self, slot: &mut rn_value) -> i32 {
        if *self > i64::MAX as u64 {
            trap(
                TrapCode::RangeCheck,
                &format!("uint64 argument {} exceeds the signed slot", self),
            );
        }
        slot.v_int64 = *self as i64;
        Tag::Int.raw()
    }
}

impl PackArg for bool {
    fn fill(&self, slot: &mut rn_value) -> i32 {
        slot.v_int64 = i64::from(*self);
        Tag::Int.raw()
    }
}

impl PackArg for f64 {
    fn fill(&self, slot: &mut rn_value) -> i32 {
        slot.v_float64 = *self;
        Tag::Float.raw()
    }
}

impl PackArg for f32 {
    fn fill(&self, slot: &mut rn_value) -> i32 {
        slot.v_float64 = f64::from(*self);
        Tag::Float.raw()
    }
}

impl PackArg for () {
    fn fill(&self, slot: &mut rn_value) -> i32 {
        slot.v_handle = core::ptr::null_mut();
        Tag::Null.raw()
    }
}

impl PackArg for *mut c_void {
    fn fill(&self, slot: &mut rn_value) -> i32 {
        slot.v_handle = *self;
        Tag::Handle.raw()
    }
}

impl PackArg for *mut rn_array {
    fn fill(&self, slot: &mut rn_value) -> i32 {
        slot.v_handle = (*self).cast();
        Tag::ArrayHandle.raw()
    }
}

impl PackArg for rn_dtype {
    fn fill(&self, slot: &mut rn_value) -> i32 {
        slot.v_dtype = *self;
        Tag::Dtype.raw()
    }
}

// The borrowed kinds: the slot points into the caller-owned argument
// object, which lives in the call frame for the whole invocation.

impl PackArg for String {
    fn fill(&self, slot: &mut rn_value) -> i32 {
        slot.v_handle = (self as *const String as *mut String).cast();
        Tag::Str.raw()
    }
}

impl PackArg for PackedFn {
    fn fill(&self, slot: &mut rn_value) -> i32 {
        slot.v_handle = (self as *const PackedFn as *mut PackedFn).cast();
        Tag::FuncHandle.raw()
    }
}

impl PackArg for Module {
    fn fill(&self, slot: &mut rn_value) -> i32 {
        slot.v_handle = (self as *const Module as *mut Module).cast();
        Tag::ModuleHandle.raw()
    }
}

impl PackArg for NodeRef {
    fn fill(&self, slot: &mut rn_value) -> i32 {
        slot.v_handle = (self as *const NodeRef as *mut NodeRef).cast();
        Tag::NodeHandle.raw()
    }
}

impl PackArg for rn_bytes {
    fn fill(&self, slot: &mut rn_value) -> i32 {
        slot.v_handle = (self as *const rn_bytes as *mut rn_bytes).cast();
        Tag::Bytes.raw()
    }
}

/// Re-pack an argument view verbatim.
impl PackArg for ArgValue<'_> {
    fn fill(&self, slot: &mut rn_value) -> i32 {
        *slot = self.raw_value();
        self.tag().raw()
    }
}

/// Forward a return slot as an argument. A string payload is passed as a
/// borrowed pointer to the boxed string; everything else is its wire pair.
impl PackArg for RetValue {
    fn fill(&self, slot: &mut rn_value) -> i32 {
        let (value, tag) = self.raw_parts();
        *slot = value;
        tag.raw()
    }
}

impl<T: PackArg> PackArg for &T {
    fn fill(&self, slot: &mut rn_value) -> i32 {
        <T as PackArg>::fill(*self, slot)
    }
}

/// A tuple of arguments that can be lowered into one packed call.
pub trait PackArgs {
    fn invoke(&self, f: &PackedFn) -> RetValue;
}

macro_rules! impl_pack_args {
    ($n:literal; $($T:ident : $idx:tt),*) => {
        impl<$($T: PackArg),*> PackArgs for ($($T,)*) {
            fn invoke(&self, f: &PackedFn) -> RetValue {
                let mut values = [rn_value::zeroed(); $n];
                let mut tags = [0i32; $n];
                $(
                    tags[$idx] = self.$idx.fill(&mut values[$idx]);
                )*
                let mut rv = RetValue::default();
                f.call_packed(Args::new(&values, &tags), &mut rv);
                rv
            }
        }
    };
}

impl PackArgs for () {
    fn invoke(&self, f: &PackedFn) -> RetValue {
        let mut rv = RetValue::default();
        f.call_packed(Args::new(&[], &[]), &mut rv);
        rv
    }
}

impl_pack_args!(1; A: 0);
impl_pack_args!(2; A: 0, B: 1);
impl_pack_args!(3; A: 0, B: 1, C: 2);
impl_pack_args!(4; A: 0, B: 1, C: 2, D: 3);
impl_pack_args!(5; A: 0, B: 1, C: 2, D: 3, E: 4);
impl_pack_args!(6; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_pack_args!(7; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_pack_args!(8; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);

/// One argument's typed read-out, the inverse of [`PackArg`].
pub trait UnpackArg: Sized {
    fn unpack(a: ArgValue<'_>) -> Self;
}

macro_rules! impl_unpack {
    ($($t:ty => $m:ident),*) => {
        $(
            impl UnpackArg for $t {
                fn unpack(a: ArgValue<'_>) -> $t {
                    a.$m()
                }
            }
        )*
    };
}

impl_unpack!(
    i64 => as_i64,
    u64 => as_u64,
    i32 => as_i32,
    bool => as_bool,
    f64 => as_f64,
    String => as_string,
    rn_dtype => as_dtype,
    PackedFn => as_fn,
    Module => as_module,
    NodeRef => as_node_ref
);

/// Read a whole argument list into a tuple of concrete types, in order.
pub trait UnpackArgs: Sized {
    fn unpack(args: Args<'_>) -> Self;
}

macro_rules! impl_unpack_args {
    ($($T:ident : $idx:tt),*) => {
        impl<$($T: UnpackArg),*> UnpackArgs for ($($T,)*) {
            fn unpack(args: Args<'_>) -> Self {
                ($($T::unpack(args.get($idx)),)*)
            }
        }
    };
}

impl_unpack_args!(A: 0);
impl_unpack_args!(A: 0, B: 1);
impl_unpack_args!(A: 0, B: 1, C: 2);
impl_unpack_args!(A: 0, B: 1, C: 2, D: 3);
impl_unpack_args!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_unpack_args!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_fn_is_detectable_without_calling() {
        let f = PackedFn::null();
        assert!(f.is_null());
        assert!(PackedFn::default().is_null());
        let g = PackedFn::new(|_, _| {});
        assert!(!g.is_null());
    }

    #[test]
    #[should_panic(expected = "call on null packed function")]
    fn calling_a_null_fn_traps() {
        PackedFn::null().call(());
    }

    #[test]
    fn body_writing_nothing_leaves_null() {
        let f = PackedFn::new(|_, _| {});
        let rv = f.call((1i64,));
        assert_eq!(rv.tag(), Tag::Null);
    }

    #[test]
    fn unpack_tuple_reads_in_order() {
        let f = PackedFn::new(|args, rv: &mut RetValue| {
            let (a, b, keep): (i64, f64, bool) = UnpackArgs::unpack(args);
            rv.set(if keep { a as f64 + b } else { 0.0 });
        });
        assert_eq!(f.call((4i64, 0.5f64, true)).as_f64(), 4.5);
    }
}
