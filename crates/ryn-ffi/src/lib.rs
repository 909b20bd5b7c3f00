//! Packed calling convention for the runtime boundary.
//!
//! Values of many concrete types cross one uniform call signature as
//! tagged slots: compiled artifacts, host bindings, and the runtime core
//! all talk to each other through [`PackedFn`]. A body reads its inputs
//! through [`Args`] views and writes at most one result into a
//! [`RetValue`]; the typed [`PackedFn::call`] packs a strongly-typed
//! argument tuple into the wire arrays and hands the result slot back.
//!
//! All checks in this crate are fatal-by-default local checks routed
//! through [`trap`]; there is no recoverable error channel at this layer.

#![allow(clippy::missing_safety_doc)]

pub mod args;
pub mod dtype;
pub mod module;
pub mod node;
pub mod packed;
mod pod;
pub mod ret;
pub mod tag;
pub mod trap;

pub use args::{ArgValue, Args};
pub use dtype::{dtype_format, dtype_new, dtype_parse, dtype_try_parse};
pub use module::Module;
pub use node::{FromNodeRef, NodeRef};
pub use packed::{PackArg, PackArgs, PackedFn, UnpackArg, UnpackArgs};
pub use ret::{IntoRet, RetValue};
pub use tag::Tag;
pub use trap::{trap, TrapCode};

pub use ryn_abi as abi;
