//! The single fatal-check primitive.
//!
//! Every check in the dispatch layer funnels through [`trap`]. A trap is a
//! synchronous, local defect report, not a recoverable error channel: it
//! unwinds with a `trap NNNN:`-prefixed panic so an embedding boundary can
//! catch at the edge and turn it into its own error propagation.

/// Defect categories, each with a stable numeric code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrapCode {
    /// A conversion was requested against a slot whose tag does not
    /// support it.
    TypeMismatch,
    /// A 64-bit integer does not fit the requested narrow target.
    RangeCheck,
    /// Argument-list index past the argument count.
    BoundsCheck,
    /// Unrecognized element-type descriptor text.
    DtypeParse,
    /// A string-valued return slot cannot cross the raw boundary.
    InvalidTransfer,
    /// Invocation of a null packed function.
    NullCall,
    /// An unrecognized tag reached the registry; indicates corruption.
    Corrupt,
}

impl TrapCode {
    pub const fn code(self) -> i32 {
        match self {
            TrapCode::TypeMismatch => 9201,
            TrapCode::RangeCheck => 9202,
            TrapCode::BoundsCheck => 9203,
            TrapCode::DtypeParse => 9204,
            TrapCode::InvalidTransfer => 9205,
            TrapCode::NullCall => 9206,
            TrapCode::Corrupt => 9207,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            TrapCode::TypeMismatch => "type-mismatch",
            TrapCode::RangeCheck => "range-check",
            TrapCode::BoundsCheck => "bounds-check",
            TrapCode::DtypeParse => "dtype-parse",
            TrapCode::InvalidTransfer => "invalid-transfer",
            TrapCode::NullCall => "null-call",
            TrapCode::Corrupt => "corrupt",
        }
    }
}

/// Report a defect and unwind. Must not return.
#[cold]
pub fn trap(code: TrapCode, msg: &str) -> ! {
    panic!("trap {} ({}): {}", code.code(), code.as_str(), msg);
}
