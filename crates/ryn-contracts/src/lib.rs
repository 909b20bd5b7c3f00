//! Shared, version-pinned protocol identifiers.
//!
//! These constants are the single source of truth for schema/version strings
//! that appear in machine-readable I/O.

pub const RYN_ABI_VERSION: &str = "ryn.abi@0.1.0";

pub const RYN_DTYPE_REPORT_SCHEMA_VERSION: &str = "ryn.dtype.report@0.1.0";
pub const RYN_SELFCHECK_REPORT_SCHEMA_VERSION: &str = "ryn.selfcheck.report@0.1.0";
