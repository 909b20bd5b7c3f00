use std::panic::{catch_unwind, AssertUnwindSafe};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use ryn_contracts::{
    RYN_ABI_VERSION, RYN_DTYPE_REPORT_SCHEMA_VERSION, RYN_SELFCHECK_REPORT_SCHEMA_VERSION,
};
use ryn_ffi::abi::{
    rn_value, RN_DTYPE_FLOAT, RN_DTYPE_HANDLE, RN_DTYPE_INT, RN_DTYPE_UINT,
};
use ryn_ffi::{
    dtype_format, dtype_new, dtype_parse, dtype_try_parse, Args, NodeRef, PackedFn, RetValue, Tag,
};

#[derive(Parser, Debug)]
#[command(name = "ryn")]
#[command(about = "Ryn runtime boundary utilities.", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Parse and normalize element-type descriptors.
    Dtype(DtypeArgs),
    /// Run the packed-call dispatch smoke suite.
    Selfcheck(SelfcheckArgs),
}

#[derive(clap::Args, Debug)]
struct DtypeArgs {
    /// Descriptor text, e.g. `float32x4`.
    #[arg(value_name = "TYPE", required = true)]
    specs: Vec<String>,

    /// Pretty-print the JSON report.
    #[arg(long)]
    pretty: bool,
}

#[derive(clap::Args, Debug)]
struct SelfcheckArgs {
    /// Pretty-print the JSON report.
    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
struct DtypeReport {
    schema: &'static str,
    abi: &'static str,
    ok: bool,
    entries: Vec<DtypeEntry>,
}

#[derive(Serialize)]
struct DtypeEntry {
    spec: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    canonical: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bits: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lanes: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct SelfcheckReport {
    schema: &'static str,
    abi: &'static str,
    ok: bool,
    checks: Vec<CheckResult>,
}

#[derive(Serialize)]
struct CheckResult {
    id: &'static str,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Dtype(args) => run_dtype(&args),
        Command::Selfcheck(args) => run_selfcheck(&args),
    }
}

fn emit<T: Serialize>(report: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    }
    .context("serialize report")?;
    println!("{}", text);
    Ok(())
}

fn run_dtype(args: &DtypeArgs) -> Result<()> {
    let entries: Vec<DtypeEntry> = args
        .specs
        .iter()
        .map(|spec| match dtype_try_parse(spec) {
            Ok(d) => DtypeEntry {
                spec: spec.clone(),
                ok: true,
                canonical: Some(dtype_format(d)),
                kind: Some(Tag::from_raw(i32::from(d.code)).name()),
                bits: Some(d.bits),
                lanes: Some(d.lanes),
                error: None,
            },
            Err(msg) => DtypeEntry {
                spec: spec.clone(),
                ok: false,
                canonical: None,
                kind: None,
                bits: None,
                lanes: None,
                error: Some(msg),
            },
        })
        .collect();
    let ok = entries.iter().all(|e| e.ok);
    emit(
        &DtypeReport {
            schema: RYN_DTYPE_REPORT_SCHEMA_VERSION,
            abi: RYN_ABI_VERSION,
            ok,
            entries,
        },
        args.pretty,
    )?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn run_selfcheck(args: &SelfcheckArgs) -> Result<()> {
    let checks = vec![
        check_dtype_roundtrip(),
        check_pod_sum(),
        check_string_result(),
        check_string_transfer_refused(),
        check_bounds_trap(),
        check_narrow_trap(),
        check_ownership_transfer(),
    ];
    let ok = checks.iter().all(|c| c.ok);
    emit(
        &SelfcheckReport {
            schema: RYN_SELFCHECK_REPORT_SCHEMA_VERSION,
            abi: RYN_ABI_VERSION,
            ok,
            checks,
        },
        args.pretty,
    )?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn pass(id: &'static str) -> CheckResult {
    CheckResult {
        id,
        ok: true,
        detail: None,
    }
}

fn fail(id: &'static str, detail: String) -> CheckResult {
    CheckResult {
        id,
        ok: false,
        detail: Some(detail),
    }
}

/// Run a probe that is expected to trap, with the default panic hook
/// silenced so the expected unwind does not spill onto stderr.
fn expect_trap(id: &'static str, fragment: &str, probe: impl FnOnce()) -> CheckResult {
    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(|_| {}));
    let outcome = catch_unwind(AssertUnwindSafe(probe));
    std::panic::set_hook(prev);
    match outcome {
        Ok(()) => fail(id, "expected a trap, none was raised".to_string()),
        Err(payload) => {
            let msg = payload
                .downcast_ref::<String>()
                .map(String::as_str)
                .or_else(|| payload.downcast_ref::<&str>().copied())
                .unwrap_or("<non-string panic payload>");
            if msg.contains(fragment) {
                pass(id)
            } else {
                fail(id, format!("unexpected trap: {}", msg))
            }
        }
    }
}

fn check_dtype_roundtrip() -> CheckResult {
    let id = "dtype-roundtrip";
    let mut tried = 0u32;
    for code in [RN_DTYPE_INT, RN_DTYPE_UINT, RN_DTYPE_FLOAT, RN_DTYPE_HANDLE] {
        let bit_choices: &[u8] = if code == RN_DTYPE_HANDLE {
            &[64]
        } else {
            &[1, 8, 16, 32, 64]
        };
        for &bits in bit_choices {
            for lanes in [1u16, 4, 8] {
                let d = dtype_new(code, bits, lanes);
                let text = dtype_format(d);
                if dtype_parse(&text) != d {
                    return fail(id, format!("{} did not round-trip", text));
                }
                tried += 1;
            }
        }
    }
    CheckResult {
        id,
        ok: true,
        detail: Some(format!("{} descriptors", tried)),
    }
}

fn check_pod_sum() -> CheckResult {
    let id = "pod-sum";
    let add = PackedFn::new(|args, rv: &mut RetValue| {
        rv.set(args.get(0).as_i64() as f64 + args.get(1).as_f64());
    });
    let got = add.call((1i64, 2.0f64)).as_f64();
    if got == 3.0 {
        pass(id)
    } else {
        fail(id, format!("expected 3.0, got {}", got))
    }
}

fn check_string_result() -> CheckResult {
    let id = "string-result";
    let f = PackedFn::new(|_, rv: &mut RetValue| rv.set("x"));
    let got = f.call(()).as_string();
    if got == "x" {
        pass(id)
    } else {
        fail(id, format!("expected \"x\", got {:?}", got))
    }
}

fn check_string_transfer_refused() -> CheckResult {
    let f = PackedFn::new(|_, rv: &mut RetValue| rv.set("x"));
    let mut rv = f.call(());
    expect_trap(
        "string-transfer-refusal",
        "string return value cannot cross the raw boundary",
        move || {
            rv.move_to_raw();
        },
    )
}

fn check_bounds_trap() -> CheckResult {
    expect_trap("bounds-trap", "not enough argument passed", || {
        let values = [rn_value { v_int64: 1 }];
        let tags = [Tag::Int.raw()];
        Args::new(&values, &tags).get(1);
    })
}

fn check_narrow_trap() -> CheckResult {
    expect_trap("narrow-trap", "out of range for int8", || {
        let values = [rn_value { v_int64: 300 }];
        let tags = [Tag::Int.raw()];
        Args::new(&values, &tags).get(0).as_i8();
    })
}

fn check_ownership_transfer() -> CheckResult {
    let id = "ownership-transfer";
    let probe = NodeRef::new(0u8);
    let mut rv = RetValue::default();
    rv.set(probe.clone());
    if probe.ref_count() != 2 {
        return fail(id, "boxing did not take one reference".to_string());
    }
    let (value, tag) = rv.move_to_raw();
    if rv.tag() != Tag::Null || tag != Tag::NodeHandle.raw() {
        return fail(id, "transfer did not null the source".to_string());
    }
    drop(rv);
    if probe.ref_count() != 2 {
        return fail(id, "moved-from slot released the payload".to_string());
    }
    unsafe {
        drop(Box::from_raw(value.v_handle as *mut NodeRef));
    }
    if probe.ref_count() != 1 {
        return fail(id, "receiver release was not balanced".to_string());
    }
    pass(id)
}
