use ryn_ffi::abi::{
    rn_bytes, rn_value, RN_DTYPE_FLOAT, RN_DTYPE_HANDLE, RN_DTYPE_INT, RN_DTYPE_UINT,
};
use ryn_ffi::{
    dtype_format, dtype_new, dtype_parse, Args, FromNodeRef, Module, NodeRef, PackedFn, RetValue,
    Tag, UnpackArgs,
};

fn int_args(values: &[i64]) -> (Vec<rn_value>, Vec<i32>) {
    let slots = values.iter().map(|&v| rn_value { v_int64: v }).collect();
    let tags = values.iter().map(|_| Tag::Int.raw()).collect();
    (slots, tags)
}

#[test]
fn dtype_round_trips_over_the_representable_grid() {
    for code in [RN_DTYPE_INT, RN_DTYPE_UINT, RN_DTYPE_FLOAT, RN_DTYPE_HANDLE] {
        let bit_choices: &[u8] = if code == RN_DTYPE_HANDLE {
            &[64]
        } else {
            &[1, 8, 16, 32, 64]
        };
        for &bits in bit_choices {
            for lanes in [1u16, 4, 8] {
                let d = dtype_new(code, bits, lanes);
                assert_eq!(dtype_parse(&dtype_format(d)), d, "{:?}", d);
            }
        }
    }
}

#[test]
fn vector_float_formats_canonically() {
    let d = dtype_new(RN_DTYPE_FLOAT, 32, 4);
    assert_eq!(dtype_format(d), "float32x4");
    assert_eq!(dtype_parse("float32x4"), d);
}

#[test]
fn typed_call_packs_pod_arguments() {
    let add = PackedFn::new(|args, rv: &mut RetValue| {
        let a = args.get(0).as_i64();
        let b = args.get(1).as_f64();
        rv.set(a as f64 + b);
    });
    let rv = add.call((1i64, 2.0f64));
    assert_eq!(rv.tag(), Tag::Float);
    assert_eq!(rv.as_f64(), 3.0);
}

#[test]
fn string_result_converts_back() {
    let f = PackedFn::new(|_, rv: &mut RetValue| {
        rv.set("x");
    });
    let rv = f.call(());
    assert_eq!(rv.tag(), Tag::Str);
    assert_eq!(rv.as_string(), "x");
}

#[test]
#[should_panic(expected = "string return value cannot cross the raw boundary")]
fn string_result_refuses_raw_transfer() {
    let f = PackedFn::new(|_, rv: &mut RetValue| {
        rv.set("x");
    });
    let mut rv = f.call(());
    rv.move_to_raw();
}

#[test]
fn borrowed_string_argument_reaches_the_body() {
    let shout = PackedFn::new(|args, rv: &mut RetValue| {
        rv.set(args.get(0).as_string().to_uppercase());
    });
    let rv = shout.call(("quiet".to_string(),));
    assert_eq!(rv.as_string(), "QUIET");
}

#[test]
fn string_ret_slot_repacks_as_borrowed_argument() {
    let produce = PackedFn::new(|_, rv: &mut RetValue| {
        rv.set("chained");
    });
    let consume = PackedFn::new(|args, rv: &mut RetValue| {
        rv.set(args.get(0).as_string().len() as i64);
    });
    let first = produce.call(());
    let rv = consume.call((&first,));
    assert_eq!(rv.as_i64(), 7);
    // The first slot still owns its payload.
    assert_eq!(first.as_string(), "chained");
}

#[test]
fn callable_argument_is_cloned_out_and_invoked() {
    let double = PackedFn::new(|args, rv: &mut RetValue| {
        rv.set(args.get(0).as_i64() * 2);
    });
    let apply = PackedFn::new(|args, rv: &mut RetValue| {
        let f = args.get(0).as_fn();
        let x = args.get(1).as_i64();
        rv.set(f.call((x,)).as_i64());
    });
    assert_eq!(apply.call((double, 21i64)).as_i64(), 42);
}

#[test]
fn module_argument_round_trips() {
    let m = Module::new("graph_exec", ());
    let f = PackedFn::new(|args, rv: &mut RetValue| {
        rv.set(args.get(0).as_module().name().to_string());
    });
    assert_eq!(f.call((m,)).as_string(), "graph_exec");
}

#[test]
fn bytes_argument_copies_into_a_string() {
    let f = PackedFn::new(|args, rv: &mut RetValue| {
        rv.set(args.get(0).as_string());
    });
    let payload = b"float64x8";
    let rv = f.call((rn_bytes::from_slice(payload),));
    assert_eq!(rv.as_string(), "float64x8");
}

#[test]
fn dtype_argument_reads_as_text_and_text_reads_as_dtype() {
    let f = PackedFn::new(|args, rv: &mut RetValue| {
        // Text form of the descriptor argument.
        rv.set(args.get(0).as_string());
    });
    let rv = f.call((dtype_new(RN_DTYPE_INT, 8, 1),));
    assert_eq!(rv.as_string(), "int8");

    let g = PackedFn::new(|args, rv: &mut RetValue| {
        rv.set(args.get(0).as_dtype());
    });
    let rv = g.call(("uint32x4".to_string(),));
    assert_eq!(rv.as_dtype(), dtype_new(RN_DTYPE_UINT, 32, 4));
}

#[test]
fn unpack_reads_a_whole_argument_list() {
    let f = PackedFn::new(|args, rv: &mut RetValue| {
        let (n, scale, label): (i64, f64, String) = UnpackArgs::unpack(args);
        rv.set(format!("{}:{}", label, n as f64 * scale));
    });
    let rv = f.call((10i64, 1.5f64, "scaled".to_string()));
    assert_eq!(rv.as_string(), "scaled:15");
}

#[test]
fn argument_list_is_bounds_checked() {
    let (values, tags) = int_args(&[7, 9]);
    let args = Args::new(&values, &tags);
    assert_eq!(args.len(), 2);
    assert_eq!(args.get(1).as_i64(), 9);
}

#[test]
#[should_panic(expected = "not enough argument passed, 2 passed but request arg[2]")]
fn indexing_past_the_count_traps() {
    let (values, tags) = int_args(&[7, 9]);
    Args::new(&values, &tags).get(2);
}

#[test]
fn narrowing_within_range_succeeds() {
    let (values, tags) = int_args(&[300]);
    let args = Args::new(&values, &tags);
    assert_eq!(args.get(0).as_i32(), 300);
}

#[test]
#[should_panic(expected = "value 300 out of range for int8")]
fn narrowing_past_the_target_width_traps() {
    let (values, tags) = int_args(&[300]);
    Args::new(&values, &tags).get(0).as_i8();
}

#[test]
#[should_panic(expected = "expected str but get int")]
fn reading_an_int_slot_as_string_traps() {
    let (values, tags) = int_args(&[1]);
    Args::new(&values, &tags).get(0).as_string();
}

#[test]
fn null_and_handle_views() {
    let values = [rn_value::zeroed()];
    let tags = [Tag::Null.raw()];
    let args = Args::new(&values, &tags);
    assert!(args.get(0).as_handle().is_null());
    assert!(args.get(0).as_array().is_null());
}

#[test]
fn exactly_one_tag_is_active_after_reassignment() {
    let mut rv = RetValue::default();
    rv.set(3i64);
    rv.set("now a string");
    assert_eq!(rv.tag(), Tag::Str);
    assert_eq!(rv.as_string(), "now a string");
}

#[test]
#[should_panic(expected = "expected int but get str")]
fn stale_tag_reads_trap_after_reassignment() {
    let mut rv = RetValue::default();
    rv.set(3i64);
    rv.set("now a string");
    rv.as_i64();
}

#[test]
fn moved_from_slot_releases_nothing() {
    let probe = NodeRef::new("payload".to_string());
    let mut rv = RetValue::default();
    rv.set(probe.clone());
    assert_eq!(probe.ref_count(), 2);

    let moved = rv.take();
    assert_eq!(rv.tag(), Tag::Null);
    drop(rv);
    assert_eq!(probe.ref_count(), 2);

    drop(moved);
    assert_eq!(probe.ref_count(), 1);
}

#[test]
fn raw_transfer_hands_ownership_exactly_once() {
    let probe = NodeRef::new(0u8);
    let mut rv = RetValue::default();
    rv.set(probe.clone());
    assert_eq!(probe.ref_count(), 2);

    let (value, tag) = rv.move_to_raw();
    assert_eq!(tag, Tag::NodeHandle.raw());
    assert_eq!(rv.tag(), Tag::Null);

    // A second transfer and the destructor are both no-ops now.
    let (_, tag2) = rv.move_to_raw();
    assert_eq!(tag2, Tag::Null.raw());
    drop(rv);
    assert_eq!(probe.ref_count(), 2);

    // The receiver releases the box it was handed.
    unsafe {
        drop(Box::from_raw(value.v_handle as *mut NodeRef));
    }
    assert_eq!(probe.ref_count(), 1);
}

#[test]
fn assigning_an_argument_copies_the_shared_handle() {
    let probe = NodeRef::new(1i32);
    let f = PackedFn::new(|args, rv: &mut RetValue| {
        rv.set(args.get(0).as_node_ref());
    });
    let rv = f.call((probe.clone(),));
    assert_eq!(rv.tag(), Tag::NodeHandle);
    assert_eq!(probe.ref_count(), 2);
    drop(rv);
    assert_eq!(probe.ref_count(), 1);
}

struct Extent {
    units: i64,
}

struct ExtentView {
    units: i64,
}

impl FromNodeRef for ExtentView {
    fn from_node_ref(node: &NodeRef) -> ExtentView {
        let ext = node.downcast_ref::<Extent>().expect("extent node");
        ExtentView { units: ext.units }
    }
}

#[test]
fn injected_node_conversion_is_consulted() {
    let node = NodeRef::new(Extent { units: 12 });
    let f = PackedFn::new(|args, rv: &mut RetValue| {
        assert!(args.get(0).is_node::<Extent>());
        let view: ExtentView = args.get(0).as_node();
        rv.set(view.units);
    });
    assert_eq!(f.call((node,)).as_i64(), 12);
}
