mod common;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::*;
use starbridge::{
    ConvertConfig, Decoder, Dict, Error, NumberError, NumberFailReason, Record, Value, decode,
};
use test_case::test_case;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

#[derive(Debug, Default, PartialEq, Record)]
pub struct Scalars {
    pub b: bool,
    pub b_opt: Option<bool>,
    pub s: String,
    pub s_opt: Option<String>,
    pub raw: Vec<u8>,
    pub i: i32,
    pub u8v: u8,
    pub f32v: f32,
    pub f: f64,
    pub i_opt: Option<i64>,
}

#[test]
fn missing_keys_leave_fields_untouched() {
    init_tracing();
    let mut dst = Scalars {
        b: true,
        s: "keep".into(),
        i_opt: Some(3),
        ..Default::default()
    };
    decode(&dict([("unrelated", int(1))]), &mut dst).unwrap();
    assert_eq!(
        dst,
        Scalars {
            b: true,
            s: "keep".into(),
            i_opt: Some(3),
            ..Default::default()
        }
    );
}

#[test]
fn scalars_decode_through_one_optional_level() {
    let src = dict([
        ("b", Value::Bool(true)),
        ("b_opt", Value::Bool(false)),
        ("s", string("a")),
        ("s_opt", bytes(b"b")),
        ("raw", string("c")),
        ("i", Value::Float(-2.0)),
        ("u8v", int(255)),
        ("f32v", Value::Float(0.5)),
        ("f", int(1 << 53)),
        ("i_opt", int(-7)),
    ]);
    let mut dst = Scalars::default();
    decode(&src, &mut dst).unwrap();
    assert_eq!(
        dst,
        Scalars {
            b: true,
            b_opt: Some(false),
            s: "a".into(),
            s_opt: Some("b".into()),
            raw: b"c".to_vec(),
            i: -2,
            u8v: 255,
            f32v: 0.5,
            f: 9007199254740992.0,
            i_opt: Some(-7),
        }
    );
}

/// Field names as they appear in scripts written against an older schema.
#[allow(non_snake_case)]
#[derive(Debug, Default, PartialEq, Record)]
pub struct Legacy {
    pub Enabled: bool,
    pub Label: String,
}

#[test]
fn lowercase_fallback() {
    let mut dst = Legacy::default();
    let src = dict([("enabled", Value::Bool(true)), ("Enabled", Value::Bool(false))]);
    decode(&src, &mut dst).unwrap();
    assert!(!dst.Enabled, "exact name wins");

    decode(&dict([("label", string("lower"))]), &mut dst).unwrap();
    assert_eq!(dst.Label, "lower");

    let mut dst = Legacy::default();
    Decoder::new()
        .with_config(ConvertConfig {
            lowercase_fallback: false,
            ..Default::default()
        })
        .decode(&dict([("label", string("lower"))]), &mut dst)
        .unwrap();
    assert_eq!(dst.Label, "");

    let mut dst = Legacy::default();
    Decoder::new()
        .lowercase_fallback(false)
        .decode(&dict([("enabled", Value::Bool(true))]), &mut dst)
        .unwrap();
    assert!(!dst.Enabled);
}

#[derive(Debug, Default, PartialEq, Record)]
pub struct Named {
    #[star("Count")]
    pub count: i64,
    #[star(",astuple")]
    pub items: Vec<i64>,
}

#[test]
fn explicit_names_do_not_fall_back() {
    let mut dst = Named::default();
    decode(&dict([("count", int(1)), ("items", list([int(2)]))]), &mut dst).unwrap();
    assert_eq!(
        dst,
        Named {
            count: 0,
            items: vec![2],
        }
    );
}

#[test_case("b", Value::None, "b: cannot convert NoneType to type bool"; "none into bool")]
#[test_case("s", Value::Bool(true), "s: cannot convert bool to type String"; "bool into string")]
#[test_case(
    "s_opt",
    Value::Bool(true),
    "s_opt: cannot convert bool to type Option<String>";
    "bool into optional string"
)]
#[test_case("b", string("x"), "b: cannot convert string to type bool"; "string into bool")]
#[test_case("i", string("1"), "i: cannot convert string to type i32"; "string into int")]
#[test_case(
    "b_opt",
    list([]),
    "b_opt: cannot convert list to type Option<bool>";
    "list into optional bool"
)]
#[test_case("b", set([int(1)]), "b: cannot convert set to type bool"; "set into bool")]
#[test_case(
    "s",
    Value::Dict(Dict::new()),
    "s: cannot convert dict to type String";
    "dict into string"
)]
#[test_case(
    "s",
    bytes(&[0xff]),
    "s: cannot convert bytes to type String: invalid utf-8 sequence of 1 bytes from index 0";
    "invalid utf8"
)]
fn type_mismatch(key: &str, value: Value, expected: &str) {
    let mut dst = Scalars::default();
    let err = decode(&dict([(key, value)]), &mut dst).unwrap_err();
    assert_eq!(messages(&err), [expected]);
    assert!(matches!(err.errors()[0], Error::Type(_)));
    assert_eq!(dst, Scalars::default());
}

#[test_case(
    "u8v",
    int(256),
    "u8v: cannot assign int to type u8: value out of range";
    "u8 overflow"
)]
#[test_case(
    "u8v",
    int(-1),
    "u8v: cannot assign int to type u8: value out of range";
    "negative into unsigned"
)]
#[test_case(
    "i",
    Value::Float(3.5),
    "i: cannot assign float to type i32: value cannot be exactly represented";
    "fractional float"
)]
#[test_case(
    "i",
    Value::Float(1e10),
    "i: cannot assign float to type i32: value out of range";
    "float out of range"
)]
#[test_case(
    "f",
    int((1 << 53) + 1),
    "f: cannot assign int to type f64: value cannot be exactly represented";
    "beyond f64 mantissa"
)]
#[test_case(
    "f32v",
    int((1 << 24) + 1),
    "f32v: cannot assign int to type f32: value cannot be exactly represented";
    "beyond f32 mantissa"
)]
#[test_case(
    "f32v",
    Value::Float(1e300),
    "f32v: cannot assign float to type f32: value cannot be exactly represented";
    "f32 overflow"
)]
#[test_case(
    "i_opt",
    Value::Float(f64::NAN),
    "i_opt: cannot assign float to type Option<i64>: value cannot be exactly represented";
    "nan into optional int"
)]
fn numeric_failures(key: &str, value: Value, expected: &str) {
    let mut dst = Scalars::default();
    let err = decode(&dict([(key, value)]), &mut dst).unwrap_err();
    assert_eq!(messages(&err), [expected]);
    assert!(matches!(err.errors()[0], Error::Number(_)));
    // A failed write never leaves an allocated optional behind.
    assert_eq!(dst, Scalars::default());
}

#[test]
fn number_error_reason_is_inspectable() {
    let mut dst = Scalars::default();
    let err = decode(&dict([("u8v", int(300))]), &mut dst).unwrap_err();
    match &err.errors()[0] {
        Error::Number(NumberError { reason, path, .. }) => {
            assert_eq!(*reason, NumberFailReason::OutOfRange);
            assert_eq!(path, "u8v");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[derive(Debug, Default, PartialEq, Record)]
pub struct Containers {
    pub seq: Vec<String>,
    pub seq_opt: Option<Vec<String>>,
    pub raw: Vec<u8>,
    pub members: HashMap<String, bool>,
    pub members_opt: Option<BTreeMap<i64, bool>>,
    pub from_set: Vec<String>,
}

#[test]
fn lists_replace_sequences() {
    let mut dst = Containers {
        seq: vec!["old".into(), "older".into(), "oldest".into()],
        ..Default::default()
    };
    decode(
        &dict([
            ("seq", list([string("a"), string("b")])),
            ("seq_opt", tuple([string("c")])),
            ("raw", list([int(1), int(2)])),
        ]),
        &mut dst,
    )
    .unwrap();
    assert_eq!(dst.seq, ["a", "b"]);
    assert_eq!(dst.seq_opt, Some(vec!["c".to_string()]));
    assert_eq!(dst.raw, [1, 2]);
}

#[test]
fn empty_list_gives_fresh_empty_sequence() {
    let mut dst = Containers {
        seq: Vec::with_capacity(16),
        ..Default::default()
    };
    dst.seq.push("x".into());
    decode(&dict([("seq", list([]))]), &mut dst).unwrap();
    assert!(dst.seq.is_empty());
    assert_eq!(dst.seq.capacity(), 0);
}

#[test]
fn list_element_errors_carry_index() {
    let mut dst = Containers::default();
    let err = decode(
        &dict([("seq", list([string("a"), int(1)])), ("raw", list([int(256)]))]),
        &mut dst,
    )
    .unwrap_err();
    assert_eq!(
        messages(&err),
        [
            "seq[1]: cannot convert int to type String",
            "raw[0]: cannot assign int to type u8: value out of range",
        ]
    );
    assert_eq!(dst.seq, ["a", ""]);
}

#[test]
fn sets_decode_into_maps_additively() {
    let mut dst = Containers {
        members: HashMap::from([("b".to_string(), true), ("c".to_string(), true)]),
        ..Default::default()
    };
    decode(
        &dict([
            ("members", set([string("a"), string("b")])),
            ("members_opt", set([int(1), int(2)])),
        ]),
        &mut dst,
    )
    .unwrap();
    assert_eq!(
        dst.members,
        HashMap::from([
            ("a".to_string(), true),
            ("b".to_string(), true),
            ("c".to_string(), true),
        ])
    );
    assert_eq!(dst.members_opt, Some(BTreeMap::from([(1, true), (2, true)])));
}

#[test]
fn sets_decode_into_sequences() {
    let mut dst = Containers {
        from_set: vec!["c".into(), "d".into(), "e".into()],
        ..Default::default()
    };
    decode(&dict([("from_set", set([string("a"), string("b")]))]), &mut dst).unwrap();
    assert_eq!(dst.from_set, ["a", "b"]);
}

#[test]
fn failing_set_members_are_not_inserted() {
    let mut dst = Containers::default();
    let err = decode(&dict([("members", set([string("a"), int(1)]))]), &mut dst).unwrap_err();
    assert_eq!(messages(&err), ["members[1]: cannot convert int to type String"]);
    assert_eq!(dst.members, HashMap::from([("a".to_string(), true)]));
}

#[test]
fn list_into_set_map_is_a_mismatch() {
    let mut dst = Containers::default();
    let err = decode(&dict([("members", list([string("a")]))]), &mut dst).unwrap_err();
    assert_eq!(
        messages(&err),
        ["members: cannot convert list to type HashMap<String, bool>"]
    );
}

#[test]
fn none_resets_containers_and_optionals() {
    let mut dst = Containers {
        seq: vec!["a".into()],
        seq_opt: Some(vec!["b".into()]),
        raw: vec![1],
        members: HashMap::from([("x".to_string(), true)]),
        members_opt: Some(BTreeMap::new()),
        from_set: vec![],
    };
    decode(
        &dict([
            ("seq", Value::None),
            ("seq_opt", Value::None),
            ("raw", Value::None),
            ("members", Value::None),
            ("members_opt", Value::None),
        ]),
        &mut dst,
    )
    .unwrap();
    assert_eq!(dst, Containers::default());
}

#[derive(Debug, Default, PartialEq, Record)]
pub struct Inner {
    pub a: i64,
    pub b: String,
}

#[derive(Debug, Default, PartialEq, Record)]
pub struct Outer {
    pub inner: Inner,
    pub ptr: Option<Inner>,
    #[star(embed)]
    pub flat: Inner,
    #[star(embed)]
    pub maybe: Option<Extra>,
}

#[derive(Debug, Default, PartialEq, Record)]
pub struct Extra {
    pub z: bool,
}

#[test]
fn nested_dicts_overlay_records() {
    let mut dst = Outer {
        inner: Inner {
            a: 1,
            b: "keep".into(),
        },
        ..Default::default()
    };
    decode(
        &dict([
            ("inner", Value::Dict(dict([("a", int(2))]))),
            ("ptr", Value::Dict(dict([("b", string("set"))]))),
        ]),
        &mut dst,
    )
    .unwrap();
    assert_eq!(
        dst.inner,
        Inner {
            a: 2,
            b: "keep".into()
        }
    );
    assert_eq!(
        dst.ptr,
        Some(Inner {
            a: 0,
            b: "set".into()
        })
    );
}

#[test]
fn optional_record_is_attached_only_when_a_field_matches() {
    let mut dst = Outer::default();
    decode(
        &dict([("ptr", Value::Dict(dict([("unknown", int(1))])))]),
        &mut dst,
    )
    .unwrap();
    assert_eq!(dst.ptr, None);

    let mut dst = Outer {
        ptr: Some(Inner::default()),
        ..Default::default()
    };
    decode(&dict([("ptr", Value::Dict(Dict::new()))]), &mut dst).unwrap();
    assert_eq!(dst.ptr, Some(Inner::default()));
}

#[test]
fn embedded_records_read_parent_keys() {
    let mut dst = Outer::default();
    decode(&dict([("a", int(5)), ("b", string("b"))]), &mut dst).unwrap();
    assert_eq!(
        dst.flat,
        Inner {
            a: 5,
            b: "b".into()
        }
    );
    assert_eq!(dst.maybe, None);

    decode(&dict([("z", Value::Bool(true))]), &mut dst).unwrap();
    assert_eq!(dst.maybe, Some(Extra { z: true }));
}

#[test]
fn embedded_field_errors_use_embedded_path() {
    let mut dst = Outer::default();
    let err = decode(&dict([("a", string("x"))]), &mut dst).unwrap_err();
    assert_eq!(messages(&err), ["flat.a: cannot convert string to type i64"]);
}

/// Collects the `path` of every "decode field" event.
struct FieldVisits(Arc<Mutex<Vec<String>>>);

#[derive(Default)]
struct EventFields {
    message: String,
    path: String,
}

impl Visit for EventFields {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{value:?}"),
            "path" => self.path = format!("{value:?}"),
            _ => {}
        }
    }
}

impl<S: Subscriber> Layer<S> for FieldVisits {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = EventFields::default();
        event.record(&mut fields);
        if fields.message == "decode field" {
            self.0.lock().unwrap().push(fields.path);
        }
    }
}

#[test]
fn every_visited_field_is_traced() {
    let visits = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(FieldVisits(visits.clone()));
    tracing::subscriber::with_default(subscriber, || {
        let mut dst = Outer::default();
        decode(&dict([("ptr", Value::None)]), &mut dst).unwrap();
    });
    assert_eq!(
        *visits.lock().unwrap(),
        ["inner", "ptr", "flat", "flat.a", "flat.b", "maybe", "maybe.z"]
    );
}

#[derive(Debug, Default, PartialEq, Record)]
pub struct Dynamic {
    pub v: Value,
    pub v_opt: Option<Value>,
    pub nested: Option<Option<bool>>,
    pub ts: Duration,
}

#[test]
fn dynamic_values_are_assigned_as_is() {
    let mut dst = Dynamic::default();
    decode(
        &dict([("v", list([int(1), Value::None])), ("v_opt", Value::None)]),
        &mut dst,
    )
    .unwrap();
    assert_eq!(dst.v, list([int(1), Value::None]));
    assert_eq!(dst.v_opt, Some(Value::None));
}

#[test]
fn unsupported_destinations() {
    let mut dst = Dynamic::default();
    let err = decode(
        &dict([("nested", Value::Bool(true)), ("ts", int(1))]),
        &mut dst,
    )
    .unwrap_err();
    assert_eq!(
        messages(&err),
        [
            "nested: cannot convert bool to type Option<Option<bool>>",
            "ts: cannot convert int to type Duration",
        ]
    );
    assert_eq!(dst.nested, None);
}

#[derive(Debug, Default, PartialEq, Record)]
pub struct Flags {
    pub a: bool,
    pub b: bool,
    pub c: bool,
    pub d: bool,
    pub e: bool,
}

#[test]
fn error_cap_stops_before_later_fields() {
    let src = dict([
        ("a", int(1)),
        ("b", int(2)),
        ("c", int(3)),
        ("d", int(4)),
        ("e", Value::Bool(true)),
    ]);
    let mut dst = Flags::default();
    let err = Decoder::new().max_errors(2).decode(&src, &mut dst).unwrap_err();
    assert_eq!(
        messages(&err),
        [
            "a: cannot convert int to type bool",
            "b: cannot convert int to type bool",
            "maximum number of errors reached",
        ]
    );
    assert!(!dst.e, "walk stopped before e");

    let mut dst = Flags::default();
    let err = decode(&src, &mut dst).unwrap_err();
    assert_eq!(err.len(), 4);
    assert!(dst.e);
}

#[test]
fn decode_dyn_into_present_optional_record() {
    let mut dst: Option<Inner> = Some(Inner::default());
    Decoder::new()
        .decode_dyn(&dict([("a", int(9))]), &mut dst)
        .unwrap();
    assert_eq!(dst.map(|i| i.a), Some(9));
}

#[test]
#[should_panic(
    expected = "destination value is not a record or a present optional record: Option<Inner>"
)]
fn decode_dyn_rejects_absent_record() {
    let mut dst: Option<Inner> = None;
    let _ = Decoder::new().decode_dyn(&Dict::new(), &mut dst);
}

#[test]
#[should_panic(expected = "destination value is not a record or a present optional record: i32")]
fn decode_dyn_rejects_non_record() {
    let mut dst = 0i32;
    let _ = Decoder::new().decode_dyn(&Dict::new(), &mut dst);
}
