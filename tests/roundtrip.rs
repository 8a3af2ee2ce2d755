//! End-to-end scenarios exercising the public façade the way an external
//! crate would: build bytes by hand, wrap them, read them back, and check
//! the writer produces byte-for-byte the same layout a hand-built example
//! does.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use gvariant::signature::signature_one;
use gvariant::vecs::Segment;
use gvariant::{GVariant, Value};

/// Property-style check, reproducibly seeded: for a batch of random-ish
/// tuples of basic values, writing then reading back always yields the
/// same `Value` tree back.
#[test]
fn random_tuples_of_basic_values_round_trip() {
    let mut rng = Pcg32::seed_from_u64(0xc0ffee);

    for _ in 0..64 {
        let a: u32 = rng.gen();
        let b: i64 = rng.gen();
        let byte: u8 = rng.gen();
        let len = rng.gen_range(0..12);
        let s: String = (0..len).map(|_| rng.gen_range(b'a'..=b'z') as char).collect();

        let value = Value::Tuple(vec![
            Value::U32(a),
            Value::I64(b),
            Value::Byte(byte),
            Value::String(s.clone()),
        ]);

        let mut w = GVariant::new(b"(uxys)").unwrap();
        w.writev(&value).unwrap();
        let mut sealed = w.seal().unwrap();

        let read_back = sealed.readv().unwrap();

        assert_eq!(read_back, value);
    }
}

#[test]
fn simple_u32_round_trips() {
    let bytes: &[u8] = &[0xff, 0x00, 0xff, 0x00];
    let mut v = GVariant::new_from_vecs(b"u", vec![Segment::Borrowed(bytes)]).unwrap();
    assert_eq!(v.readv().unwrap(), Value::U32(0x00ff00ff));
}

/// `(uaum(s)u)` with a 0xffff tuple head, an array of four u32s, a present
/// `m(s)` of "foo", and a 0xffffffff tail — laid out exactly as hand-traced
/// bytes, framing-offset table included.
fn tuple_with_array_and_maybe_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&[0xff, 0xff, 0x00, 0x00]); // u = 0xffff
    for n in [1u32, 2, 3, 4] {
        bytes.extend_from_slice(&n.to_le_bytes()); // au = [1,2,3,4]
    }
    bytes.extend_from_slice(b"foo\0"); // m(s) payload: the string itself
    bytes.push(0x00); // maybe-present marker byte
    bytes.extend_from_slice(&[0x00, 0x00, 0x00]); // padding to align the tail u
    bytes.extend_from_slice(&0xffffffffu32.to_le_bytes()); // u = 0xffffffff
    bytes.extend_from_slice(&[0x19, 0x14]); // framing table: m(s) end, au end
    bytes
}

#[test]
fn tuple_with_array_and_maybe_reads_back() {
    let bytes = tuple_with_array_and_maybe_bytes();
    let mut v =
        GVariant::new_from_vecs(b"(uaum(s)u)", vec![Segment::Owned(bytes)]).unwrap();

    v.enter(b'(').unwrap();
    assert_eq!(v.readv().unwrap(), Value::U32(0xffff));
    assert_eq!(
        v.readv().unwrap(),
        Value::Array(vec![Value::U32(1), Value::U32(2), Value::U32(3), Value::U32(4)])
    );
    let maybe = v.readv().unwrap();
    match maybe {
        Value::Maybe(Some(inner)) => {
            assert_eq!(*inner, Value::Tuple(vec![Value::String("foo".into())]));
        }
        other => panic!("expected Just(\"foo\"), got {other:?}"),
    }
    assert_eq!(v.readv().unwrap(), Value::U32(0xffffffff));
    v.exit_try(b')').unwrap();
}

#[test]
fn writer_reproduces_the_hand_built_layout() {
    let mut v = GVariant::new(b"(uaum(s)u)").unwrap();
    v.begin(b'(', None).unwrap();
    v.append_basic(b'u', &0xffffu32.to_le_bytes()).unwrap();

    v.begin(b'a', None).unwrap();
    for n in [1u32, 2, 3, 4] {
        v.append_basic(b'u', &n.to_le_bytes()).unwrap();
    }
    v.end(b'a').unwrap();

    v.begin(b'm', None).unwrap();
    v.begin(b'(', None).unwrap();
    v.append_basic(b's', b"foo\0").unwrap();
    v.end(b')').unwrap();
    v.end(b'm').unwrap();

    v.append_basic(b'u', &0xffffffffu32.to_le_bytes()).unwrap();
    v.end(b')').unwrap();

    let sealed = v.seal().unwrap();
    let flattened: Vec<u8> = sealed
        .get_vecs()
        .unwrap()
        .segments()
        .iter()
        .flat_map(|s| s.as_slice().to_vec())
        .collect();

    assert_eq!(flattened, tuple_with_array_and_maybe_bytes());
}

#[test]
fn variant_self_describes_its_payload_type() {
    let mut v = GVariant::new(b"v").unwrap();
    v.begin(b'v', Some(b"u")).unwrap();
    v.append_basic(b'u', &0xdeadbeefu32.to_le_bytes()).unwrap();
    v.end(b'v').unwrap();
    let mut sealed = v.seal().unwrap();

    sealed.enter(b'v').unwrap();
    assert_eq!(sealed.peek_type().unwrap(), Some(b'u'));
    assert_eq!(sealed.readv().unwrap(), Value::U32(0xdeadbeef));
    sealed.exit_try(b'v').unwrap();
}

#[test]
fn malformed_fixed_array_reads_as_empty_without_erroring() {
    // 3 bytes can't hold a whole number of 4-byte `u` elements: the element
    // count default-substitutes to 0 rather than erroring.
    let mut v = GVariant::new_from_vecs(b"au", vec![Segment::Borrowed(&[1, 2, 3])]).unwrap();
    v.enter(b'a').unwrap();
    assert_eq!(v.peek_count().unwrap(), 0);
    v.exit_try(b'a').unwrap();
}

#[test]
fn deeply_nested_signature_reports_expected_shape() {
    // (u(u(u(u(u)u)u)u)u)
    let info = signature_one(b"(u(u(u(u(u)u)u)u)u)").unwrap();
    assert_eq!(info.alignment, 2);
    assert_eq!(info.size, 40);
    assert_eq!(info.depth, 4);
    assert_eq!(info.length, 19);
}
