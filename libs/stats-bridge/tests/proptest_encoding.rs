use proptest::prelude::*;
use stats_api::{Member, MemberValue, Record, Report};
use stats_bridge::encode::encode;
use stats_bridge::{
    BoxedClass, BridgeConfig, ForeignValue, HeapConfig, InMemoryHeap,
    StatsCollectorCallbackWrapper,
};

fn encoded(value: &MemberValue) -> ForeignValue {
    let mut env = InMemoryHeap::new(&HeapConfig::default());
    let obj = encode(&mut env, value).unwrap();
    env.export_value(obj).unwrap()
}

fn arb_sequence_value() -> impl Strategy<Value = MemberValue> {
    prop_oneof![
        prop::collection::vec(any::<bool>(), 0..8).prop_map(MemberValue::SequenceBool),
        prop::collection::vec(any::<i32>(), 0..8).prop_map(MemberValue::SequenceInt32),
        prop::collection::vec(any::<u32>(), 0..8).prop_map(MemberValue::SequenceUint32),
        prop::collection::vec(any::<i64>(), 0..8).prop_map(MemberValue::SequenceInt64),
        prop::collection::vec(any::<u64>(), 0..8).prop_map(MemberValue::SequenceUint64),
        prop::collection::vec(-1.0e12f64..1.0e12, 0..8).prop_map(MemberValue::SequenceDouble),
        prop::collection::vec("[a-z]{0,4}", 0..8).prop_map(MemberValue::SequenceString),
    ]
}

fn arb_member_value() -> impl Strategy<Value = MemberValue> {
    prop_oneof![
        any::<bool>().prop_map(MemberValue::Bool),
        any::<i32>().prop_map(MemberValue::Int32),
        any::<u32>().prop_map(MemberValue::Uint32),
        any::<i64>().prop_map(MemberValue::Int64),
        any::<u64>().prop_map(MemberValue::Uint64),
        (-1.0e12f64..1.0e12).prop_map(MemberValue::Double),
        "[a-z]{0,8}".prop_map(MemberValue::String),
        arb_sequence_value(),
    ]
}

/// Scalar members for each element of a sequence value.
fn elements(value: &MemberValue) -> Vec<MemberValue> {
    match value {
        MemberValue::SequenceBool(v) => v.iter().copied().map(MemberValue::Bool).collect(),
        MemberValue::SequenceInt32(v) => v.iter().copied().map(MemberValue::Int32).collect(),
        MemberValue::SequenceUint32(v) => v.iter().copied().map(MemberValue::Uint32).collect(),
        MemberValue::SequenceInt64(v) => v.iter().copied().map(MemberValue::Int64).collect(),
        MemberValue::SequenceUint64(v) => v.iter().copied().map(MemberValue::Uint64).collect(),
        MemberValue::SequenceDouble(v) => v.iter().copied().map(MemberValue::Double).collect(),
        MemberValue::SequenceString(v) => v.iter().cloned().map(MemberValue::String).collect(),
        scalar => panic!("not a sequence: {scalar:?}"),
    }
}

proptest! {
    #[test]
    fn uint64_decimal_text_round_trips(v in any::<u64>()) {
        let value = encoded(&MemberValue::Uint64(v));
        prop_assert_eq!(value, ForeignValue::BigInteger(v.to_string()));
    }

    #[test]
    fn uint32_upper_half_stays_positive(v in (1u32 << 31)..=u32::MAX) {
        match encoded(&MemberValue::Uint32(v)) {
            ForeignValue::Long(read_back) => {
                prop_assert!(read_back > 0);
                prop_assert_eq!(read_back, i64::from(v));
            }
            other => {
                prop_assert!(false, "expected long, got {:?}", other);
            }
        }
    }

    #[test]
    fn sequence_elements_encode_like_scalars(value in arb_sequence_value()) {
        let expected: Vec<ForeignValue> = elements(&value).iter().map(encoded).collect();
        match encoded(&value) {
            ForeignValue::Array { items, .. } => {
                prop_assert_eq!(items.len(), expected.len());
                prop_assert_eq!(items, expected);
            }
            other => {
                prop_assert!(false, "expected array, got {:?}", other);
            }
        }
    }

    #[test]
    fn uint64_sequences_use_big_integer_arrays(items in prop::collection::vec(any::<u64>(), 0..32)) {
        let value = encoded(&MemberValue::SequenceUint64(items.clone()));
        let expected: Vec<ForeignValue> = items
            .iter()
            .map(|v| ForeignValue::BigInteger(v.to_string()))
            .collect();
        prop_assert_eq!(
            value,
            ForeignValue::Array { class: BoxedClass::BigInteger, items: expected }
        );
    }

    #[test]
    fn int32_sequences_keep_length_and_order(items in prop::collection::vec(any::<i32>(), 0..32)) {
        match encoded(&MemberValue::SequenceInt32(items.clone())) {
            ForeignValue::Array { class, items: out } => {
                prop_assert_eq!(class, BoxedClass::Integer);
                let back: Vec<i32> = out
                    .into_iter()
                    .map(|v| match v {
                        ForeignValue::Integer(x) => x,
                        other => panic!("unexpected element {other:?}"),
                    })
                    .collect();
                prop_assert_eq!(back, items);
            }
            other => {
                prop_assert!(false, "expected array, got {:?}", other);
            }
        }
    }

    #[test]
    fn report_keeps_record_and_member_order(
        records in prop::collection::vec(
            prop::collection::vec((any::<bool>(), arb_member_value()), 0..6),
            0..8,
        )
    ) {
        let mut report = Report::new(42);
        for (r, members) in records.iter().enumerate() {
            let mut record = Record::new(format!("id{r}"), "candidate-pair", r as i64);
            for (m, (defined, value)) in members.iter().enumerate() {
                let name = format!("member{m}");
                record = record.with_member(if *defined {
                    Member::defined(name, value.clone())
                } else {
                    Member::undefined(name, value.kind())
                });
            }
            report = report.with_record(record);
        }

        let config = BridgeConfig::default();
        let mut env = InMemoryHeap::new(&config.heap);
        let cb = env.register_callback();
        StatsCollectorCallbackWrapper::new(cb, &config)
            .on_stats_delivered(&mut env, &report)
            .unwrap();
        let delivered = env.delivered_reports(cb).unwrap();
        prop_assert_eq!(delivered.len(), 1);

        let out = &delivered[0];
        let expected_ids: Vec<&str> = report.iter().map(|r| r.id.as_str()).collect();
        prop_assert_eq!(out.record_ids(), expected_ids);
        for record in &report {
            let projected = out.record(&record.id).unwrap();
            let expected: Vec<&str> = record.defined_members().map(Member::name).collect();
            prop_assert_eq!(projected.member_names(), expected);
            for member in record.defined_members() {
                let expected_value = encoded(member.value().unwrap());
                prop_assert_eq!(projected.member(member.name()), Some(&expected_value));
            }
        }
    }
}
