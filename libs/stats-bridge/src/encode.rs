//! Value encoder: one member payload to one boxed foreign value.
//!
//! | source   | foreign                                   |
//! |----------|-------------------------------------------|
//! | bool     | `Boolean`                                 |
//! | int32    | `Integer`                                 |
//! | uint32   | `Long` (an `Integer` would go negative)   |
//! | int64    | `Long`                                    |
//! | uint64   | `BigInteger` built from the decimal text  |
//! | double   | `Double`                                  |
//! | string   | `String`                                  |
//!
//! Sequences become fixed-length arrays of the same boxed class, element by
//! element.

use stats_api::MemberValue;

use crate::env::{BoxedClass, ForeignEnv, LocalRef};
use crate::error::ForeignError;

/// Encode one defined member value into a new local reference.
pub fn encode<E: ForeignEnv + ?Sized>(
    env: &mut E,
    value: &MemberValue,
) -> Result<LocalRef, ForeignError> {
    match value {
        MemberValue::Bool(v) => env.new_boolean(*v),
        MemberValue::Int32(v) => env.new_integer(*v),
        MemberValue::Uint32(v) => env.new_long(i64::from(*v)),
        MemberValue::Int64(v) => env.new_long(*v),
        MemberValue::Uint64(_) => big_integer(env, &value.to_string()),
        MemberValue::Double(v) => env.new_double(*v),
        MemberValue::String(v) => env.new_string(v),
        MemberValue::SequenceBool(items) => {
            array(env, BoxedClass::Boolean, items, |env, v| env.new_boolean(*v))
        }
        MemberValue::SequenceInt32(items) => {
            array(env, BoxedClass::Integer, items, |env, v| env.new_integer(*v))
        }
        MemberValue::SequenceUint32(items) => array(env, BoxedClass::Long, items, |env, v| {
            env.new_long(i64::from(*v))
        }),
        MemberValue::SequenceInt64(items) => {
            array(env, BoxedClass::Long, items, |env, v| env.new_long(*v))
        }
        MemberValue::SequenceUint64(items) => {
            array(env, BoxedClass::BigInteger, items, |env, v| {
                big_integer(env, &MemberValue::Uint64(*v).to_string())
            })
        }
        MemberValue::SequenceDouble(items) => {
            array(env, BoxedClass::Double, items, |env, v| env.new_double(*v))
        }
        MemberValue::SequenceString(items) => {
            array(env, BoxedClass::String, items, |env, v| env.new_string(v))
        }
    }
}

/// uint64 does not fit a signed 64-bit long; go through the member's
/// decimal text.
fn big_integer<E: ForeignEnv + ?Sized>(env: &mut E, decimal: &str) -> Result<LocalRef, ForeignError> {
    let text = env.new_string(decimal)?;
    let big = env.new_big_integer(text)?;
    env.delete_local_ref(text);
    Ok(big)
}

/// Element temporaries are deleted as soon as they are stored, so a sequence
/// holds one live reference (the array) no matter its length.
fn array<E, T, F>(
    env: &mut E,
    class: BoxedClass,
    items: &[T],
    mut element: F,
) -> Result<LocalRef, ForeignError>
where
    E: ForeignEnv + ?Sized,
    F: FnMut(&mut E, &T) -> Result<LocalRef, ForeignError>,
{
    let array = env.new_object_array(items.len(), class)?;
    for (index, item) in items.iter().enumerate() {
        let value = element(env, item)?;
        env.set_object_array_element(array, index, value)?;
        env.delete_local_ref(value);
    }
    Ok(array)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::HeapConfig;
    use crate::foreign::ForeignValue;
    use crate::heap::InMemoryHeap;

    fn encoded(value: MemberValue) -> ForeignValue {
        let mut env = InMemoryHeap::new(&HeapConfig::default());
        let obj = encode(&mut env, &value).unwrap();
        env.export_value(obj).unwrap()
    }

    #[test]
    fn scalars_map_to_boxed_types() {
        assert_eq!(encoded(MemberValue::Bool(true)), ForeignValue::Boolean(true));
        assert_eq!(encoded(MemberValue::Int32(-42)), ForeignValue::Integer(-42));
        assert_eq!(encoded(MemberValue::Int64(i64::MIN)), ForeignValue::Long(i64::MIN));
        assert_eq!(encoded(MemberValue::Double(0.25)), ForeignValue::Double(0.25));
        assert_eq!(
            encoded(MemberValue::String("opus".into())),
            ForeignValue::String("opus".into())
        );
    }

    #[test]
    fn uint32_widens_to_long() {
        assert_eq!(
            encoded(MemberValue::Uint32(u32::MAX)),
            ForeignValue::Long(4294967295)
        );
        assert_eq!(
            encoded(MemberValue::Uint32(1 << 31)),
            ForeignValue::Long(2147483648)
        );
    }

    #[test]
    fn uint64_goes_through_decimal_text() {
        assert_eq!(
            encoded(MemberValue::Uint64(u64::MAX)),
            ForeignValue::BigInteger("18446744073709551615".into())
        );
        assert_eq!(
            encoded(MemberValue::Uint64(0)),
            ForeignValue::BigInteger("0".into())
        );
    }

    #[test]
    fn sequences_keep_length_order_and_class() {
        assert_eq!(
            encoded(MemberValue::SequenceUint32(vec![3, u32::MAX, 1])),
            ForeignValue::Array {
                class: BoxedClass::Long,
                items: vec![
                    ForeignValue::Long(3),
                    ForeignValue::Long(4294967295),
                    ForeignValue::Long(1),
                ],
            }
        );
        assert_eq!(
            encoded(MemberValue::SequenceUint64(vec![u64::MAX, 7])),
            ForeignValue::Array {
                class: BoxedClass::BigInteger,
                items: vec![
                    ForeignValue::BigInteger("18446744073709551615".into()),
                    ForeignValue::BigInteger("7".into()),
                ],
            }
        );
        assert_eq!(
            encoded(MemberValue::SequenceString(vec!["a".into(), "b".into()])),
            ForeignValue::Array {
                class: BoxedClass::String,
                items: vec![ForeignValue::String("a".into()), ForeignValue::String("b".into())],
            }
        );
    }

    #[test]
    fn empty_sequence_is_empty_array() {
        assert_eq!(
            encoded(MemberValue::SequenceDouble(vec![])),
            ForeignValue::Array {
                class: BoxedClass::Double,
                items: vec![],
            }
        );
        assert_eq!(
            encoded(MemberValue::SequenceBool(vec![])),
            ForeignValue::Array {
                class: BoxedClass::Boolean,
                items: vec![],
            }
        );
    }

    #[test]
    fn long_sequence_holds_one_live_reference() {
        let mut env = InMemoryHeap::new(&HeapConfig {
            local_ref_capacity: 4,
        });
        let items: Vec<u64> = (0..10_000).collect();
        let obj = encode(&mut env, &MemberValue::SequenceUint64(items)).unwrap();
        assert_eq!(env.live_local_refs(), 1);
        assert!(env.peak_local_refs() <= 3);
        match env.export_value(obj).unwrap() {
            ForeignValue::Array { items, .. } => {
                assert_eq!(items.len(), 10_000);
                assert_eq!(items[9_999], ForeignValue::BigInteger("9999".into()));
            }
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn allocation_failure_propagates() {
        let mut env = InMemoryHeap::new(&HeapConfig::default());
        env.fail_allocation_after(2);
        let err = encode(&mut env, &MemberValue::SequenceInt32(vec![1, 2, 3])).unwrap_err();
        assert_eq!(err, ForeignError::OutOfMemory);
        assert!(env.exception_pending());
    }
}
