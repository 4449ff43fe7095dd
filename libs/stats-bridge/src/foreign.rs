//! Plain Rust copy of a projected foreign object graph.
//!
//! Produced by [`crate::heap::InMemoryHeap`] for assertions and JSON output.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::env::BoxedClass;

/// A boxed value as seen by the destination runtime.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignValue {
    Null,
    Boolean(bool),
    Integer(i32),
    Long(i64),
    /// Decimal text of the arbitrary-precision integer.
    BigInteger(String),
    Double(f64),
    String(String),
    Array {
        class: BoxedClass,
        items: Vec<ForeignValue>,
    },
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ForeignRecord {
    pub timestamp_us: i64,
    #[serde(rename = "type")]
    pub type_: String,
    pub id: String,
    #[serde(serialize_with = "ordered_map")]
    pub members: Vec<(String, ForeignValue)>,
}

impl ForeignRecord {
    pub fn member(&self, name: &str) -> Option<&ForeignValue> {
        self.members.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn member_names(&self) -> Vec<&str> {
        self.members.iter().map(|(k, _)| k.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ForeignReport {
    pub timestamp_us: i64,
    #[serde(serialize_with = "ordered_map")]
    pub records: Vec<(String, ForeignRecord)>,
}

impl ForeignReport {
    pub fn record(&self, id: &str) -> Option<&ForeignRecord> {
        self.records.iter().find(|(k, _)| k == id).map(|(_, v)| v)
    }

    pub fn record_ids(&self) -> Vec<&str> {
        self.records.iter().map(|(k, _)| k.as_str()).collect()
    }
}

/// Serialize insertion-ordered pairs as a JSON object, keeping the order.
fn ordered_map<V: Serialize, S: Serializer>(
    entries: &[(String, V)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (k, v) in entries {
        map.serialize_entry(k, v)?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_keeps_insertion_order_and_types() {
        let report = ForeignReport {
            timestamp_us: 1000,
            records: vec![(
                "ssrc_1".into(),
                ForeignRecord {
                    timestamp_us: 1000,
                    type_: "outbound-rtp".into(),
                    id: "ssrc_1".into(),
                    members: vec![
                        ("zeta".into(), ForeignValue::Long(4294967295)),
                        ("alpha".into(), ForeignValue::BigInteger("18446744073709551615".into())),
                    ],
                },
            )],
        };
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"timestamp_us":1000,"records":{"ssrc_1":{"timestamp_us":1000,"type":"outbound-rtp","#,
                r#""id":"ssrc_1","members":{"zeta":{"long":4294967295},"alpha":{"big_integer":"18446744073709551615"}}}}}"#
            )
        );
    }

    #[test]
    fn arrays_carry_element_class() {
        let value = ForeignValue::Array {
            class: BoxedClass::Integer,
            items: vec![ForeignValue::Integer(1)],
        };
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"array":{"class":"integer","items":[{"integer":1}]}}"#);
    }
}
