use std::fmt;

/// Closed set of member value kinds.
///
/// Seven scalar kinds and the sequence form of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Bool,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Double,
    String,
    SequenceBool,
    SequenceInt32,
    SequenceUint32,
    SequenceInt64,
    SequenceUint64,
    SequenceDouble,
    SequenceString,
}

impl MemberKind {
    pub fn name(self) -> &'static str {
        match self {
            MemberKind::Bool => "bool",
            MemberKind::Int32 => "int32",
            MemberKind::Uint32 => "uint32",
            MemberKind::Int64 => "int64",
            MemberKind::Uint64 => "uint64",
            MemberKind::Double => "double",
            MemberKind::String => "string",
            MemberKind::SequenceBool => "sequence_bool",
            MemberKind::SequenceInt32 => "sequence_int32",
            MemberKind::SequenceUint32 => "sequence_uint32",
            MemberKind::SequenceInt64 => "sequence_int64",
            MemberKind::SequenceUint64 => "sequence_uint64",
            MemberKind::SequenceDouble => "sequence_double",
            MemberKind::SequenceString => "sequence_string",
        }
    }

    /// Scalar kind of the elements of a sequence kind. `None` for scalars.
    pub fn element_kind(self) -> Option<MemberKind> {
        match self {
            MemberKind::SequenceBool => Some(MemberKind::Bool),
            MemberKind::SequenceInt32 => Some(MemberKind::Int32),
            MemberKind::SequenceUint32 => Some(MemberKind::Uint32),
            MemberKind::SequenceInt64 => Some(MemberKind::Int64),
            MemberKind::SequenceUint64 => Some(MemberKind::Uint64),
            MemberKind::SequenceDouble => Some(MemberKind::Double),
            MemberKind::SequenceString => Some(MemberKind::String),
            MemberKind::Bool
            | MemberKind::Int32
            | MemberKind::Uint32
            | MemberKind::Int64
            | MemberKind::Uint64
            | MemberKind::Double
            | MemberKind::String => None,
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload of a defined member. The constructor determines the kind.
///
/// Serializes as the bare payload; decoding needs the declared kind and goes
/// through [`crate::record::Member`]. Non-finite doubles serialize as the
/// strings `"NaN"`, `"Infinity"` and `"-Infinity"`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum MemberValue {
    Bool(bool),
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    #[serde(serialize_with = "double::serialize")]
    Double(f64),
    String(String),
    SequenceBool(Vec<bool>),
    SequenceInt32(Vec<i32>),
    SequenceUint32(Vec<u32>),
    SequenceInt64(Vec<i64>),
    SequenceUint64(Vec<u64>),
    #[serde(serialize_with = "double::serialize_seq")]
    SequenceDouble(Vec<f64>),
    SequenceString(Vec<String>),
}

impl MemberValue {
    pub fn kind(&self) -> MemberKind {
        match self {
            MemberValue::Bool(_) => MemberKind::Bool,
            MemberValue::Int32(_) => MemberKind::Int32,
            MemberValue::Uint32(_) => MemberKind::Uint32,
            MemberValue::Int64(_) => MemberKind::Int64,
            MemberValue::Uint64(_) => MemberKind::Uint64,
            MemberValue::Double(_) => MemberKind::Double,
            MemberValue::String(_) => MemberKind::String,
            MemberValue::SequenceBool(_) => MemberKind::SequenceBool,
            MemberValue::SequenceInt32(_) => MemberKind::SequenceInt32,
            MemberValue::SequenceUint32(_) => MemberKind::SequenceUint32,
            MemberValue::SequenceInt64(_) => MemberKind::SequenceInt64,
            MemberValue::SequenceUint64(_) => MemberKind::SequenceUint64,
            MemberValue::SequenceDouble(_) => MemberKind::SequenceDouble,
            MemberValue::SequenceString(_) => MemberKind::SequenceString,
        }
    }
}

fn write_seq<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    f.write_str("[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str("]")
}

/// Textual rendering. Integers are plain decimal, which the uint64 encoding
/// relies on.
impl fmt::Display for MemberValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberValue::Bool(v) => write!(f, "{v}"),
            MemberValue::Int32(v) => write!(f, "{v}"),
            MemberValue::Uint32(v) => write!(f, "{v}"),
            MemberValue::Int64(v) => write!(f, "{v}"),
            MemberValue::Uint64(v) => write!(f, "{v}"),
            MemberValue::Double(v) => write!(f, "{v}"),
            MemberValue::String(v) => f.write_str(v),
            MemberValue::SequenceBool(v) => write_seq(f, v),
            MemberValue::SequenceInt32(v) => write_seq(f, v),
            MemberValue::SequenceUint32(v) => write_seq(f, v),
            MemberValue::SequenceInt64(v) => write_seq(f, v),
            MemberValue::SequenceUint64(v) => write_seq(f, v),
            MemberValue::SequenceDouble(v) => write_seq(f, v),
            MemberValue::SequenceString(v) => write_seq(f, v),
        }
    }
}

/// JSON has no NaN or infinities, so non-finite doubles travel as text.
pub(crate) mod double {
    use serde::ser::{Serialize, Serializer};

    pub(crate) fn from_text(text: &str) -> Option<f64> {
        match text {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            _ => None,
        }
    }

    pub(crate) fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { "Infinity" } else { "-Infinity" })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub(crate) fn serialize_seq<S: Serializer>(
        items: &[f64],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(items.iter().map(|v| Double(*v)))
    }

    struct Double(f64);

    impl Serialize for Double {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serialize(&self.0, serializer)
        }
    }
}
