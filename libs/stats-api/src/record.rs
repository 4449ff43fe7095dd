use crate::error::ModelError;
use crate::value::{MemberKind, MemberValue, double};

/// One named field of a record. May be undefined, in which case it only
/// carries its declared kind.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "MemberRepr")]
pub struct Member {
    name: String,
    kind: MemberKind,
    value: Option<MemberValue>,
}

impl Member {
    pub fn defined(name: impl Into<String>, value: MemberValue) -> Self {
        Self {
            name: name.into(),
            kind: value.kind(),
            value: Some(value),
        }
    }

    pub fn undefined(name: impl Into<String>, kind: MemberKind) -> Self {
        Self {
            name: name.into(),
            kind,
            value: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn is_defined(&self) -> bool {
        self.value.is_some()
    }

    pub fn value(&self) -> Option<&MemberValue> {
        self.value.as_ref()
    }
}

/// One statistics entity (e.g. the counters of one RTP stream).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub timestamp_us: i64,
    /// Declaration order is preserved.
    #[serde(default)]
    pub members: Vec<Member>,
}

impl Record {
    pub fn new(id: impl Into<String>, type_: impl Into<String>, timestamp_us: i64) -> Self {
        Self {
            id: id.into(),
            type_: type_.into(),
            timestamp_us,
            members: Vec::new(),
        }
    }

    pub fn with_member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Members that carry a value, in declaration order.
    pub fn defined_members(&self) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(|m| m.is_defined())
    }
}

// ---------------------------------------------------------------------------
// Decoding: the payload is read according to the declared kind
// ---------------------------------------------------------------------------

#[derive(serde::Deserialize)]
struct MemberRepr {
    name: String,
    kind: MemberKind,
    #[serde(default)]
    value: Option<RawValue>,
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum RawValue {
    Bool(bool),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(String),
    Seq(Vec<RawValue>),
}

impl RawValue {
    fn describe(&self) -> MemberKind {
        match self {
            RawValue::Bool(_) => MemberKind::Bool,
            RawValue::Unsigned(_) => MemberKind::Uint64,
            RawValue::Signed(_) => MemberKind::Int64,
            RawValue::Float(_) => MemberKind::Double,
            RawValue::Text(_) => MemberKind::String,
            RawValue::Seq(_) => MemberKind::SequenceString,
        }
    }
}

fn scalar(name: &str, kind: MemberKind, raw: RawValue) -> Result<MemberValue, ModelError> {
    let mismatch = |raw: &RawValue| ModelError::KindMismatch {
        name: name.to_string(),
        declared: kind,
        actual: raw.describe(),
    };
    let value = match (kind, raw) {
        (MemberKind::Bool, RawValue::Bool(v)) => MemberValue::Bool(v),
        (MemberKind::Int32, RawValue::Unsigned(v)) => {
            MemberValue::Int32(i32::try_from(v).map_err(|_| mismatch(&RawValue::Unsigned(v)))?)
        }
        (MemberKind::Int32, RawValue::Signed(v)) => {
            MemberValue::Int32(i32::try_from(v).map_err(|_| mismatch(&RawValue::Signed(v)))?)
        }
        (MemberKind::Uint32, RawValue::Unsigned(v)) => {
            MemberValue::Uint32(u32::try_from(v).map_err(|_| mismatch(&RawValue::Unsigned(v)))?)
        }
        (MemberKind::Int64, RawValue::Unsigned(v)) => {
            MemberValue::Int64(i64::try_from(v).map_err(|_| mismatch(&RawValue::Unsigned(v)))?)
        }
        (MemberKind::Int64, RawValue::Signed(v)) => MemberValue::Int64(v),
        (MemberKind::Uint64, RawValue::Unsigned(v)) => MemberValue::Uint64(v),
        (MemberKind::Double, RawValue::Float(v)) => MemberValue::Double(v),
        (MemberKind::Double, RawValue::Unsigned(v)) => MemberValue::Double(v as f64),
        (MemberKind::Double, RawValue::Signed(v)) => MemberValue::Double(v as f64),
        (MemberKind::Double, RawValue::Text(v)) => match double::from_text(&v) {
            Some(x) => MemberValue::Double(x),
            None => return Err(mismatch(&RawValue::Text(v))),
        },
        (MemberKind::String, RawValue::Text(v)) => MemberValue::String(v),
        (_, raw) => return Err(mismatch(&raw)),
    };
    Ok(value)
}

fn sequence<T>(
    name: &str,
    element: MemberKind,
    items: Vec<RawValue>,
    unwrap: impl Fn(MemberValue) -> Option<T>,
) -> Result<Vec<T>, ModelError> {
    items
        .into_iter()
        .map(|raw| {
            let value = scalar(name, element, raw)?;
            let actual = value.kind();
            unwrap(value).ok_or(ModelError::KindMismatch {
                name: name.to_string(),
                declared: element,
                actual,
            })
        })
        .collect()
}

fn decode(name: &str, kind: MemberKind, raw: RawValue) -> Result<MemberValue, ModelError> {
    let Some(element) = kind.element_kind() else {
        return scalar(name, kind, raw);
    };
    let items = match raw {
        RawValue::Seq(items) => items,
        other => {
            return Err(ModelError::KindMismatch {
                name: name.to_string(),
                declared: kind,
                actual: other.describe(),
            });
        }
    };
    let value = match kind {
        MemberKind::SequenceBool => MemberValue::SequenceBool(sequence(name, element, items, |v| {
            if let MemberValue::Bool(b) = v { Some(b) } else { None }
        })?),
        MemberKind::SequenceInt32 => MemberValue::SequenceInt32(sequence(name, element, items, |v| {
            if let MemberValue::Int32(x) = v { Some(x) } else { None }
        })?),
        MemberKind::SequenceUint32 => MemberValue::SequenceUint32(sequence(name, element, items, |v| {
            if let MemberValue::Uint32(x) = v { Some(x) } else { None }
        })?),
        MemberKind::SequenceInt64 => MemberValue::SequenceInt64(sequence(name, element, items, |v| {
            if let MemberValue::Int64(x) = v { Some(x) } else { None }
        })?),
        MemberKind::SequenceUint64 => MemberValue::SequenceUint64(sequence(name, element, items, |v| {
            if let MemberValue::Uint64(x) = v { Some(x) } else { None }
        })?),
        MemberKind::SequenceDouble => MemberValue::SequenceDouble(sequence(name, element, items, |v| {
            if let MemberValue::Double(x) = v { Some(x) } else { None }
        })?),
        MemberKind::SequenceString => MemberValue::SequenceString(sequence(name, element, items, |v| {
            if let MemberValue::String(s) = v { Some(s) } else { None }
        })?),
        scalar_kind => return scalar(name, scalar_kind, RawValue::Seq(items)),
    };
    Ok(value)
}

impl TryFrom<MemberRepr> for Member {
    type Error = ModelError;

    fn try_from(repr: MemberRepr) -> Result<Self, Self::Error> {
        let value = match repr.value {
            Some(raw) => Some(decode(&repr.name, repr.kind, raw)?),
            None => None,
        };
        Ok(Self {
            name: repr.name,
            kind: repr.kind,
            value,
        })
    }
}
