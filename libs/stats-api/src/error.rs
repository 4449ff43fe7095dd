use crate::value::MemberKind;

/// Errors raised while building or decoding the statistics model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("member '{name}' declared as {declared} but carries a {actual} value")]
    KindMismatch {
        name: String,
        declared: MemberKind,
        actual: MemberKind,
    },
}
