pub mod error;
pub mod record;
pub mod report;
pub mod value;

pub use error::ModelError;
pub use record::{Member, Record};
pub use report::Report;
pub use value::{MemberKind, MemberValue};
