pub mod config;
pub mod delivery;
pub mod encode;
pub mod env;
pub mod error;
pub mod foreign;
pub mod frame;
pub mod heap;
pub mod project;

pub use config::{BridgeConfig, HeapConfig};
pub use delivery::StatsCollectorCallbackWrapper;
pub use env::{BoxedClass, CallbackRef, ForeignEnv, LocalRef};
pub use error::{BridgeError, ForeignError};
pub use foreign::{ForeignRecord, ForeignReport, ForeignValue};
pub use frame::LocalFrame;
pub use heap::{InMemoryHeap, ObjectId};
pub use project::{FrameCapacities, Projector};
