use crate::error::ForeignError;

/// Handle to a temporary reference owned by the innermost local frame.
///
/// Becomes invalid when its frame is popped or when it is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalRef(u64);

impl LocalRef {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn into_raw(self) -> u64 {
        self.0
    }
}

/// Handle to a long-lived callback registered on the foreign side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackRef(u64);

impl CallbackRef {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn into_raw(self) -> u64 {
        self.0
    }
}

/// Element class of a foreign object array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxedClass {
    Boolean,
    Integer,
    Long,
    BigInteger,
    Double,
    String,
}

impl BoxedClass {
    pub fn name(self) -> &'static str {
        match self {
            BoxedClass::Boolean => "java/lang/Boolean",
            BoxedClass::Integer => "java/lang/Integer",
            BoxedClass::Long => "java/lang/Long",
            BoxedClass::BigInteger => "java/math/BigInteger",
            BoxedClass::Double => "java/lang/Double",
            BoxedClass::String => "java/lang/String",
        }
    }
}

/// Operations the marshaller needs from the destination runtime.
///
/// The destination has no unsigned integers and only boxed-object
/// collections. Every constructor returns a new local reference in the
/// innermost frame. Implementations must leave a pending exception behind on
/// failure; callers abort the walk on the first error.
pub trait ForeignEnv {
    /// Open a new local frame able to hold at least `capacity` references.
    fn push_local_frame(&mut self, capacity: usize) -> Result<(), ForeignError>;

    /// Release every local reference created since the matching push.
    fn pop_local_frame(&mut self);

    /// Release a single local reference before its frame ends.
    fn delete_local_ref(&mut self, obj: LocalRef);

    fn new_boolean(&mut self, value: bool) -> Result<LocalRef, ForeignError>;

    fn new_integer(&mut self, value: i32) -> Result<LocalRef, ForeignError>;

    fn new_long(&mut self, value: i64) -> Result<LocalRef, ForeignError>;

    /// Arbitrary-precision integer parsed from a foreign decimal string.
    fn new_big_integer(&mut self, decimal: LocalRef) -> Result<LocalRef, ForeignError>;

    fn new_double(&mut self, value: f64) -> Result<LocalRef, ForeignError>;

    fn new_string(&mut self, value: &str) -> Result<LocalRef, ForeignError>;

    /// Fixed-length array of `class`, every element initially null.
    fn new_object_array(&mut self, len: usize, class: BoxedClass)
    -> Result<LocalRef, ForeignError>;

    fn set_object_array_element(
        &mut self,
        array: LocalRef,
        index: usize,
        value: LocalRef,
    ) -> Result<(), ForeignError>;

    /// Empty insertion-ordered map.
    fn new_linked_hash_map(&mut self) -> Result<LocalRef, ForeignError>;

    fn map_put(&mut self, map: LocalRef, key: LocalRef, value: LocalRef)
    -> Result<(), ForeignError>;

    /// `RTCStats(timestamp_us, type, id, members)`.
    fn new_stats(
        &mut self,
        timestamp_us: i64,
        type_: LocalRef,
        id: LocalRef,
        members: LocalRef,
    ) -> Result<LocalRef, ForeignError>;

    /// `RTCStatsReport(timestamp_us, stats)`.
    fn new_stats_report(
        &mut self,
        timestamp_us: i64,
        stats: LocalRef,
    ) -> Result<LocalRef, ForeignError>;

    /// Invoke `onStatsDelivered(report)` on a registered callback.
    fn call_on_stats_delivered(
        &mut self,
        callback: CallbackRef,
        report: LocalRef,
    ) -> Result<(), ForeignError>;
}
