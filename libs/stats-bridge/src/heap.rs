//! In-memory foreign runtime.
//!
//! Models the destination side of the bridge: a garbage-free object arena,
//! a bounded table of local references organised in frames, a sticky pending
//! exception and a registry of `onStatsDelivered` callbacks.

use std::collections::HashMap;
use std::str::FromStr;

use bigdecimal::BigDecimal;

use crate::config::HeapConfig;
use crate::env::{BoxedClass, CallbackRef, ForeignEnv, LocalRef};
use crate::error::ForeignError;
use crate::foreign::{ForeignRecord, ForeignReport, ForeignValue};

/// Identity of an object in the heap. Stable for the heap's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(usize);

enum Object {
    Boolean(bool),
    Integer(i32),
    Long(i64),
    /// Always an integer (scale 0).
    BigInteger(BigDecimal),
    Double(f64),
    String(String),
    Array {
        class: BoxedClass,
        items: Vec<Option<ObjectId>>,
    },
    /// `LinkedHashMap`: a put on an existing key keeps the key's position.
    Map {
        entries: Vec<(ObjectId, ObjectId)>,
        index: HashMap<MapKey, usize>,
    },
    Stats {
        timestamp_us: i64,
        type_: ObjectId,
        id: ObjectId,
        members: ObjectId,
    },
    Report {
        timestamp_us: i64,
        stats: ObjectId,
    },
}

impl Object {
    fn type_name(&self) -> &'static str {
        match self {
            Object::Boolean(_) => BoxedClass::Boolean.name(),
            Object::Integer(_) => BoxedClass::Integer.name(),
            Object::Long(_) => BoxedClass::Long.name(),
            Object::BigInteger(_) => BoxedClass::BigInteger.name(),
            Object::Double(_) => BoxedClass::Double.name(),
            Object::String(_) => BoxedClass::String.name(),
            Object::Array { .. } => "java/lang/Object[]",
            Object::Map { .. } => "java/util/LinkedHashMap",
            Object::Stats { .. } => "org/webrtc/RTCStats",
            Object::Report { .. } => "org/webrtc/RTCStatsReport",
        }
    }

    fn instance_of(&self, class: BoxedClass) -> bool {
        matches!(
            (self, class),
            (Object::Boolean(_), BoxedClass::Boolean)
                | (Object::Integer(_), BoxedClass::Integer)
                | (Object::Long(_), BoxedClass::Long)
                | (Object::BigInteger(_), BoxedClass::BigInteger)
                | (Object::Double(_), BoxedClass::Double)
                | (Object::String(_), BoxedClass::String)
        )
    }

    /// Hash key for `id`: boxed values compare by content, everything else
    /// by identity.
    fn map_key(&self, id: ObjectId) -> MapKey {
        match self {
            Object::String(v) => MapKey::String(v.clone()),
            Object::Boolean(v) => MapKey::Boolean(*v),
            Object::Integer(v) => MapKey::Integer(*v),
            Object::Long(v) => MapKey::Long(*v),
            Object::BigInteger(v) => MapKey::BigInteger(v.clone()),
            _ => MapKey::Identity(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum MapKey {
    String(String),
    Boolean(bool),
    Integer(i32),
    Long(i64),
    BigInteger(BigDecimal),
    Identity(ObjectId),
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    object: ObjectId,
    serial: u32,
}

struct Frame {
    /// First slot index owned by this frame.
    base: usize,
}

#[derive(Default)]
struct Callback {
    delivered: Vec<ObjectId>,
    throws: Option<String>,
}

/// In-memory implementation of [`ForeignEnv`].
///
/// Nothing is ever collected: objects stay in the arena and every delivered
/// report stays recorded until the heap is dropped. Use one heap per
/// delivery run (the CLI and the tests do) rather than a long-lived one.
pub struct InMemoryHeap {
    objects: Vec<Object>,
    slots: Vec<Option<Slot>>,
    frames: Vec<Frame>,
    live: usize,
    peak: usize,
    capacity: usize,
    next_serial: u32,
    pending: Option<String>,
    allocation_budget: Option<usize>,
    callbacks: Vec<Callback>,
}

impl InMemoryHeap {
    /// New heap with one open base frame, like a thread entering native code.
    pub fn new(config: &HeapConfig) -> Self {
        Self {
            objects: Vec::new(),
            slots: Vec::new(),
            frames: vec![Frame { base: 0 }],
            live: 0,
            peak: 0,
            capacity: config.local_ref_capacity,
            next_serial: 1,
            pending: None,
            allocation_budget: None,
            callbacks: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Test and tooling hooks
    // -----------------------------------------------------------------------

    pub fn register_callback(&mut self) -> CallbackRef {
        self.callbacks.push(Callback::default());
        CallbackRef::from_raw(self.callbacks.len() as u64 - 1)
    }

    /// Make the callback throw `message` on every invocation.
    pub fn set_callback_throws(&mut self, callback: CallbackRef, message: impl Into<String>) {
        if let Some(cb) = self.callbacks.get_mut(callback.into_raw() as usize) {
            cb.throws = Some(message.into());
        }
    }

    /// Let `count` more allocations succeed, then fail with `OutOfMemory`.
    pub fn fail_allocation_after(&mut self, count: usize) {
        self.allocation_budget = Some(count);
    }

    pub fn exception_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn clear_exception(&mut self) {
        self.pending = None;
        self.allocation_budget = None;
    }

    pub fn live_local_refs(&self) -> usize {
        self.live
    }

    pub fn peak_local_refs(&self) -> usize {
        self.peak
    }

    /// Open frames, including the base frame.
    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Reports received by a callback, oldest first.
    pub fn delivered(&self, callback: CallbackRef) -> Result<&[ObjectId], ForeignError> {
        self.callbacks
            .get(callback.into_raw() as usize)
            .map(|cb| cb.delivered.as_slice())
            .ok_or(ForeignError::UnknownCallback)
    }

    pub fn delivered_reports(&self, callback: CallbackRef) -> Result<Vec<ForeignReport>, ForeignError> {
        self.delivered(callback)?
            .iter()
            .map(|id| self.export_report(*id))
            .collect()
    }

    /// Resolve a local reference to the object it points at.
    pub fn object_id(&self, obj: LocalRef) -> Result<ObjectId, ForeignError> {
        self.resolve(obj)
    }

    /// Every object reachable from `root`, `root` included, in visit order.
    pub fn reachable_objects(&self, root: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            match &self.objects[id.0] {
                Object::Array { items, .. } => stack.extend(items.iter().rev().flatten()),
                Object::Map { entries, .. } => {
                    for (k, v) in entries.iter().rev() {
                        stack.push(*v);
                        stack.push(*k);
                    }
                }
                Object::Stats {
                    type_,
                    id: stats_id,
                    members,
                    ..
                } => stack.extend([*members, *stats_id, *type_]),
                Object::Report { stats, .. } => stack.push(*stats),
                _ => {}
            }
        }
        out
    }

    pub fn export_value(&self, obj: LocalRef) -> Result<ForeignValue, ForeignError> {
        self.export_object(self.resolve(obj)?)
    }

    pub fn export_report_ref(&self, obj: LocalRef) -> Result<ForeignReport, ForeignError> {
        self.export_report(self.resolve(obj)?)
    }

    pub fn export_report(&self, id: ObjectId) -> Result<ForeignReport, ForeignError> {
        let Object::Report {
            timestamp_us,
            stats,
        } = self.get(id)
        else {
            return Err(self.mismatch("org/webrtc/RTCStatsReport", id));
        };
        let records: Vec<(String, ForeignRecord)> = self
            .map_entries(*stats)?
            .iter()
            .map(|(k, v)| -> Result<_, ForeignError> {
                Ok((self.string(*k)?.to_string(), self.export_record(*v)?))
            })
            .collect::<Result<_, _>>()?;
        Ok(ForeignReport {
            timestamp_us: *timestamp_us,
            records,
        })
    }

    fn export_record(&self, id: ObjectId) -> Result<ForeignRecord, ForeignError> {
        let Object::Stats {
            timestamp_us,
            type_,
            id: stats_id,
            members,
        } = self.get(id)
        else {
            return Err(self.mismatch("org/webrtc/RTCStats", id));
        };
        let members: Vec<(String, ForeignValue)> = self
            .map_entries(*members)?
            .iter()
            .map(|(k, v)| -> Result<_, ForeignError> {
                Ok((self.string(*k)?.to_string(), self.export_object(*v)?))
            })
            .collect::<Result<_, _>>()?;
        Ok(ForeignRecord {
            timestamp_us: *timestamp_us,
            type_: self.string(*type_)?.to_string(),
            id: self.string(*stats_id)?.to_string(),
            members,
        })
    }

    fn export_object(&self, id: ObjectId) -> Result<ForeignValue, ForeignError> {
        let value = match self.get(id) {
            Object::Boolean(v) => ForeignValue::Boolean(*v),
            Object::Integer(v) => ForeignValue::Integer(*v),
            Object::Long(v) => ForeignValue::Long(*v),
            Object::BigInteger(v) => ForeignValue::BigInteger(v.as_bigint_and_exponent().0.to_string()),
            Object::Double(v) => ForeignValue::Double(*v),
            Object::String(v) => ForeignValue::String(v.clone()),
            Object::Array { class, items } => ForeignValue::Array {
                class: *class,
                items: items
                    .iter()
                    .map(|item| match item {
                        Some(item) => self.export_object(*item),
                        None => Ok(ForeignValue::Null),
                    })
                    .collect::<Result<_, _>>()?,
            },
            other => {
                return Err(ForeignError::TypeMismatch {
                    expected: "boxed value",
                    found: other.type_name(),
                });
            }
        };
        Ok(value)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn get(&self, id: ObjectId) -> &Object {
        &self.objects[id.0]
    }

    fn mismatch(&self, expected: &'static str, id: ObjectId) -> ForeignError {
        ForeignError::TypeMismatch {
            expected,
            found: self.get(id).type_name(),
        }
    }

    fn string(&self, id: ObjectId) -> Result<&str, ForeignError> {
        match self.get(id) {
            Object::String(s) => Ok(s.as_str()),
            _ => Err(self.mismatch("java/lang/String", id)),
        }
    }

    fn map_entries(&self, id: ObjectId) -> Result<&[(ObjectId, ObjectId)], ForeignError> {
        match self.get(id) {
            Object::Map { entries, .. } => Ok(entries.as_slice()),
            _ => Err(self.mismatch("java/util/LinkedHashMap", id)),
        }
    }

    /// Record `err` as the pending exception and hand it back.
    fn throw(&mut self, err: ForeignError) -> ForeignError {
        tracing::trace!(error = %err, "foreign exception raised");
        self.pending = Some(err.to_string());
        err
    }

    fn check(&self) -> Result<(), ForeignError> {
        match &self.pending {
            Some(msg) => Err(ForeignError::PendingException(msg.clone())),
            None => Ok(()),
        }
    }

    fn resolve(&self, obj: LocalRef) -> Result<ObjectId, ForeignError> {
        let raw = obj.into_raw();
        let index = (raw >> 32) as usize;
        let serial = raw as u32;
        match self.slots.get(index) {
            Some(Some(slot)) if slot.serial == serial => Ok(slot.object),
            _ => Err(ForeignError::InvalidReference),
        }
    }

    fn resolve_checked(&mut self, obj: LocalRef) -> Result<ObjectId, ForeignError> {
        self.resolve(obj).map_err(|e| self.throw(e))
    }

    fn new_local(&mut self, object: ObjectId) -> Result<LocalRef, ForeignError> {
        if self.live >= self.capacity {
            let err = ForeignError::LocalRefCapacityExceeded {
                live: self.live,
                requested: 1,
                capacity: self.capacity,
            };
            return Err(self.throw(err));
        }
        let serial = self.next_serial;
        self.next_serial = self.next_serial.wrapping_add(1).max(1);
        let index = self.slots.len();
        self.slots.push(Some(Slot { object, serial }));
        self.live += 1;
        self.peak = self.peak.max(self.live);
        Ok(LocalRef::from_raw(((index as u64) << 32) | u64::from(serial)))
    }

    fn alloc(&mut self, object: Object) -> Result<LocalRef, ForeignError> {
        self.check()?;
        if let Some(budget) = self.allocation_budget.as_mut() {
            if *budget == 0 {
                return Err(self.throw(ForeignError::OutOfMemory));
            }
            *budget -= 1;
        }
        let id = ObjectId(self.objects.len());
        self.objects.push(object);
        self.new_local(id)
    }

    fn trim_trailing_holes(&mut self) {
        let base = self.frames.last().map_or(0, |f| f.base);
        while self.slots.len() > base && matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }
    }
}

impl ForeignEnv for InMemoryHeap {
    fn push_local_frame(&mut self, capacity: usize) -> Result<(), ForeignError> {
        self.check()?;
        if self.live + capacity > self.capacity {
            let err = ForeignError::LocalRefCapacityExceeded {
                live: self.live,
                requested: capacity,
                capacity: self.capacity,
            };
            return Err(self.throw(err));
        }
        self.frames.push(Frame {
            base: self.slots.len(),
        });
        Ok(())
    }

    fn pop_local_frame(&mut self) {
        if self.frames.len() == 1 {
            tracing::warn!("pop_local_frame called on the base frame, ignoring");
            return;
        }
        if let Some(frame) = self.frames.pop() {
            let released = self.slots[frame.base..].iter().flatten().count();
            self.slots.truncate(frame.base);
            self.live -= released;
        }
    }

    fn delete_local_ref(&mut self, obj: LocalRef) {
        if self.resolve(obj).is_err() {
            return;
        }
        let index = (obj.into_raw() >> 32) as usize;
        self.slots[index] = None;
        self.live -= 1;
        self.trim_trailing_holes();
    }

    fn new_boolean(&mut self, value: bool) -> Result<LocalRef, ForeignError> {
        self.alloc(Object::Boolean(value))
    }

    fn new_integer(&mut self, value: i32) -> Result<LocalRef, ForeignError> {
        self.alloc(Object::Integer(value))
    }

    fn new_long(&mut self, value: i64) -> Result<LocalRef, ForeignError> {
        self.alloc(Object::Long(value))
    }

    fn new_big_integer(&mut self, decimal: LocalRef) -> Result<LocalRef, ForeignError> {
        self.check()?;
        let id = self.resolve_checked(decimal)?;
        let text = match self.string(id) {
            Ok(text) => text.to_string(),
            Err(e) => return Err(self.throw(e)),
        };
        let digits = text.strip_prefix(['-', '+']).unwrap_or(&text);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(self.throw(ForeignError::NumberFormat(text)));
        }
        match BigDecimal::from_str(&text) {
            Ok(value) => self.alloc(Object::BigInteger(value)),
            Err(_) => Err(self.throw(ForeignError::NumberFormat(text))),
        }
    }

    fn new_double(&mut self, value: f64) -> Result<LocalRef, ForeignError> {
        self.alloc(Object::Double(value))
    }

    fn new_string(&mut self, value: &str) -> Result<LocalRef, ForeignError> {
        self.alloc(Object::String(value.to_string()))
    }

    fn new_object_array(&mut self, len: usize, class: BoxedClass) -> Result<LocalRef, ForeignError> {
        self.alloc(Object::Array {
            class,
            items: vec![None; len],
        })
    }

    fn set_object_array_element(
        &mut self,
        array: LocalRef,
        index: usize,
        value: LocalRef,
    ) -> Result<(), ForeignError> {
        self.check()?;
        let array_id = self.resolve_checked(array)?;
        let value_id = self.resolve_checked(value)?;
        let value = &self.objects[value_id.0];
        let check = match &self.objects[array_id.0] {
            Object::Array { items, .. } if index >= items.len() => {
                Err(ForeignError::ArrayIndexOutOfBounds {
                    index,
                    len: items.len(),
                })
            }
            Object::Array { class, .. } if !value.instance_of(*class) => {
                Err(ForeignError::TypeMismatch {
                    expected: class.name(),
                    found: value.type_name(),
                })
            }
            Object::Array { .. } => Ok(()),
            other => Err(ForeignError::TypeMismatch {
                expected: "java/lang/Object[]",
                found: other.type_name(),
            }),
        };
        if let Err(e) = check {
            return Err(self.throw(e));
        }
        if let Object::Array { items, .. } = &mut self.objects[array_id.0] {
            items[index] = Some(value_id);
        }
        Ok(())
    }

    fn new_linked_hash_map(&mut self) -> Result<LocalRef, ForeignError> {
        self.alloc(Object::Map {
            entries: Vec::new(),
            index: HashMap::new(),
        })
    }

    fn map_put(&mut self, map: LocalRef, key: LocalRef, value: LocalRef) -> Result<(), ForeignError> {
        self.check()?;
        let map_id = self.resolve_checked(map)?;
        let key_id = self.resolve_checked(key)?;
        let value_id = self.resolve_checked(value)?;
        let key = match self.get(map_id) {
            Object::Map { .. } => self.get(key_id).map_key(key_id),
            other => {
                let err = ForeignError::TypeMismatch {
                    expected: "java/util/LinkedHashMap",
                    found: other.type_name(),
                };
                return Err(self.throw(err));
            }
        };
        if let Object::Map { entries, index } = &mut self.objects[map_id.0] {
            match index.get(&key).copied() {
                Some(pos) => entries[pos].1 = value_id,
                None => {
                    index.insert(key, entries.len());
                    entries.push((key_id, value_id));
                }
            }
        }
        Ok(())
    }

    fn new_stats(
        &mut self,
        timestamp_us: i64,
        type_: LocalRef,
        id: LocalRef,
        members: LocalRef,
    ) -> Result<LocalRef, ForeignError> {
        self.check()?;
        let type_ = self.resolve_checked(type_)?;
        let id = self.resolve_checked(id)?;
        let members = self.resolve_checked(members)?;
        let shape = self
            .string(type_)
            .and(self.string(id))
            .and(self.map_entries(members).map(|_| ()));
        if let Err(e) = shape {
            return Err(self.throw(e));
        }
        self.alloc(Object::Stats {
            timestamp_us,
            type_,
            id,
            members,
        })
    }

    fn new_stats_report(&mut self, timestamp_us: i64, stats: LocalRef) -> Result<LocalRef, ForeignError> {
        self.check()?;
        let stats = self.resolve_checked(stats)?;
        if let Err(e) = self.map_entries(stats) {
            return Err(self.throw(e));
        }
        self.alloc(Object::Report { timestamp_us, stats })
    }

    fn call_on_stats_delivered(
        &mut self,
        callback: CallbackRef,
        report: LocalRef,
    ) -> Result<(), ForeignError> {
        self.check()?;
        let report = self.resolve_checked(report)?;
        if !matches!(self.get(report), Object::Report { .. }) {
            let err = self.mismatch("org/webrtc/RTCStatsReport", report);
            return Err(self.throw(err));
        }
        let index = callback.into_raw() as usize;
        let thrown = match self.callbacks.get(index) {
            Some(cb) => cb.throws.clone().map(ForeignError::CallbackThrew),
            None => Some(ForeignError::UnknownCallback),
        };
        if let Some(err) = thrown {
            return Err(self.throw(err));
        }
        self.callbacks[index].delivered.push(report);
        Ok(())
    }
}
