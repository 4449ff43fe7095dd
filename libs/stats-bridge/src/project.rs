//! Projection of a report into foreign objects.
//!
//! Each record and each defined member is converted inside its own local
//! frame, so the number of live references stays bounded no matter how large
//! the report is. Only the containers that outlive the scope (the outer maps)
//! hold on to what was built inside it.

use stats_api::{MemberValue, Record, Report};

use crate::config::BridgeConfig;
use crate::encode::encode;
use crate::env::{ForeignEnv, LocalRef};
use crate::error::{BridgeError, ForeignError};
use crate::frame::LocalFrame;

/// Capacities requested for the per-record and per-member frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCapacities {
    pub record: usize,
    pub member: usize,
}

impl From<&BridgeConfig> for FrameCapacities {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            record: config.record_frame_capacity,
            member: config.member_frame_capacity,
        }
    }
}

impl Default for FrameCapacities {
    fn default() -> Self {
        (&BridgeConfig::default()).into()
    }
}

/// Stateless report walker.
#[derive(Debug, Clone, Copy, Default)]
pub struct Projector {
    capacities: FrameCapacities,
}

impl Projector {
    pub fn new(capacities: FrameCapacities) -> Self {
        Self { capacities }
    }

    /// Ordered `name -> boxed value` map of the record's defined members.
    /// Undefined members are left out entirely.
    pub fn project_members<E: ForeignEnv + ?Sized>(
        &self,
        env: &mut E,
        record: &Record,
    ) -> Result<LocalRef, BridgeError> {
        let members = env.new_linked_hash_map()?;
        for member in &record.members {
            let Some(value) = member.value() else {
                continue;
            };
            self.put_member(env, members, member.name(), value)
                .map_err(|e| BridgeError::from(e).with_context(format_args!("member '{}'", member.name())))?;
        }
        Ok(members)
    }

    fn put_member<E: ForeignEnv + ?Sized>(
        &self,
        env: &mut E,
        members: LocalRef,
        name: &str,
        value: &MemberValue,
    ) -> Result<(), ForeignError> {
        let mut frame = LocalFrame::push(env, self.capacities.member)?;
        let key = frame.new_string(name)?;
        let value = encode(&mut *frame, value)?;
        frame.map_put(members, key, value)
    }

    /// One `RTCStats(timestamp_us, type, id, members)` object.
    pub fn project_record<E: ForeignEnv + ?Sized>(
        &self,
        env: &mut E,
        record: &Record,
    ) -> Result<LocalRef, BridgeError> {
        let type_ = env.new_string(&record.type_)?;
        let id = env.new_string(&record.id)?;
        let members = self.project_members(env, record)?;
        Ok(env.new_stats(record.timestamp_us, type_, id, members)?)
    }

    /// `RTCStatsReport(timestamp_us, {id -> RTCStats})`, records in report order.
    pub fn project_report<E: ForeignEnv + ?Sized>(
        &self,
        env: &mut E,
        report: &Report,
    ) -> Result<LocalRef, BridgeError> {
        let stats_map = env.new_linked_hash_map()?;
        for record in report {
            tracing::trace!(id = %record.id, r#type = %record.type_, "projecting record");
            self.put_record(env, stats_map, record)
                .map_err(|e| e.with_context(format_args!("record '{}'", record.id)))?;
        }
        Ok(env.new_stats_report(report.timestamp_us, stats_map)?)
    }

    fn put_record<E: ForeignEnv + ?Sized>(
        &self,
        env: &mut E,
        stats_map: LocalRef,
        record: &Record,
    ) -> Result<(), BridgeError> {
        let mut frame = LocalFrame::push(env, self.capacities.record)?;
        let id = frame.new_string(&record.id)?;
        let stats = self.project_record(&mut *frame, record)?;
        frame.map_put(stats_map, id, stats)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use stats_api::{Member, MemberKind};

    use super::*;
    use crate::config::HeapConfig;
    use crate::foreign::ForeignValue;
    use crate::heap::InMemoryHeap;

    fn heap() -> InMemoryHeap {
        InMemoryHeap::new(&HeapConfig::default())
    }

    fn exported_members(record: &Record) -> Vec<(String, ForeignValue)> {
        let mut env = heap();
        let projector = Projector::default();
        let stats = projector.project_record(&mut env, record).unwrap();
        let map = env.new_linked_hash_map().unwrap();
        let key = env.new_string(&record.id).unwrap();
        env.map_put(map, key, stats).unwrap();
        let report = env.new_stats_report(0, map).unwrap();
        let report = env.export_report_ref(report).unwrap();
        report.records.into_iter().next().unwrap().1.members
    }

    #[test]
    fn undefined_members_are_skipped() {
        let record = Record::new("RTCInboundRTPVideoStream_1", "inbound-rtp", 10)
            .with_member(Member::undefined("qualityLimitationDurations", MemberKind::SequenceDouble))
            .with_member(Member::defined("framesDecoded", MemberValue::Int32(42)));
        assert_eq!(
            exported_members(&record),
            vec![("framesDecoded".to_string(), ForeignValue::Integer(42))]
        );
    }

    #[test]
    fn members_keep_declaration_order() {
        let record = Record::new("r", "t", 0)
            .with_member(Member::defined("z", MemberValue::Bool(false)))
            .with_member(Member::defined("a", MemberValue::Double(1.5)))
            .with_member(Member::defined("m", MemberValue::Int64(-1)));
        let names: Vec<String> = exported_members(&record).into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["z", "a", "m"]);
    }

    #[test]
    fn duplicate_member_name_last_write_wins() {
        let record = Record::new("r", "t", 0)
            .with_member(Member::defined("x", MemberValue::Int32(1)))
            .with_member(Member::defined("y", MemberValue::Int32(2)))
            .with_member(Member::defined("x", MemberValue::Int32(3)));
        assert_eq!(
            exported_members(&record),
            vec![
                ("x".to_string(), ForeignValue::Integer(3)),
                ("y".to_string(), ForeignValue::Integer(2)),
            ]
        );
    }

    #[test]
    fn member_scopes_are_released() {
        let mut record = Record::new("r", "t", 0);
        for i in 0..1_000 {
            record = record.with_member(Member::defined(format!("m{i}"), MemberValue::Uint64(i)));
        }
        let mut env = InMemoryHeap::new(&HeapConfig {
            local_ref_capacity: 24,
        });
        Projector::default()
            .project_members(&mut env, &record)
            .unwrap();
        assert_eq!(env.live_local_refs(), 1);
        assert!(env.peak_local_refs() <= 5);
    }

    #[test]
    fn failure_carries_record_and_member_context() {
        let report = Report::new(1).with_record(
            Record::new("ssrc_1", "outbound-rtp", 1)
                .with_member(Member::defined("bytesSent", MemberValue::Uint64(5))),
        );
        let mut env = heap();
        // report map, record id key, type, id, members map, member name, then the digits
        env.fail_allocation_after(6);
        let err = Projector::default()
            .project_report(&mut env, &report)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "record 'ssrc_1': member 'bytesSent': out of memory"
        );
        assert_eq!(err.foreign(), Some(&ForeignError::OutOfMemory));
        assert_eq!(env.frame_depth(), 1);
        assert_eq!(env.live_local_refs(), 1);
    }
}
