use stats_api::Report;

use crate::config::BridgeConfig;
use crate::env::{CallbackRef, ForeignEnv};
use crate::error::BridgeError;
use crate::frame::LocalFrame;
use crate::project::{FrameCapacities, Projector};

/// Receives finished reports from the collector and hands the projected
/// `RTCStatsReport` to the registered `onStatsDelivered` callback.
///
/// Holds no per-delivery state: one wrapper may serve several threads, each
/// with its own environment.
#[derive(Debug, Clone)]
pub struct StatsCollectorCallbackWrapper {
    callback: CallbackRef,
    projector: Projector,
    delivery_frame_capacity: usize,
}

impl StatsCollectorCallbackWrapper {
    pub fn new(callback: CallbackRef, config: &BridgeConfig) -> Self {
        Self {
            callback,
            projector: Projector::new(FrameCapacities::from(config)),
            delivery_frame_capacity: config.delivery_frame_capacity,
        }
    }

    pub fn callback(&self) -> CallbackRef {
        self.callback
    }

    /// Convert `report` and invoke the callback exactly once.
    ///
    /// On error nothing is delivered and the error is returned to the caller.
    /// There is no retry.
    pub fn on_stats_delivered<E: ForeignEnv + ?Sized>(
        &self,
        env: &mut E,
        report: &Report,
    ) -> Result<(), BridgeError> {
        tracing::debug!(
            records = report.len(),
            timestamp_us = report.timestamp_us,
            "delivering stats report"
        );
        self.deliver(env, report).inspect_err(|e| {
            tracing::warn!(error = %e, "stats report delivery aborted");
        })?;
        tracing::debug!(records = report.len(), "stats report delivered");
        Ok(())
    }

    fn deliver<E: ForeignEnv + ?Sized>(&self, env: &mut E, report: &Report) -> Result<(), BridgeError> {
        let mut frame = LocalFrame::push(env, self.delivery_frame_capacity)?;
        let j_report = self.projector.project_report(&mut *frame, report)?;
        frame
            .call_on_stats_delivered(self.callback, j_report)
            .map_err(|e| BridgeError::from(e).with_context("onStatsDelivered"))
    }
}
