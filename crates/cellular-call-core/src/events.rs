//! Call status reporting towards the application layer
//!
//! At most one [`CallStatusListener`] is registered at a time. Delivery is
//! best-effort: when nobody is registered, reports are dropped.
//!
//! # Examples
//!
//! ```rust
//! use async_trait::async_trait;
//! use cellular_call_core::events::{CallStatusListener, CallbackRegistry};
//! use cellular_call_core::types::CallsReportInfo;
//! use std::sync::Arc;
//!
//! struct PrintListener;
//!
//! #[async_trait]
//! impl CallStatusListener for PrintListener {
//!     async fn on_calls_report(&self, report: CallsReportInfo) {
//!         println!("slot {} has {} calls", report.slot_id, report.calls.len());
//!     }
//! }
//!
//! let registry = CallbackRegistry::new();
//! registry.register(Arc::new(PrintListener));
//! assert!(registry.is_registered());
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::mmi::MmiResult;
use crate::types::{CallFailReason, CallReportInfo, CallsReportInfo, SlotId, TelCallState};

/// Receiver of call status reports
#[async_trait]
pub trait CallStatusListener: Send + Sync {
    /// Aggregated call list of a slot after a reconciliation pass
    async fn on_calls_report(&self, report: CallsReportInfo);

    /// Pre-emptive state change of one call, e.g. "disconnecting" before a
    /// hang up is confirmed by the network
    async fn on_single_call_report(&self, _info: CallReportInfo, _state: TelCallState) {}

    async fn on_mmi_result(&self, _slot_id: SlotId, _result: MmiResult) {}

    async fn on_call_fail_reason(&self, _slot_id: SlotId, _reason: CallFailReason) {}
}

/// Holder of the zero-or-one registered listener
#[derive(Default)]
pub struct CallbackRegistry {
    listener: RwLock<Option<Arc<dyn CallStatusListener>>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener`, replacing any previous one
    pub fn register(&self, listener: Arc<dyn CallStatusListener>) {
        let replaced = self.listener.write().replace(listener).is_some();
        debug!("Registered call status listener (replaced: {})", replaced);
    }

    pub fn unregister(&self) {
        if self.listener.write().take().is_some() {
            debug!("Unregistered call status listener");
        }
    }

    pub fn is_registered(&self) -> bool {
        self.listener.read().is_some()
    }

    fn current(&self) -> Option<Arc<dyn CallStatusListener>> {
        self.listener.read().clone()
    }

    pub async fn report_calls_info(&self, report: CallsReportInfo) {
        match self.current() {
            Some(listener) => listener.on_calls_report(report).await,
            None => trace!("No listener, dropping calls report for slot {}", report.slot_id),
        }
    }

    pub async fn report_single_call(&self, info: CallReportInfo, state: TelCallState) {
        if let Some(listener) = self.current() {
            listener.on_single_call_report(info, state).await;
        }
    }

    pub async fn report_mmi_result(&self, slot_id: SlotId, result: MmiResult) {
        if let Some(listener) = self.current() {
            listener.on_mmi_result(slot_id, result).await;
        }
    }

    pub async fn report_call_fail_reason(&self, slot_id: SlotId, reason: CallFailReason) {
        if let Some(listener) = self.current() {
            listener.on_call_fail_reason(slot_id, reason).await;
        }
    }
}

/// Report forwarded by a [`ChannelListener`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallEvent {
    CallsReport(CallsReportInfo),
    SingleCall {
        info: CallReportInfo,
        state: TelCallState,
    },
    MmiResult {
        slot_id: SlotId,
        result: MmiResult,
    },
    CallFailReason {
        slot_id: SlotId,
        reason: CallFailReason,
    },
}

/// Listener that forwards every report into an unbounded channel
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<CallEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CallEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: CallEvent) {
        if self.tx.send(event).is_err() {
            trace!("Call event receiver dropped");
        }
    }
}

#[async_trait]
impl CallStatusListener for ChannelListener {
    async fn on_calls_report(&self, report: CallsReportInfo) {
        self.forward(CallEvent::CallsReport(report));
    }

    async fn on_single_call_report(&self, info: CallReportInfo, state: TelCallState) {
        self.forward(CallEvent::SingleCall { info, state });
    }

    async fn on_mmi_result(&self, slot_id: SlotId, result: MmiResult) {
        self.forward(CallEvent::MmiResult { slot_id, result });
    }

    async fn on_call_fail_reason(&self, slot_id: SlotId, reason: CallFailReason) {
        self.forward(CallEvent::CallFailReason { slot_id, reason });
    }
}
