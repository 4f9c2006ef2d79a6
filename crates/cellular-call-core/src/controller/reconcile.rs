//! Reconciliation of transport call lists against the connection table
//!
//! Each pass falls into one of three cases:
//!
//! * empty list, tracked calls: every call hung up
//! * calls, empty table: new incoming or outgoing calls
//! * calls and tracked calls: update, then sweep every record the list did
//!   not mention
//!
//! After a pass the table holds exactly the calls of the last list.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::CallController;
use crate::connection::{find_record, ConnectionKey, ConnectionRecord};
use crate::transport::TransportConnector;
use crate::types::{CallReportInfo, CallType, CallsReportInfo, ReportedCall, TelCallState, VideoState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconcileKind {
    /// Empty list and nothing tracked
    Idle,
    HungUp,
    Incoming,
    Update,
    /// Dropped without looking at the table (handover in progress)
    Ignored,
}

/// What a reconciliation pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub kind: ReconcileKind,
    pub created: usize,
    /// Existing records whose state changed
    pub state_changes: usize,
    pub disconnected: usize,
    /// Whether a batch was delivered to the registry
    pub reported: bool,
}

impl ReconcileSummary {
    pub fn new(kind: ReconcileKind) -> Self {
        Self {
            kind,
            created: 0,
            state_changes: 0,
            disconnected: 0,
            reported: false,
        }
    }

    /// True when the pass changed nothing in the table
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.state_changes == 0 && self.disconnected == 0
    }
}

impl<T: TransportConnector + ?Sized> CallController<T> {
    /// Apply a call list pushed by the transport
    pub async fn report_calls_data(&mut self, calls: &[ReportedCall]) -> ReconcileSummary {
        match (calls.is_empty(), self.table.is_empty()) {
            (true, true) => ReconcileSummary::new(ReconcileKind::Idle),
            (true, false) => self.reconcile_hung_up().await,
            (false, true) => self.reconcile_incoming(calls).await,
            (false, false) => self.reconcile_update(calls).await,
        }
    }

    /// Snapshot for `call`, filling gaps from the tracked snapshot
    fn build_report(&self, call: &ReportedCall, tracked: Option<&CallReportInfo>) -> CallReportInfo {
        let call_type = self.call_type();
        let number = if call.number.is_empty() {
            tracked.map(|t| t.account_number.clone()).unwrap_or_default()
        } else {
            call.number.clone()
        };
        let call_mode = match call_type {
            CallType::Cs => VideoState::Audio,
            _ => call
                .call_mode
                .or_else(|| tracked.map(|t| t.call_mode))
                .unwrap_or_default(),
        };
        CallReportInfo {
            index: call.index,
            account_number: number,
            account_id: self.slot_id,
            voice_domain: call
                .voice_domain
                .or_else(|| tracked.map(|t| t.voice_domain))
                .unwrap_or_default(),
            state: call
                .state
                .or_else(|| tracked.map(|t| t.state))
                .unwrap_or(TelCallState::Idle),
            call_type,
            call_mode,
        }
    }

    /// Keys of the records the calls of one list refer to, in list order.
    ///
    /// A tracked record whose index and number both agree with a call is that
    /// call, wherever it sits in the list. The remaining calls are keyed by
    /// number, or by index once the number is taken by another call of the
    /// same list.
    fn resolve_keys(&self, calls: &[ReportedCall]) -> Vec<ConnectionKey> {
        let mut claimed: HashSet<ConnectionKey> = HashSet::with_capacity(calls.len());
        let mut keys: Vec<Option<ConnectionKey>> = calls
            .iter()
            .map(|call| {
                let unclaimed = self.table.iter().filter(|(key, _)| !claimed.contains(*key));
                let (key, _) = find_record(unclaimed, |record| {
                    record.index() == call.index
                        && (call.number.is_empty()
                            || record.phone_number().is_empty()
                            || record.phone_number() == call.number)
                })?;
                let key = key.clone();
                claimed.insert(key.clone());
                Some(key)
            })
            .collect();

        for (resolved, call) in keys.iter_mut().zip(calls) {
            if resolved.is_some() {
                continue;
            }
            let by_number = ConnectionKey::Number(call.number.clone());
            let key = if !call.number.is_empty() && !claimed.contains(&by_number) {
                by_number
            } else {
                ConnectionKey::Index(call.index)
            };
            claimed.insert(key.clone());
            *resolved = Some(key);
        }

        keys.into_iter()
            .zip(calls)
            .map(|(key, call)| key.unwrap_or(ConnectionKey::Index(call.index)))
            .collect()
    }

    /// Insert or refresh the record under `key`, returning its snapshot and
    /// whether it was created or changed state
    fn apply_reported(&mut self, key: ConnectionKey, call: &ReportedCall) -> (CallReportInfo, bool, bool) {
        let tracked = self.table.get(&key).map(|record| record.report().clone());
        let report = self.build_report(call, tracked.as_ref());

        match self.table.get_mut(&key) {
            Some(record) => {
                let changed = record.update_report(report.clone());
                record.set_seen_in_last_report(true);
                (report, false, changed)
            }
            None => {
                let mut record = ConnectionRecord::new(report.clone());
                record.set_seen_in_last_report(true);
                self.table.insert(key, record);
                (report, true, false)
            }
        }
    }

    async fn request_fail_reason(&self) {
        if let Err(e) = self.transport.request_call_fail_reason(self.slot_id).await {
            warn!("Call fail reason request on slot {} failed: {}", self.slot_id, e);
        }
    }

    fn disconnected_report(record: &ConnectionRecord) -> CallReportInfo {
        let mut report = record.report().clone();
        report.state = TelCallState::Disconnected;
        report
    }

    async fn reconcile_hung_up(&mut self) -> ReconcileSummary {
        let mut summary = ReconcileSummary::new(ReconcileKind::HungUp);
        let mut batch = CallsReportInfo::new(self.slot_id);

        for record in self.table.drain() {
            batch.calls.push(Self::disconnected_report(&record));
            self.request_fail_reason().await;
        }
        summary.disconnected = batch.calls.len();

        let suppress_hangup = std::mem::take(&mut self.ignore_hangup_report);
        let suppress_incoming = std::mem::take(&mut self.ignore_incoming_report);
        if suppress_hangup || suppress_incoming {
            debug!(
                "Suppressed hang up report of {} calls on slot {} (hangup: {}, incoming: {})",
                summary.disconnected, self.slot_id, suppress_hangup, suppress_incoming
            );
        } else {
            self.registry.report_calls_info(batch).await;
            summary.reported = true;
        }
        summary
    }

    async fn reconcile_incoming(&mut self, calls: &[ReportedCall]) -> ReconcileSummary {
        let mut summary = ReconcileSummary::new(ReconcileKind::Incoming);
        let mut batch = CallsReportInfo::new(self.slot_id);

        for (key, call) in self.resolve_keys(calls).into_iter().zip(calls) {
            let (report, _, _) = self.apply_reported(key, call);
            batch.calls.push(report);
            summary.created += 1;
        }
        // resets the pass flags; nothing can be unseen here
        self.table.sweep_unseen();

        let first_is_incoming = batch
            .calls
            .first()
            .map_or(false, |c| c.state == TelCallState::Incoming);
        if first_is_incoming && !self.registry.is_registered() {
            debug!("No listener yet, holding back incoming call report on slot {}", self.slot_id);
            self.ignore_incoming_report = true;
        } else {
            self.registry.report_calls_info(batch).await;
            summary.reported = true;
        }
        summary
    }

    async fn reconcile_update(&mut self, calls: &[ReportedCall]) -> ReconcileSummary {
        let mut summary = ReconcileSummary::new(ReconcileKind::Update);
        let mut batch = CallsReportInfo::new(self.slot_id);

        for (key, call) in self.resolve_keys(calls).into_iter().zip(calls) {
            let (report, created, changed) = self.apply_reported(key, call);
            if created {
                summary.created += 1;
            }
            if changed {
                summary.state_changes += 1;
            }
            batch.calls.push(report);
        }

        for record in self.table.sweep_unseen() {
            debug!("Call {} on slot {} left the call list", record.index(), self.slot_id);
            batch.calls.push(Self::disconnected_report(&record));
            summary.disconnected += 1;
            self.request_fail_reason().await;
        }

        // a held back incoming report is superseded by this full list
        self.ignore_incoming_report = false;
        self.registry.report_calls_info(batch).await;
        summary.reported = true;
        summary
    }
}
