//! Per-slot call controller
//!
//! One [`CallController`] exists per slot and transport domain. CS and IMS
//! differ only in the [`TransportConnector`] they are built with; the
//! connection table, request validation and reconciliation are shared.
//!
//! ```text
//!   requests ──► CallController ──► TransportConnector ──► modem / IMS
//!                     │  ▲
//!                     │  └──── report_calls_data(call list) ◄── transport push
//!                     ▼
//!               CallbackRegistry ──► application listener
//! ```
//!
//! Requests never mutate the [`ConnectionTable`]; only reconciliation does.
//! A controller is owned by its slot worker and is not shared across tasks.

mod dial;
mod reconcile;

pub use dial::{normalize_dial_number, DialOutcome};
pub use reconcile::{ReconcileKind, ReconcileSummary};

use std::sync::Arc;

use tracing::{debug, info};

use crate::capability::CapabilityProvider;
use crate::connection::{ConnectionKey, ConnectionTable};
use crate::errors::{CallError, Result};
use crate::events::CallbackRegistry;
use crate::transport::TransportConnector;
use crate::types::{CallSupplementType, CallType, CellularCallInfo, ImsCallMode, SlotId, TelCallState};

/// Call control for one slot over one transport
pub struct CallController<T: ?Sized> {
    slot_id: SlotId,
    transport: Arc<T>,
    capability: Arc<dyn CapabilityProvider>,
    registry: Arc<CallbackRegistry>,
    table: ConnectionTable,
    ignore_hangup_report: bool,
    ignore_incoming_report: bool,
}

/// Whether `code` is a valid DTMF digit
pub fn is_dtmf_code(code: char) -> bool {
    code.is_ascii_digit() || matches!(code, '*' | '#' | 'A' | 'B' | 'C' | 'D')
}

impl<T: TransportConnector + ?Sized> CallController<T> {
    pub fn new(
        slot_id: SlotId,
        transport: Arc<T>,
        capability: Arc<dyn CapabilityProvider>,
        registry: Arc<CallbackRegistry>,
        max_connections: usize,
    ) -> Self {
        debug!("Creating {} call controller for slot {}", transport.call_type(), slot_id);
        Self {
            slot_id,
            transport,
            capability,
            registry,
            table: ConnectionTable::new(max_connections),
            ignore_hangup_report: false,
            ignore_incoming_report: false,
        }
    }

    pub fn slot_id(&self) -> SlotId {
        self.slot_id
    }

    pub fn call_type(&self) -> CallType {
        self.transport.call_type()
    }

    pub fn table(&self) -> &ConnectionTable {
        &self.table
    }

    /// Suppress the next hung-up report; used while hanging up everything
    /// after the call manager went away
    pub fn set_hangup_report_ignored(&mut self, ignore: bool) {
        self.ignore_hangup_report = ignore;
    }

    pub fn is_hangup_report_ignored(&self) -> bool {
        self.ignore_hangup_report
    }

    pub fn is_incoming_report_ignored(&self) -> bool {
        self.ignore_incoming_report
    }

    fn require_connection(&self, info: &CellularCallInfo) -> Result<ConnectionKey> {
        self.table
            .lookup(&info.phone_number, info.index)
            .ok_or_else(|| CallError::connection_not_exist(info.phone_number.clone(), info.index))
    }

    fn reject_if_incoming(&self, operation: &str) -> Result<()> {
        if self.table.has_state(TelCallState::Incoming) {
            return Err(CallError::call_state(
                Some(TelCallState::Incoming),
                format!("cannot {} while a call is incoming", operation),
            ));
        }
        Ok(())
    }

    /// Emit a single "disconnecting" notification for the record at `key`
    async fn report_disconnecting(&self, key: &ConnectionKey) {
        if let Some(record) = self.table.get(key) {
            let mut report = record.report().clone();
            report.state = TelCallState::Disconnecting;
            self.registry.report_single_call(report, TelCallState::Disconnecting).await;
        }
    }

    pub async fn hang_up(&mut self, info: &CellularCallInfo, supplement: CallSupplementType) -> Result<()> {
        let key = self.require_connection(info)?;
        let index = self.table.get(&key).map(|r| r.index()).unwrap_or(info.index);
        info!("Hang up {} on slot {} ({:?})", key, self.slot_id, supplement);

        match supplement {
            CallSupplementType::Default => {
                self.report_disconnecting(&key).await;
                self.transport.hang_up(self.slot_id, index).await?;
            }
            CallSupplementType::HangUpHoldWait | CallSupplementType::HangUpActive => {
                self.transport.call_supplement(self.slot_id, supplement).await?;
            }
            // releasing every call uses the same primitive as rejecting
            CallSupplementType::HangUpAll => {
                self.transport.reject(self.slot_id, index).await?;
            }
        }
        Ok(())
    }

    pub async fn answer(&mut self, info: &CellularCallInfo) -> Result<()> {
        let key = self.require_connection(info)?;
        let (index, state) = match self.table.get(&key) {
            Some(record) => (record.index(), record.state()),
            None => return Err(CallError::connection_not_exist(info.phone_number.clone(), info.index)),
        };

        if state == TelCallState::Waiting {
            if let Some(active) = self.table.find_by_state(TelCallState::Active) {
                let active_index = active.index();
                info!("Accepting waiting call {} by switching active call {}", index, active_index);
                self.transport.switch_call(self.slot_id, active_index).await?;
                return Ok(());
            }
        }

        if !state.is_ringing() {
            return Err(CallError::call_state(Some(state), "call is not ringing"));
        }
        info!("Answer call {} on slot {}", index, self.slot_id);
        self.transport.answer(self.slot_id, index, info.video_state).await?;
        Ok(())
    }

    pub async fn reject(&mut self, info: &CellularCallInfo) -> Result<()> {
        let key = self.require_connection(info)?;
        let (index, state) = match self.table.get(&key) {
            Some(record) => (record.index(), record.state()),
            None => return Err(CallError::connection_not_exist(info.phone_number.clone(), info.index)),
        };
        if !state.is_ringing() {
            return Err(CallError::call_state(Some(state), "call is not ringing"));
        }
        info!("Reject call {} on slot {}", index, self.slot_id);
        self.report_disconnecting(&key).await;
        self.transport.reject(self.slot_id, index).await?;
        Ok(())
    }

    pub async fn hold_call(&mut self, info: &CellularCallInfo) -> Result<()> {
        self.reject_if_incoming("hold")?;
        self.transport.hold_call(self.slot_id, info.index).await?;
        Ok(())
    }

    pub async fn unhold_call(&mut self, info: &CellularCallInfo) -> Result<()> {
        self.reject_if_incoming("unhold")?;
        self.transport.unhold_call(self.slot_id, info.index).await?;
        Ok(())
    }

    pub async fn switch_call(&mut self, info: &CellularCallInfo) -> Result<()> {
        self.reject_if_incoming("switch")?;
        self.transport.switch_call(self.slot_id, info.index).await?;
        Ok(())
    }

    pub async fn combine_conference(&mut self, info: &CellularCallInfo) -> Result<()> {
        self.transport.combine_conference(self.slot_id, info.video_state).await?;
        Ok(())
    }

    /// Split one participant off the conference; the participant is found by
    /// number, otherwise the request index is used as is
    pub async fn separate_conference(&mut self, info: &CellularCallInfo) -> Result<()> {
        let key = ConnectionKey::for_call(&info.phone_number, info.index);
        let index = match (&key, self.table.get(&key)) {
            (ConnectionKey::Number(_), Some(record)) => record.index(),
            _ => info.index,
        };
        self.transport.separate_conference(self.slot_id, index).await?;
        Ok(())
    }

    pub async fn invite_to_conference(&mut self, numbers: &[String]) -> Result<()> {
        if numbers.is_empty() {
            return Err(CallError::argument_invalid("no numbers to invite"));
        }
        self.transport.invite_to_conference(self.slot_id, numbers).await?;
        Ok(())
    }

    pub async fn kick_out_from_conference(&mut self, numbers: &[String]) -> Result<()> {
        if numbers.is_empty() {
            return Err(CallError::argument_invalid("no numbers to remove"));
        }
        self.transport.kick_out_from_conference(self.slot_id, numbers).await?;
        Ok(())
    }

    pub async fn update_call_media_mode(&mut self, info: &CellularCallInfo, mode: ImsCallMode) -> Result<()> {
        let key = self.require_connection(info)?;
        let index = self.table.get(&key).map(|r| r.index()).unwrap_or(info.index);
        self.transport.update_call_media_mode(self.slot_id, index, mode).await?;
        Ok(())
    }

    fn dtmf_target(&self, code: Option<char>, info: &CellularCallInfo) -> Result<i32> {
        if let Some(code) = code {
            if !is_dtmf_code(code) {
                return Err(CallError::argument_invalid(format!("invalid DTMF code {:?}", code)));
            }
        }
        self.table
            .find_by_index(info.index)
            .map(|record| record.index())
            .ok_or_else(|| CallError::connection_not_exist(info.phone_number.clone(), info.index))
    }

    pub async fn start_dtmf(&mut self, code: char, info: &CellularCallInfo) -> Result<()> {
        let index = self.dtmf_target(Some(code), info)?;
        self.transport.start_dtmf(self.slot_id, code, index).await?;
        Ok(())
    }

    pub async fn stop_dtmf(&mut self, info: &CellularCallInfo) -> Result<()> {
        let index = self.dtmf_target(None, info)?;
        self.transport.stop_dtmf(self.slot_id, index).await?;
        Ok(())
    }

    pub async fn send_dtmf(&mut self, code: char, info: &CellularCallInfo) -> Result<()> {
        let index = self.dtmf_target(Some(code), info)?;
        self.transport.send_dtmf(self.slot_id, code, index).await?;
        Ok(())
    }

    /// Ask the network to release every call; a no-op with nothing tracked
    pub async fn hang_up_all_connections(&mut self) -> Result<()> {
        let index = match self.table.iter().next() {
            Some((_, record)) => record.index(),
            None => return Ok(()),
        };
        info!("Hang up all {} connections on slot {}", self.call_type(), self.slot_id);
        self.transport.reject(self.slot_id, index).await?;
        Ok(())
    }

    /// Forget every connection without notifying anyone
    pub fn release_all_connections(&mut self) {
        let released = self.table.drain();
        self.ignore_hangup_report = false;
        self.ignore_incoming_report = false;
        debug!(
            "Released {} {} connections on slot {}",
            released.len(),
            self.call_type(),
            self.slot_id
        );
    }
}
