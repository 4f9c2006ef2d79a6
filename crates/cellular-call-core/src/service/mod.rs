//! Cellular call service
//!
//! [`CellularCallService`] is the entry point for the call manager. Every
//! request goes through the same gate before it reaches a slot worker:
//!
//! ```text
//!  request ─► permission ─► slot id ─► SRVCC ─► route (CS / IMS) ─► slot worker ─► controller
//! ```
//!
//! Dial requests pick their domain with [`policy::select_dial_domain`];
//! every other request uses the call type it carries.
//!
//! # Examples
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use cellular_call_core::prelude::*;
//! # async fn example(
//! #     cs: Arc<dyn TransportConnector>,
//! #     ims: Arc<dyn TransportConnector>,
//! #     ss: Arc<dyn SupplementaryTransport>,
//! #     capability: Arc<dyn CapabilityProvider>,
//! # ) -> Result<()> {
//! let service = CellularCallService::builder()
//!     .with_config(CellularCallConfig::new().with_slot_count(2))
//!     .with_cs_transport(cs)
//!     .with_ims_transport(ims)
//!     .with_supplementary_transport(ss)
//!     .with_capability_provider(capability)
//!     .build()?;
//!
//! let outcome = service
//!     .dial(CellularCallInfo::new(0, "10086", CallType::Cs))
//!     .await?;
//! println!("dial result code {}", outcome.code());
//! # Ok(())
//! # }
//! ```

pub mod policy;
mod worker;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::capability::{AllowAll, CapabilityProvider, Permission, PermissionChecker};
use crate::config::CellularCallConfig;
use crate::controller::{DialOutcome, ReconcileKind, ReconcileSummary};
use crate::errors::{CallError, Result};
use crate::events::{CallStatusListener, CallbackRegistry};
use crate::mmi::MmiDispatcher;
use crate::transport::{SupplementaryTransport, TransportConnector};
use crate::types::{
    CallFailReason, CallReportInfo, CallSupplementType, CallType, CellularCallInfo, DomainPreferenceMode,
    EmergencyCall, ImsCallMode, ReportedCall, SlotId, SrvccState,
};

use policy::{DomainInputs, SlotSettings};
use worker::{ControlOp, ServiceContext, SlotCommand, SlotHandle, SlotWorker};

/// Per-slot front door for call control
pub struct CellularCallService {
    context: Arc<ServiceContext>,
    permissions: Arc<dyn PermissionChecker>,
    slots: Mutex<HashMap<SlotId, SlotHandle>>,
    settings: DashMap<SlotId, SlotSettings>,
    srvcc_state: RwLock<SrvccState>,
    death_watcher: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
}

#[derive(Serialize)]
struct SlotDump {
    slot_id: SlotId,
    settings: Option<SlotSettings>,
    cs_calls: Vec<CallReportInfo>,
    ims_calls: Vec<CallReportInfo>,
}

#[derive(Serialize)]
struct ServiceDump {
    srvcc_state: SrvccState,
    listener_registered: bool,
    slots: Vec<SlotDump>,
}

impl CellularCallService {
    pub fn builder() -> CellularCallServiceBuilder {
        CellularCallServiceBuilder::new()
    }

    pub fn config(&self) -> &CellularCallConfig {
        &self.context.config
    }

    pub fn registry(&self) -> &Arc<CallbackRegistry> {
        &self.context.registry
    }

    fn is_valid_slot_id(&self, slot_id: SlotId) -> bool {
        policy::is_valid_slot_id(slot_id, self.context.config.slot_count)
    }

    fn check_slot(&self, slot_id: SlotId) -> Result<()> {
        if !self.is_valid_slot_id(slot_id) {
            return Err(CallError::InvalidSlotId { slot_id });
        }
        Ok(())
    }

    fn check_permission(&self, permission: Permission) -> Result<()> {
        if !self.permissions.check(permission) {
            return Err(CallError::PermissionDenied { permission });
        }
        Ok(())
    }

    /// Permission, slot and handover checks shared by every call request
    fn precheck(&self, slot_id: SlotId, permission: Permission) -> Result<()> {
        self.check_permission(permission)?;
        self.check_slot(slot_id)?;
        if *self.srvcc_state.read() == SrvccState::Started {
            return Err(CallError::SrvccInProgress);
        }
        Ok(())
    }

    fn routable(call_type: CallType) -> Result<CallType> {
        match call_type {
            CallType::Cs | CallType::Ims => Ok(call_type),
            CallType::Ott => Err(CallError::argument_invalid("OTT calls are not handled here")),
        }
    }

    /// Sender of the slot worker, started on first use. No worker is
    /// started once the service has been stopped.
    fn sender(&self, slot_id: SlotId) -> Result<mpsc::Sender<SlotCommand>> {
        let mut slots = self.slots.lock();
        if self.stopped.load(Ordering::SeqCst) {
            return Err(CallError::service_unavailable("cellular call service is stopped"));
        }
        if let Some(handle) = slots.get(&slot_id) {
            if !handle.tx.is_closed() {
                return Ok(handle.tx.clone());
            }
        }
        debug!("Starting worker for slot {}", slot_id);
        let handle = SlotWorker::spawn(slot_id, self.context.clone());
        let tx = handle.tx.clone();
        slots.insert(slot_id, handle);
        Ok(tx)
    }

    fn running_slots(&self) -> Vec<(SlotId, mpsc::Sender<SlotCommand>)> {
        let mut running: Vec<_> = self
            .slots
            .lock()
            .iter()
            .filter(|(_, handle)| !handle.tx.is_closed())
            .map(|(slot_id, handle)| (*slot_id, handle.tx.clone()))
            .collect();
        running.sort_by_key(|(slot_id, _)| *slot_id);
        running
    }

    async fn send_to<R>(
        tx: &mpsc::Sender<SlotCommand>,
        slot_id: SlotId,
        make: impl FnOnce(oneshot::Sender<R>) -> SlotCommand,
    ) -> Result<R> {
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(make(reply_tx))
            .await
            .map_err(|_| CallError::service_unavailable(format!("slot {} worker is not running", slot_id)))?;
        reply_rx
            .await
            .map_err(|_| CallError::service_unavailable(format!("slot {} worker dropped the request", slot_id)))
    }

    async fn request<R>(&self, slot_id: SlotId, make: impl FnOnce(oneshot::Sender<R>) -> SlotCommand) -> Result<R> {
        let tx = self.sender(slot_id)?;
        Self::send_to(&tx, slot_id, make).await
    }

    async fn control(&self, call_type: CallType, slot_id: SlotId, op: ControlOp) -> Result<()> {
        let call_type = Self::routable(call_type)?;
        self.request(slot_id, |reply| SlotCommand::Control { call_type, op, reply })
            .await?
    }

    fn settings(&self, slot_id: SlotId) -> SlotSettings {
        self.settings
            .get(&slot_id)
            .map(|s| s.clone())
            .unwrap_or_else(|| SlotSettings::from_config(&self.context.config))
    }

    fn emergency_number(&self, slot_id: SlotId, number: &str) -> bool {
        let settings = self.settings(slot_id);
        policy::is_emergency_number(
            number,
            self.context.capability.has_sim_card(slot_id),
            &settings.emergency_calls,
            &self.context.config.emergency_numbers,
        )
    }

    /// Domain a dial on `info.slot_id` should use
    pub fn select_dial_domain(&self, info: &CellularCallInfo) -> CallType {
        let settings = self.settings(info.slot_id);
        let capability = &self.context.capability;
        policy::select_dial_domain(&DomainInputs {
            ims_registered: capability.is_ims_registered(info.slot_id),
            ims_service_connected: capability.is_ims_service_connected(),
            preference: settings.domain_preference_mode,
            ims_switch_on: settings.ims_switch_on,
            is_emergency: self.emergency_number(info.slot_id, &info.phone_number),
            ims_prefer_for_emergency: self.context.config.ims_prefer_for_emergency,
        })
    }

    // ===== Call control =====

    /// Place a call on the domain chosen by policy.
    ///
    /// Returns [`DialOutcome::Mmi`] when the dial string was a supplementary
    /// service code; the code is executed afterwards and its result is
    /// reported to the listener.
    pub async fn dial(&self, info: CellularCallInfo) -> Result<DialOutcome> {
        self.precheck(info.slot_id, Permission::PlaceCall)?;
        let call_type = self.select_dial_domain(&info);
        let slot_id = info.slot_id;
        info!("Dial request on slot {} routed to {}", slot_id, call_type);
        self.request(slot_id, |reply| SlotCommand::Dial { call_type, info, reply })
            .await?
    }

    pub async fn hang_up(&self, info: CellularCallInfo, supplement: CallSupplementType) -> Result<()> {
        self.precheck(info.slot_id, Permission::AnswerCall)?;
        self.control(info.call_type, info.slot_id, ControlOp::HangUp(info.clone(), supplement))
            .await
    }

    pub async fn reject(&self, info: CellularCallInfo) -> Result<()> {
        self.precheck(info.slot_id, Permission::AnswerCall)?;
        self.control(info.call_type, info.slot_id, ControlOp::Reject(info.clone()))
            .await
    }

    pub async fn answer(&self, info: CellularCallInfo) -> Result<()> {
        self.precheck(info.slot_id, Permission::AnswerCall)?;
        self.control(info.call_type, info.slot_id, ControlOp::Answer(info.clone()))
            .await
    }

    pub async fn hold_call(&self, info: CellularCallInfo) -> Result<()> {
        self.precheck(info.slot_id, Permission::AnswerCall)?;
        self.control(info.call_type, info.slot_id, ControlOp::Hold(info.clone()))
            .await
    }

    pub async fn unhold_call(&self, info: CellularCallInfo) -> Result<()> {
        self.precheck(info.slot_id, Permission::AnswerCall)?;
        self.control(info.call_type, info.slot_id, ControlOp::UnHold(info.clone()))
            .await
    }

    pub async fn switch_call(&self, info: CellularCallInfo) -> Result<()> {
        self.precheck(info.slot_id, Permission::AnswerCall)?;
        self.control(info.call_type, info.slot_id, ControlOp::Switch(info.clone()))
            .await
    }

    pub async fn combine_conference(&self, info: CellularCallInfo) -> Result<()> {
        self.precheck(info.slot_id, Permission::AnswerCall)?;
        self.control(info.call_type, info.slot_id, ControlOp::Combine(info.clone()))
            .await
    }

    pub async fn separate_conference(&self, info: CellularCallInfo) -> Result<()> {
        self.precheck(info.slot_id, Permission::AnswerCall)?;
        self.control(info.call_type, info.slot_id, ControlOp::Separate(info.clone()))
            .await
    }

    /// Add participants to the IMS conference of `slot_id`
    pub async fn invite_to_conference(&self, slot_id: SlotId, numbers: Vec<String>) -> Result<()> {
        self.precheck(slot_id, Permission::PlaceCall)?;
        self.control(CallType::Ims, slot_id, ControlOp::Invite(numbers)).await
    }

    pub async fn kick_out_from_conference(&self, slot_id: SlotId, numbers: Vec<String>) -> Result<()> {
        self.precheck(slot_id, Permission::AnswerCall)?;
        self.control(CallType::Ims, slot_id, ControlOp::KickOut(numbers)).await
    }

    /// Change the media mode of an IMS call
    pub async fn update_ims_call_mode(&self, info: CellularCallInfo, mode: ImsCallMode) -> Result<()> {
        self.precheck(info.slot_id, Permission::AnswerCall)?;
        if info.call_type != CallType::Ims {
            return Err(CallError::argument_invalid("media mode updates need an IMS call"));
        }
        self.control(CallType::Ims, info.slot_id, ControlOp::UpdateMediaMode(info.clone(), mode))
            .await
    }

    pub async fn start_dtmf(&self, code: char, info: CellularCallInfo) -> Result<()> {
        self.precheck(info.slot_id, Permission::AnswerCall)?;
        self.control(info.call_type, info.slot_id, ControlOp::StartDtmf(code, info.clone()))
            .await
    }

    pub async fn stop_dtmf(&self, info: CellularCallInfo) -> Result<()> {
        self.precheck(info.slot_id, Permission::AnswerCall)?;
        self.control(info.call_type, info.slot_id, ControlOp::StopDtmf(info.clone()))
            .await
    }

    pub async fn send_dtmf(&self, code: char, info: CellularCallInfo) -> Result<()> {
        self.precheck(info.slot_id, Permission::AnswerCall)?;
        self.control(info.call_type, info.slot_id, ControlOp::SendDtmf(code, info.clone()))
            .await
    }

    async fn hang_up_everywhere(&self, ignore_hangup_report: bool) -> Result<()> {
        let mut result = Ok(());
        for (slot_id, tx) in self.running_slots() {
            let outcome = Self::send_to(&tx, slot_id, |reply| SlotCommand::HangUpAll {
                ignore_hangup_report,
                reply,
            })
            .await
            .and_then(|r| r);
            if let Err(e) = outcome {
                warn!("Hang up all on slot {} failed: {}", slot_id, e);
                result = Err(e);
            }
        }
        result
    }

    /// Release every call on every slot with tracked connections
    pub async fn hang_up_all_connections(&self) -> Result<()> {
        info!("Hang up all connections");
        self.hang_up_everywhere(false).await
    }

    /// React to the call manager going away: drop its listener and hang up
    /// every call without reporting the resulting hang ups back
    pub async fn handle_call_manager_exception(&self) {
        warn!("Call manager died, hanging up all connections");
        self.context.registry.unregister();
        if let Err(e) = self.hang_up_everywhere(true).await {
            error!("Hang up after call manager death failed: {}", e);
        }
    }

    /// Watch a death notification channel of the call manager. Each message
    /// triggers [`handle_call_manager_exception`](Self::handle_call_manager_exception).
    pub fn watch_call_manager(self: &Arc<Self>, mut deaths: mpsc::Receiver<()>) {
        let service = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            while deaths.recv().await.is_some() {
                match service.upgrade() {
                    Some(service) => service.handle_call_manager_exception().await,
                    None => break,
                }
            }
            debug!("Call manager death watcher finished");
        });
        if let Some(previous) = self.death_watcher.lock().replace(task) {
            previous.abort();
        }
    }

    // ===== Transport pushes =====

    /// Apply a call list reported by the `call_type` transport of `slot_id`.
    ///
    /// Lists arriving during an SRVCC handover are dropped.
    pub async fn report_calls_data(
        &self,
        slot_id: SlotId,
        call_type: CallType,
        calls: Vec<ReportedCall>,
    ) -> Result<ReconcileSummary> {
        self.check_slot(slot_id)?;
        let call_type = Self::routable(call_type)?;
        if *self.srvcc_state.read() == SrvccState::Started {
            debug!("SRVCC in progress, ignoring {} call list on slot {}", call_type, slot_id);
            return Ok(ReconcileSummary::new(ReconcileKind::Ignored));
        }
        self.request(slot_id, |reply| SlotCommand::Report {
            call_type,
            calls,
            reply,
        })
        .await
    }

    pub async fn report_call_fail_reason(&self, slot_id: SlotId, reason: CallFailReason) -> Result<()> {
        self.check_slot(slot_id)?;
        self.context.registry.report_call_fail_reason(slot_id, reason).await;
        Ok(())
    }

    /// Record a handover state change. Completion releases every connection
    /// of the slot and returns the state to `None`.
    pub async fn set_srvcc_state(&self, slot_id: SlotId, state: SrvccState) -> Result<()> {
        self.check_slot(slot_id)?;
        info!("SRVCC state on slot {}: {:?}", slot_id, state);
        *self.srvcc_state.write() = state;
        if state == SrvccState::Completed {
            self.request(slot_id, |reply| SlotCommand::ReleaseAll { reply }).await?;
            *self.srvcc_state.write() = SrvccState::None;
        }
        Ok(())
    }

    pub fn srvcc_state(&self) -> SrvccState {
        *self.srvcc_state.read()
    }

    // ===== Listener =====

    pub fn register_callback(&self, listener: Arc<dyn CallStatusListener>) {
        self.context.registry.register(listener);
    }

    pub fn unregister_callback(&self) {
        self.context.registry.unregister();
    }

    // ===== Settings =====

    pub fn set_emergency_call_list(&self, slot_id: SlotId, calls: Vec<EmergencyCall>) -> Result<()> {
        self.check_permission(Permission::SetTelephonyState)?;
        self.check_slot(slot_id)?;
        let mut settings = self.settings(slot_id);
        settings.emergency_calls = calls;
        self.settings.insert(slot_id, settings);
        Ok(())
    }

    pub fn is_emergency_phone_number(&self, slot_id: SlotId, number: &str) -> Result<bool> {
        self.check_slot(slot_id)?;
        Ok(self.emergency_number(slot_id, number))
    }

    pub fn set_domain_preference_mode(&self, slot_id: SlotId, mode: DomainPreferenceMode) -> Result<()> {
        self.check_permission(Permission::SetTelephonyState)?;
        self.check_slot(slot_id)?;
        let mut settings = self.settings(slot_id);
        settings.domain_preference_mode = mode;
        self.settings.insert(slot_id, settings);
        Ok(())
    }

    pub fn domain_preference_mode(&self, slot_id: SlotId) -> Result<DomainPreferenceMode> {
        self.check_slot(slot_id)?;
        Ok(self.settings(slot_id).domain_preference_mode)
    }

    pub fn set_ims_switch_status(&self, slot_id: SlotId, on: bool) -> Result<()> {
        self.check_permission(Permission::SetTelephonyState)?;
        self.check_slot(slot_id)?;
        let mut settings = self.settings(slot_id);
        settings.ims_switch_on = on;
        self.settings.insert(slot_id, settings);
        Ok(())
    }

    pub fn ims_switch_status(&self, slot_id: SlotId) -> Result<bool> {
        self.check_slot(slot_id)?;
        Ok(self.settings(slot_id).ims_switch_on)
    }

    // ===== Introspection and lifecycle =====

    /// Calls currently tracked by the `call_type` controller of `slot_id`
    pub async fn connection_snapshot(&self, slot_id: SlotId, call_type: CallType) -> Result<Vec<CallReportInfo>> {
        self.check_slot(slot_id)?;
        let call_type = Self::routable(call_type)?;
        let tx = match self.slots.lock().get(&slot_id) {
            Some(handle) if !handle.tx.is_closed() => handle.tx.clone(),
            _ => return Ok(Vec::new()),
        };
        Self::send_to(&tx, slot_id, |reply| SlotCommand::Snapshot { call_type, reply }).await
    }

    /// JSON description of slots, settings and tracked calls
    pub async fn dump(&self) -> Result<String> {
        let mut slots = Vec::new();
        for slot in 0..self.context.config.slot_count {
            let slot_id = slot as SlotId;
            slots.push(SlotDump {
                slot_id,
                settings: self.settings.get(&slot_id).map(|s| s.clone()),
                cs_calls: self.connection_snapshot(slot_id, CallType::Cs).await?,
                ims_calls: self.connection_snapshot(slot_id, CallType::Ims).await?,
            });
        }
        let dump = ServiceDump {
            srvcc_state: self.srvcc_state(),
            listener_registered: self.context.registry.is_registered(),
            slots,
        };
        serde_json::to_string_pretty(&dump).map_err(|e| CallError::config(format!("dump failed: {}", e)))
    }

    /// Stop every slot worker, dropping tracked connections. Requests made
    /// after this fail with [`CallError::ServiceUnavailable`].
    pub async fn stop(&self) {
        info!("Stopping cellular call service");
        if let Some(watcher) = self.death_watcher.lock().take() {
            watcher.abort();
        }
        let handles: Vec<(SlotId, SlotHandle)> = {
            let mut slots = self.slots.lock();
            self.stopped.store(true, Ordering::SeqCst);
            slots.drain().collect()
        };
        for (slot_id, handle) in handles {
            let _ = handle.tx.send(SlotCommand::Shutdown).await;
            if let Err(e) = handle.task.await {
                warn!("Slot {} worker ended abnormally: {}", slot_id, e);
            }
        }
    }
}

/// Builder for [`CellularCallService`]
pub struct CellularCallServiceBuilder {
    config: CellularCallConfig,
    cs_transport: Option<Arc<dyn TransportConnector>>,
    ims_transport: Option<Arc<dyn TransportConnector>>,
    supplementary: Option<Arc<dyn SupplementaryTransport>>,
    capability: Option<Arc<dyn CapabilityProvider>>,
    permissions: Arc<dyn PermissionChecker>,
}

impl CellularCallServiceBuilder {
    pub fn new() -> Self {
        Self {
            config: CellularCallConfig::default(),
            cs_transport: None,
            ims_transport: None,
            supplementary: None,
            capability: None,
            permissions: Arc::new(AllowAll),
        }
    }

    pub fn with_config(mut self, config: CellularCallConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cs_transport(mut self, transport: Arc<dyn TransportConnector>) -> Self {
        self.cs_transport = Some(transport);
        self
    }

    pub fn with_ims_transport(mut self, transport: Arc<dyn TransportConnector>) -> Self {
        self.ims_transport = Some(transport);
        self
    }

    pub fn with_supplementary_transport(mut self, transport: Arc<dyn SupplementaryTransport>) -> Self {
        self.supplementary = Some(transport);
        self
    }

    pub fn with_capability_provider(mut self, capability: Arc<dyn CapabilityProvider>) -> Self {
        self.capability = Some(capability);
        self
    }

    pub fn with_permission_checker(mut self, permissions: Arc<dyn PermissionChecker>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn build(self) -> Result<CellularCallService> {
        self.config.validate()?;
        let cs_transport = self
            .cs_transport
            .ok_or_else(|| CallError::config("CS transport is required"))?;
        let ims_transport = self
            .ims_transport
            .ok_or_else(|| CallError::config("IMS transport is required"))?;
        let supplementary = self
            .supplementary
            .ok_or_else(|| CallError::config("supplementary transport is required"))?;
        let capability = self
            .capability
            .ok_or_else(|| CallError::config("capability provider is required"))?;
        if cs_transport.call_type() != CallType::Cs || ims_transport.call_type() != CallType::Ims {
            return Err(CallError::config("transport call types do not match their slots"));
        }

        let registry = Arc::new(CallbackRegistry::new());
        let settings = DashMap::new();
        for slot in 0..self.config.slot_count {
            settings.insert(slot as SlotId, SlotSettings::from_config(&self.config));
        }

        Ok(CellularCallService {
            context: Arc::new(ServiceContext {
                config: self.config,
                cs_transport,
                ims_transport,
                capability,
                dispatcher: MmiDispatcher::new(supplementary, registry.clone()),
                registry,
            }),
            permissions: self.permissions,
            slots: Mutex::new(HashMap::new()),
            settings,
            srvcc_state: RwLock::new(SrvccState::None),
            death_watcher: Mutex::new(None),
            stopped: AtomicBool::new(false),
        })
    }
}

impl Default for CellularCallServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
