//! Shared helpers for cellular-call-core integration tests
//!
//! Provides recording transports, a switchable capability provider and a
//! ready-made service with a channel listener attached.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use cellular_call_core::logging::{setup_logging, LoggingConfig};
use cellular_call_core::prelude::*;

/// Install a test subscriber once; later calls are ignored
pub fn init_tracing() {
    let _ = setup_logging(&LoggingConfig::default().with_file_info());
}

/// Transport recording each request as `op:args`
pub struct RecordingTransport {
    call_type: CallType,
    log: Mutex<Vec<String>>,
    fail_dial: AtomicBool,
    fail_reject: AtomicBool,
}

impl RecordingTransport {
    pub fn new(call_type: CallType) -> Arc<Self> {
        Arc::new(Self {
            call_type,
            log: Mutex::new(Vec::new()),
            fail_dial: AtomicBool::new(false),
            fail_reject: AtomicBool::new(false),
        })
    }

    pub fn set_fail_dial(&self, fail: bool) {
        self.fail_dial.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reject(&self, fail: bool) {
        self.fail_reject.store(fail, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.lock())
    }

    fn record(&self, entry: String) -> TransportResult {
        self.log.lock().push(entry);
        Ok(())
    }
}

#[async_trait]
impl TransportConnector for RecordingTransport {
    fn call_type(&self) -> CallType {
        self.call_type
    }

    async fn dial(&self, slot_id: SlotId, request: &DialRequest) -> TransportResult {
        if self.fail_dial.load(Ordering::SeqCst) {
            return TransportError::from_code(TransportError::SEND_FAILED);
        }
        self.record(format!("dial:{}:{}", slot_id, request.phone_number))
    }

    async fn answer(&self, slot_id: SlotId, index: i32, _video_state: VideoState) -> TransportResult {
        self.record(format!("answer:{}:{}", slot_id, index))
    }

    async fn reject(&self, slot_id: SlotId, index: i32) -> TransportResult {
        if self.fail_reject.load(Ordering::SeqCst) {
            return TransportError::from_code(TransportError::SEND_FAILED);
        }
        self.record(format!("reject:{}:{}", slot_id, index))
    }

    async fn hang_up(&self, slot_id: SlotId, index: i32) -> TransportResult {
        self.record(format!("hang_up:{}:{}", slot_id, index))
    }

    async fn hold_call(&self, slot_id: SlotId, index: i32) -> TransportResult {
        self.record(format!("hold:{}:{}", slot_id, index))
    }

    async fn unhold_call(&self, slot_id: SlotId, index: i32) -> TransportResult {
        self.record(format!("unhold:{}:{}", slot_id, index))
    }

    async fn switch_call(&self, slot_id: SlotId, index: i32) -> TransportResult {
        self.record(format!("switch:{}:{}", slot_id, index))
    }

    async fn call_supplement(&self, slot_id: SlotId, supplement: CallSupplementType) -> TransportResult {
        self.record(format!("supplement:{}:{:?}", slot_id, supplement))
    }

    async fn combine_conference(&self, slot_id: SlotId, _video_state: VideoState) -> TransportResult {
        self.record(format!("combine:{}", slot_id))
    }

    async fn separate_conference(&self, slot_id: SlotId, index: i32) -> TransportResult {
        self.record(format!("separate:{}:{}", slot_id, index))
    }

    async fn start_dtmf(&self, slot_id: SlotId, code: char, index: i32) -> TransportResult {
        self.record(format!("start_dtmf:{}:{}:{}", slot_id, code, index))
    }

    async fn stop_dtmf(&self, slot_id: SlotId, index: i32) -> TransportResult {
        self.record(format!("stop_dtmf:{}:{}", slot_id, index))
    }

    async fn send_dtmf(&self, slot_id: SlotId, code: char, index: i32) -> TransportResult {
        self.record(format!("send_dtmf:{}:{}:{}", slot_id, code, index))
    }

    async fn request_call_fail_reason(&self, slot_id: SlotId) -> TransportResult {
        self.record(format!("fail_reason:{}", slot_id))
    }

    async fn invite_to_conference(&self, slot_id: SlotId, numbers: &[String]) -> TransportResult {
        if self.call_type != CallType::Ims {
            return Err(TransportError::Unsupported(self.call_type));
        }
        self.record(format!("invite:{}:{}", slot_id, numbers.join(",")))
    }

    async fn kick_out_from_conference(&self, slot_id: SlotId, numbers: &[String]) -> TransportResult {
        if self.call_type != CallType::Ims {
            return Err(TransportError::Unsupported(self.call_type));
        }
        self.record(format!("kick:{}:{}", slot_id, numbers.join(",")))
    }

    async fn update_call_media_mode(&self, slot_id: SlotId, index: i32, mode: ImsCallMode) -> TransportResult {
        self.record(format!("media:{}:{}:{:?}", slot_id, index, mode))
    }
}

/// Supplementary transport recording each request
#[derive(Default)]
pub struct RecordingSupplementary {
    log: Mutex<Vec<(SlotId, SupplementaryRequest)>>,
}

impl RecordingSupplementary {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn requests(&self) -> Vec<(SlotId, SupplementaryRequest)> {
        self.log.lock().clone()
    }
}

#[async_trait]
impl SupplementaryTransport for RecordingSupplementary {
    async fn send_supplementary(&self, slot_id: SlotId, request: &SupplementaryRequest) -> TransportResult {
        self.log.lock().push((slot_id, request.clone()));
        Ok(())
    }
}

/// Capability provider whose answers can be flipped during a test
pub struct SwitchableCapability {
    pub radio: AtomicBool,
    pub ims_registered: AtomicBool,
    pub ims_connected: AtomicBool,
    pub sim: AtomicBool,
    pub network: Mutex<NetworkType>,
}

impl SwitchableCapability {
    /// Radio on, GSM network, IMS down
    pub fn cs_only() -> Arc<Self> {
        Arc::new(Self {
            radio: AtomicBool::new(true),
            ims_registered: AtomicBool::new(false),
            ims_connected: AtomicBool::new(false),
            sim: AtomicBool::new(true),
            network: Mutex::new(NetworkType::Gsm),
        })
    }

    pub fn set_ims(&self, registered: bool, connected: bool) {
        self.ims_registered.store(registered, Ordering::SeqCst);
        self.ims_connected.store(connected, Ordering::SeqCst);
    }
}

impl CapabilityProvider for SwitchableCapability {
    fn is_radio_available(&self, _slot_id: SlotId) -> bool {
        self.radio.load(Ordering::SeqCst)
    }

    fn network_type(&self, _slot_id: SlotId) -> NetworkType {
        *self.network.lock()
    }

    fn is_ims_registered(&self, _slot_id: SlotId) -> bool {
        self.ims_registered.load(Ordering::SeqCst)
    }

    fn is_ims_service_connected(&self) -> bool {
        self.ims_connected.load(Ordering::SeqCst)
    }

    fn has_sim_card(&self, _slot_id: SlotId) -> bool {
        self.sim.load(Ordering::SeqCst)
    }
}

/// Permission checker denying a fixed set of permissions
pub struct DenyPermissions(pub Vec<Permission>);

impl PermissionChecker for DenyPermissions {
    fn check(&self, permission: Permission) -> bool {
        !self.0.contains(&permission)
    }
}

/// A service plus handles on everything it talks to
pub struct TestHarness {
    pub service: Arc<CellularCallService>,
    pub cs: Arc<RecordingTransport>,
    pub ims: Arc<RecordingTransport>,
    pub supplementary: Arc<RecordingSupplementary>,
    pub capability: Arc<SwitchableCapability>,
    pub events: mpsc::UnboundedReceiver<CallEvent>,
}

impl TestHarness {
    pub fn new(config: CellularCallConfig) -> Self {
        Self::with_permissions(config, Arc::new(AllowAll))
    }

    pub fn with_permissions(config: CellularCallConfig, permissions: Arc<dyn PermissionChecker>) -> Self {
        init_tracing();
        let cs = RecordingTransport::new(CallType::Cs);
        let ims = RecordingTransport::new(CallType::Ims);
        let supplementary = RecordingSupplementary::new();
        let capability = SwitchableCapability::cs_only();

        let service = CellularCallService::builder()
            .with_config(config)
            .with_cs_transport(cs.clone())
            .with_ims_transport(ims.clone())
            .with_supplementary_transport(supplementary.clone())
            .with_capability_provider(capability.clone())
            .with_permission_checker(permissions)
            .build()
            .expect("Failed to build service");

        let (listener, events) = ChannelListener::new();
        service.register_callback(Arc::new(listener));

        Self {
            service: Arc::new(service),
            cs,
            ims,
            supplementary,
            capability,
            events,
        }
    }

    /// Next calls report, skipping other events
    pub async fn next_calls_report(&mut self) -> CallsReportInfo {
        loop {
            let event = tokio::time::timeout(Duration::from_secs(1), self.events.recv())
                .await
                .expect("Timed out waiting for a calls report")
                .expect("Event channel closed");
            if let CallEvent::CallsReport(report) = event {
                return report;
            }
        }
    }

    pub async fn next_mmi_result(&mut self) -> (SlotId, MmiResult) {
        loop {
            let event = tokio::time::timeout(Duration::from_secs(1), self.events.recv())
                .await
                .expect("Timed out waiting for an MMI result")
                .expect("Event channel closed");
            if let CallEvent::MmiResult { slot_id, result } = event {
                return (slot_id, result);
            }
        }
    }

    /// Drain whatever is queued right now
    pub fn pending_events(&mut self) -> Vec<CallEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

pub fn cs_call(slot_id: SlotId, number: &str) -> CellularCallInfo {
    CellularCallInfo::new(slot_id, number, CallType::Cs)
}

pub fn ims_call(slot_id: SlotId, number: &str) -> CellularCallInfo {
    CellularCallInfo::new(slot_id, number, CallType::Ims)
}
