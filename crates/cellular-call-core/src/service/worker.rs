//! Per-slot worker task
//!
//! Every slot has one task that owns its CS and IMS controllers. Requests
//! from any caller and call list pushes from the transports are queued into
//! it, so table mutation for a slot is strictly sequential.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::capability::CapabilityProvider;
use crate::config::CellularCallConfig;
use crate::controller::{CallController, DialOutcome, ReconcileKind, ReconcileSummary};
use crate::errors::{CallError, Result};
use crate::events::CallbackRegistry;
use crate::mmi::MmiDispatcher;
use crate::transport::TransportConnector;
use crate::types::{
    CallReportInfo, CallSupplementType, CallType, CellularCallInfo, ImsCallMode, ReportedCall, SlotId,
};

type DynController = CallController<dyn TransportConnector>;

/// Dependencies shared by every slot worker
pub(crate) struct ServiceContext {
    pub config: CellularCallConfig,
    pub cs_transport: Arc<dyn TransportConnector>,
    pub ims_transport: Arc<dyn TransportConnector>,
    pub capability: Arc<dyn CapabilityProvider>,
    pub registry: Arc<CallbackRegistry>,
    pub dispatcher: MmiDispatcher,
}

/// Call control request routed to one controller
#[derive(Debug)]
pub(crate) enum ControlOp {
    HangUp(CellularCallInfo, CallSupplementType),
    Reject(CellularCallInfo),
    Answer(CellularCallInfo),
    Hold(CellularCallInfo),
    UnHold(CellularCallInfo),
    Switch(CellularCallInfo),
    Combine(CellularCallInfo),
    Separate(CellularCallInfo),
    Invite(Vec<String>),
    KickOut(Vec<String>),
    UpdateMediaMode(CellularCallInfo, ImsCallMode),
    StartDtmf(char, CellularCallInfo),
    StopDtmf(CellularCallInfo),
    SendDtmf(char, CellularCallInfo),
}

pub(crate) enum SlotCommand {
    Dial {
        call_type: CallType,
        info: CellularCallInfo,
        reply: oneshot::Sender<Result<DialOutcome>>,
    },
    Control {
        call_type: CallType,
        op: ControlOp,
        reply: oneshot::Sender<Result<()>>,
    },
    Report {
        call_type: CallType,
        calls: Vec<ReportedCall>,
        reply: oneshot::Sender<ReconcileSummary>,
    },
    HangUpAll {
        ignore_hangup_report: bool,
        reply: oneshot::Sender<Result<()>>,
    },
    ReleaseAll {
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        call_type: CallType,
        reply: oneshot::Sender<Vec<CallReportInfo>>,
    },
    Shutdown,
}

/// Sending side of a running slot worker
pub(crate) struct SlotHandle {
    pub tx: mpsc::Sender<SlotCommand>,
    pub task: JoinHandle<()>,
}

pub(crate) struct SlotWorker {
    slot_id: SlotId,
    context: Arc<ServiceContext>,
    cs: Option<DynController>,
    ims: Option<DynController>,
    rx: mpsc::Receiver<SlotCommand>,
}

impl SlotWorker {
    pub fn spawn(slot_id: SlotId, context: Arc<ServiceContext>) -> SlotHandle {
        let (tx, rx) = mpsc::channel(context.config.command_queue_depth);
        let worker = SlotWorker {
            slot_id,
            context,
            cs: None,
            ims: None,
            rx,
        };
        let task = tokio::spawn(worker.run());
        SlotHandle { tx, task }
    }

    async fn run(mut self) {
        info!("Slot {} worker started", self.slot_id);
        while let Some(command) = self.rx.recv().await {
            if !self.handle(command).await {
                break;
            }
        }
        self.release_all();
        info!("Slot {} worker stopped", self.slot_id);
    }

    /// Controller for `call_type`, created on first use
    fn controller(&mut self, call_type: CallType) -> Result<&mut DynController> {
        let slot_id = self.slot_id;
        let context = &self.context;
        let (slot, transport) = match call_type {
            CallType::Cs => (&mut self.cs, &context.cs_transport),
            CallType::Ims => (&mut self.ims, &context.ims_transport),
            CallType::Ott => {
                return Err(CallError::argument_invalid(format!(
                    "call type {} is not handled here",
                    call_type
                )))
            }
        };
        Ok(slot.get_or_insert_with(|| {
            CallController::new(
                slot_id,
                transport.clone(),
                context.capability.clone(),
                context.registry.clone(),
                context.config.max_connections,
            )
        }))
    }

    fn existing(&self, call_type: CallType) -> Option<&DynController> {
        match call_type {
            CallType::Cs => self.cs.as_ref(),
            CallType::Ims => self.ims.as_ref(),
            CallType::Ott => None,
        }
    }

    fn release_all(&mut self) {
        for controller in [self.cs.as_mut(), self.ims.as_mut()].into_iter().flatten() {
            controller.release_all_connections();
        }
        self.cs = None;
        self.ims = None;
    }

    /// Returns false once the worker should stop
    async fn handle(&mut self, command: SlotCommand) -> bool {
        match command {
            SlotCommand::Dial { call_type, info, reply } => {
                let result = match self.controller(call_type) {
                    Ok(controller) => controller.dial(&info).await,
                    Err(e) => Err(e),
                };
                let mmi = match &result {
                    Ok(DialOutcome::Mmi(command)) => Some(command.clone()),
                    _ => None,
                };
                let _ = reply.send(result);
                // the caller already has its answer; the code runs afterwards
                if let Some(command) = mmi {
                    self.context.dispatcher.execute(self.slot_id, &command).await;
                }
            }
            SlotCommand::Control { call_type, op, reply } => {
                let result = self.control(call_type, op).await;
                let _ = reply.send(result);
            }
            SlotCommand::Report {
                call_type,
                calls,
                reply,
            } => {
                let summary = match self.controller(call_type) {
                    Ok(controller) => controller.report_calls_data(&calls).await,
                    Err(e) => {
                        warn!("Dropping call list for slot {}: {}", self.slot_id, e);
                        ReconcileSummary::new(ReconcileKind::Ignored)
                    }
                };
                debug!("Slot {} {} reconcile: {:?}", self.slot_id, call_type, summary);
                let _ = reply.send(summary);
            }
            SlotCommand::HangUpAll {
                ignore_hangup_report,
                reply,
            } => {
                let mut result = Ok(());
                for controller in [self.cs.as_mut(), self.ims.as_mut()].into_iter().flatten() {
                    if controller.table().is_empty() {
                        continue;
                    }
                    if ignore_hangup_report {
                        controller.set_hangup_report_ignored(true);
                    }
                    if let Err(e) = controller.hang_up_all_connections().await {
                        warn!("Hang up all on slot {} failed: {}", controller.slot_id(), e);
                        // nothing was released, so the next hang up is a real one
                        controller.set_hangup_report_ignored(false);
                        result = Err(e);
                    }
                }
                let _ = reply.send(result);
            }
            SlotCommand::ReleaseAll { reply } => {
                self.release_all();
                let _ = reply.send(());
            }
            SlotCommand::Snapshot { call_type, reply } => {
                let snapshot = self
                    .existing(call_type)
                    .map(|controller| controller.table().snapshot())
                    .unwrap_or_default();
                let _ = reply.send(snapshot);
            }
            SlotCommand::Shutdown => return false,
        }
        true
    }

    async fn control(&mut self, call_type: CallType, op: ControlOp) -> Result<()> {
        let controller = self.controller(call_type)?;
        match op {
            ControlOp::HangUp(info, supplement) => controller.hang_up(&info, supplement).await,
            ControlOp::Reject(info) => controller.reject(&info).await,
            ControlOp::Answer(info) => controller.answer(&info).await,
            ControlOp::Hold(info) => controller.hold_call(&info).await,
            ControlOp::UnHold(info) => controller.unhold_call(&info).await,
            ControlOp::Switch(info) => controller.switch_call(&info).await,
            ControlOp::Combine(info) => controller.combine_conference(&info).await,
            ControlOp::Separate(info) => controller.separate_conference(&info).await,
            ControlOp::Invite(numbers) => controller.invite_to_conference(&numbers).await,
            ControlOp::KickOut(numbers) => controller.kick_out_from_conference(&numbers).await,
            ControlOp::UpdateMediaMode(info, mode) => controller.update_call_media_mode(&info, mode).await,
            ControlOp::StartDtmf(code, info) => controller.start_dtmf(code, &info).await,
            ControlOp::StopDtmf(info) => controller.stop_dtmf(&info).await,
            ControlOp::SendDtmf(code, info) => controller.send_dtmf(code, &info).await,
        }
    }
}
