//! Execution of parsed MMI commands
//!
//! Each supported service code maps to a handler that turns the command into
//! a [`SupplementaryRequest`]. The table is built once on first use.
//!
//! ```text
//! MmiCommand ──► handler(service code) ──► SupplementaryRequest ──► SupplementaryTransport
//!      │                                                               │
//!      └── unknown code + dial string ──► SendUssd                     ▼
//!                                                        MmiResult ──► CallbackRegistry
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::command::{MmiAction, MmiCommand};
use super::request::{
    service_class, BarringFacility, CallTransferAction, CallTransferReason, SupplementaryRequest,
};
use crate::events::CallbackRegistry;
use crate::transport::{SupplementaryTransport, TransportError};
use crate::types::SlotId;

const PIN_PUK_MIN: usize = 4;
const PIN_PUK_MAX: usize = 8;

pub const MMI_RESULT_SUCCESS: i32 = 0;
pub const MMI_RESULT_FAILED: i32 = 1;

/// Errors produced while interpreting an MMI command
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MmiError {
    #[error("Invalid MMI code: action {action:?} not supported for service code {service_code}")]
    UnsupportedAction {
        service_code: String,
        action: Option<MmiAction>,
    },

    #[error("PIN or PUK don't match")]
    PinMismatch,

    #[error("Invalid PIN or PUK numbers")]
    InvalidPinLength,

    #[error("Supplementary request failed: {0}")]
    Transport(#[from] TransportError),
}

impl MmiError {
    fn unsupported(command: &MmiCommand) -> Self {
        Self::UnsupportedAction {
            service_code: command.service_code.clone(),
            action: command.action,
        }
    }
}

/// Outcome of an MMI command as reported to the application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MmiResult {
    pub result: i32,
    pub message: String,
}

impl MmiResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            result: MMI_RESULT_SUCCESS,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            result: MMI_RESULT_FAILED,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == MMI_RESULT_SUCCESS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmiOutcome {
    /// A supplementary request was issued or rejected locally
    Handled,
    /// The code was forwarded to the network as USSD
    UssdSent,
    NotHandled,
}

type Handler = fn(&MmiCommand) -> Result<SupplementaryRequest, MmiError>;

static HANDLERS: Lazy<HashMap<&'static str, Handler>> = Lazy::new(|| {
    let mut handlers: HashMap<&'static str, Handler> = HashMap::new();
    handlers.insert("30", clip);
    handlers.insert("31", clir);
    for code in ["21", "61", "62", "67", "002", "004"] {
        handlers.insert(code, call_transfer);
    }
    for code in ["33", "331", "332", "35", "351", "330", "333", "353"] {
        handlers.insert(code, call_restriction);
    }
    handlers.insert("43", call_waiting);
    handlers.insert("04", alter_pin);
    handlers.insert("042", alter_pin2);
    handlers.insert("05", unlock_puk);
    handlers.insert("052", unlock_puk2);
    handlers
});

fn clip(command: &MmiCommand) -> Result<SupplementaryRequest, MmiError> {
    match command.action {
        Some(MmiAction::Interrogate) => Ok(SupplementaryRequest::GetClip),
        _ => Err(MmiError::unsupported(command)),
    }
}

fn clir(command: &MmiCommand) -> Result<SupplementaryRequest, MmiError> {
    match command.action {
        Some(MmiAction::Activate) => Ok(SupplementaryRequest::SetClir { enable: true }),
        Some(MmiAction::Deactivate) => Ok(SupplementaryRequest::SetClir { enable: false }),
        Some(MmiAction::Interrogate) => Ok(SupplementaryRequest::GetClir),
        _ => Err(MmiError::unsupported(command)),
    }
}

fn transfer_reason(service_code: &str) -> Option<CallTransferReason> {
    match service_code {
        "21" => Some(CallTransferReason::Unconditional),
        "67" => Some(CallTransferReason::Busy),
        "61" => Some(CallTransferReason::NoReply),
        "62" => Some(CallTransferReason::NotReachable),
        "002" => Some(CallTransferReason::All),
        "004" => Some(CallTransferReason::AllConditional),
        _ => None,
    }
}

fn call_transfer(command: &MmiCommand) -> Result<SupplementaryRequest, MmiError> {
    let reason = transfer_reason(&command.service_code).ok_or_else(|| MmiError::unsupported(command))?;
    let number = command.service_info_a.clone();
    let action = match command.action {
        Some(MmiAction::Interrogate) => return Ok(SupplementaryRequest::GetCallTransfer { reason }),
        Some(MmiAction::Activate) if number.is_empty() => CallTransferAction::Enable,
        Some(MmiAction::Activate) | Some(MmiAction::Register) => CallTransferAction::Registration,
        Some(MmiAction::Deactivate) => CallTransferAction::Disable,
        Some(MmiAction::Erase) => CallTransferAction::Erasure,
        None => return Err(MmiError::unsupported(command)),
    };
    Ok(SupplementaryRequest::SetCallTransfer {
        action,
        reason,
        number,
        service_class: service_class::from_basic_service_group(&command.service_info_b),
    })
}

fn call_restriction(command: &MmiCommand) -> Result<SupplementaryRequest, MmiError> {
    let facility =
        BarringFacility::from_service_code(&command.service_code).ok_or_else(|| MmiError::unsupported(command))?;
    match command.action {
        Some(MmiAction::Interrogate) => Ok(SupplementaryRequest::GetCallRestriction { facility }),
        Some(action @ (MmiAction::Activate | MmiAction::Deactivate)) => Ok(SupplementaryRequest::SetCallRestriction {
            facility,
            enable: action == MmiAction::Activate,
            password: command.service_info_a.clone(),
        }),
        _ => Err(MmiError::unsupported(command)),
    }
}

fn call_waiting(command: &MmiCommand) -> Result<SupplementaryRequest, MmiError> {
    match command.action {
        Some(action @ (MmiAction::Activate | MmiAction::Deactivate)) => Ok(SupplementaryRequest::SetCallWaiting {
            enable: action == MmiAction::Activate,
            service_class: service_class::from_basic_service_group(&command.service_info_a),
        }),
        Some(MmiAction::Interrogate) => Ok(SupplementaryRequest::GetCallWaiting),
        _ => Err(MmiError::unsupported(command)),
    }
}

/// New code (SIB) and its confirmation (SIC) must agree and be 4 to 8 long
fn checked_new_code(command: &MmiCommand) -> Result<String, MmiError> {
    if command.action.is_none() {
        return Err(MmiError::unsupported(command));
    }
    let new_code = &command.service_info_b;
    if *new_code != command.service_info_c {
        return Err(MmiError::PinMismatch);
    }
    if new_code.len() < PIN_PUK_MIN || new_code.len() > PIN_PUK_MAX {
        return Err(MmiError::InvalidPinLength);
    }
    Ok(new_code.clone())
}

fn alter_pin(command: &MmiCommand) -> Result<SupplementaryRequest, MmiError> {
    let new_pin = checked_new_code(command)?;
    Ok(SupplementaryRequest::AlterPin {
        old_pin: command.service_info_a.clone(),
        new_pin,
    })
}

fn alter_pin2(command: &MmiCommand) -> Result<SupplementaryRequest, MmiError> {
    let new_pin2 = checked_new_code(command)?;
    Ok(SupplementaryRequest::AlterPin2 {
        old_pin2: command.service_info_a.clone(),
        new_pin2,
    })
}

fn unlock_puk(command: &MmiCommand) -> Result<SupplementaryRequest, MmiError> {
    let new_pin = checked_new_code(command)?;
    Ok(SupplementaryRequest::UnlockPuk {
        puk: command.service_info_a.clone(),
        new_pin,
    })
}

fn unlock_puk2(command: &MmiCommand) -> Result<SupplementaryRequest, MmiError> {
    let new_pin2 = checked_new_code(command)?;
    Ok(SupplementaryRequest::UnlockPuk2 {
        puk2: command.service_info_a.clone(),
        new_pin2,
    })
}

/// Whether a handler exists for `service_code`
pub fn is_known_service_code(service_code: &str) -> bool {
    HANDLERS.contains_key(service_code)
}

/// Translate a command into the request to send.
///
/// `Ok(None)` means the command is not a supplementary service this core
/// knows how to execute.
pub fn resolve(command: &MmiCommand) -> Result<Option<SupplementaryRequest>, MmiError> {
    if let Some(handler) = HANDLERS.get(command.service_code.as_str()) {
        return handler(command).map(Some);
    }
    if command.is_unstructured() && !command.full_string.is_empty() {
        return Ok(Some(SupplementaryRequest::SendUssd {
            message: command.full_string.clone(),
        }));
    }
    if !command.dial_string.is_empty() {
        return Ok(Some(SupplementaryRequest::SendUssd {
            message: format!("{}{}", command.full_string, command.dial_string),
        }));
    }
    Ok(None)
}

/// Executes MMI commands for every slot against one supplementary transport
pub struct MmiDispatcher {
    transport: Arc<dyn SupplementaryTransport>,
    registry: Arc<CallbackRegistry>,
}

impl MmiDispatcher {
    pub fn new(transport: Arc<dyn SupplementaryTransport>, registry: Arc<CallbackRegistry>) -> Self {
        Self { transport, registry }
    }

    /// Execute `command` on `slot_id` and report the outcome to the listener
    pub async fn execute(&self, slot_id: SlotId, command: &MmiCommand) -> MmiOutcome {
        let request = match resolve(command) {
            Ok(Some(request)) => request,
            Ok(None) => {
                debug!("MMI code {} on slot {} not handled", command.full_string, slot_id);
                return MmiOutcome::NotHandled;
            }
            Err(e) => {
                warn!("Rejected MMI code {} on slot {}: {}", command.full_string, slot_id, e);
                self.registry
                    .report_mmi_result(slot_id, MmiResult::failed(e.to_string()))
                    .await;
                return MmiOutcome::Handled;
            }
        };

        let outcome = match request {
            SupplementaryRequest::SendUssd { .. } => MmiOutcome::UssdSent,
            _ => MmiOutcome::Handled,
        };

        info!("Executing {} on slot {}", request.describe(), slot_id);
        let result = match self.transport.send_supplementary(slot_id, &request).await {
            Ok(()) => MmiResult::success(format!("{} success", request.describe())),
            Err(e) => {
                warn!("{} on slot {} failed: {}", request.describe(), slot_id, e);
                MmiResult::failed(format!("{} failed", request.describe()))
            }
        };
        self.registry.report_mmi_result(slot_id, result).await;
        outcome
    }
}
