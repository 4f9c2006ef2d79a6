use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::CallController;
use crate::errors::{codes, CallError, Result};
use crate::mmi::MmiCommand;
use crate::transport::{DialRequest, TransportConnector};
use crate::types::{CallType, CellularCallInfo, ClirMode, NetworkType, TelCallState};

/// Characters stripped from the user part of a SIP address
const VISUAL_SEPARATORS: [char; 6] = [' ', '-', '(', ')', '.', '/'];

/// Result of a dial request that passed every precondition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialOutcome {
    /// The transport accepted the dial
    Dialed,
    /// The dial string is a supplementary service code and must be executed
    /// instead of dialled
    Mmi(MmiCommand),
}

impl DialOutcome {
    pub fn code(&self) -> i32 {
        match self {
            DialOutcome::Dialed => codes::SUCCESS,
            DialOutcome::Mmi(_) => codes::RETURN_TYPE_MMI,
        }
    }

    pub fn is_mmi(&self) -> bool {
        matches!(self, DialOutcome::Mmi(_))
    }
}

fn is_dialable(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '*' | '#' | '+' | ',' | ';')
}

/// Strip formatting from a number before it is dialled.
///
/// SIP addresses only lose visual separators in the user part; anything else
/// is reduced to dialable characters.
pub fn normalize_dial_number(number: &str) -> String {
    match number.split_once('@') {
        Some((user, host)) => {
            let user: String = user.chars().filter(|c| !VISUAL_SEPARATORS.contains(c)).collect();
            format!("{}@{}", user, host)
        }
        None => number.chars().filter(|c| is_dialable(*c)).collect(),
    }
}

impl<T: TransportConnector + ?Sized> CallController<T> {
    /// Place an outgoing call.
    ///
    /// Checks run in a fixed order: empty number, radio, CS network type,
    /// supplementary service classification, call count bound. An active call
    /// is put on hold first; a failed hold does not stop the dial.
    pub async fn dial(&mut self, info: &CellularCallInfo) -> Result<DialOutcome> {
        if info.phone_number.is_empty() {
            return Err(CallError::PhoneNumberEmpty);
        }
        if !self.capability.is_radio_available(self.slot_id) {
            return Err(CallError::RadioUnavailable);
        }

        let network_type = match self.call_type() {
            CallType::Cs => match self.capability.network_type(self.slot_id) {
                NetworkType::Unknown => return Err(CallError::UnsupportedNetworkType),
                known => Some(known),
            },
            _ => None,
        };

        let number = normalize_dial_number(&info.phone_number);
        let (number, clir_mode) = match MmiCommand::parse(&number) {
            Some(command) => match command.clir_override() {
                Some(mode) => (command.dial_string, mode),
                None => {
                    debug!("Dial string on slot {} is an MMI code", self.slot_id);
                    return Ok(DialOutcome::Mmi(command));
                }
            },
            None => (number, ClirMode::Default),
        };
        if number.is_empty() {
            return Err(CallError::argument_invalid("no dialable characters in number"));
        }

        if self.table.is_full() {
            return Err(CallError::CallCountsExceedLimit {
                limit: self.table.max_connections(),
            });
        }

        if network_type == Some(NetworkType::Cdma) && self.table.has_state(TelCallState::Active) {
            info!("Three-way dial on slot {}", self.slot_id);
            self.transport.cdma_three_way_dial(self.slot_id).await?;
            return Ok(DialOutcome::Dialed);
        }

        if let Some(active) = self.table.find_by_state(TelCallState::Active) {
            let index = active.index();
            if let Err(e) = self.transport.hold_call(self.slot_id, index).await {
                warn!("Hold of active call {} before dial failed: {}", index, e);
            }
        }

        info!("Dialing over {} on slot {} (clir: {:?})", self.call_type(), self.slot_id, clir_mode);
        let request = DialRequest {
            phone_number: number,
            clir_mode,
            video_state: info.video_state,
        };
        self.transport.dial(self.slot_id, &request).await?;
        Ok(DialOutcome::Dialed)
    }
}
