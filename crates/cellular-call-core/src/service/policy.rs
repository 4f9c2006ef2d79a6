//! Slot validation, emergency numbers and voice domain selection

use serde::{Deserialize, Serialize};

use crate::config::CellularCallConfig;
use crate::controller::normalize_dial_number;
use crate::types::{CallType, DomainPreferenceMode, EmergencyCall, SlotId};

/// Emergency numbers valid with a SIM (3GPP TS 22.101)
pub const DEFAULT_EMERGENCY_NUMBERS: [&str; 2] = ["112", "911"];

/// Additional emergency numbers valid without a SIM
pub const NO_SIM_EMERGENCY_NUMBERS: [&str; 6] = ["000", "08", "110", "118", "119", "999"];

/// Runtime settings of one slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSettings {
    pub domain_preference_mode: DomainPreferenceMode,
    pub ims_switch_on: bool,
    pub emergency_calls: Vec<EmergencyCall>,
}

impl SlotSettings {
    pub fn from_config(config: &CellularCallConfig) -> Self {
        Self {
            domain_preference_mode: config.domain_preference_mode,
            ims_switch_on: config.ims_switch_on,
            emergency_calls: Vec::new(),
        }
    }
}

pub fn is_valid_slot_id(slot_id: SlotId, slot_count: usize) -> bool {
    slot_id >= 0 && (slot_id as usize) < slot_count
}

pub fn is_emergency_number(
    number: &str,
    has_sim: bool,
    slot_list: &[EmergencyCall],
    configured: &[String],
) -> bool {
    let number = normalize_dial_number(number);
    if number.is_empty() {
        return false;
    }
    DEFAULT_EMERGENCY_NUMBERS.contains(&number.as_str())
        || (!has_sim && NO_SIM_EMERGENCY_NUMBERS.contains(&number.as_str()))
        || slot_list.iter().any(|call| call.number == number)
        || configured.iter().any(|n| *n == number)
}

/// Inputs to the dial domain decision
#[derive(Debug, Clone, Copy)]
pub struct DomainInputs {
    pub ims_registered: bool,
    pub ims_service_connected: bool,
    pub preference: DomainPreferenceMode,
    pub ims_switch_on: bool,
    pub is_emergency: bool,
    pub ims_prefer_for_emergency: bool,
}

/// Pick the controller a dial goes to
pub fn select_dial_domain(inputs: &DomainInputs) -> CallType {
    let ims_usable = inputs.ims_registered
        && inputs.preference != DomainPreferenceMode::CsVoiceOnly
        && inputs.ims_switch_on
        && inputs.ims_service_connected;
    let ims_emergency =
        inputs.is_emergency && inputs.ims_service_connected && inputs.ims_prefer_for_emergency;
    if ims_usable || ims_emergency {
        CallType::Ims
    } else {
        CallType::Cs
    }
}
