//! Supplementary service requests produced from MMI commands

use serde::{Deserialize, Serialize};

/// Basic service class bits (3GPP TS 27.007 `<class>`)
pub mod service_class {
    pub const NONE: i32 = 0;
    pub const VOICE: i32 = 1;
    pub const DATA: i32 = 2;
    pub const FAX: i32 = 4;
    pub const SHORT_MESSAGE_SERVICE: i32 = 8;
    pub const DATA_CIRCUIT_SYNC: i32 = 16;
    pub const DATA_CIRCUIT_ASYNC: i32 = 32;
    pub const DEDICATED_PACKET_ACCESS: i32 = 64;
    pub const DEDICATED_PAD_ACCESS: i32 = 128;

    /// Map a basic service group code (3GPP TS 22.030 Annex C) to class bits
    pub fn from_basic_service_group(group: &str) -> i32 {
        match group.parse::<i32>() {
            Ok(10) => SHORT_MESSAGE_SERVICE + FAX + VOICE,
            Ok(11) => VOICE,
            Ok(12) => SHORT_MESSAGE_SERVICE + FAX,
            Ok(13) => FAX,
            Ok(16) => SHORT_MESSAGE_SERVICE,
            Ok(19) => FAX + VOICE,
            Ok(20) => DATA_CIRCUIT_ASYNC + DATA_CIRCUIT_SYNC,
            Ok(21) => DEDICATED_PAD_ACCESS + DATA_CIRCUIT_ASYNC,
            Ok(22) => DEDICATED_PACKET_ACCESS + DATA_CIRCUIT_SYNC,
            Ok(24) => DATA_CIRCUIT_SYNC,
            Ok(25) => DATA_CIRCUIT_ASYNC,
            Ok(99) => DEDICATED_PACKET_ACCESS,
            _ => NONE,
        }
    }
}

/// Call forwarding condition
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum CallTransferReason {
    Unconditional,
    Busy,
    NoReply,
    NotReachable,
    All,
    AllConditional,
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum CallTransferAction {
    Disable,
    Enable,
    Registration,
    Erasure,
}

/// Call barring facility (3GPP TS 27.007 `+CLCK`)
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum BarringFacility {
    AllOutgoing,
    OutgoingInternational,
    OutgoingInternationalExceptHome,
    AllIncoming,
    IncomingWhenRoaming,
    AllBarring,
    AllOutgoingBarring,
    AllIncomingBarring,
}

impl BarringFacility {
    pub fn from_service_code(code: &str) -> Option<Self> {
        match code {
            "33" => Some(BarringFacility::AllOutgoing),
            "331" => Some(BarringFacility::OutgoingInternational),
            "332" => Some(BarringFacility::OutgoingInternationalExceptHome),
            "35" => Some(BarringFacility::AllIncoming),
            "351" => Some(BarringFacility::IncomingWhenRoaming),
            "330" => Some(BarringFacility::AllBarring),
            "333" => Some(BarringFacility::AllOutgoingBarring),
            "353" => Some(BarringFacility::AllIncomingBarring),
            _ => None,
        }
    }

    /// Two letter facility code
    pub fn code(self) -> &'static str {
        match self {
            BarringFacility::AllOutgoing => "AO",
            BarringFacility::OutgoingInternational => "OI",
            BarringFacility::OutgoingInternationalExceptHome => "OX",
            BarringFacility::AllIncoming => "AI",
            BarringFacility::IncomingWhenRoaming => "IR",
            BarringFacility::AllBarring => "AB",
            BarringFacility::AllOutgoingBarring => "AG",
            BarringFacility::AllIncomingBarring => "AC",
        }
    }
}

/// A request handed to the supplementary service transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupplementaryRequest {
    GetClip,
    GetClir,
    SetClir {
        enable: bool,
    },
    GetCallTransfer {
        reason: CallTransferReason,
    },
    SetCallTransfer {
        action: CallTransferAction,
        reason: CallTransferReason,
        number: String,
        service_class: i32,
    },
    GetCallRestriction {
        facility: BarringFacility,
    },
    SetCallRestriction {
        facility: BarringFacility,
        enable: bool,
        password: String,
    },
    GetCallWaiting,
    SetCallWaiting {
        enable: bool,
        service_class: i32,
    },
    AlterPin {
        old_pin: String,
        new_pin: String,
    },
    UnlockPuk {
        puk: String,
        new_pin: String,
    },
    AlterPin2 {
        old_pin2: String,
        new_pin2: String,
    },
    UnlockPuk2 {
        puk2: String,
        new_pin2: String,
    },
    SendUssd {
        message: String,
    },
}

impl SupplementaryRequest {
    /// Short human readable name used in MMI result messages
    pub fn describe(&self) -> &'static str {
        match self {
            SupplementaryRequest::GetClip => "Get clip",
            SupplementaryRequest::GetClir => "Get clir",
            SupplementaryRequest::SetClir { .. } => "Set clir",
            SupplementaryRequest::GetCallTransfer { .. } => "Get call transfer",
            SupplementaryRequest::SetCallTransfer { .. } => "Set call transfer",
            SupplementaryRequest::GetCallRestriction { .. } => "Get call restriction",
            SupplementaryRequest::SetCallRestriction { .. } => "Set call restriction",
            SupplementaryRequest::GetCallWaiting => "Get call waiting",
            SupplementaryRequest::SetCallWaiting { .. } => "Set call waiting",
            SupplementaryRequest::AlterPin { .. } => "Alter pin",
            SupplementaryRequest::UnlockPuk { .. } => "Unlock puk",
            SupplementaryRequest::AlterPin2 { .. } => "Alter pin2",
            SupplementaryRequest::UnlockPuk2 { .. } => "Unlock puk2",
            SupplementaryRequest::SendUssd { .. } => "Send ussd",
        }
    }
}
