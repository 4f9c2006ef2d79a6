//! Core value types shared by controllers, transports and the service

use serde::{Deserialize, Serialize};

use crate::errors::{CallError, Result};

/// SIM slot identifier
pub type SlotId = i32;

pub const DEFAULT_SIM_SLOT_ID: SlotId = 0;

/// Transport domain a call runs over
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum CallType {
    /// Circuit switched
    Cs,
    /// IP multimedia subsystem
    Ims,
    /// Over-the-top; never routed by this core
    Ott,
}

impl std::fmt::Display for CallType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallType::Cs => write!(f, "CS"),
            CallType::Ims => write!(f, "IMS"),
            CallType::Ott => write!(f, "OTT"),
        }
    }
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize, Default)]
pub enum VideoState {
    #[default]
    Audio,
    Video,
}

/// Call state as observed by the application.
///
/// Integer codes follow the numbering used on the call manager interface.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum TelCallState {
    Active,
    Holding,
    Dialing,
    Alerting,
    Incoming,
    Waiting,
    Disconnected,
    Disconnecting,
    Idle,
}

impl TelCallState {
    pub fn code(self) -> i32 {
        match self {
            TelCallState::Active => 0,
            TelCallState::Holding => 1,
            TelCallState::Dialing => 2,
            TelCallState::Alerting => 3,
            TelCallState::Incoming => 4,
            TelCallState::Waiting => 5,
            TelCallState::Disconnected => 6,
            TelCallState::Disconnecting => 7,
            TelCallState::Idle => 8,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(TelCallState::Active),
            1 => Some(TelCallState::Holding),
            2 => Some(TelCallState::Dialing),
            3 => Some(TelCallState::Alerting),
            4 => Some(TelCallState::Incoming),
            5 => Some(TelCallState::Waiting),
            6 => Some(TelCallState::Disconnected),
            7 => Some(TelCallState::Disconnecting),
            8 => Some(TelCallState::Idle),
            _ => None,
        }
    }

    /// Alerting, incoming or waiting
    pub fn is_ringing(self) -> bool {
        matches!(
            self,
            TelCallState::Alerting | TelCallState::Incoming | TelCallState::Waiting
        )
    }
}

/// How a hang up request selects the legs to release
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize, Default)]
pub enum CallSupplementType {
    /// Release the addressed connection only
    #[default]
    Default,
    /// Release held and waiting calls
    HangUpHoldWait,
    /// Release the active call and accept the held or waiting one
    HangUpActive,
    /// Release every call
    HangUpAll,
}

impl CallSupplementType {
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(CallSupplementType::Default),
            1 => Ok(CallSupplementType::HangUpHoldWait),
            2 => Ok(CallSupplementType::HangUpActive),
            3 => Ok(CallSupplementType::HangUpAll),
            other => Err(CallError::argument_invalid(format!(
                "unknown supplement type {}",
                other
            ))),
        }
    }
}

/// Calling line identification restriction for a single dial
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize, Default)]
pub enum ClirMode {
    /// Subscription default
    #[default]
    Default,
    /// Restrict (hide) the caller id
    Invocation,
    /// Present the caller id
    Suppression,
}

/// Radio technology family of the CS network
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum NetworkType {
    Gsm,
    Cdma,
    Unknown,
}

/// Single radio voice call continuity state
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize, Default)]
pub enum SrvccState {
    #[default]
    None,
    Started,
    Completed,
    Failed,
    Canceled,
}

/// Voice domain preference configured per slot
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DomainPreferenceMode {
    CsVoiceOnly,
    CsVoicePreferred,
    #[default]
    ImsPsVoicePreferred,
    ImsPsVoiceOnly,
}

impl DomainPreferenceMode {
    pub fn code(self) -> i32 {
        match self {
            DomainPreferenceMode::CsVoiceOnly => 1,
            DomainPreferenceMode::CsVoicePreferred => 2,
            DomainPreferenceMode::ImsPsVoicePreferred => 3,
            DomainPreferenceMode::ImsPsVoiceOnly => 4,
        }
    }

    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            1 => Ok(DomainPreferenceMode::CsVoiceOnly),
            2 => Ok(DomainPreferenceMode::CsVoicePreferred),
            3 => Ok(DomainPreferenceMode::ImsPsVoicePreferred),
            4 => Ok(DomainPreferenceMode::ImsPsVoiceOnly),
            other => Err(CallError::argument_invalid(format!(
                "unknown domain preference mode {}",
                other
            ))),
        }
    }
}

/// Media mode of an IMS call
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum ImsCallMode {
    AudioOnly,
    SendOnly,
    ReceiveOnly,
    SendReceive,
    VideoPaused,
}

/// Call description supplied by the call manager with every request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellularCallInfo {
    pub slot_id: SlotId,
    pub phone_number: String,
    pub call_type: CallType,
    pub video_state: VideoState,
    /// Network index of the connection, 0 when not yet known
    pub index: i32,
    pub account_id: i32,
    pub call_id: i32,
}

impl CellularCallInfo {
    pub fn new(slot_id: SlotId, phone_number: impl Into<String>, call_type: CallType) -> Self {
        Self {
            slot_id,
            phone_number: phone_number.into(),
            call_type,
            video_state: VideoState::Audio,
            index: 0,
            account_id: slot_id,
            call_id: 0,
        }
    }

    pub fn with_index(mut self, index: i32) -> Self {
        self.index = index;
        self
    }

    pub fn with_video_state(mut self, video_state: VideoState) -> Self {
        self.video_state = video_state;
        self
    }

    pub fn with_call_id(mut self, call_id: i32) -> Self {
        self.call_id = call_id;
        self
    }
}

/// One entry of a call list pushed by the transport.
///
/// Fields the modem did not fill in stay `None` and fall back to what is
/// already tracked for the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReportedCall {
    pub index: i32,
    pub number: String,
    pub state: Option<TelCallState>,
    pub call_mode: Option<VideoState>,
    pub voice_domain: Option<i32>,
}

impl ReportedCall {
    pub fn new(index: i32, number: impl Into<String>, state: TelCallState) -> Self {
        Self {
            index,
            number: number.into(),
            state: Some(state),
            call_mode: None,
            voice_domain: None,
        }
    }

    pub fn with_call_mode(mut self, call_mode: VideoState) -> Self {
        self.call_mode = Some(call_mode);
        self
    }

    pub fn with_voice_domain(mut self, voice_domain: i32) -> Self {
        self.voice_domain = Some(voice_domain);
        self
    }
}

/// Snapshot of a connection as reported to the application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallReportInfo {
    pub index: i32,
    pub account_number: String,
    pub account_id: SlotId,
    pub voice_domain: i32,
    pub state: TelCallState,
    pub call_type: CallType,
    pub call_mode: VideoState,
}

/// Batch of call snapshots for one slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallsReportInfo {
    pub slot_id: SlotId,
    pub calls: Vec<CallReportInfo>,
}

impl CallsReportInfo {
    pub fn new(slot_id: SlotId) -> Self {
        Self {
            slot_id,
            calls: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Calls in the batch with the given number
    pub fn find(&self, number: &str) -> impl Iterator<Item = &CallReportInfo> {
        let number = number.to_string();
        self.calls
            .iter()
            .filter(move |c| c.account_number == number)
    }
}

/// Release cause reported after a call ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFailReason {
    pub cause: i32,
    pub message: String,
}

/// Entry of a per-slot emergency number list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmergencyCall {
    pub number: String,
    pub mcc: String,
    pub category: i32,
}

impl EmergencyCall {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            mcc: String::new(),
            category: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_codes() {
        for code in 0..=8 {
            let state = TelCallState::from_code(code).unwrap();
            assert_eq!(state.code(), code);
        }
        assert_eq!(TelCallState::from_code(9), None);
        assert!(TelCallState::Waiting.is_ringing());
        assert!(!TelCallState::Holding.is_ringing());
    }

    #[test]
    fn test_supplement_type_rejects_unknown_code() {
        assert_eq!(
            CallSupplementType::from_code(2).unwrap(),
            CallSupplementType::HangUpActive
        );
        let err = CallSupplementType::from_code(7).unwrap_err();
        assert!(matches!(err, CallError::ArgumentInvalid { .. }));
    }

    #[test]
    fn test_domain_preference_codes() {
        assert_eq!(
            DomainPreferenceMode::from_code(1).unwrap(),
            DomainPreferenceMode::CsVoiceOnly
        );
        assert_eq!(DomainPreferenceMode::default().code(), 3);
        assert!(DomainPreferenceMode::from_code(0).is_err());
    }
}
