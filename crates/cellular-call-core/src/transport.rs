//! Radio and IMS transport abstraction
//!
//! A [`TransportConnector`] issues call control requests towards the modem
//! (CS) or the IMS stack. A successful return only means the request was
//! accepted; the resulting call state arrives later as a reported call list.

use async_trait::async_trait;
use thiserror::Error;

use crate::mmi::SupplementaryRequest;
use crate::types::{CallSupplementType, CallType, ClirMode, ImsCallMode, SlotId, VideoState};

/// Failure classes returned by a transport
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("resource unavailable")]
    ResourceUnavailable,

    #[error("argument rejected by transport")]
    ArgumentInvalid,

    #[error("request could not be sent")]
    SendFailed,

    #[error("operation not supported over {0}")]
    Unsupported(CallType),

    /// Any other non-zero result code
    #[error("transport result code {0}")]
    Code(i32),
}

impl TransportError {
    pub const RESOURCE_UNAVAILABLE: i32 = -1;
    pub const ARGUMENT_INVALID: i32 = -2;
    pub const SEND_FAILED: i32 = -3;

    /// Map a raw transport result code; `0` is success
    pub fn from_code(code: i32) -> TransportResult {
        match code {
            0 => Ok(()),
            Self::RESOURCE_UNAVAILABLE => Err(TransportError::ResourceUnavailable),
            Self::ARGUMENT_INVALID => Err(TransportError::ArgumentInvalid),
            Self::SEND_FAILED => Err(TransportError::SendFailed),
            other => Err(TransportError::Code(other)),
        }
    }
}

pub type TransportResult<T = ()> = Result<T, TransportError>;

/// Parameters of a dial request after normalisation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialRequest {
    pub phone_number: String,
    pub clir_mode: ClirMode,
    pub video_state: VideoState,
}

/// Call control primitives of one transport domain
#[async_trait]
pub trait TransportConnector: Send + Sync {
    /// Domain served by this transport
    fn call_type(&self) -> CallType;

    async fn dial(&self, slot_id: SlotId, request: &DialRequest) -> TransportResult;

    async fn answer(&self, slot_id: SlotId, index: i32, video_state: VideoState) -> TransportResult;

    async fn reject(&self, slot_id: SlotId, index: i32) -> TransportResult;

    async fn hang_up(&self, slot_id: SlotId, index: i32) -> TransportResult;

    async fn hold_call(&self, slot_id: SlotId, index: i32) -> TransportResult;

    async fn unhold_call(&self, slot_id: SlotId, index: i32) -> TransportResult;

    async fn switch_call(&self, slot_id: SlotId, index: i32) -> TransportResult;

    /// Release legs selected by the network (`+CHLD` style)
    async fn call_supplement(&self, slot_id: SlotId, supplement: CallSupplementType) -> TransportResult;

    async fn combine_conference(&self, slot_id: SlotId, video_state: VideoState) -> TransportResult;

    async fn separate_conference(&self, slot_id: SlotId, index: i32) -> TransportResult;

    async fn start_dtmf(&self, slot_id: SlotId, code: char, index: i32) -> TransportResult;

    async fn stop_dtmf(&self, slot_id: SlotId, index: i32) -> TransportResult;

    async fn send_dtmf(&self, slot_id: SlotId, code: char, index: i32) -> TransportResult;

    /// Ask for the release cause of the last ended call
    async fn request_call_fail_reason(&self, slot_id: SlotId) -> TransportResult;

    /// CDMA flash request adding a third party to the active call
    async fn cdma_three_way_dial(&self, _slot_id: SlotId) -> TransportResult {
        Err(TransportError::Unsupported(self.call_type()))
    }

    async fn invite_to_conference(&self, _slot_id: SlotId, _numbers: &[String]) -> TransportResult {
        Err(TransportError::Unsupported(self.call_type()))
    }

    async fn kick_out_from_conference(&self, _slot_id: SlotId, _numbers: &[String]) -> TransportResult {
        Err(TransportError::Unsupported(self.call_type()))
    }

    async fn update_call_media_mode(&self, _slot_id: SlotId, _index: i32, _mode: ImsCallMode) -> TransportResult {
        Err(TransportError::Unsupported(self.call_type()))
    }
}

/// Sends supplementary service requests (forwarding, barring, USSD, ...)
#[async_trait]
pub trait SupplementaryTransport: Send + Sync {
    async fn send_supplementary(&self, slot_id: SlotId, request: &SupplementaryRequest) -> TransportResult;
}
