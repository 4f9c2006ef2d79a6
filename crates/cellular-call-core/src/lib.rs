//! # Cellular-Call-Core
//!
//! Call-session control core of a cellular telephony stack.
//!
//! This crate provides:
//! - A per-slot service front door with permission, slot and SRVCC checks
//! - CS and IMS call controllers issuing dial, answer, hold and conference
//!   requests over a pluggable transport
//! - Reconciliation of tracked connections against call lists pushed by the
//!   transports, with aggregated reports to a registered listener
//! - Parsing and dispatch of MMI supplementary service codes (`*#21#`, USSD, ...)
//!
//! ## Architecture
//!
//! The application layer talks to [`CellularCallService`]. Each slot owns one
//! worker task holding a CS and an IMS [`CallController`]; all requests and
//! call list pushes for a slot are serialized through that task. Transports
//! implement [`TransportConnector`] and feed state back through
//! [`CellularCallService::report_calls_data`].

pub mod capability;
pub mod config;
pub mod connection;
pub mod controller;
pub mod errors;
pub mod events;
pub mod logging;
pub mod mmi;
pub mod service;
pub mod transport;
pub mod types;

pub use capability::{AllowAll, CapabilityProvider, Permission, PermissionChecker};
pub use config::CellularCallConfig;
pub use connection::{ConnectionKey, ConnectionRecord, ConnectionTable};
pub use controller::{CallController, DialOutcome, ReconcileKind, ReconcileSummary};
pub use errors::{result_code, CallError, Result};
pub use events::{CallEvent, CallStatusListener, CallbackRegistry, ChannelListener};
pub use logging::{setup_logging, LoggingConfig};
pub use mmi::{MmiCommand, MmiOutcome, MmiResult, SupplementaryRequest};
pub use service::{CellularCallService, CellularCallServiceBuilder};
pub use transport::{DialRequest, SupplementaryTransport, TransportConnector, TransportError, TransportResult};
pub use types::*;

/// Common imports for embedding the call core
pub mod prelude {
    pub use crate::capability::{AllowAll, CapabilityProvider, Permission, PermissionChecker};
    pub use crate::config::CellularCallConfig;
    pub use crate::controller::{DialOutcome, ReconcileKind, ReconcileSummary};
    pub use crate::errors::{CallError, Result};
    pub use crate::events::{CallEvent, CallStatusListener, ChannelListener};
    pub use crate::mmi::{MmiResult, SupplementaryRequest};
    pub use crate::service::{CellularCallService, CellularCallServiceBuilder};
    pub use crate::transport::{DialRequest, SupplementaryTransport, TransportConnector, TransportError, TransportResult};
    pub use crate::types::{
        CallFailReason, CallReportInfo, CallSupplementType, CallType, CallsReportInfo, CellularCallInfo,
        DomainPreferenceMode, EmergencyCall, ImsCallMode, NetworkType, ReportedCall, SlotId, SrvccState,
        TelCallState, VideoState,
    };
}
