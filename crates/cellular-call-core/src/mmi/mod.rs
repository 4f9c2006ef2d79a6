//! Supplementary service (MMI) codes
//!
//! Dial strings such as `*21*12345#` are not numbers but requests to change
//! a network side setting. [`MmiCommand::parse`] recognises them and
//! [`MmiDispatcher`] turns them into [`SupplementaryRequest`]s.

pub mod command;
pub mod dispatch;
pub mod request;

pub use command::{needs_mmi_handling, MmiAction, MmiCommand};
pub use dispatch::{is_known_service_code, resolve, MmiDispatcher, MmiError, MmiOutcome, MmiResult};
pub use request::{
    service_class, BarringFacility, CallTransferAction, CallTransferReason, SupplementaryRequest,
};
