//! Device state and permission queries consumed by the call core

use serde::{Deserialize, Serialize};

use crate::types::{NetworkType, SlotId};

/// Read-only view of radio, network and IMS state
pub trait CapabilityProvider: Send + Sync {
    fn is_radio_available(&self, slot_id: SlotId) -> bool;

    /// Technology family of the CS network currently camped on
    fn network_type(&self, slot_id: SlotId) -> NetworkType;

    fn is_ims_registered(&self, slot_id: SlotId) -> bool;

    /// Whether the IMS service process is reachable
    fn is_ims_service_connected(&self) -> bool;

    fn has_sim_card(&self, _slot_id: SlotId) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Permission {
    PlaceCall,
    AnswerCall,
    SetTelephonyState,
}

/// Authority deciding whether the current caller holds a permission
pub trait PermissionChecker: Send + Sync {
    fn check(&self, permission: Permission) -> bool;
}

/// Grants every permission
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionChecker for AllowAll {
    fn check(&self, _permission: Permission) -> bool {
        true
    }
}
