//! Request gating and routing policy of CellularCallService
//!
//! Precondition order, voice domain selection, SRVCC handling, emergency
//! numbers, supplementary service codes and per-slot settings.

mod common;

use std::sync::Arc;

use cellular_call_core::errors::codes;
use cellular_call_core::mmi::{CallTransferAction, CallTransferReason};
use cellular_call_core::prelude::*;
use cellular_call_core::result_code;
use common::{cs_call, DenyPermissions, TestHarness};

#[tokio::test]
async fn test_precondition_failures_skip_transport() {
    let h = TestHarness::new(CellularCallConfig::new());

    let result = h.service.dial(cs_call(1, "222")).await;
    assert_eq!(result_code(&result), codes::CALL_ERR_INVALID_SLOT_ID);

    let result = h.service.dial(cs_call(0, "")).await;
    assert_eq!(result, Err(CallError::PhoneNumberEmpty));

    h.capability
        .radio
        .store(false, std::sync::atomic::Ordering::SeqCst);
    let result = h.service.dial(cs_call(0, "222")).await;
    assert_eq!(result, Err(CallError::RadioUnavailable));
    h.capability
        .radio
        .store(true, std::sync::atomic::Ordering::SeqCst);

    *h.capability.network.lock() = NetworkType::Unknown;
    let result = h.service.dial(cs_call(0, "222")).await;
    assert_eq!(result, Err(CallError::UnsupportedNetworkType));
    assert!(result.unwrap_err().is_precondition());

    assert!(h.cs.requests().is_empty());
    assert!(h.ims.requests().is_empty());
}

#[tokio::test]
async fn test_permission_is_checked_first() {
    let h = TestHarness::with_permissions(
        CellularCallConfig::new(),
        Arc::new(DenyPermissions(vec![Permission::PlaceCall, Permission::SetTelephonyState])),
    );

    // permission beats the invalid slot
    let result = h.service.dial(cs_call(5, "222")).await;
    assert_eq!(
        result,
        Err(CallError::PermissionDenied {
            permission: Permission::PlaceCall
        })
    );
    assert_eq!(result_code(&result), codes::ERR_PERMISSION);

    let result = h
        .service
        .set_domain_preference_mode(0, DomainPreferenceMode::CsVoiceOnly);
    assert!(matches!(result, Err(CallError::PermissionDenied { .. })));

    // answering needs a different permission
    let result = h.service.answer(cs_call(0, "222")).await;
    assert!(matches!(result, Err(CallError::ConnectionNotExist { .. })));
}

#[tokio::test]
async fn test_call_count_limit() -> Result<()> {
    let mut h = TestHarness::new(CellularCallConfig::new().with_max_connections(2));

    h.service
        .report_calls_data(
            0,
            CallType::Cs,
            vec![
                ReportedCall::new(1, "100", TelCallState::Active),
                ReportedCall::new(2, "200", TelCallState::Holding),
            ],
        )
        .await?;
    let _ = h.next_calls_report().await;

    let result = h.service.dial(cs_call(0, "300")).await;
    assert_eq!(result, Err(CallError::CallCountsExceedLimit { limit: 2 }));
    assert!(h.cs.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_dial_domain_follows_ims_state_and_settings() -> Result<()> {
    let h = TestHarness::new(CellularCallConfig::new());

    h.service.dial(cs_call(0, "100")).await?;
    assert_eq!(h.cs.take(), vec!["dial:0:100"]);

    h.capability.set_ims(true, true);
    h.service.dial(cs_call(0, "200")).await?;
    assert_eq!(h.ims.take(), vec!["dial:0:200"]);

    h.service
        .set_domain_preference_mode(0, DomainPreferenceMode::CsVoiceOnly)?;
    assert_eq!(h.service.domain_preference_mode(0)?, DomainPreferenceMode::CsVoiceOnly);
    h.service.dial(cs_call(0, "300")).await?;
    assert_eq!(h.cs.take(), vec!["dial:0:300"]);

    h.service
        .set_domain_preference_mode(0, DomainPreferenceMode::ImsPsVoicePreferred)?;
    h.service.set_ims_switch_status(0, false)?;
    assert!(!h.service.ims_switch_status(0)?);
    h.service.dial(cs_call(0, "400")).await?;
    assert_eq!(h.cs.take(), vec!["dial:0:400"]);
    assert!(h.ims.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_emergency_call_prefers_connected_ims() -> Result<()> {
    let h = TestHarness::new(CellularCallConfig::new());

    // IMS service up but not registered
    h.capability.set_ims(false, true);
    h.service.dial(cs_call(0, "112")).await?;
    assert_eq!(h.ims.take(), vec!["dial:0:112"]);

    h.service.dial(cs_call(0, "10086")).await?;
    assert_eq!(h.cs.take(), vec!["dial:0:10086"]);
    Ok(())
}

#[tokio::test]
async fn test_emergency_number_lists() -> Result<()> {
    let h = TestHarness::new(
        CellularCallConfig::new()
            .with_slot_count(2)
            .with_emergency_numbers(vec!["122".to_string()]),
    );

    assert!(h.service.is_emergency_phone_number(0, "911")?);
    assert!(h.service.is_emergency_phone_number(1, "122")?);
    assert!(!h.service.is_emergency_phone_number(0, "120")?);

    h.service
        .set_emergency_call_list(0, vec![EmergencyCall::new("120")])?;
    assert!(h.service.is_emergency_phone_number(0, "120")?);
    assert!(!h.service.is_emergency_phone_number(1, "120")?);

    h.capability
        .sim
        .store(false, std::sync::atomic::Ordering::SeqCst);
    assert!(h.service.is_emergency_phone_number(1, "999")?);

    assert!(matches!(
        h.service.is_emergency_phone_number(2, "112"),
        Err(CallError::InvalidSlotId { slot_id: 2 })
    ));
    Ok(())
}

#[tokio::test]
async fn test_srvcc_blocks_requests_and_reports() -> Result<()> {
    let mut h = TestHarness::new(CellularCallConfig::new());

    h.service
        .report_calls_data(0, CallType::Ims, vec![ReportedCall::new(1, "100", TelCallState::Active)])
        .await?;
    let _ = h.next_calls_report().await;

    h.service.set_srvcc_state(0, SrvccState::Started).await?;
    assert_eq!(h.service.srvcc_state(), SrvccState::Started);

    let result = h.service.dial(cs_call(0, "200")).await;
    assert_eq!(result, Err(CallError::SrvccInProgress));
    assert_eq!(result_code(&result), codes::CALL_ERR_SRVCC_IN_PROGRESS);

    let summary = h.service.report_calls_data(0, CallType::Ims, Vec::new()).await?;
    assert_eq!(summary.kind, ReconcileKind::Ignored);
    assert_eq!(h.service.connection_snapshot(0, CallType::Ims).await?.len(), 1);

    h.service.set_srvcc_state(0, SrvccState::Completed).await?;
    assert_eq!(h.service.srvcc_state(), SrvccState::None);
    assert!(h.service.connection_snapshot(0, CallType::Ims).await?.is_empty());

    h.service.dial(cs_call(0, "200")).await?;
    assert_eq!(h.cs.take(), vec!["dial:0:200"]);
    Ok(())
}

#[tokio::test]
async fn test_supplementary_code_is_executed_not_dialled() -> Result<()> {
    let mut h = TestHarness::new(CellularCallConfig::new());

    let outcome = h.service.dial(cs_call(0, "*21*12345#")).await?;
    assert!(outcome.is_mmi());
    assert_eq!(outcome.code(), codes::RETURN_TYPE_MMI);

    let (slot_id, result) = h.next_mmi_result().await;
    assert_eq!(slot_id, 0);
    assert!(result.is_success());

    assert_eq!(
        h.supplementary.requests(),
        vec![(
            0,
            SupplementaryRequest::SetCallTransfer {
                action: CallTransferAction::Registration,
                reason: CallTransferReason::Unconditional,
                number: "12345".to_string(),
                service_class: cellular_call_core::mmi::service_class::NONE,
            }
        )]
    );
    assert!(h.cs.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_clir_prefix_dials_remaining_number() -> Result<()> {
    let h = TestHarness::new(CellularCallConfig::new());

    let outcome = h.service.dial(cs_call(0, "#31#10086")).await?;
    assert_eq!(outcome, DialOutcome::Dialed);
    assert_eq!(h.cs.take(), vec!["dial:0:10086"]);
    assert!(h.supplementary.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unknown_code_with_trailing_digits_goes_out_as_ussd() -> Result<()> {
    let mut h = TestHarness::new(CellularCallConfig::new());

    let outcome = h.service.dial(cs_call(0, "*99#123")).await?;
    assert!(outcome.is_mmi());

    let (_, result) = h.next_mmi_result().await;
    assert!(result.is_success());
    assert_eq!(
        h.supplementary.requests(),
        vec![(
            0,
            SupplementaryRequest::SendUssd {
                message: "*99#123".to_string()
            }
        )]
    );
    Ok(())
}

#[tokio::test]
async fn test_pin_change_mismatch_reported_without_request() -> Result<()> {
    let mut h = TestHarness::new(CellularCallConfig::new());

    h.service.dial(cs_call(0, "**04*1234*5678*8765#")).await?;
    let (_, result) = h.next_mmi_result().await;
    assert!(!result.is_success());
    assert!(h.supplementary.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_settings_reject_invalid_slots() {
    let h = TestHarness::new(CellularCallConfig::new());

    assert!(matches!(
        h.service.set_ims_switch_status(1, true),
        Err(CallError::InvalidSlotId { slot_id: 1 })
    ));
    assert!(matches!(
        h.service.domain_preference_mode(-1),
        Err(CallError::InvalidSlotId { slot_id: -1 })
    ));
    assert!(matches!(
        h.service.set_srvcc_state(3, SrvccState::Started).await,
        Err(CallError::InvalidSlotId { slot_id: 3 })
    ));
    assert_eq!(h.service.srvcc_state(), SrvccState::None);
}

#[tokio::test]
async fn test_dump_lists_slots_and_calls() -> Result<()> {
    let mut h = TestHarness::new(CellularCallConfig::new().with_slot_count(2));

    h.service
        .report_calls_data(1, CallType::Cs, vec![ReportedCall::new(1, "100", TelCallState::Active)])
        .await?;
    let _ = h.next_calls_report().await;

    let dump: serde_json::Value = serde_json::from_str(&h.service.dump().await?).expect("dump is JSON");
    assert_eq!(dump["slots"].as_array().map(|s| s.len()), Some(2));
    assert_eq!(dump["slots"][1]["cs_calls"][0]["account_number"], "100");
    assert_eq!(dump["listener_registered"], true);
    Ok(())
}

#[test]
fn test_builder_requires_transports() {
    let result = CellularCallService::builder().build();
    assert!(matches!(result, Err(CallError::Config { .. })));

    let result = CellularCallService::builder()
        .with_config(CellularCallConfig::new().with_slot_count(0))
        .build();
    assert!(matches!(result, Err(CallError::Config { .. })));
}
