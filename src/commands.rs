//! Inbound control requests from a UI and their responses.

use log::error;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    models::LeadView,
    service::{LeadWatch, StatusReport},
    settings::{Settings, SettingsPatch},
};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlRequest {
    GetLeads,
    GetSettings,
    GetStatus,
    UpdateSettings {
        settings: Value,
    },
    ClearNewIndicators,
    PauseMonitoring,
    ResumeMonitoring,
    #[serde(rename_all = "camelCase")]
    ScrollToLead {
        #[serde(alias = "id")]
        lead_id: String,
        #[serde(default, alias = "pauseDurationMs")]
        pause_duration: Option<u64>,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ControlResponse {
    Leads {
        leads: Vec<LeadView>,
    },
    Settings {
        settings: Settings,
    },
    Status(StatusReport),
    Ack {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl ControlResponse {
    pub fn success() -> Self {
        ControlResponse::Ack {
            success: true,
            error: None,
        }
    }

    pub fn outcome(success: bool) -> Self {
        ControlResponse::Ack {
            success,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        ControlResponse::Ack {
            success: false,
            error: Some(message.into()),
        }
    }
}

pub async fn dispatch(watch: &LeadWatch, request: ControlRequest) -> ControlResponse {
    match request {
        ControlRequest::GetLeads => match watch.get_leads().await {
            Ok(leads) => ControlResponse::Leads { leads },
            Err(err) => {
                error!("GET_LEADS failed: {err:#}");
                ControlResponse::failure(err.to_string())
            }
        },
        ControlRequest::GetSettings => ControlResponse::Settings {
            settings: watch.settings(),
        },
        ControlRequest::GetStatus => ControlResponse::Status(watch.status().await),
        ControlRequest::UpdateSettings { settings } => {
            match watch.update_settings(SettingsPatch::from_value(&settings)).await {
                Ok(_) => ControlResponse::success(),
                Err(err) => {
                    error!("Failed to restart polling with new settings: {err:#}");
                    ControlResponse::failure(err.to_string())
                }
            }
        }
        ControlRequest::ClearNewIndicators => {
            if let Err(err) = watch.clear_new_indicators().await {
                error!("Failed to clear new-lead marks: {err:#}");
            }
            ControlResponse::success()
        }
        ControlRequest::PauseMonitoring => {
            watch.pause_monitoring().await;
            ControlResponse::success()
        }
        ControlRequest::ResumeMonitoring => match watch.resume_monitoring().await {
            Ok(()) => ControlResponse::success(),
            Err(err) => ControlResponse::failure(err.to_string()),
        },
        ControlRequest::ScrollToLead {
            lead_id,
            pause_duration,
        } => ControlResponse::outcome(watch.scroll_to_lead(&lead_id, pause_duration).await),
    }
}
