use serde::Serialize;

use adsearch_core::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Ok,
    Failed,
}

/// One persistence entry of the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ping_error: Option<String>,
}

impl HealthReport {
    pub fn from_ping(backend: &str, ping: Result<()>) -> Self {
        let (status, ping_error) = match ping {
            Ok(()) => (HealthStatus::Ok, None),
            Err(e) => (HealthStatus::Failed, Some(e.to_string())),
        };
        Self { name: backend.to_string(), kind: "indexer".to_string(), status, ping_error }
    }

    pub fn is_ok(&self) -> bool {
        self.status == HealthStatus::Ok
    }
}
