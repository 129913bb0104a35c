//! Payload assembly for the collection endpoint
//!
//! A payload is the flat JSON object posted for one event. It merges the
//! record itself with the host identity, device metadata and the location
//! resolved at send time.

use serde::{Deserialize, Serialize};

use crate::config::AgentConfig;
use crate::enrichment::Location;
use crate::types::{EventRecord, Extra};

/// Body submitted to the collection endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub session_id: String,
    /// Host application user id
    pub uuid: String,
    pub event_code: String,
    pub event_name: String,
    /// Coarse wire code of the event kind
    pub event_type: String,
    /// Epoch milliseconds
    pub event_time: i64,
    pub user_ip: String,
    pub country_code: String,
    pub city_code: String,
    pub system_version: String,
    pub app_version: String,
    pub attr_page: String,
    /// Compacted `extra`, see [`compact_content`]
    pub event_content: String,
    pub env: String,
}

impl Payload {
    pub fn build(record: &EventRecord, agent: &AgentConfig, location: &Location) -> Self {
        Self {
            session_id: record.session_id.clone(),
            uuid: agent.user_id.clone(),
            event_code: record.event_code.clone(),
            event_name: record.event_name.clone(),
            event_type: record.kind.wire_code().to_string(),
            event_time: record.timestamp_ms,
            user_ip: location.ip.clone(),
            country_code: location.country_code.clone(),
            city_code: location.city_code.clone(),
            system_version: agent.system_version.clone(),
            app_version: agent.app_version.clone(),
            attr_page: record.belonging_page.clone().unwrap_or_default(),
            event_content: record
                .extra
                .as_ref()
                .map(compact_content)
                .unwrap_or_default(),
            env: agent.environment().as_str().to_string(),
        }
    }
}

/// Serialize `extra` as JSON with every space and line feed removed.
///
/// Spaces inside string values are removed too; downstream dedup compares
/// these strings byte for byte. Serialization failures yield an empty string
/// so the event itself is still sent.
pub fn compact_content(extra: &Extra) -> String {
    match serde_json::to_string(extra) {
        Ok(json) => json.chars().filter(|c| *c != ' ' && *c != '\n').collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize event extra");
            String::new()
        }
    }
}
