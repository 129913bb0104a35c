//! Core domain types for eventbeacon
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Event** | One discrete thing that happened in the host app (a click, a page transition) |
//! | **Page** | A screen of the host app, identified by a short code |
//! | **Session** | A process-lifetime id grouping the events of one run or login |
//! | **Extra** | Free-form JSON attached to an event, sent as `eventContent` |
//! | **Payload** | The flat key/value body submitted to the collection endpoint |

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Free-form event attributes. Key order is kept as inserted.
pub type Extra = serde_json::Map<String, serde_json::Value>;

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

// ============================================
// Event kinds
// ============================================

/// Semantic kind of a tracked event.
///
/// The set is closed; wire codes and display templates for each variant live
/// in [`crate::catalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    AppForeground,
    AppBackground,
    PageEnter,
    PageExit,
    Click,
    ValueChange,
    Load,
    Show,
    Close,
    StateChange,
    Error,
}

impl EventKind {
    /// Every variant, in declaration order
    pub const ALL: [EventKind; 11] = [
        EventKind::AppForeground,
        EventKind::AppBackground,
        EventKind::PageEnter,
        EventKind::PageExit,
        EventKind::Click,
        EventKind::ValueChange,
        EventKind::Load,
        EventKind::Show,
        EventKind::Close,
        EventKind::StateChange,
        EventKind::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::AppForeground => "appForeground",
            EventKind::AppBackground => "appBackground",
            EventKind::PageEnter => "pageEnter",
            EventKind::PageExit => "pageExit",
            EventKind::Click => "click",
            EventKind::ValueChange => "valueChange",
            EventKind::Load => "load",
            EventKind::Show => "show",
            EventKind::Close => "close",
            EventKind::StateChange => "stateChange",
            EventKind::Error => "error",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown event kind: {}", s))
    }
}

// ============================================
// Event records
// ============================================

/// One tracked event, as captured at `record` time.
///
/// The session id is fixed when the record is built, so rotating the session
/// later never rewrites events that are already in flight or queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub session_id: String,
    pub event_code: String,
    pub event_name: String,
    pub kind: EventKind,
    /// Epoch milliseconds
    pub timestamp_ms: i64,
    /// Page the event belongs to, if any
    pub belonging_page: Option<String>,
    pub extra: Option<Extra>,
}

/// Caller-supplied description of a new event.
///
/// Built with [`NewEvent::new`] and the chained setters, then handed to
/// [`crate::Beacon::record`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub code: String,
    pub name: String,
    pub kind: EventKind,
    /// Falls back to the capture time when absent
    pub timestamp_ms: Option<i64>,
    pub belonging_page: Option<String>,
    pub extra: Option<Extra>,
}

impl NewEvent {
    pub fn new(code: impl Into<String>, name: impl Into<String>, kind: EventKind) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            kind,
            timestamp_ms: None,
            belonging_page: None,
            extra: None,
        }
    }

    pub fn at(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    pub fn page(mut self, page: impl Into<String>) -> Self {
        self.belonging_page = Some(page.into());
        self
    }

    pub fn extra(mut self, extra: Extra) -> Self {
        self.extra = Some(extra);
        self
    }
}

// ============================================
// Pages
// ============================================

/// The page currently shown by the host app.
///
/// An empty `code` means no page is open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSession {
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Extra>,
}

impl PageSession {
    pub fn is_open(&self) -> bool {
        !self.code.is_empty()
    }
}

// ============================================
// Platform signals
// ============================================

/// Application lifecycle notifications delivered by the host platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleSignal {
    EnteredBackground,
    WillEnterForeground,
    DidBecomeActive,
    WillResignActive,
}

/// Network reachability as reported by the host platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reachability {
    Unknown,
    NotReachable,
    Reachable,
}
