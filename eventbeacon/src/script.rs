//! Replay scripts
//!
//! A script is a JSONL file with one step per line. Blank lines and lines
//! starting with `#` are skipped.
//!
//! ```text
//! {"step": "event", "code": "home", "kind": "pageEnter"}
//! {"step": "event", "code": "buy", "kind": "click", "page": "home", "extra": {"sku": "A-1"}}
//! {"step": "lifecycle", "signal": "entered_background"}
//! {"step": "snapshot"}
//! {"step": "return_to_page"}
//! {"step": "rotate_session"}
//! {"step": "reachable"}
//! {"step": "sleep", "ms": 250}
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use eventbeacon_core::{EventKind, Extra, LifecycleSignal, NewEvent};
use serde::Deserialize;

/// One line of a replay script
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Event {
        code: String,
        /// Defaults to the kind's display name for `code`
        #[serde(default)]
        name: Option<String>,
        kind: EventKind,
        #[serde(default)]
        timestamp: Option<i64>,
        #[serde(default)]
        page: Option<String>,
        #[serde(default)]
        extra: Option<Extra>,
    },
    Lifecycle {
        signal: LifecycleSignal,
    },
    /// Remember the open page for a later `return_to_page`
    Snapshot,
    ReturnToPage,
    RotateSession,
    Reachable,
    Sleep {
        ms: u64,
    },
}

impl Step {
    /// The event to record for an `event` step
    pub fn to_event(&self) -> Option<NewEvent> {
        let Step::Event {
            code,
            name,
            kind,
            timestamp,
            page,
            extra,
        } = self
        else {
            return None;
        };

        let name = name.clone().unwrap_or_else(|| kind.display_name(code));
        Some(NewEvent {
            code: code.clone(),
            name,
            kind: *kind,
            timestamp_ms: *timestamp,
            belonging_page: page.clone(),
            extra: extra.clone(),
        })
    }
}

/// Parse script text, reporting the line number of the first bad step
pub fn parse(content: &str) -> Result<Vec<Step>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("invalid step on line {}", i + 1))
        })
        .collect()
}

pub fn load(path: &Path) -> Result<Vec<Step>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    parse(&content)
}
