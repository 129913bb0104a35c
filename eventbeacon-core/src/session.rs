//! Session identity and page tracking
//!
//! Both pieces of state are owned by a [`crate::Beacon`] and shared with its
//! background tasks, so each sits behind its own lock.

use std::sync::{Mutex, RwLock};

use crate::types::{EventKind, EventRecord, Extra, PageSession};

// ============================================
// Session identity
// ============================================

/// Process-lifetime session token.
///
/// Generated once on construction and replaced only by [`rotate`](Self::rotate).
#[derive(Debug)]
pub struct SessionIdentity {
    id: RwLock<String>,
}

impl SessionIdentity {
    pub fn new() -> Self {
        Self {
            id: RwLock::new(new_session_id()),
        }
    }

    pub fn current(&self) -> String {
        match self.id.read() {
            Ok(id) => id.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the stored id with a fresh one and return it
    pub fn rotate(&self) -> String {
        let fresh = new_session_id();
        let mut id = self.id.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *id = fresh.clone();
        fresh
    }
}

impl Default for SessionIdentity {
    fn default() -> Self {
        Self::new()
    }
}

fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string().to_uppercase()
}

// ============================================
// Page tracking
// ============================================

/// Tracks the open page and closes it implicitly when another page opens.
#[derive(Debug, Default)]
pub struct PageSessionTracker {
    current: Mutex<PageSession>,
}

impl PageSessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the open page (empty code if none)
    pub fn current(&self) -> PageSession {
        self.lock().clone()
    }

    /// Code of the open page, empty if none
    pub fn current_code(&self) -> String {
        self.lock().code.clone()
    }

    /// Make `code` the open page.
    ///
    /// When another page was open, returns a `PageExit` record for it stamped
    /// one millisecond before `timestamp_ms` (saturating at `i64::MIN`), so
    /// the exit sorts before the new enter. The check and the replacement happen under one
    /// lock.
    pub fn on_page_enter(
        &self,
        session_id: &str,
        code: &str,
        name: &str,
        extra: Option<Extra>,
        timestamp_ms: i64,
    ) -> Option<EventRecord> {
        let mut current = self.lock();

        let previous = std::mem::replace(
            &mut *current,
            PageSession {
                code: code.to_string(),
                name: name.to_string(),
                extra,
            },
        );

        if !previous.is_open() {
            return None;
        }

        Some(EventRecord {
            session_id: session_id.to_string(),
            event_code: previous.code.clone(),
            event_name: previous.name,
            kind: EventKind::PageExit,
            timestamp_ms: timestamp_ms.saturating_sub(1),
            belonging_page: Some(previous.code),
            extra: None,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PageSession> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
