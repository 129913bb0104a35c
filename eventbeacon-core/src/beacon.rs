//! The event beacon: records events and gets them to the collection endpoint
//!
//! ## Pipeline
//!
//! ```text
//! record() ──▶ page tracker ──▶ background task ──▶ resolver ──▶ transport
//!                (may add an                                       │
//!                 implicit pageExit)                     failure   ▼
//!                                                     ┌─────────────────┐
//! reachable signal ──────────── drain pass ─────────▶ │   RetryQueue    │
//!                                                     └─────────────────┘
//! ```
//!
//! A [`Beacon`] is an explicitly constructed context object: create one at
//! application start, clone it (cheaply) into whatever needs to record
//! events, and call [`Beacon::shutdown`] on exit. Nothing reaches the caller
//! from the delivery path; outcomes are logged and counted in
//! [`DeliveryStats`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use eventbeacon_core::{Beacon, Config, EventKind, NewEvent, StaticLocation};
//! use std::sync::Arc;
//!
//! # async fn run() -> eventbeacon_core::Result<()> {
//! let config = Config::load()?;
//! let beacon = Beacon::initialize(config.agent, Arc::new(StaticLocation::default()))?;
//!
//! beacon.record(NewEvent::new("home", "Home", EventKind::PageEnter));
//! beacon.record(NewEvent::new("buy", "Buy", EventKind::Click).page("home"));
//!
//! beacon.shutdown(std::time::Duration::from_secs(5)).await;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::AgentConfig;
use crate::enrichment::{LocationResolver, StaticLocation};
use crate::error::{Error, Result};
use crate::payload::Payload;
use crate::retry::{DrainOutcome, RetryQueue};
use crate::session::{PageSessionTracker, SessionIdentity};
use crate::sink::{self, SecondarySink};
use crate::transport::{HttpTransport, Transport};
use crate::types::{
    now_millis, EventKind, EventRecord, LifecycleSignal, NewEvent, PageSession, Reachability,
};

// ============================================
// Statistics
// ============================================

/// Delivery counters since the beacon was created
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryStats {
    /// Events recorded by the host (implicit page exits included)
    pub recorded: usize,
    /// Events delivered on their first attempt
    pub sent: usize,
    /// First attempts that failed and were queued for retry
    pub queued: usize,
    /// Queued events later delivered by a drain pass
    pub retried: usize,
    /// Events never delivered: undeliverable, or still in flight at shutdown
    pub dropped: usize,
}

#[derive(Debug, Default)]
struct Counters {
    recorded: AtomicUsize,
    sent: AtomicUsize,
    queued: AtomicUsize,
    retried: AtomicUsize,
    dropped: AtomicUsize,
}

impl Counters {
    fn bump(counter: &AtomicUsize, by: usize) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    fn snapshot(&self) -> DeliveryStats {
        DeliveryStats {
            recorded: self.recorded.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

// ============================================
// Builder
// ============================================

/// Assembles a [`Beacon`] from its collaborators
pub struct BeaconBuilder {
    agent: AgentConfig,
    transport: Option<Arc<dyn Transport>>,
    resolver: Option<Arc<dyn LocationResolver>>,
    sink: Option<Arc<dyn SecondarySink>>,
    runtime: Option<Handle>,
}

impl BeaconBuilder {
    /// Use a custom transport instead of HTTP
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn LocationResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Mirror every recorded event into a secondary analytics sink
    pub fn sink(mut self, sink: Arc<dyn SecondarySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Runtime that runs deliveries and listeners (default: the one `build`
    /// is called from)
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Build the beacon. Without an explicit transport the agent config must
    /// validate, since an [`HttpTransport`] is created from it. Without an
    /// explicit runtime this must be called from within a Tokio runtime.
    pub fn build(self) -> Result<Beacon> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                self.agent.validate()?;
                Arc::new(HttpTransport::new(&self.agent)?) as Arc<dyn Transport>
            }
        };
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current()
                .map_err(|e| Error::Config(format!("no Tokio runtime for the beacon: {}", e)))?,
        };
        let resolver = self.resolver.unwrap_or_else(|| {
            Arc::new(StaticLocation::default()) as Arc<dyn LocationResolver>
        });

        let session = SessionIdentity::new();
        tracing::info!(
            session_id = %session.current(),
            env = %self.agent.environment().as_str(),
            "Event beacon initialized"
        );

        Ok(Beacon {
            inner: Arc::new(Inner {
                agent: self.agent,
                transport,
                resolver,
                sink: self.sink,
                session,
                pages: PageSessionTracker::new(),
                retry: RetryQueue::new(),
                counters: Counters::default(),
                runtime,
                tasks: TaskTracker::new(),
                cancel: CancellationToken::new(),
            }),
        })
    }
}

// ============================================
// Beacon
// ============================================

/// Event recording agent. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct Beacon {
    inner: Arc<Inner>,
}

struct Inner {
    agent: AgentConfig,
    transport: Arc<dyn Transport>,
    resolver: Arc<dyn LocationResolver>,
    sink: Option<Arc<dyn SecondarySink>>,
    session: SessionIdentity,
    pages: PageSessionTracker,
    retry: RetryQueue,
    counters: Counters,
    runtime: Handle,
    /// Deliveries and drain passes; waited on by `flush` and `shutdown`
    tasks: TaskTracker,
    cancel: CancellationToken,
}

impl Beacon {
    pub fn builder(agent: AgentConfig) -> BeaconBuilder {
        BeaconBuilder {
            agent,
            transport: None,
            resolver: None,
            sink: None,
            runtime: None,
        }
    }

    /// Create a beacon posting to `agent.endpoint` over HTTP
    pub fn initialize(agent: AgentConfig, resolver: Arc<dyn LocationResolver>) -> Result<Self> {
        Self::builder(agent).resolver(resolver).build()
    }

    /// Record an event.
    ///
    /// Returns immediately; delivery runs on a background task of the
    /// beacon's runtime, so any thread may call this. A `PageEnter` while
    /// another page is open first emits a `PageExit` for that page, and the
    /// two are delivered in that order.
    pub fn record(&self, event: NewEvent) {
        if self.inner.cancel.is_cancelled() {
            tracing::debug!(event_code = %event.code, "Beacon is shut down, ignoring event");
            return;
        }

        let timestamp_ms = event.timestamp_ms.unwrap_or_else(now_millis);
        let session_id = self.inner.session.current();
        let mut batch = Vec::with_capacity(2);

        if event.kind == EventKind::PageEnter {
            if let Some(close) = self.inner.pages.on_page_enter(
                &session_id,
                &event.code,
                &event.name,
                event.extra.clone(),
                timestamp_ms,
            ) {
                batch.push(close);
            }
        }

        batch.push(EventRecord {
            session_id,
            event_code: event.code,
            event_name: event.name,
            kind: event.kind,
            timestamp_ms,
            belonging_page: event.belonging_page,
            extra: event.extra,
        });

        Counters::bump(&self.inner.counters.recorded, batch.len());
        self.dispatch(batch);
    }

    /// Deliver `batch` in order on one background task
    fn dispatch(&self, batch: Vec<EventRecord>) {
        let inner = Arc::clone(&self.inner);
        let task = async move {
            let mut remaining = batch.len();
            for record in batch {
                if let Some(sink) = &inner.sink {
                    let name =
                        sink::sink_event_name(&record.event_code, record.kind, &inner.agent.app_version);
                    sink::forward(sink.as_ref(), &name);
                }

                tokio::select! {
                    _ = inner.deliver(record) => remaining -= 1,
                    _ = inner.cancel.cancelled() => {
                        Counters::bump(&inner.counters.dropped, remaining);
                        tracing::debug!(dropped = remaining, "Beacon shut down with events in flight");
                        return;
                    }
                }
            }
        };
        self.inner.tasks.spawn_on(task, &self.inner.runtime);
    }

    /// Start a new session; later events carry the returned id.
    ///
    /// Events already recorded keep the id they were captured with.
    pub fn rotate_session_id(&self) -> String {
        let id = self.inner.session.rotate();
        tracing::info!(session_id = %id, "Session rotated");
        id
    }

    pub fn session_id(&self) -> String {
        self.inner.session.current()
    }

    /// Snapshot of the open page, for a later [`return_to_page`](Self::return_to_page)
    pub fn current_page(&self) -> PageSession {
        self.inner.pages.current()
    }

    /// Record a fresh `PageEnter` for a previously captured page.
    ///
    /// Each call records independently; repeating it is not deduplicated.
    /// Snapshots taken while no page was open are ignored.
    pub fn return_to_page(&self, snapshot: &PageSession) {
        if !snapshot.is_open() {
            tracing::debug!("Ignoring return to an empty page snapshot");
            return;
        }

        let mut event = NewEvent::new(&snapshot.code, &snapshot.name, EventKind::PageEnter)
            .page(&snapshot.code);
        event.extra = snapshot.extra.clone();
        self.record(event);
    }

    /// Record the event for a platform lifecycle notification. Safe to call
    /// from platform callback threads.
    pub fn on_lifecycle(&self, signal: LifecycleSignal) {
        let (code, name, kind) = match signal {
            LifecycleSignal::EnteredBackground => {
                ("app_foreground", "进入-【后台】", EventKind::AppBackground)
            }
            LifecycleSignal::WillEnterForeground => {
                ("app_foreground", "进入-【前台】", EventKind::AppForeground)
            }
            LifecycleSignal::DidBecomeActive => {
                ("app_become_active", "进入-活跃状态", EventKind::StateChange)
            }
            LifecycleSignal::WillResignActive => {
                ("app_resign_active", "进入-非活跃状态", EventKind::StateChange)
            }
        };

        let page = self.inner.pages.current_code();
        self.record(NewEvent::new(code, name, kind).page(page));
    }

    /// Connectivity came back: start a drain pass unless one is running or
    /// the queue is empty.
    pub fn on_reachable(&self) {
        if self.inner.retry.is_empty() || self.inner.retry.is_draining() {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let task = async move {
            let Some(guard) = inner.retry.try_begin_drain() else {
                return;
            };

            let pending = inner.retry.len();
            tracing::debug!(pending, "Draining retry queue");

            let outcome: DrainOutcome = inner
                .retry
                .drain(&guard, &inner.cancel, |record| {
                    let inner = Arc::clone(&inner);
                    async move { inner.submit(&record).await }
                })
                .await;

            Counters::bump(&inner.counters.retried, outcome.sent);
            Counters::bump(&inner.counters.dropped, outcome.dropped);
            tracing::info!(
                sent = outcome.sent,
                dropped = outcome.dropped,
                halted = outcome.halted,
                remaining = inner.retry.len(),
                "Retry drain pass finished"
            );
        };
        self.inner.tasks.spawn_on(task, &self.inner.runtime);
    }

    /// Forward lifecycle notifications from `rx` until it closes or the
    /// beacon shuts down
    pub fn attach_lifecycle(&self, mut rx: mpsc::Receiver<LifecycleSignal>) -> JoinHandle<()> {
        let beacon = self.clone();
        self.inner.runtime.spawn(async move {
            loop {
                tokio::select! {
                    signal = rx.recv() => match signal {
                        Some(signal) => beacon.on_lifecycle(signal),
                        None => break,
                    },
                    _ = beacon.inner.cancel.cancelled() => break,
                }
            }
        })
    }

    /// Start a drain pass on every `Reachable` update from `rx`
    pub fn attach_reachability(&self, mut rx: mpsc::Receiver<Reachability>) -> JoinHandle<()> {
        let beacon = self.clone();
        self.inner.runtime.spawn(async move {
            loop {
                tokio::select! {
                    status = rx.recv() => match status {
                        Some(Reachability::Reachable) => beacon.on_reachable(),
                        Some(status) => tracing::debug!(?status, "Reachability changed"),
                        None => break,
                    },
                    _ = beacon.inner.cancel.cancelled() => break,
                }
            }
        })
    }

    pub fn pending_retries(&self) -> usize {
        self.inner.retry.len()
    }

    /// Queued events, oldest first
    pub fn retry_snapshot(&self) -> Vec<EventRecord> {
        self.inner.retry.snapshot()
    }

    pub fn stats(&self) -> DeliveryStats {
        self.inner.counters.snapshot()
    }

    /// Wait until every delivery and drain pass started so far has finished.
    ///
    /// A lookup or transport that never completes makes this wait forever;
    /// use [`shutdown`](Self::shutdown) for a bounded wait.
    pub async fn flush(&self) {
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        self.inner.tasks.reopen();
    }

    /// Give in-flight work up to `grace` to finish, then cancel the rest and
    /// stop the signal listeners. Events recorded afterwards are ignored.
    pub async fn shutdown(&self, grace: Duration) {
        self.inner.tasks.close();
        if tokio::time::timeout(grace, self.inner.tasks.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                in_flight = self.inner.tasks.len(),
                "Shutdown grace period elapsed, cancelling in-flight events"
            );
        }
        self.inner.cancel.cancel();
        self.inner.tasks.wait().await;

        tracing::info!(
            pending_retries = self.inner.retry.len(),
            "Event beacon shut down"
        );
    }
}

impl Inner {
    /// First delivery attempt for a freshly recorded event
    async fn deliver(&self, record: EventRecord) {
        match self.submit(&record).await {
            Ok(()) => {
                Counters::bump(&self.counters.sent, 1);
                tracing::debug!(
                    event_code = %record.event_code,
                    event_type = %record.kind.wire_code(),
                    page = record.belonging_page.as_deref().unwrap_or(""),
                    "Event sent"
                );
            }
            Err(e) if e.is_retryable() => {
                Counters::bump(&self.counters.queued, 1);
                tracing::warn!(
                    event_code = %record.event_code,
                    error = %e,
                    "Event send failed, queued for retry"
                );
                self.retry.push(record);
            }
            Err(e) => {
                Counters::bump(&self.counters.dropped, 1);
                tracing::warn!(
                    event_code = %record.event_code,
                    error = %e,
                    "Dropping event"
                );
            }
        }
    }

    /// Resolve location, build the payload and send it
    async fn submit(&self, record: &EventRecord) -> Result<()> {
        let location = self.resolver.resolve().await;
        let payload = Payload::build(record, &self.agent, &location);
        self.transport.send(&payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::Location;
    use crate::error::Error;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Transport that records payloads and fails while `offline` is set
    #[derive(Default)]
    struct FlakyTransport {
        offline: std::sync::atomic::AtomicBool,
        sent: Mutex<Vec<Payload>>,
    }

    #[async_trait]
    impl Transport for FlakyTransport {
        async fn send(&self, payload: &Payload) -> Result<()> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(Error::Transport("offline".to_string()));
            }
            self.sent.lock().unwrap().push(payload.clone());
            Ok(())
        }
    }

    fn beacon(transport: Arc<FlakyTransport>) -> Beacon {
        Beacon::builder(AgentConfig {
            user_id: "u-1".to_string(),
            ..Default::default()
        })
        .transport(transport)
        .resolver(Arc::new(StaticLocation(Location {
            ip: "127.0.0.1".to_string(),
            country_code: "US".to_string(),
            city_code: "NYC".to_string(),
        })))
        .build()
        .unwrap()
    }

    #[test]
    fn test_build_without_transport_requires_endpoint() {
        assert!(Beacon::builder(AgentConfig::default()).build().is_err());
    }

    #[test]
    fn test_build_outside_runtime_needs_handle() {
        let transport = Arc::new(FlakyTransport::default());
        let result = Beacon::builder(AgentConfig::default())
            .transport(transport.clone())
            .build();
        assert!(matches!(result, Err(Error::Config(_))));

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let beacon = Beacon::builder(AgentConfig::default())
            .transport(transport.clone())
            .runtime(runtime.handle().clone())
            .build()
            .unwrap();

        beacon.record(NewEvent::new("buy", "Buy", EventKind::Click));
        runtime.block_on(beacon.flush());
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_record_and_flush() {
        let transport = Arc::new(FlakyTransport::default());
        let beacon = beacon(transport.clone());

        beacon.record(NewEvent::new("buy", "Buy", EventKind::Click).at(42));
        beacon.flush().await;

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].event_time, 42);
        assert_eq!(sent[0].uuid, "u-1");
        assert_eq!(sent[0].city_code, "NYC");
        assert_eq!(beacon.stats().sent, 1);
    }

    #[tokio::test]
    async fn test_lifecycle_events_carry_current_page() {
        let transport = Arc::new(FlakyTransport::default());
        let beacon = beacon(transport.clone());

        beacon.record(NewEvent::new("home", "Home", EventKind::PageEnter).at(1));
        beacon.flush().await;
        beacon.on_lifecycle(LifecycleSignal::EnteredBackground);
        beacon.on_lifecycle(LifecycleSignal::WillResignActive);
        beacon.flush().await;

        let sent = transport.sent.lock().unwrap();
        let background = sent.iter().find(|p| p.event_type == "out").unwrap();
        assert_eq!(background.event_code, "app_foreground");
        assert_eq!(background.attr_page, "home");

        let resign = sent
            .iter()
            .find(|p| p.event_code == "app_resign_active")
            .unwrap();
        assert_eq!(resign.event_type, "load");
        assert_eq!(resign.attr_page, "home");
    }

    #[tokio::test]
    async fn test_reachable_with_empty_queue_is_noop() {
        let transport = Arc::new(FlakyTransport::default());
        let beacon = beacon(transport.clone());

        beacon.on_reachable();
        beacon.flush().await;

        assert!(transport.sent.lock().unwrap().is_empty());
        assert_eq!(beacon.stats(), DeliveryStats::default());
    }

    #[tokio::test]
    async fn test_record_after_shutdown_is_ignored() {
        let transport = Arc::new(FlakyTransport::default());
        let beacon = beacon(transport.clone());

        beacon.shutdown(Duration::from_millis(100)).await;
        beacon.record(NewEvent::new("late", "Late", EventKind::Click));

        assert_eq!(beacon.stats().recorded, 0);
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_return_snapshot_is_ignored() {
        let transport = Arc::new(FlakyTransport::default());
        let beacon = beacon(transport.clone());

        beacon.return_to_page(&beacon.current_page());
        beacon.flush().await;

        assert_eq!(beacon.stats().recorded, 0);
    }
}
