//! Secondary analytics sink
//!
//! Some hosts mirror every event into a third-party analytics SDK. The sink is
//! called fire-and-forget for each newly recorded event; it never sees
//! retries and cannot affect delivery to the collection endpoint.

use crate::types::EventKind;

/// Longest event name third-party SDKs commonly accept
pub const MAX_SINK_NAME_LEN: usize = 40;

/// Receives a compact name for every recorded event
pub trait SecondarySink: Send + Sync {
    fn log_event(&self, name: &str);
}

/// Name forwarded to the sink: `{code}_{altWireCode}`, suffixed with the app
/// version stripped of dots (`home_in_140` for version 1.4.0).
pub fn sink_event_name(code: &str, kind: EventKind, app_version: &str) -> String {
    let mut name = format!("{}_{}", code, kind.alt_wire_code());
    let version = app_version.replace('.', "");
    if !version.is_empty() {
        name.push('_');
        name.push_str(&version);
    }
    name
}

/// Sink that only writes the name to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl SecondarySink for LogSink {
    fn log_event(&self, name: &str) {
        tracing::debug!(name = %name, "Secondary sink event");
    }
}

/// Forward `name` to `sink`, warning about names the sink may reject
pub(crate) fn forward(sink: &dyn SecondarySink, name: &str) {
    if name.chars().count() > MAX_SINK_NAME_LEN {
        tracing::warn!(
            name = %name,
            max = MAX_SINK_NAME_LEN,
            "Secondary sink event name is too long"
        );
    }
    sink.log_event(name);
}
