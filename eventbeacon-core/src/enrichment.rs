//! Network location enrichment
//!
//! Before an event is sent, the agent asks an injected [`LocationResolver`]
//! for the device's public IP, country and city. The lookup is asynchronous
//! and has no timeout of its own: a resolver that never answers keeps its
//! event in flight until the beacon shuts down.

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::config::LocationConfig;

/// Location fields merged into every payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub ip: String,
    pub country_code: String,
    pub city_code: String,
}

/// Resolves the current network location. Called once per send attempt.
#[async_trait]
pub trait LocationResolver: Send + Sync {
    async fn resolve(&self) -> Location;
}

/// Resolver that always answers with the same values
#[derive(Debug, Clone, Default)]
pub struct StaticLocation(pub Location);

impl From<&LocationConfig> for StaticLocation {
    fn from(config: &LocationConfig) -> Self {
        StaticLocation(Location {
            ip: config.ip.clone(),
            country_code: config.country_code.clone(),
            city_code: config.city_code.clone(),
        })
    }
}

#[async_trait]
impl LocationResolver for StaticLocation {
    async fn resolve(&self) -> Location {
        self.0.clone()
    }
}

/// Completion handed to a callback-style lookup: `(ip, country_code, city_code)`
pub type LocationCompletion = Box<dyn FnOnce(String, String, String) + Send>;

/// Adapts a completion-callback lookup into a [`LocationResolver`].
///
/// The lookup may call the completion from any thread, at any later time.
pub struct CallbackResolver<F> {
    lookup: F,
}

impl<F> CallbackResolver<F>
where
    F: Fn(LocationCompletion) + Send + Sync,
{
    pub fn new(lookup: F) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl<F> LocationResolver for CallbackResolver<F>
where
    F: Fn(LocationCompletion) + Send + Sync,
{
    async fn resolve(&self) -> Location {
        let (tx, rx) = oneshot::channel();
        (self.lookup)(Box::new(move |ip, country_code, city_code| {
            let _ = tx.send(Location {
                ip,
                country_code,
                city_code,
            });
        }));

        match rx.await {
            Ok(location) => location,
            Err(_) => {
                // The completion was dropped without being called; it never can be now
                tracing::warn!("Location lookup dropped its completion, sending without location");
                Location::default()
            }
        }
    }
}
