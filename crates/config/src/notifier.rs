use crate::ConfigError;
use serde::{Deserialize, Deserializer};
use std::{borrow::Cow, fmt::Display, path::Path, time::Duration};

/// Default endpoint the query service receives replies and notifications on.
pub const DEFAULT_NOTIFICATION_ENDPOINT: &str = "tcp://127.0.0.1:9091";
/// Default endpoint of the heartbeat feed.
pub const DEFAULT_HEARTBEAT_ENDPOINT: &str = "tcp://127.0.0.1:9092";
/// Default endpoint of the block feed.
pub const DEFAULT_BLOCK_ENDPOINT: &str = "tcp://127.0.0.1:9093";
/// Default endpoint of the transaction feed.
pub const DEFAULT_TRANSACTION_ENDPOINT: &str = "tcp://127.0.0.1:9094";

fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}

/// Configuration for the notification workers and push relays.
///
/// Every field has a default, so a JSON document only needs to name the
/// settings it changes. Durations are given in milliseconds.
///
/// # Example
///
/// ```
/// use chainwatch_config::NotifierConfig;
/// use std::time::Duration;
///
/// let config = NotifierConfig::from_json(r#"{ "pollInterval": 250 }"#).unwrap();
/// assert_eq!(config.poll_interval(), Duration::from_millis(250));
/// assert_eq!(config.subscription_expiration(), Duration::from_secs(600));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotifierConfig {
    /// How long a subscription lives without being renewed.
    ///
    /// Default: `10 minutes`.
    #[serde(deserialize_with = "millis")]
    subscription_expiration: Duration,

    /// Period of the purge cycle.
    ///
    /// Default: `1 minute`.
    #[serde(deserialize_with = "millis")]
    purge_interval: Duration,

    /// Maximum subscriptions removed per write-lock acquisition during a
    /// purge.
    ///
    /// Default: `1024`.
    purge_batch_size: usize,

    /// Receive timeout of every worker loop. Bounds how long a stop request
    /// takes to be observed.
    ///
    /// Default: `100 milliseconds`.
    #[serde(deserialize_with = "millis")]
    poll_interval: Duration,

    /// Capacity of each push relay's broadcast channel.
    ///
    /// Default: `1024`.
    relay_capacity: usize,

    /// Endpoint notifications are sent to.
    notification_endpoint: Cow<'static, str>,

    /// Endpoint of the block feed.
    block_endpoint: Cow<'static, str>,

    /// Endpoint of the transaction feed.
    transaction_endpoint: Cow<'static, str>,

    /// Endpoint of the heartbeat feed.
    heartbeat_endpoint: Cow<'static, str>,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            subscription_expiration: Duration::from_secs(10 * 60),
            purge_interval: Duration::from_secs(60),
            purge_batch_size: 1024,
            poll_interval: Duration::from_millis(100),
            relay_capacity: 1024,
            notification_endpoint: Cow::Borrowed(DEFAULT_NOTIFICATION_ENDPOINT),
            block_endpoint: Cow::Borrowed(DEFAULT_BLOCK_ENDPOINT),
            transaction_endpoint: Cow::Borrowed(DEFAULT_TRANSACTION_ENDPOINT),
            heartbeat_endpoint: Cow::Borrowed(DEFAULT_HEARTBEAT_ENDPOINT),
        }
    }
}

impl Display for NotifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierConfig")
            .field("subscription_expiration", &self.subscription_expiration)
            .field("purge_interval", &self.purge_interval)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl NotifierConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check that the settings are usable.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.subscription_expiration.is_zero() {
            return Err(ConfigError::zero("subscriptionExpiration"));
        }
        if self.purge_interval.is_zero() {
            return Err(ConfigError::zero("purgeInterval"));
        }
        if self.purge_batch_size == 0 {
            return Err(ConfigError::zero("purgeBatchSize"));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::zero("pollInterval"));
        }
        if self.relay_capacity == 0 {
            return Err(ConfigError::zero("relayCapacity"));
        }
        Ok(())
    }

    /// Subscription lifetime.
    pub const fn subscription_expiration(&self) -> Duration {
        self.subscription_expiration
    }

    /// Set the subscription lifetime.
    pub const fn set_subscription_expiration(&mut self, expiration: Duration) {
        self.subscription_expiration = expiration;
    }

    /// Purge cycle period.
    pub const fn purge_interval(&self) -> Duration {
        self.purge_interval
    }

    /// Set the purge cycle period.
    pub const fn set_purge_interval(&mut self, interval: Duration) {
        self.purge_interval = interval;
    }

    /// Subscriptions removed per purge batch.
    pub const fn purge_batch_size(&self) -> usize {
        self.purge_batch_size
    }

    /// Set the purge batch size.
    pub const fn set_purge_batch_size(&mut self, size: usize) {
        self.purge_batch_size = size;
    }

    /// Worker receive timeout.
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Set the worker receive timeout.
    pub const fn set_poll_interval(&mut self, interval: Duration) {
        self.poll_interval = interval;
    }

    /// Relay broadcast channel capacity.
    pub const fn relay_capacity(&self) -> usize {
        self.relay_capacity
    }

    /// Notification endpoint.
    pub fn notification_endpoint(&self) -> &str {
        &self.notification_endpoint
    }

    /// Set the notification endpoint.
    pub fn set_notification_endpoint(&mut self, endpoint: Cow<'static, str>) {
        self.notification_endpoint = endpoint;
    }

    /// Block feed endpoint.
    pub fn block_endpoint(&self) -> &str {
        &self.block_endpoint
    }

    /// Transaction feed endpoint.
    pub fn transaction_endpoint(&self) -> &str {
        &self.transaction_endpoint
    }

    /// Heartbeat feed endpoint.
    pub fn heartbeat_endpoint(&self) -> &str {
        &self.heartbeat_endpoint
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = NotifierConfig::default();
        config.validate().unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.block_endpoint(), DEFAULT_BLOCK_ENDPOINT);
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(NotifierConfig::from_json("{}").unwrap(), NotifierConfig::default());
    }

    #[test]
    fn partial_document() {
        let config = NotifierConfig::from_json(
            r#"{
                "subscriptionExpiration": 30000,
                "purgeBatchSize": 16,
                "blockEndpoint": "tcp://10.0.0.1:9093"
            }"#,
        )
        .unwrap();
        assert_eq!(config.subscription_expiration(), Duration::from_secs(30));
        assert_eq!(config.purge_batch_size(), 16);
        assert_eq!(config.block_endpoint(), "tcp://10.0.0.1:9093");
        assert_eq!(config.purge_interval(), Duration::from_secs(60));
    }

    #[test]
    fn zero_values_rejected() {
        let err = NotifierConfig::from_json(r#"{ "pollInterval": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Zero { field: "pollInterval" }));
    }

    #[test]
    fn malformed_json_rejected() {
        assert!(matches!(
            NotifierConfig::from_json(r#"{ "pollInterval": "fast" }"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn loads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "relayCapacity": 8 }}"#).unwrap();
        let config = NotifierConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.relay_capacity(), 8);

        assert!(matches!(
            NotifierConfig::from_json_file(file.path().with_extension("missing")),
            Err(ConfigError::Io(_))
        ));
    }
}
