//! # Configuration
//!
//! Options are validated once at construction and stored verbatim; the
//! accessor on the engine returns exactly what was passed in.

use crate::error::ConfigError;
use crate::transport::OriginFilter;
use crate::{CHANNEL_DELIMITER, DEFAULT_MAX_WAIT_TIME};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine construction options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Namespace scoping this instance on a shared transport.
    ///
    /// Must not contain `':'`, which delimits the channel prefix inside
    /// message ids. `None` accepts protocol traffic from any channel.
    pub channel: Option<String>,

    /// How long a posted request waits for a reply before its answer
    /// rejects with "Response timeout reached.". Serialized in
    /// milliseconds.
    #[serde(with = "duration_millis")]
    pub max_wait_time: Duration,

    /// Chatty per-envelope logging.
    pub enable_debug: bool,

    /// Origin restriction applied to every outbound send.
    pub target_origin: OriginFilter,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            channel: None,
            max_wait_time: DEFAULT_MAX_WAIT_TIME,
            enable_debug: false,
            target_origin: OriginFilter::Any,
        }
    }
}

impl Options {
    /// Validate the options.
    ///
    /// Fails with [`ConfigError::InvalidChannel`] when the channel contains
    /// the reserved delimiter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(channel) = &self.channel {
            if channel.contains(CHANNEL_DELIMITER) {
                return Err(ConfigError::InvalidChannel {
                    channel: channel.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Serialize `Duration` as integer milliseconds.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
