//! # Wire Envelope
//!
//! The JSON unit exchanged through the transport. A boolean `marker` field
//! tags protocol traffic so it can be told apart from unrelated messages
//! sharing the same transport; everything without it is ignored.

use crate::CHANNEL_DELIMITER;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Message identifier for request/reply correlation.
///
/// Uses UUID v7 (time-ordered), optionally prefixed with the configured
/// channel and the `':'` delimiter: `"<channel>:<uuid>"`. The prefix is what
/// lets instances sharing one transport discard each other's traffic, and is
/// the reason channel identifiers must not contain `':'`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MsgId(String);

impl MsgId {
    /// Generate a fresh identifier, unique within this process.
    #[must_use]
    pub fn generate(channel: Option<&str>) -> Self {
        let id = Uuid::now_v7();
        match channel {
            Some(channel) => Self(format!("{channel}{CHANNEL_DELIMITER}{id}")),
            None => Self(id.to_string()),
        }
    }

    /// The channel prefix, if the identifier carries one.
    #[must_use]
    pub fn channel(&self) -> Option<&str> {
        self.0.split_once(CHANNEL_DELIMITER).map(|(channel, _)| channel)
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MsgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for MsgId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for MsgId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The wire unit exchanged through the transport.
///
/// ```text
/// Request:  { "marker": true, "msgId": "...", "data": ... }
/// Response: { "marker": true, "msgId": "...", "data": ..., "origMsgId": "..." }
/// ```
///
/// `orig_msg_id` present means this envelope replies to the request with that
/// id; absent means it is a fresh request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Protocol tag. Always `true` on envelopes we emit.
    pub marker: bool,

    /// Identifier of this envelope.
    pub msg_id: MsgId,

    /// Payload.
    #[serde(default)]
    pub data: serde_json::Value,

    /// Identifier of the request this envelope answers, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orig_msg_id: Option<MsgId>,
}

impl Envelope {
    /// Build a fresh request envelope.
    #[must_use]
    pub fn request(msg_id: MsgId, data: serde_json::Value) -> Self {
        Self {
            marker: true,
            msg_id,
            data,
            orig_msg_id: None,
        }
    }

    /// Build a reply envelope answering `orig_msg_id`.
    #[must_use]
    pub fn reply(msg_id: MsgId, data: serde_json::Value, orig_msg_id: MsgId) -> Self {
        Self {
            marker: true,
            msg_id,
            data,
            orig_msg_id: Some(orig_msg_id),
        }
    }

    /// Whether this envelope answers an earlier request.
    #[must_use]
    pub fn is_reply(&self) -> bool {
        self.orig_msg_id.is_some()
    }

    /// Classify an inbound transport message.
    ///
    /// Returns `None` for anything that is not protocol traffic: missing or
    /// non-`true` marker, missing or non-string `msgId`, non-object values.
    /// The transport is shared, so foreign traffic is expected and dropped
    /// without ceremony.
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        if !value
            .get("marker")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
        {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}
