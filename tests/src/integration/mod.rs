//! Cross-component integration scenarios.

pub mod request_reply;
pub mod shared_channel;
