//! # Postline Test Suite
//!
//! Unified test crate containing cross-component scenarios that exercise
//! two or more engine instances over one shared transport.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── request_reply.rs   # end-to-end post/answer flows
//!     └── shared_channel.rs  # channel isolation and foreign traffic
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p postline-tests
//! ```

pub mod integration;
