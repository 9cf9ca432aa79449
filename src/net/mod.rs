//! Networking.
//!
//! - **client**: JSON-over-HTTP RPC calls against the game front end
//! - **poll**: the perpetual single-in-flight long-poll loop
//!
//! The poll loop only sees the `GameTransport` seam, so everything above
//! the HTTP layer is testable with scripted outcomes.

pub mod client;
pub mod poll;

pub use client::{GameClient, InstanceStats, NetError};
pub use poll::{GameTransport, PollLoop, PollOutcome};
