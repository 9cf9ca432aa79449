//! Core protocol state.
//!
//! This module contains the pieces that must never desynchronize from the
//! server's view of the screen:
//!
//! - **screen**: virtual 24×80 character grid with cursor semantics
//! - **decoder**: draw-command byte stream → screen mutations
//! - **session**: per-session identity (instance, player id, name, team)
//!
//! # Architecture
//!
//! ```text
//! poll batches ──> Decoder ──> Screen ──> Presenter (terminal)
//!                     │
//!                     └──> SessionEnd signal (stops polling)
//! ```

pub mod decoder;
pub mod screen;
pub mod session;
