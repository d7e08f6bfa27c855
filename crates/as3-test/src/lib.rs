//! Test infrastructure for the AS3 dispatch agent
//!
//! Provides:
//! - Declaration and schema fixtures
//! - A scripted in-memory control plane that records every post
//! - Assertion helpers over the recorded posts

pub mod fixtures;
mod scripted;
mod verification;

pub use scripted::{RecordedPost, ScriptedControlPlane};
pub use verification::*;
