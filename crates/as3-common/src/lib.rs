//! Common types for the AS3 declaration dispatch agent.
//!
//! This crate provides the pieces shared by the `as3mgrd` daemon and its
//! test harness:
//!
//! - [`Declaration`], [`PostOutcome`], [`EventCode`]: the values that flow
//!   through the dispatch loop
//! - [`ControlPlane`]: the trait the BIG-IP transport implements
//! - [`equality`]: canonical, order-independent declaration comparison
//! - [`error`]: Error types for agent operations
//!
//! # Example
//!
//! ```
//! use as3_common::{declarations_equal, Declaration};
//!
//! let a = Declaration::new(r#"{"class":"AS3","persist":true}"#);
//! let b = Declaration::new(r#"{ "persist": true, "class": "AS3" }"#);
//! assert!(declarations_equal(&a.body, &b.body));
//! ```

pub mod control_plane;
pub mod declaration;
pub mod equality;
pub mod error;

// Re-export commonly used items at crate root
pub use control_plane::ControlPlane;
pub use declaration::{ControlPlaneInfo, Declaration, EventCode, PostNotification, PostOutcome};
pub use equality::{declarations_equal, CanonicalJson};
pub use error::{As3Error, As3Result};
