//! AS3 declaration dispatch daemon.
//!
//! This crate implements `as3mgrd`, which keeps a BIG-IP's AS3 configuration
//! converged on the latest desired declaration.
//!
//! # Responsibilities
//!
//! - Gate startup on a supported AS3 version ([`version`])
//! - Hand declarations to one dispatcher with latest-wins semantics ([`queue`])
//! - Skip unchanged declarations, drop schema-invalid ones ([`schema`])
//! - Post through the [`ControlPlane`](as3_common::ControlPlane) and retry
//!   failures with event-specific timeouts ([`dispatcher`], [`retry`])
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`agent`] | Initialize / submit / shutdown entry points |
//! | [`queue`] | Single-slot latest-wins mailbox |
//! | [`dispatcher`] | Post and retry state machine |
//! | [`retry`] | Event to timeout mapping |
//! | [`schema`] | JSON schema gate |
//! | [`version`] | AS3 version compatibility check |
//! | [`bigip`] | reqwest-based BIG-IP client |
//! | [`config_file`] | TOML configuration |
//! | [`source`] | File-backed declaration producer |
//!
//! # Example
//!
//! ```ignore
//! use as3mgrd::{AgentParams, As3Agent, BigIpClient};
//!
//! let client = Arc::new(BigIpClient::new(config.bigip_params())?);
//! let agent = As3Agent::initialize(AgentParams::default(), client).await?;
//! agent.submit(Declaration::new(body))?;
//! agent.shutdown().await?;
//! ```

pub mod agent;
pub mod bigip;
pub mod config_file;
pub mod dispatcher;
pub mod queue;
pub mod retry;
pub mod schema;
pub mod source;
pub mod version;

pub use agent::{AgentParams, As3Agent};
pub use bigip::{BigIpClient, BigIpParams};
pub use config_file::{As3MgrConfig, DEFAULT_CONFIG_PATH};
pub use dispatcher::{Dispatcher, DispatcherSettings};
pub use queue::{dispatch_channel, DispatchReceiver, DispatchSender};
pub use retry::RetryPolicy;
pub use schema::SchemaValidator;
pub use source::DeclarationSource;
pub use version::{check_version, AS3_SUPPORTED_VERSION};
