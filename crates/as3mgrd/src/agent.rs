//! AS3 agent - the entry points the host process uses.
//!
//! [`As3Agent::initialize`] gates startup on the control plane's AS3
//! version and spawns the dispatcher task; [`As3Agent::submit`] hands it new
//! desired state; [`As3Agent::shutdown`] tears it down.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use as3_common::{
    As3Error, As3Result, ControlPlane, ControlPlaneInfo, Declaration, PostNotification,
};

use crate::dispatcher::{Dispatcher, DispatcherSettings};
use crate::queue::{dispatch_channel, DispatchSender};
use crate::schema::SchemaValidator;
use crate::version;

/// Everything the agent needs besides the control plane itself.
#[derive(Debug, Default)]
pub struct AgentParams {
    /// Post delay and retry policy.
    pub settings: DispatcherSettings,
    /// Schema gate; `None` disables validation.
    pub validator: Option<SchemaValidator>,
    /// Receives a notification after each accepted post.
    pub notifications: Option<mpsc::Sender<PostNotification>>,
}

/// Handle to a running dispatcher.
#[derive(Debug)]
pub struct As3Agent {
    sender: DispatchSender,
    dispatcher: JoinHandle<()>,
    info: ControlPlaneInfo,
}

impl As3Agent {
    /// Verifies the control plane and starts the dispatch loop.
    ///
    /// # Errors
    ///
    /// Fails if the AS3 version cannot be queried, cannot be parsed, or is
    /// below the supported minimum. No dispatcher is started in that case.
    pub async fn initialize<C>(params: AgentParams, control_plane: Arc<C>) -> As3Result<Self>
    where
        C: ControlPlane + 'static,
    {
        info!("Initializing AS3 agent");

        let info = version::check_version(control_plane.as_ref()).await?;

        let (sender, receiver) = dispatch_channel();
        let mut dispatcher = Dispatcher::new(control_plane, receiver, params.settings);
        if let Some(validator) = params.validator {
            info!(schema = %validator.reference(), "AS3 schema validation enabled");
            dispatcher = dispatcher.with_validator(validator);
        }
        if let Some(sink) = params.notifications {
            dispatcher = dispatcher.with_notifications(sink);
        }

        let dispatcher = tokio::spawn(dispatcher.run());

        Ok(Self {
            sender,
            dispatcher,
            info,
        })
    }

    /// Queues `declaration`, replacing any declaration not yet picked up.
    ///
    /// # Errors
    ///
    /// Returns [`As3Error::QueueClosed`] if the dispatcher has stopped.
    pub fn submit(&self, declaration: Declaration) -> As3Result<()> {
        if self.sender.submit(declaration)?.is_some() {
            debug!("Superseded a pending declaration");
        }
        Ok(())
    }

    /// Returns a sender other producers can submit through.
    pub fn sender(&self) -> DispatchSender {
        self.sender.clone()
    }

    /// Returns the AS3 version details resolved at startup.
    pub fn control_plane_info(&self) -> &ControlPlaneInfo {
        &self.info
    }

    /// Closes the queue and waits for the dispatcher to exit.
    ///
    /// A declaration still pending in the queue is posted first. The
    /// notification channel closes when the dispatcher exits.
    pub async fn shutdown(self) -> As3Result<()> {
        info!("Shutting down AS3 agent");
        self.sender.close();

        self.dispatcher.await.map_err(|e| {
            error!(error = %e, "Config dispatcher terminated abnormally");
            As3Error::internal(format!("config dispatcher terminated abnormally: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use as3_test::{fixtures, ScriptedControlPlane};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_initialize_resolves_release() {
        let cp = Arc::new(ScriptedControlPlane::with_version("3.20.0", "0.0.1"));
        let agent = As3Agent::initialize(AgentParams::default(), cp).await.unwrap();

        assert_eq!(agent.control_plane_info().release, "3.20.0-0.0.1");
        agent.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_initialize_rejects_old_as3() {
        let cp = Arc::new(ScriptedControlPlane::with_version("3.19.1", "0.0.1"));
        let err = As3Agent::initialize(AgentParams::default(), Arc::clone(&cp))
            .await
            .unwrap_err();

        assert!(matches!(err, As3Error::IncompatibleVersion { .. }));
        assert_eq!(cp.post_count(), 0);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_fails() {
        let cp = Arc::new(ScriptedControlPlane::new());
        let agent = As3Agent::initialize(AgentParams::default(), cp).await.unwrap();
        let producer = agent.sender();

        agent.shutdown().await.unwrap();

        assert!(matches!(
            producer.submit(fixtures::declaration("tenant_a", 80)),
            Err(As3Error::QueueClosed)
        ));
    }

    #[tokio::test]
    async fn test_shutdown_posts_pending_declaration() {
        let cp = Arc::new(ScriptedControlPlane::new());
        let agent = As3Agent::initialize(AgentParams::default(), Arc::clone(&cp))
            .await
            .unwrap();

        agent.submit(fixtures::declaration("tenant_a", 80)).unwrap();
        agent.shutdown().await.unwrap();

        assert_eq!(
            cp.posted_bodies(),
            vec![fixtures::declaration("tenant_a", 80).body]
        );
    }

    #[tokio::test]
    async fn test_shutdown_closes_notification_channel() {
        let cp = Arc::new(ScriptedControlPlane::new());
        let (tx, mut rx) = mpsc::channel(4);
        let params = AgentParams {
            notifications: Some(tx),
            ..AgentParams::default()
        };
        let agent = As3Agent::initialize(params, cp).await.unwrap();

        agent.submit(fixtures::declaration("tenant_a", 80)).unwrap();
        agent.shutdown().await.unwrap();

        let notification = rx.recv().await.expect("accepted post is reported");
        assert_eq!(notification.tenants, vec!["tenant_a".to_string()]);
        assert!(rx.recv().await.is_none());
    }
}
