//! Config dispatcher - the loop that posts declarations to BIG-IP.
//!
//! The dispatcher is the only owner of the active declaration and of the
//! sticky unprocessable-entity flag, so neither needs a lock. It cycles
//! through these states:
//!
//! ```text
//! WaitingForRequest -> DelayBeforePost -> RefreshLatest -> Posting
//!        ^                                                   |
//!        |------------------- accepted ----------------------|
//!                                                            | failed
//!                          RetryWait -> Posting <------------'
//! ```
//!
//! Closing the queue moves it to `Closed` from either waiting state.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use as3_common::{
    declarations_equal, ControlPlane, Declaration, EventCode, PostNotification, PostOutcome,
};

use crate::queue::DispatchReceiver;
use crate::retry::RetryPolicy;
use crate::schema::SchemaValidator;

/// Tunables for the dispatch loop.
#[derive(Debug, Clone, Default)]
pub struct DispatcherSettings {
    /// Wait before every post except the first one.
    pub post_delay: Duration,
    /// Retry timeouts per event.
    pub retry: RetryPolicy,
}

/// What a single pass through the posting step did.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Attempt {
    /// Equal to the active declaration; nothing sent.
    Unchanged,
    /// Failed schema validation; dropped without posting.
    Rejected,
    /// Sent to the control plane.
    Sent(PostOutcome),
}

impl Attempt {
    fn needs_retry(&self) -> Option<&EventCode> {
        match self {
            Attempt::Sent(outcome) if !outcome.accepted => Some(&outcome.event),
            _ => None,
        }
    }
}

/// Posts the latest declaration and retries until it is accepted or
/// superseded.
pub struct Dispatcher<C: ControlPlane> {
    control_plane: Arc<C>,
    requests: DispatchReceiver,
    settings: DispatcherSettings,
    validator: Option<SchemaValidator>,
    notifications: Option<mpsc::Sender<PostNotification>>,
    active: Declaration,
    unprocessable_entity: bool,
    first_post: bool,
}

impl<C: ControlPlane> Dispatcher<C> {
    /// Creates a dispatcher draining `requests`.
    pub fn new(
        control_plane: Arc<C>,
        requests: DispatchReceiver,
        settings: DispatcherSettings,
    ) -> Self {
        Self {
            control_plane,
            requests,
            settings,
            validator: None,
            notifications: None,
            active: Declaration::default(),
            unprocessable_entity: false,
            first_post: true,
        }
    }

    /// Validates declarations against `validator` before posting.
    pub fn with_validator(mut self, validator: SchemaValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Sends a notification to `sink` after each accepted post.
    pub fn with_notifications(mut self, sink: mpsc::Sender<PostNotification>) -> Self {
        self.notifications = Some(sink);
        self
    }

    /// Runs until the queue is closed and drained.
    ///
    /// Dropping the dispatcher at the end closes the notification channel.
    pub async fn run(mut self) {
        info!("Running config dispatcher");

        while let Some(mut request) = self.requests.recv().await {
            debug!("Received new declaration");

            if !self.first_post && !self.settings.post_delay.is_zero() {
                debug!(
                    delay_secs = self.settings.post_delay.as_secs_f64(),
                    "Delaying post to BIG-IP"
                );
                tokio::time::sleep(self.settings.post_delay).await;
            }

            // Something newer may have arrived during the delay
            if let Some(latest) = self.requests.try_recv() {
                debug!("Picked up a newer declaration after delay");
                request = latest;
            }

            let mut attempt = self.post(request).await;
            while let Some(event) = attempt.needs_retry() {
                self.unprocessable_entity = true;
                let timeout = self.settings.retry.timeout_for(event);
                debug!(
                    event = %event,
                    timeout_secs = timeout.as_secs_f64(),
                    "Error handling for event"
                );

                match self.post_on_event_or_timeout(timeout).await {
                    Some(next) => attempt = next,
                    None => {
                        info!("Dispatch queue closed during retry wait");
                        return;
                    }
                }
            }
            self.first_post = false;

            if let Attempt::Sent(outcome) = &attempt {
                if outcome.event == EventCode::Ok {
                    self.unprocessable_entity = false;
                    self.notify_posted();
                }
            }
        }

        info!("Dispatch queue closed, config dispatcher exiting");
    }

    /// Equality gate, schema gate, then the network call.
    #[instrument(skip_all, fields(tenants = ?declaration.tenants))]
    async fn post(&mut self, declaration: Declaration) -> Attempt {
        if declarations_equal(&self.active.body, &declaration.body) {
            if !self.unprocessable_entity {
                debug!("Declaration unchanged, skipping post");
                return Attempt::Unchanged;
            }
            debug!("Declaration unchanged but previous post failed, posting again");
        }

        if let Some(validator) = &self.validator {
            if !validator.validate(&declaration.body) {
                warn!("Dropping declaration that failed schema validation");
                return Attempt::Rejected;
            }
        }

        debug!("Posting AS3 declaration");
        self.active = declaration;
        Attempt::Sent(self.send_active().await)
    }

    async fn send_active(&self) -> PostOutcome {
        let outcome = self
            .control_plane
            .post_declaration(&self.active.body, &self.active.tenants)
            .await;

        if outcome.accepted {
            info!("Declaration accepted by BIG-IP");
        } else {
            warn!(event = %outcome.event, "Declaration post failed");
        }
        outcome
    }

    /// Waits out a retry timeout unless a newer declaration arrives first.
    ///
    /// Returns `None` if the queue closes while waiting.
    async fn post_on_event_or_timeout(&mut self, timeout: Duration) -> Option<Attempt> {
        tokio::select! {
            request = self.requests.recv() => match request {
                Some(declaration) => {
                    debug!("Newer declaration pre-empted retry");
                    Some(self.post(declaration).await)
                }
                None => None,
            },
            _ = tokio::time::sleep(timeout) => {
                debug!("Retry timeout elapsed, re-posting active declaration");
                Some(Attempt::Sent(self.send_active().await))
            }
        }
    }

    fn notify_posted(&self) {
        let Some(sink) = &self.notifications else {
            return;
        };

        let notification = PostNotification {
            tenants: self.active.tenants.clone(),
            schema_version: self.active.schema_version.clone(),
            posted_at: Utc::now(),
        };
        match sink.try_send(notification) {
            Ok(()) => debug!("Sent response message to response handler"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Notification channel full, dropping post notification")
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Notification receiver gone")
            }
        }
    }
}

impl<C: ControlPlane> std::fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("settings", &self.settings)
            .field("unprocessable_entity", &self.unprocessable_entity)
            .field("first_post", &self.first_post)
            .finish_non_exhaustive()
    }
}
