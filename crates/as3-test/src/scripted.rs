//! Scripted in-memory control plane
//!
//! Returns queued outcomes in order and accepts everything once the script
//! runs out. Every post is recorded for later inspection.

use std::collections::VecDeque;
use std::time::Duration;

use as3_common::{As3Error, As3Result, ControlPlane, PostOutcome};
use async_trait::async_trait;
use parking_lot::Mutex;

/// A post observed by [`ScriptedControlPlane`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPost {
    /// Posted JSON document.
    pub document: String,
    /// Tenant scope of the post.
    pub tenants: Vec<String>,
}

#[derive(Debug, Default)]
struct Script {
    outcomes: VecDeque<PostOutcome>,
    posts: Vec<RecordedPost>,
}

/// Control plane double driven by a queue of outcomes.
#[derive(Debug)]
pub struct ScriptedControlPlane {
    version: Option<(String, String)>,
    latency: Duration,
    script: Mutex<Script>,
}

impl Default for ScriptedControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedControlPlane {
    /// A control plane running AS3 3.20.0 that accepts every post.
    pub fn new() -> Self {
        Self::with_version("3.20.0", "0.0.1")
    }

    /// A control plane reporting the given AS3 version and build.
    pub fn with_version(version: &str, build: &str) -> Self {
        Self {
            version: Some((version.to_string(), build.to_string())),
            latency: Duration::ZERO,
            script: Mutex::new(Script::default()),
        }
    }

    /// A control plane whose version query fails, as when AS3 is not
    /// installed.
    pub fn without_as3() -> Self {
        Self {
            version: None,
            ..Self::new()
        }
    }

    /// Makes every post take `latency` before returning.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queues the outcome of the next unscripted post.
    pub fn push_outcome(&self, outcome: PostOutcome) {
        self.script.lock().outcomes.push_back(outcome);
    }

    /// Queues `outcome` for the next `count` posts.
    pub fn push_outcomes(&self, outcome: PostOutcome, count: usize) {
        let mut script = self.script.lock();
        for _ in 0..count {
            script.outcomes.push_back(outcome.clone());
        }
    }

    /// Number of posts received so far.
    pub fn post_count(&self) -> usize {
        self.script.lock().posts.len()
    }

    /// Bodies of all posts, in arrival order.
    pub fn posted_bodies(&self) -> Vec<String> {
        self.script
            .lock()
            .posts
            .iter()
            .map(|p| p.document.clone())
            .collect()
    }

    /// All recorded posts, in arrival order.
    pub fn posts(&self) -> Vec<RecordedPost> {
        self.script.lock().posts.clone()
    }

    /// Scripted outcomes not yet consumed.
    pub fn pending_outcomes(&self) -> usize {
        self.script.lock().outcomes.len()
    }
}

#[async_trait]
impl ControlPlane for ScriptedControlPlane {
    async fn post_declaration(&self, document: &str, tenants: &[String]) -> PostOutcome {
        let outcome = {
            let mut script = self.script.lock();
            script.posts.push(RecordedPost {
                document: document.to_string(),
                tenants: tenants.to_vec(),
            });
            script
                .outcomes
                .pop_front()
                .unwrap_or_else(PostOutcome::accepted)
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        outcome
    }

    async fn query_version(&self) -> As3Result<(String, String)> {
        self.version.clone().ok_or_else(|| {
            As3Error::control_plane("query_version", "AS3 RPM is not installed on BIG-IP")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use as3_common::EventCode;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_script_then_accept() {
        let cp = ScriptedControlPlane::new();
        cp.push_outcome(PostOutcome::failed(EventCode::ServiceUnavailable));

        assert_eq!(
            cp.post_declaration("a", &[]).await,
            PostOutcome::failed(EventCode::ServiceUnavailable)
        );
        assert_eq!(cp.post_declaration("b", &[]).await, PostOutcome::accepted());
        assert_eq!(cp.posted_bodies(), vec!["a", "b"]);
        assert_eq!(cp.pending_outcomes(), 0);
    }

    #[tokio::test]
    async fn test_records_tenants() {
        let cp = ScriptedControlPlane::new();
        cp.post_declaration("{}", &["tenant_a".to_string()]).await;

        assert_eq!(
            cp.posts(),
            vec![RecordedPost {
                document: "{}".to_string(),
                tenants: vec!["tenant_a".to_string()],
            }]
        );
    }

    #[tokio::test]
    async fn test_version() {
        assert_eq!(
            ScriptedControlPlane::new().query_version().await.unwrap(),
            ("3.20.0".to_string(), "0.0.1".to_string())
        );
        assert!(ScriptedControlPlane::without_as3()
            .query_version()
            .await
            .is_err());
    }
}
