//! Control plane collaborator trait.
//!
//! The dispatcher never talks HTTP itself. Everything it needs from the
//! BIG-IP side goes through [`ControlPlane`], which keeps the dispatch loop
//! testable against scripted implementations.

use std::sync::Arc;

use async_trait::async_trait;

use crate::declaration::PostOutcome;
use crate::error::As3Result;

/// Remote AS3 control plane.
///
/// # Example
///
/// ```ignore
/// use as3_common::{ControlPlane, EventCode, PostOutcome, As3Result};
///
/// struct AlwaysBusy;
///
/// #[async_trait]
/// impl ControlPlane for AlwaysBusy {
///     async fn post_declaration(&self, _doc: &str, _tenants: &[String]) -> PostOutcome {
///         PostOutcome::failed(EventCode::ServiceUnavailable)
///     }
///
///     async fn query_version(&self) -> As3Result<(String, String)> {
///         Ok(("3.20.0".to_string(), "0.0.1".to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Posts a declaration document, optionally scoped to tenants.
    ///
    /// Implementations own the request timeout. Failures are reported
    /// through the returned outcome, never as an error.
    async fn post_declaration(&self, document: &str, tenants: &[String]) -> PostOutcome;

    /// Queries the AS3 extension version and build identifier.
    async fn query_version(&self) -> As3Result<(String, String)>;
}

#[async_trait]
impl<T: ControlPlane + ?Sized> ControlPlane for Arc<T> {
    async fn post_declaration(&self, document: &str, tenants: &[String]) -> PostOutcome {
        (**self).post_declaration(document, tenants).await
    }

    async fn query_version(&self) -> As3Result<(String, String)> {
        (**self).query_version().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::EventCode;

    struct FixedControlPlane;

    #[async_trait]
    impl ControlPlane for FixedControlPlane {
        async fn post_declaration(&self, document: &str, _tenants: &[String]) -> PostOutcome {
            if document.is_empty() {
                PostOutcome::failed(EventCode::ValidationFailed)
            } else {
                PostOutcome::accepted()
            }
        }

        async fn query_version(&self) -> As3Result<(String, String)> {
            Ok(("3.20.0".to_string(), "0.0.1".to_string()))
        }
    }

    #[tokio::test]
    async fn test_arc_forwards_calls() {
        let cp: Arc<dyn ControlPlane> = Arc::new(FixedControlPlane);

        assert!(cp.post_declaration("{}", &[]).await.accepted);
        assert_eq!(
            cp.post_declaration("", &[]).await.event,
            EventCode::ValidationFailed
        );

        let (version, build) = cp.query_version().await.unwrap();
        assert_eq!(version, "3.20.0");
        assert_eq!(build, "0.0.1");
    }
}
