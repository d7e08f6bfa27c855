//! Verification helpers for dispatch tests
//!
//! Assertions over the posts a [`ScriptedControlPlane`] recorded.

use as3_common::Declaration;
use thiserror::Error;

use crate::ScriptedControlPlane;

/// Verification error types
#[derive(Error, Debug, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Expected {expected} posts, found {actual}")]
    PostCountMismatch { expected: usize, actual: usize },

    #[error("Post #{index} mismatch: expected '{expected}', got '{actual}'")]
    BodyMismatch {
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("Post #{index} tenants mismatch: expected {expected:?}, got {actual:?}")]
    TenantMismatch {
        index: usize,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Declaration was posted but should not have been: '{body}'")]
    UnexpectedPost { body: String },

    #[error("No declaration has been posted")]
    NothingPosted,
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Verify exactly `expected` posts were made
pub fn assert_post_count(cp: &ScriptedControlPlane, expected: usize) -> VerifyResult<()> {
    let actual = cp.post_count();
    if actual != expected {
        return Err(VerificationError::PostCountMismatch { expected, actual });
    }
    Ok(())
}

/// Verify the recorded posts are exactly `expected`, in order, including
/// their tenant scope
pub fn assert_posted_in_order(
    cp: &ScriptedControlPlane,
    expected: &[&Declaration],
) -> VerifyResult<()> {
    let posts = cp.posts();
    if posts.len() != expected.len() {
        return Err(VerificationError::PostCountMismatch {
            expected: expected.len(),
            actual: posts.len(),
        });
    }

    for (index, (post, want)) in posts.iter().zip(expected).enumerate() {
        if post.document != want.body {
            return Err(VerificationError::BodyMismatch {
                index,
                expected: want.body.clone(),
                actual: post.document.clone(),
            });
        }
        if post.tenants != want.tenants {
            return Err(VerificationError::TenantMismatch {
                index,
                expected: want.tenants.clone(),
                actual: post.tenants.clone(),
            });
        }
    }

    Ok(())
}

/// Verify `declaration` was never sent
pub fn assert_never_posted(
    cp: &ScriptedControlPlane,
    declaration: &Declaration,
) -> VerifyResult<()> {
    if cp.posted_bodies().iter().any(|b| *b == declaration.body) {
        return Err(VerificationError::UnexpectedPost {
            body: declaration.body.clone(),
        });
    }
    Ok(())
}

/// Verify the most recent post carried `declaration`
pub fn assert_last_posted(
    cp: &ScriptedControlPlane,
    declaration: &Declaration,
) -> VerifyResult<()> {
    match cp.posted_bodies().pop() {
        None => Err(VerificationError::NothingPosted),
        Some(body) if body == declaration.body => Ok(()),
        Some(body) => Err(VerificationError::BodyMismatch {
            index: cp.post_count() - 1,
            expected: declaration.body.clone(),
            actual: body,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use as3_common::ControlPlane;

    #[tokio::test]
    async fn test_posted_in_order() {
        let cp = ScriptedControlPlane::new();
        let d1 = fixtures::declaration("tenant_a", 80);
        let d2 = fixtures::declaration("tenant_a", 443);

        cp.post_declaration(&d1.body, &d1.tenants).await;
        cp.post_declaration(&d2.body, &d2.tenants).await;

        assert!(assert_posted_in_order(&cp, &[&d1, &d2]).is_ok());
        assert!(matches!(
            assert_posted_in_order(&cp, &[&d2, &d1]),
            Err(VerificationError::BodyMismatch { index: 0, .. })
        ));
        assert_eq!(
            assert_posted_in_order(&cp, &[&d1]),
            Err(VerificationError::PostCountMismatch {
                expected: 1,
                actual: 2
            })
        );
    }

    #[tokio::test]
    async fn test_tenant_mismatch() {
        let cp = ScriptedControlPlane::new();
        let d1 = fixtures::declaration("tenant_a", 80);
        cp.post_declaration(&d1.body, &[]).await;

        assert!(matches!(
            assert_posted_in_order(&cp, &[&d1]),
            Err(VerificationError::TenantMismatch { index: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_never_and_last_posted() {
        let cp = ScriptedControlPlane::new();
        let d1 = fixtures::declaration("tenant_a", 80);
        let d2 = fixtures::declaration("tenant_b", 80);

        assert_eq!(
            assert_last_posted(&cp, &d1),
            Err(VerificationError::NothingPosted)
        );

        cp.post_declaration(&d1.body, &d1.tenants).await;
        assert!(assert_never_posted(&cp, &d2).is_ok());
        assert!(assert_never_posted(&cp, &d1).is_err());
        assert!(assert_last_posted(&cp, &d1).is_ok());
        assert!(assert_post_count(&cp, 1).is_ok());
    }
}
