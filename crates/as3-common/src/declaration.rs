//! Declaration, post outcome and control plane metadata types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A serialized AS3 declaration plus the metadata needed to post it.
///
/// Declarations are immutable values once submitted; the dispatcher clones
/// them rather than editing them in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    /// The JSON document.
    pub body: String,
    /// Tenants the post is scoped to. Empty means the whole declaration.
    #[serde(default)]
    pub tenants: Vec<String>,
    /// AS3 schema version the document was rendered for.
    #[serde(default)]
    pub schema_version: String,
}

impl Declaration {
    /// Creates a declaration for the given document with no tenant scope.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            tenants: Vec::new(),
            schema_version: String::new(),
        }
    }

    /// Scopes the declaration to the given tenants.
    pub fn with_tenants<I, S>(mut self, tenants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tenants = tenants.into_iter().map(Into::into).collect();
        self
    }

    /// Records the schema version the document targets.
    pub fn with_schema_version(mut self, version: impl Into<String>) -> Self {
        self.schema_version = version.into();
        self
    }

    /// Returns true if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Classified result of a post attempt, used to select a retry timeout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventCode {
    /// The declaration was accepted.
    Ok,
    /// The control plane rejected the document structure.
    ValidationFailed,
    /// The control plane rejected the semantic content (HTTP 422).
    UnprocessableEntity,
    /// The control plane is busy or unhealthy (HTTP 503).
    ServiceUnavailable,
    /// The AS3 endpoint was not found (HTTP 404).
    NotFound,
    /// Network failure or any other error response.
    TransientError,
    /// An event code this agent does not know about.
    Unknown(String),
}

impl EventCode {
    /// Returns the wire name of the event.
    pub fn as_str(&self) -> &str {
        match self {
            EventCode::Ok => "statusOK",
            EventCode::ValidationFailed => "statusValidationFailed",
            EventCode::UnprocessableEntity => "statusUnprocessableEntity",
            EventCode::ServiceUnavailable => "statusServiceUnavailable",
            EventCode::NotFound => "statusNotFound",
            EventCode::TransientError => "statusCommonResponse",
            EventCode::Unknown(code) => code,
        }
    }

    /// Parses a wire name. Unrecognised names map to [`EventCode::Unknown`].
    pub fn from_code(code: &str) -> Self {
        match code {
            "statusOK" => EventCode::Ok,
            "statusValidationFailed" => EventCode::ValidationFailed,
            "statusUnprocessableEntity" => EventCode::UnprocessableEntity,
            "statusServiceUnavailable" => EventCode::ServiceUnavailable,
            "statusNotFound" => EventCode::NotFound,
            "statusCommonResponse" => EventCode::TransientError,
            other => EventCode::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one post attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostOutcome {
    /// True if the control plane accepted the declaration.
    pub accepted: bool,
    /// Classified event for the attempt.
    pub event: EventCode,
}

impl PostOutcome {
    /// An accepted post.
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            event: EventCode::Ok,
        }
    }

    /// A failed post with the given event.
    pub fn failed(event: EventCode) -> Self {
        Self {
            accepted: false,
            event,
        }
    }
}

/// Control plane version details resolved at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlPlaneInfo {
    /// AS3 extension version (e.g., "3.20.0").
    pub version: String,
    /// AS3 build identifier (e.g., "0.0.1").
    pub build: String,
    /// Combined release string, `{version}-{build}`.
    pub release: String,
}

impl ControlPlaneInfo {
    /// Builds the info record, deriving the release string.
    pub fn new(version: impl Into<String>, build: impl Into<String>) -> Self {
        let version = version.into();
        let build = build.into();
        let release = format!("{}-{}", version, build);
        Self {
            version,
            build,
            release,
        }
    }
}

/// Emitted on the notification sink after a declaration is accepted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostNotification {
    /// Tenants the accepted post was scoped to.
    pub tenants: Vec<String>,
    /// Schema version of the accepted declaration.
    pub schema_version: String,
    /// Time the control plane acknowledged the post.
    pub posted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_declaration_builder() {
        let decl = Declaration::new("{}")
            .with_tenants(["tenant_a", "tenant_b"])
            .with_schema_version("3.20.0");

        assert_eq!(decl.body, "{}");
        assert_eq!(decl.tenants, vec!["tenant_a", "tenant_b"]);
        assert_eq!(decl.schema_version, "3.20.0");
        assert!(!decl.is_empty());
        assert!(Declaration::default().is_empty());
    }

    #[test]
    fn test_event_code_names() {
        for event in [
            EventCode::Ok,
            EventCode::ValidationFailed,
            EventCode::UnprocessableEntity,
            EventCode::ServiceUnavailable,
            EventCode::NotFound,
            EventCode::TransientError,
        ] {
            assert_eq!(EventCode::from_code(event.as_str()), event);
        }

        assert_eq!(
            EventCode::from_code("statusTeapot"),
            EventCode::Unknown("statusTeapot".to_string())
        );
        assert_eq!(EventCode::UnprocessableEntity.to_string(), "statusUnprocessableEntity");
    }

    #[test]
    fn test_post_outcome() {
        assert!(PostOutcome::accepted().accepted);
        assert_eq!(PostOutcome::accepted().event, EventCode::Ok);

        let failed = PostOutcome::failed(EventCode::ServiceUnavailable);
        assert!(!failed.accepted);
        assert_eq!(failed.event, EventCode::ServiceUnavailable);
    }

    #[test]
    fn test_control_plane_info_release() {
        let info = ControlPlaneInfo::new("3.20.0", "0.0.1");
        assert_eq!(info.release, "3.20.0-0.0.1");
    }
}
