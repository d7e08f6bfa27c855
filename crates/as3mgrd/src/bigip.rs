//! BIG-IP REST client implementing [`ControlPlane`].
//!
//! Posts declarations to the AS3 declare endpoint and reads the AS3 info
//! endpoint for the startup version check. HTTP status codes are mapped to
//! [`EventCode`]s here so the dispatcher only ever sees classified outcomes.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use as3_common::{As3Error, As3Result, ControlPlane, EventCode, PostOutcome};

/// AS3 declare endpoint.
pub const DECLARE_PATH: &str = "/mgmt/shared/appsvcs/declare";

/// AS3 info endpoint.
pub const INFO_PATH: &str = "/mgmt/shared/appsvcs/info";

/// Connection parameters for a BIG-IP.
#[derive(Clone)]
pub struct BigIpParams {
    /// Base URL, e.g. `https://10.0.0.1`.
    pub url: String,
    /// Management user.
    pub username: String,
    /// Management password.
    pub password: String,
    /// PEM bundle of extra trusted CA certificates.
    pub trusted_certs: Option<PathBuf>,
    /// Accept invalid server certificates.
    pub ssl_insecure: bool,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Log response bodies at debug level.
    pub log_response: bool,
    /// Base `User-Agent` value.
    pub user_agent: String,
}

#[derive(Debug, Deserialize)]
struct AppServicesInfo {
    version: String,
    release: String,
}

/// Maps an AS3 response status to an event code.
pub fn classify_status(status: StatusCode) -> EventCode {
    match status {
        StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED => EventCode::Ok,
        StatusCode::BAD_REQUEST => EventCode::ValidationFailed,
        StatusCode::NOT_FOUND => EventCode::NotFound,
        StatusCode::UNPROCESSABLE_ENTITY => EventCode::UnprocessableEntity,
        StatusCode::SERVICE_UNAVAILABLE => EventCode::ServiceUnavailable,
        _ => EventCode::TransientError,
    }
}

/// REST client for the AS3 extension on a BIG-IP.
pub struct BigIpClient {
    http: reqwest::Client,
    url: String,
    username: String,
    password: String,
    log_response: bool,
    base_user_agent: String,
    user_agent: RwLock<String>,
}

impl std::fmt::Debug for BigIpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BigIpClient")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("log_response", &self.log_response)
            .finish_non_exhaustive()
    }
}

impl BigIpClient {
    /// Builds the HTTP client.
    ///
    /// # Errors
    ///
    /// Fails if the trusted certificate bundle cannot be read or parsed, or
    /// if the TLS backend cannot be initialised.
    pub fn new(params: BigIpParams) -> As3Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(params.request_timeout)
            .danger_accept_invalid_certs(params.ssl_insecure);

        if let Some(path) = &params.trusted_certs {
            let pem = fs::read(path)?;
            let certs = reqwest::Certificate::from_pem_bundle(&pem).map_err(|e| {
                As3Error::invalid_config("bigip.trusted_certs", e.to_string())
            })?;
            for cert in certs {
                builder = builder.add_root_certificate(cert);
            }
        }

        let http = builder
            .build()
            .map_err(|e| As3Error::internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: params.url.trim_end_matches('/').to_string(),
            username: params.username,
            password: params.password,
            log_response: params.log_response,
            user_agent: RwLock::new(params.user_agent.clone()),
            base_user_agent: params.user_agent,
        })
    }

    /// Tags outbound requests with the AS3 release resolved at startup.
    pub fn set_release(&self, release: &str) {
        *self.user_agent.write() = format!("{};AS3/{}", self.base_user_agent, release);
    }

    /// Returns the current `User-Agent` value.
    pub fn user_agent(&self) -> String {
        self.user_agent.read().clone()
    }

    /// Builds the declare URL, adding a tenant filter when one is given.
    pub fn declare_url(&self, tenants: &[String]) -> String {
        let tenants: Vec<&str> = tenants
            .iter()
            .map(String::as_str)
            .filter(|t| !t.is_empty())
            .collect();

        if tenants.is_empty() {
            format!("{}{}", self.url, DECLARE_PATH)
        } else {
            format!("{}{}/{}", self.url, DECLARE_PATH, tenants.join(","))
        }
    }

    fn info_url(&self) -> String {
        format!("{}{}", self.url, INFO_PATH)
    }
}

#[async_trait]
impl ControlPlane for BigIpClient {
    async fn post_declaration(&self, document: &str, tenants: &[String]) -> PostOutcome {
        let url = self.declare_url(tenants);
        debug!(url = %url, "Posting AS3 declaration");

        let response = match self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header(USER_AGENT, self.user_agent())
            .header(CONTENT_TYPE, "application/json")
            .body(document.to_string())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(url = %url, error = %e, "AS3 post request failed");
                return PostOutcome::failed(EventCode::TransientError);
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if self.log_response {
            debug!(status = %status, body = %body, "AS3 response");
        }

        match classify_status(status) {
            EventCode::Ok => {
                info!(status = %status, "AS3 declaration posted");
                PostOutcome::accepted()
            }
            event => {
                warn!(status = %status, event = %event, "AS3 declaration rejected");
                PostOutcome::failed(event)
            }
        }
    }

    async fn query_version(&self) -> As3Result<(String, String)> {
        let response = self
            .http
            .get(self.info_url())
            .basic_auth(&self.username, Some(&self.password))
            .header(USER_AGENT, self.user_agent())
            .send()
            .await
            .map_err(|e| As3Error::control_plane("query_version", e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(As3Error::control_plane(
                "query_version",
                "AS3 RPM is not installed on BIG-IP",
            ));
        }
        if !status.is_success() {
            return Err(As3Error::control_plane(
                "query_version",
                format!("unexpected status {}", status),
            ));
        }

        let info: AppServicesInfo = response
            .json()
            .await
            .map_err(|e| As3Error::control_plane("query_version", e.to_string()))?;

        Ok((info.version, info.release))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn params() -> BigIpParams {
        BigIpParams {
            url: "https://10.0.0.1/".to_string(),
            username: "admin".to_string(),
            password: "secret".to_string(),
            trusted_certs: None,
            ssl_insecure: true,
            request_timeout: Duration::from_secs(5),
            log_response: false,
            user_agent: "as3mgrd".to_string(),
        }
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(StatusCode::OK), EventCode::Ok);
        assert_eq!(classify_status(StatusCode::ACCEPTED), EventCode::Ok);
        assert_eq!(
            classify_status(StatusCode::BAD_REQUEST),
            EventCode::ValidationFailed
        );
        assert_eq!(classify_status(StatusCode::NOT_FOUND), EventCode::NotFound);
        assert_eq!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY),
            EventCode::UnprocessableEntity
        );
        assert_eq!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE),
            EventCode::ServiceUnavailable
        );
        assert_eq!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            EventCode::TransientError
        );
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            EventCode::TransientError
        );
    }

    #[test]
    fn test_declare_url() {
        let client = BigIpClient::new(params()).unwrap();

        assert_eq!(
            client.declare_url(&[]),
            "https://10.0.0.1/mgmt/shared/appsvcs/declare"
        );
        assert_eq!(
            client.declare_url(&["".to_string()]),
            "https://10.0.0.1/mgmt/shared/appsvcs/declare"
        );
        assert_eq!(
            client.declare_url(&["tenant_a".to_string(), "tenant_b".to_string()]),
            "https://10.0.0.1/mgmt/shared/appsvcs/declare/tenant_a,tenant_b"
        );
        assert_eq!(client.info_url(), "https://10.0.0.1/mgmt/shared/appsvcs/info");
    }

    #[test]
    fn test_release_in_user_agent() {
        let client = BigIpClient::new(params()).unwrap();
        assert_eq!(client.user_agent(), "as3mgrd");

        client.set_release("3.20.0-0.0.1");
        assert_eq!(client.user_agent(), "as3mgrd;AS3/3.20.0-0.0.1");
    }

    #[test]
    fn test_unreadable_trusted_certs() {
        let mut p = params();
        p.trusted_certs = Some(PathBuf::from("/nonexistent/ca.pem"));

        assert!(matches!(BigIpClient::new(p), Err(As3Error::Io(_))));
    }

    #[tokio::test]
    async fn test_unreachable_bigip_is_transient() {
        let mut p = params();
        // Nothing listens on the discard port
        p.url = "http://127.0.0.1:9".to_string();
        p.request_timeout = Duration::from_secs(2);
        let client = BigIpClient::new(p).unwrap();

        let outcome = client.post_declaration("{}", &[]).await;
        assert_eq!(outcome, PostOutcome::failed(EventCode::TransientError));
        assert!(client.query_version().await.is_err());
    }
}
