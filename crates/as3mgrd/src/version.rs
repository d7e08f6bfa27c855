//! AS3 version compatibility check.
//!
//! Runs once at startup. Posting is only allowed against control planes
//! serving AS3 [`AS3_SUPPORTED_VERSION`] or newer.

use tracing::{debug, error, info};

use as3_common::{As3Error, As3Result, ControlPlane, ControlPlaneInfo};

/// Minimum supported AS3 version.
pub const AS3_SUPPORTED_VERSION: f64 = 3.20;

/// Parses the numeric part of an AS3 version string.
///
/// The last `.` segment is dropped, so `"3.20.0"` becomes `3.20`. Only
/// finite numbers are accepted.
pub fn parse_version(version: &str) -> As3Result<f64> {
    let (numeric, _) = version
        .rsplit_once('.')
        .ok_or_else(|| As3Error::version_parse(version, "missing '.' separator"))?;

    let parsed = numeric
        .parse::<f64>()
        .map_err(|e| As3Error::version_parse(version, e.to_string()))?;
    if !parsed.is_finite() {
        return Err(As3Error::version_parse(version, "not a finite number"));
    }
    Ok(parsed)
}

/// Queries the control plane and verifies its AS3 version is supported.
///
/// On success the resolved version, build and release strings are returned
/// for use in outbound request metadata.
///
/// # Errors
///
/// - the version query itself fails
/// - [`As3Error::VersionParse`] if the version string is malformed
/// - [`As3Error::IncompatibleVersion`] if the version is below the minimum
pub async fn check_version<C>(control_plane: &C) -> As3Result<ControlPlaneInfo>
where
    C: ControlPlane + ?Sized,
{
    let (version, build) = control_plane.query_version().await.map_err(|e| {
        error!(error = %e, "Failed to query AS3 version");
        e
    })?;

    let numeric = parse_version(&version).map_err(|e| {
        error!(version = %version, "Error while converting AS3 version to float");
        e
    })?;

    if numeric < AS3_SUPPORTED_VERSION {
        return Err(As3Error::IncompatibleVersion {
            found: numeric,
            required: AS3_SUPPORTED_VERSION,
        });
    }

    let info = ControlPlaneInfo::new(version, build);
    debug!(release = %info.release, "Resolved AS3 release");
    info!(version = %info.version, "BIG-IP is serving AS3");
    Ok(info)
}
