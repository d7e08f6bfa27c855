//! Test fixtures for AS3 declarations
//!
//! Declarations are small but structurally real: one tenant holding one
//! HTTP application whose virtual port varies, so tests can build distinct
//! desired states cheaply.

use as3_common::Declaration;
use serde_json::{json, Value};

/// Schema version stamped on every fixture declaration.
pub const SCHEMA_VERSION: &str = "3.20.0";

/// A declaration for `tenant` with one service listening on `port`.
pub fn declaration(tenant: &str, port: u16) -> Declaration {
    let body = json!({
        "class": "AS3",
        "action": "deploy",
        "persist": true,
        "declaration": {
            "class": "ADC",
            "schemaVersion": SCHEMA_VERSION,
            "id": "as3mgrd",
            tenant: {
                "class": "Tenant",
                "app": {
                    "class": "Application",
                    "template": "http",
                    "serviceMain": {
                        "class": "Service_HTTP",
                        "virtualAddresses": ["10.1.10.10"],
                        "virtualPort": port,
                        "pool": "web_pool"
                    },
                    "web_pool": {
                        "class": "Pool",
                        "monitors": ["http"],
                        "members": [{
                            "servicePort": 8080,
                            "serverAddresses": ["10.1.20.10", "10.1.20.11"]
                        }]
                    }
                }
            }
        }
    });

    Declaration::new(body.to_string())
        .with_tenants([tenant])
        .with_schema_version(SCHEMA_VERSION)
}

/// The same content as [`declaration`] with keys in a different order and
/// pretty-printed whitespace. Equal by value, different by bytes.
pub fn declaration_reordered(tenant: &str, port: u16) -> Declaration {
    let body = format!(
        r#"{{
  "declaration": {{
    "{tenant}": {{
      "app": {{
        "web_pool": {{
          "members": [
            {{ "serverAddresses": ["10.1.20.10", "10.1.20.11"], "servicePort": 8080 }}
          ],
          "monitors": ["http"],
          "class": "Pool"
        }},
        "serviceMain": {{
          "pool": "web_pool",
          "virtualPort": {port},
          "virtualAddresses": ["10.1.10.10"],
          "class": "Service_HTTP"
        }},
        "template": "http",
        "class": "Application"
      }},
      "class": "Tenant"
    }},
    "id": "as3mgrd",
    "schemaVersion": "{version}",
    "class": "ADC"
  }},
  "persist": true,
  "action": "deploy",
  "class": "AS3"
}}"#,
        tenant = tenant,
        port = port,
        version = SCHEMA_VERSION,
    );

    Declaration::new(body)
        .with_tenants([tenant])
        .with_schema_version(SCHEMA_VERSION)
}

/// A declaration whose document is not JSON at all.
pub fn malformed_declaration() -> Declaration {
    Declaration::new(r#"{"class": "AS3", "declaration": "#)
}

/// A reduced AS3 schema: requires the AS3 envelope around an ADC
/// declaration carrying a schema version.
pub fn as3_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "required": ["class", "declaration"],
        "properties": {
            "class": { "const": "AS3" },
            "action": { "enum": ["deploy", "dry-run", "patch", "redeploy", "retrieve", "remove"] },
            "persist": { "type": "boolean" },
            "declaration": {
                "type": "object",
                "required": ["class", "schemaVersion"],
                "properties": {
                    "class": { "const": "ADC" },
                    "schemaVersion": {
                        "type": "string",
                        "pattern": "^[0-9]+\\.[0-9]+\\.[0-9]+$"
                    },
                    "id": { "type": "string" }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_declaration_metadata() {
        let d = declaration("tenant_a", 80);
        assert_eq!(d.tenants, vec!["tenant_a"]);
        assert_eq!(d.schema_version, SCHEMA_VERSION);

        let value: Value = serde_json::from_str(&d.body).unwrap();
        assert_eq!(
            value.pointer("/declaration/tenant_a/app/serviceMain/virtualPort"),
            Some(&json!(80))
        );
    }

    #[test]
    fn test_reordered_is_same_value() {
        let a = declaration("tenant_a", 443);
        let b = declaration_reordered("tenant_a", 443);

        assert_ne!(a.body, b.body);
        let va: Value = serde_json::from_str(&a.body).unwrap();
        let vb: Value = serde_json::from_str(&b.body).unwrap();
        assert_eq!(va, vb);
    }

    #[test]
    fn test_ports_differ() {
        assert_ne!(declaration("tenant_a", 80), declaration("tenant_a", 8080));
    }

    #[test]
    fn test_malformed_is_not_json() {
        assert!(serde_json::from_str::<Value>(&malformed_declaration().body).is_err());
    }
}
