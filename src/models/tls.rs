//! TLS security profiles
//!
//! Mirrors the `tlsSecurityProfile` field of the cluster `APIServer`
//! configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const VERSION_TLS10: &str = "VersionTLS10";
pub const VERSION_TLS12: &str = "VersionTLS12";
pub const VERSION_TLS13: &str = "VersionTLS13";

/// Cipher suites the Modern profile must propagate
pub const MODERN_CIPHERS: [&str; 3] = [
    "TLS_AES_128_GCM_SHA256",
    "TLS_AES_256_GCM_SHA384",
    "TLS_CHACHA20_POLY1305_SHA256",
];

/// Members of the profile union; at most one is set, matching `type`
const UNION_MEMBERS: [&str; 4] = ["old", "intermediate", "modern", "custom"];

/// Predefined profile types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum TlsProfileType {
    Old,
    Intermediate,
    Modern,
    Custom,
}

impl TlsProfileType {
    /// Minimum TLS version of a predefined profile
    pub fn min_tls_version(&self) -> Option<&'static str> {
        match self {
            TlsProfileType::Old => Some(VERSION_TLS10),
            TlsProfileType::Intermediate => Some(VERSION_TLS12),
            TlsProfileType::Modern => Some(VERSION_TLS13),
            TlsProfileType::Custom => None,
        }
    }
}

impl fmt::Display for TlsProfileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsProfileType::Old => write!(f, "Old"),
            TlsProfileType::Intermediate => write!(f, "Intermediate"),
            TlsProfileType::Modern => write!(f, "Modern"),
            TlsProfileType::Custom => write!(f, "Custom"),
        }
    }
}

/// Marker for predefined profiles, serialized as `{}`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PredefinedProfile {}

/// User-defined profile settings
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CustomTlsProfile {
    #[serde(default)]
    pub ciphers: Vec<String>,

    #[serde(
        rename = "minTLSVersion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub min_tls_version: Option<String>,
}

/// APIServer TLS security profile
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TlsSecurityProfile {
    #[serde(rename = "type")]
    pub type_: TlsProfileType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<PredefinedProfile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate: Option<PredefinedProfile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modern: Option<PredefinedProfile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomTlsProfile>,
}

impl TlsSecurityProfile {
    fn predefined(type_: TlsProfileType) -> Self {
        Self {
            type_,
            old: (type_ == TlsProfileType::Old).then(PredefinedProfile::default),
            intermediate: (type_ == TlsProfileType::Intermediate).then(PredefinedProfile::default),
            modern: (type_ == TlsProfileType::Modern).then(PredefinedProfile::default),
            custom: None,
        }
    }

    pub fn old() -> Self {
        Self::predefined(TlsProfileType::Old)
    }

    #[cfg(test)]
    pub fn intermediate() -> Self {
        Self::predefined(TlsProfileType::Intermediate)
    }

    pub fn modern() -> Self {
        Self::predefined(TlsProfileType::Modern)
    }

    /// JSON merge patch that replaces a stored profile with this one
    ///
    /// Union members this profile leaves unset are written as `null` so that
    /// a merge removes whatever member the stored profile had.
    pub fn to_merge_patch(&self) -> serde_json::Result<Value> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            for member in UNION_MEMBERS {
                map.entry(member).or_insert(Value::Null);
            }
            if let Some(Value::Object(custom)) = map.get_mut("custom") {
                custom.entry("minTLSVersion").or_insert(Value::Null);
            }
        }
        Ok(value)
    }

    /// Minimum TLS version this profile asks for
    pub fn min_tls_version(&self) -> Option<&str> {
        match self.type_ {
            TlsProfileType::Custom => self
                .custom
                .as_ref()
                .and_then(|c| c.min_tls_version.as_deref()),
            other => other.min_tls_version(),
        }
    }
}

impl fmt::Display for TlsSecurityProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_)?;
        if let Some(version) = self.min_tls_version() {
            write!(f, " ({version})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_modern_wire_shape() {
        let value = serde_json::to_value(TlsSecurityProfile::modern()).unwrap();
        assert_eq!(value, json!({"type": "Modern", "modern": {}}));
    }

    #[test]
    fn test_merge_patch_clears_other_members() {
        let patch = TlsSecurityProfile::modern().to_merge_patch().unwrap();
        assert_eq!(
            patch,
            json!({
                "type": "Modern",
                "old": null,
                "intermediate": null,
                "modern": {},
                "custom": null
            })
        );

        let custom = TlsSecurityProfile {
            type_: TlsProfileType::Custom,
            old: None,
            intermediate: None,
            modern: None,
            custom: Some(CustomTlsProfile {
                ciphers: vec!["TLS_AES_128_GCM_SHA256".to_string()],
                min_tls_version: None,
            }),
        };
        let patch = custom.to_merge_patch().unwrap();
        assert_eq!(
            patch["custom"],
            json!({"ciphers": ["TLS_AES_128_GCM_SHA256"], "minTLSVersion": null})
        );
        assert_eq!(patch["modern"], Value::Null);
    }

    #[test]
    fn test_custom_profile() {
        let parsed: TlsSecurityProfile = serde_json::from_value(json!({
            "type": "Custom",
            "custom": {"ciphers": ["ECDHE-RSA-AES128-GCM-SHA256"], "minTLSVersion": "VersionTLS11"}
        }))
        .unwrap();

        assert_eq!(parsed.type_, TlsProfileType::Custom);
        assert_eq!(parsed.min_tls_version(), Some("VersionTLS11"));
    }

    #[test]
    fn test_min_versions() {
        assert_eq!(TlsSecurityProfile::old().min_tls_version(), Some(VERSION_TLS10));
        assert_eq!(
            TlsSecurityProfile::intermediate().min_tls_version(),
            Some(VERSION_TLS12)
        );
        assert_eq!(TlsSecurityProfile::modern().to_string(), "Modern (VersionTLS13)");
    }
}
