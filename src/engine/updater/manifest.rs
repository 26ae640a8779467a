//! Remote Manifest
//!
//! The manifest endpoint answers with `{latestVersion, sourceURL?}`. Older
//! servers use `last` and `source`; both spellings are accepted. The body may
//! arrive as structured JSON or as text that still needs parsing.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::transport::Payload;

/// Manifest parse failures, all reported as `ApiResponseNotValid`
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("empty response body")]
    Empty,
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response is not valid UTF-8")]
    Encoding,
    #[error("response is not an object")]
    NotAnObject,
    #[error("response has no latestVersion")]
    MissingLatestVersion,
}

/// What the server says about the latest release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteManifest {
    #[serde(rename = "latestVersion", alias = "last")]
    pub latest_version: String,
    /// Present only when the server offers an update
    #[serde(rename = "sourceURL", alias = "source", default)]
    pub source_url: Option<String>,
}

impl RemoteManifest {
    /// Parse a manifest from whatever shape the transport decoded
    pub fn from_payload(payload: &Payload) -> Result<Self, ManifestError> {
        match payload {
            Payload::Json(value) => Self::from_value(value, true),
            Payload::Text(text) => Self::from_text(text),
            Payload::Bytes(bytes) => {
                let text = std::str::from_utf8(bytes).map_err(|_| ManifestError::Encoding)?;
                Self::from_text(text)
            }
        }
    }

    /// True when the server offers a download
    pub fn has_update(&self) -> bool {
        self.source_url.is_some()
    }

    fn from_text(text: &str) -> Result<Self, ManifestError> {
        if text.trim().is_empty() {
            return Err(ManifestError::Empty);
        }
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value, true)
    }

    // A JSON string value is unwrapped once: some servers double-encode.
    fn from_value(value: &Value, unwrap_string: bool) -> Result<Self, ManifestError> {
        let object = match value {
            Value::Object(object) => object,
            Value::String(inner) if unwrap_string => {
                if inner.trim().is_empty() {
                    return Err(ManifestError::Empty);
                }
                let parsed: Value = serde_json::from_str(inner)?;
                return Self::from_value(&parsed, false);
            }
            Value::Null => return Err(ManifestError::Empty),
            _ => return Err(ManifestError::NotAnObject),
        };

        let latest_version = ["latestVersion", "last"]
            .iter()
            .find_map(|key| object.get(*key).and_then(non_empty_scalar))
            .ok_or(ManifestError::MissingLatestVersion)?;

        let source_url = ["sourceURL", "source"]
            .iter()
            .find_map(|key| object.get(*key).and_then(non_empty_scalar));

        Ok(Self {
            latest_version,
            source_url,
        })
    }
}

/// A manifest field is present only when it holds a usable scalar:
/// a string that is non-empty after trimming, or a number (`2` becomes "2").
/// `true`/`false`, `null`, arrays and objects count as absent, so
/// `{"sourceURL": true}` offers no update and `{"latestVersion": true}` is
/// rejected as missing its version.
fn non_empty_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structured_and_text_bodies_agree() {
        let body = json!({"latestVersion": "1.2.0", "sourceURL": "https://x/update.pkg"});
        let structured = RemoteManifest::from_payload(&Payload::Json(body.clone())).unwrap();
        let text = RemoteManifest::from_payload(&Payload::Text(body.to_string())).unwrap();
        let encoded = RemoteManifest::from_payload(&Payload::Json(Value::String(body.to_string())))
            .unwrap();

        assert_eq!(structured, text);
        assert_eq!(structured, encoded);
        assert_eq!(structured.latest_version, "1.2.0");
        assert!(structured.has_update());
    }

    #[test]
    fn test_legacy_field_names() {
        let body = r#"{"last": "2.0.0", "source": "https://x/app.asar"}"#;
        let manifest = RemoteManifest::from_payload(&Payload::Text(body.to_string())).unwrap();
        assert_eq!(manifest.latest_version, "2.0.0");
        assert_eq!(manifest.source_url.as_deref(), Some("https://x/app.asar"));
    }

    #[test]
    fn test_missing_source_means_no_update() {
        let manifest =
            RemoteManifest::from_payload(&Payload::Json(json!({"latestVersion": "9.9.9"}))).unwrap();
        assert!(!manifest.has_update());

        let manifest = RemoteManifest::from_payload(&Payload::Json(
            json!({"latestVersion": "9.9.9", "sourceURL": ""}),
        ))
        .unwrap();
        assert!(!manifest.has_update());
    }

    #[test]
    fn test_non_scalar_fields_are_absent() {
        for source in [json!(true), json!({"url": "https://x"}), json!(["https://x"]), json!("  ")] {
            let manifest = RemoteManifest::from_payload(&Payload::Json(
                json!({"latestVersion": "1.2.0", "sourceURL": source}),
            ))
            .unwrap();
            assert!(!manifest.has_update(), "sourceURL {:?} offered an update", source);
        }

        let manifest =
            RemoteManifest::from_payload(&Payload::Json(json!({"latestVersion": 2}))).unwrap();
        assert_eq!(manifest.latest_version, "2");

        for latest in [json!(true), json!(false), json!({"v": "1"})] {
            let err = RemoteManifest::from_payload(&Payload::Json(json!({"latestVersion": latest})))
                .unwrap_err();
            assert!(matches!(err, ManifestError::MissingLatestVersion));
        }
    }

    #[test]
    fn test_invalid_bodies() {
        let cases = [
            Payload::Text(String::new()),
            Payload::Text("not json".to_string()),
            Payload::Json(json!({"sourceURL": "https://x"})),
            Payload::Json(json!({"latestVersion": ""})),
            Payload::Json(json!([1, 2, 3])),
            Payload::Json(Value::Null),
            Payload::Bytes(vec![0xff, 0xfe]),
        ];
        for payload in cases {
            assert!(
                RemoteManifest::from_payload(&payload).is_err(),
                "expected failure for {:?}",
                payload
            );
        }
    }

    #[test]
    fn test_serde_round_trip_uses_wire_names() {
        let manifest = RemoteManifest {
            latest_version: "1.0.1".to_string(),
            source_url: None,
        };
        let value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(value["latestVersion"], "1.0.1");
    }
}
