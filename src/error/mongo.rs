use std::fmt;

use mongodb::bson::{Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use serde::{Deserialize, Serialize};

/// Structured view of a MongoDB driver error.
///
/// Serialized to JSON when a [`MongoCurryError::MongoDb`](super::MongoCurryError)
/// is displayed, so logs carry the server code and key details instead of
/// the driver's nested debug output.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

/// Namespace and key information pulled from a write error's details document.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Document>,
}

impl ErrorInfo {
    /// Build from a driver error.
    pub fn from_mongodb_error(error: &mongodb::error::Error) -> Self {
        extract_error_info(error)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Single-line JSON, suitable for log fields.
    pub fn to_json_compact(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    fn with_code(mut self, code: i32, message: &str) -> Self {
        self.code = Some(code);
        self.name = error_name(code).map(str::to_string);
        self.message = Some(message.to_string());
        self
    }
}

/// Write a driver error as `{"error": {...}}` JSON.
pub fn format_mongodb_error(
    f: &mut fmt::Formatter<'_>,
    error: &mongodb::error::Error,
) -> fmt::Result {
    let wrapper = serde_json::json!({ "error": extract_error_info(error) });
    let json_output = serde_json::to_string_pretty(&wrapper).map_err(|_| fmt::Error)?;
    write!(f, "{json_output}")
}

/// Extract structured information using the driver's typed error kinds.
pub fn extract_error_info(error: &mongodb::error::Error) -> ErrorInfo {
    let info = match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            let mut info = typed("mongo.write_error")
                .with_code(write_error.code, &write_error.message);
            info.details = write_error.details.as_ref().map(details_from);
            info
        }
        ErrorKind::Write(WriteFailure::WriteConcernError(wc_error)) => {
            typed("mongo.write_concern_error").with_code(wc_error.code, &wc_error.message)
        }
        ErrorKind::Command(command_error) => {
            typed("mongo.command_error").with_code(command_error.code, &command_error.message)
        }
        ErrorKind::InsertMany(insert_error) => {
            let info = typed("mongo.insert_many_error");
            match (&insert_error.write_errors, &insert_error.write_concern_error) {
                (Some(errors), _) if !errors.is_empty() => {
                    let first = &errors[0];
                    let mut info = info.with_code(first.code, &first.message);
                    info.details = first.details.as_ref().map(details_from);
                    info
                }
                (_, Some(wc_error)) => info.with_code(wc_error.code, &wc_error.message),
                _ => ErrorInfo {
                    message: Some(error.to_string()),
                    ..info
                },
            }
        }
        ErrorKind::Authentication { message, .. } => ErrorInfo {
            message: Some(message.clone()),
            ..typed("mongo.authentication_error")
        },
        ErrorKind::InvalidArgument { message, .. } => ErrorInfo {
            message: Some(message.clone()),
            ..typed("mongo.invalid_argument")
        },
        ErrorKind::ServerSelection { message, .. } => ErrorInfo {
            message: Some(message.clone()),
            ..typed("mongo.server_selection_error")
        },
        _ => ErrorInfo {
            message: Some(error.to_string()),
            ..ErrorInfo::default()
        },
    };

    simplify(info)
}

fn typed(error_type: &str) -> ErrorInfo {
    ErrorInfo {
        error_type: Some(error_type.to_string()),
        ..ErrorInfo::default()
    }
}

// Duplicate key messages repeat the whole index spec; the details carry it.
fn simplify(mut info: ErrorInfo) -> ErrorInfo {
    if matches!(info.code, Some(11000) | Some(11001)) {
        info.message = Some("Duplicate key error".to_string());
    }
    info
}

/// Human-readable name for the server codes this library commonly hits.
fn error_name(code: i32) -> Option<&'static str> {
    match code {
        11000 | 11001 => Some("DuplicateKey"),
        2 => Some("BadValue"),
        13 => Some("Unauthorized"),
        18 => Some("AuthenticationFailed"),
        26 => Some("NamespaceNotFound"),
        50 => Some("MaxTimeMSExpired"),
        66 => Some("ImmutableField"),
        121 => Some("DocumentValidationFailure"),
        _ => None,
    }
}

fn details_from(doc: &Document) -> ErrorDetails {
    let string_field = |keys: &[&str]| {
        keys.iter().find_map(|key| match doc.get(*key) {
            Some(Bson::String(s)) => Some(s.clone()),
            _ => None,
        })
    };
    let key = ["keyValue", "keyPattern"]
        .iter()
        .find_map(|key| doc.get_document(*key).ok().cloned());

    ErrorDetails {
        collection: string_field(&["namespace", "ns"]),
        index: string_field(&["index", "indexName"]),
        key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn test_error_name_lookup() {
        assert_eq!(error_name(11000), Some("DuplicateKey"));
        assert_eq!(error_name(66), Some("ImmutableField"));
        assert_eq!(error_name(99999), None);
    }

    #[test]
    fn test_details_prefer_key_value() {
        let details = details_from(&doc! {
            "ns": "app.users",
            "indexName": "email_1",
            "keyValue": { "email": "a@b.c" },
            "keyPattern": { "email": 1 },
        });
        assert_eq!(details.collection.as_deref(), Some("app.users"));
        assert_eq!(details.index.as_deref(), Some("email_1"));
        assert_eq!(details.key, Some(doc! { "email": "a@b.c" }));
    }

    #[test]
    fn test_duplicate_key_message_is_simplified() {
        let info = simplify(ErrorInfo::default().with_code(11000, "E11000 duplicate key ..."));
        assert_eq!(info.message.as_deref(), Some("Duplicate key error"));
        assert_eq!(info.name.as_deref(), Some("DuplicateKey"));
    }

    #[test]
    fn test_compact_json_skips_empty_fields() {
        let info = typed("mongo.command_error").with_code(13, "not authorized");
        let json = info.to_json_compact().unwrap();
        assert_eq!(
            json,
            r#"{"type":"mongo.command_error","code":13,"name":"Unauthorized","message":"not authorized"}"#
        );
    }
}
