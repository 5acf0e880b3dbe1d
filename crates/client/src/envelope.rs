//! Response envelopes and their validation.
//!
//! The backend answers with loosely shaped JSON (`success`, `data`,
//! `message`, `error`, `importId`, any of which may be missing). The raw
//! shapes here are decoded once and converted into either a fully populated
//! value or an [`ApiError`], never anything in between.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::api::ApiError;

/// Raw `{ success, data, message, error }` envelope.
#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> DataEnvelope<T> {
    /// Validate the envelope. A missing `success` flag is accepted when
    /// `data` is present.
    pub fn into_data(self) -> Result<T, ApiError> {
        if self.success == Some(false) {
            return Err(ApiError::Rejected(failure_message(self.message, self.error)));
        }
        self.data
            .ok_or_else(|| ApiError::Malformed("response has no 'data' field".to_string()))
    }
}

/// Raw response of the start-import endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStartImport {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub import_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A validated start-import acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartImportResponse {
    pub import_id: String,
    pub message: String,
}

impl RawStartImport {
    pub fn into_response(self) -> Result<StartImportResponse, ApiError> {
        if self.success != Some(true) {
            return Err(ApiError::Rejected(failure_message(self.message, self.error)));
        }
        match self.import_id {
            Some(id) if !id.trim().is_empty() => Ok(StartImportResponse {
                import_id: id,
                message: self.message.unwrap_or_default(),
            }),
            _ => Err(ApiError::Malformed(
                "start-import response has no 'importId'".to_string(),
            )),
        }
    }
}

/// Decode a JSON body, reporting shape problems as [`ApiError::Malformed`].
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Malformed(e.to_string()))
}

/// Best human-readable message from an error body, if it is an envelope.
pub fn message_from_body(body: &str) -> Option<String> {
    let envelope: DataEnvelope<serde_json::Value> = serde_json::from_str(body).ok()?;
    envelope
        .message
        .or(envelope.error)
        .filter(|m| !m.trim().is_empty())
}

fn failure_message(message: Option<String>, error: Option<String>) -> String {
    message
        .or(error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| "The server reported a failure without a message".to_string())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn data_envelope_success() {
        let env: DataEnvelope<u32> = decode(r#"{"success":true,"data":7}"#).unwrap();
        assert_eq!(env.into_data().unwrap(), 7);
    }

    #[test]
    fn data_envelope_without_flag_is_accepted() {
        let env: DataEnvelope<u32> = decode(r#"{"data":7}"#).unwrap();
        assert_eq!(env.into_data().unwrap(), 7);
    }

    #[test]
    fn data_envelope_failure_carries_message() {
        let env: DataEnvelope<u32> =
            decode(r#"{"success":false,"error":"Not allowed"}"#).unwrap();
        assert_matches!(env.into_data(), Err(ApiError::Rejected(msg)) if msg == "Not allowed");
    }

    #[test]
    fn data_envelope_missing_data_is_malformed() {
        let env: DataEnvelope<u32> = decode(r#"{"success":true}"#).unwrap();
        assert_matches!(env.into_data(), Err(ApiError::Malformed(_)));
    }

    #[test]
    fn start_import_requires_id() {
        let raw: RawStartImport = decode(r#"{"success":true,"message":"ok"}"#).unwrap();
        assert_matches!(raw.into_response(), Err(ApiError::Malformed(_)));

        let raw: RawStartImport =
            decode(r#"{"success":true,"importId":"imp-9","message":"queued"}"#).unwrap();
        let response = raw.into_response().unwrap();
        assert_eq!(response.import_id, "imp-9");
        assert_eq!(response.message, "queued");
    }

    #[test]
    fn start_import_rejected() {
        let raw: RawStartImport =
            decode(r#"{"success":false,"message":"Bestand is leeg"}"#).unwrap();
        assert_matches!(raw.into_response(), Err(ApiError::Rejected(msg)) if msg == "Bestand is leeg");
    }

    #[test]
    fn wrongly_typed_field_is_malformed() {
        assert_matches!(
            decode::<RawStartImport>(r#"{"success":"yes"}"#),
            Err(ApiError::Malformed(_))
        );
    }

    #[test]
    fn message_from_body_prefers_message() {
        assert_eq!(
            message_from_body(r#"{"success":false,"message":"a","error":"b"}"#).as_deref(),
            Some("a")
        );
        assert_eq!(message_from_body("<html>").as_deref(), None);
    }
}
