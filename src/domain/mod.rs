use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::DecodeError;

/// One persisted telemetry record. `ts` and `value` are extracted
/// best-effort; the full parsed document is always kept in `payload`
/// so nothing the publisher sent is lost.
#[derive(Debug, Clone)]
pub struct Measurement {
    pub topic: String,
    pub ts: Option<OffsetDateTime>,
    pub value: Option<f64>,
    pub payload: serde_json::Value,
}

impl Measurement {
    /// Decode raw bus bytes received on `topic`.
    ///
    /// Only encoding-level failures are errors: the bytes must parse as a
    /// JSON object. Missing or oddly-typed `ts`/`value` fields become
    /// `None` and the row is still written.
    pub fn decode(topic: &str, payload: &[u8]) -> Result<Self, DecodeError> {
        let document: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| DecodeError::InvalidEncoding(e.to_string()))?;

        if !document.is_object() {
            return Err(DecodeError::InvalidEncoding(
                "top-level value is not an object".to_string(),
            ));
        }

        let ts = document
            .get("ts")
            .and_then(|v| v.as_str())
            .and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok());

        let value = document.get("value").and_then(|v| v.as_f64());

        Ok(Measurement {
            topic: topic.to_string(),
            ts,
            value,
            payload: document,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn decodes_well_formed_payload() {
        let raw = br#"{"ts":"2024-01-01T00:00:00Z","value":42.5,"quality":"good"}"#;
        let m = Measurement::decode("uns/a/b/c", raw).unwrap();

        assert_eq!(m.topic, "uns/a/b/c");
        assert_eq!(m.ts, Some(datetime!(2024-01-01 00:00:00 UTC)));
        assert_eq!(m.value, Some(42.5));
        assert_eq!(m.payload["quality"], "good");
    }

    #[test]
    fn retains_full_document_as_payload() {
        let raw = br#"{"ts":"2024-01-01T00:00:00Z","value":1,"extra":{"nested":[1,2,3]}}"#;
        let m = Measurement::decode("uns/x", raw).unwrap();

        let expected: serde_json::Value = serde_json::from_slice(raw).unwrap();
        assert_eq!(m.payload, expected);
    }

    #[test]
    fn integer_enum_codes_decode_as_numbers() {
        let raw = br#"{"ts":"2024-01-01T00:00:00Z","value":3}"#;
        let m = Measurement::decode("uns/press01/state", raw).unwrap();
        assert_eq!(m.value, Some(3.0));
    }

    #[test]
    fn missing_value_is_tolerated() {
        let raw = br#"{"ts":"2024-01-01T00:00:00Z","quality":"good"}"#;
        let m = Measurement::decode("uns/a", raw).unwrap();
        assert!(m.value.is_none());
        assert!(m.ts.is_some());
        assert_eq!(m.payload["quality"], "good");
    }

    #[test]
    fn missing_or_malformed_ts_is_tolerated() {
        let m = Measurement::decode("uns/a", br#"{"value":1.0}"#).unwrap();
        assert!(m.ts.is_none());

        let m = Measurement::decode("uns/a", br#"{"ts":"yesterday","value":1.0}"#).unwrap();
        assert!(m.ts.is_none());
        assert_eq!(m.payload["ts"], "yesterday");

        let m = Measurement::decode("uns/a", br#"{"ts":12345,"value":1.0}"#).unwrap();
        assert!(m.ts.is_none());
    }

    #[test]
    fn non_numeric_value_is_tolerated() {
        let m = Measurement::decode("uns/a", br#"{"value":"running"}"#).unwrap();
        assert!(m.value.is_none());
        assert_eq!(m.payload["value"], "running");
    }

    #[test]
    fn non_json_bytes_fail_with_invalid_encoding() {
        let err = Measurement::decode("uns/a", b"not json").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidEncoding(_)));

        let err = Measurement::decode("uns/a", &[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidEncoding(_)));
    }

    #[test]
    fn non_object_json_fails_with_invalid_encoding() {
        // A bare scalar or array has no fields to extract.
        let err = Measurement::decode("uns/a", b"42").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidEncoding(_)));

        let err = Measurement::decode("uns/a", b"[1,2,3]").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidEncoding(_)));
    }
}
