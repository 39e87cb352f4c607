//! Tests for the envelope codec.

#[cfg(test)]
mod tests {
    use super::super::envelope::*;
    use crate::error::DecodeError;
    use crate::settings::{HapticPattern, SettingsDocument, SettingsEdit};
    use crate::zone::ZoneBand;

    const ORIGIN: &str = "zonekeeper-123e4567-e89b-12d3-a456-426614174000";

    fn decode_str(json: &str) -> Result<DecodedEnvelope, DecodeError> {
        SyncEnvelope::decode(json.as_bytes())
    }

    #[test]
    fn test_settings_envelope_roundtrip() {
        let mut doc = SettingsDocument::default();
        doc.apply(SettingsEdit::HeartRateZone(ZoneBand::Zone2));

        let encoded = SyncEnvelope::Settings(doc.clone()).encode(ORIGIN).unwrap();
        assert_eq!(encoded.origin, ORIGIN);

        let decoded = SyncEnvelope::decode(&encoded.bytes).unwrap();
        assert_eq!(decoded.origin.as_deref(), Some(ORIGIN));
        assert_eq!(decoded.envelope, SyncEnvelope::Settings(doc));
    }

    #[test]
    fn test_session_signal_uses_wire_key() {
        let encoded = SyncEnvelope::SessionSignal(true).encode(ORIGIN).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&encoded.bytes).unwrap();
        assert_eq!(value["workoutIsStarted"], serde_json::Value::Bool(true));
        assert_eq!(value["origin"], ORIGIN);
    }

    #[test]
    fn test_haptic_demo_pattern_is_optional() {
        let decoded = decode_str(r#"{"hapticDemo":{"running":true}}"#).unwrap();
        assert_eq!(decoded.origin, None);
        assert_eq!(
            decoded.envelope,
            SyncEnvelope::HapticDemo(HapticDemoRequest {
                running: true,
                pattern: None
            })
        );

        let decoded = decode_str(r#"{"hapticDemo":{"running":true,"pattern":"Long vibration"}}"#).unwrap();
        assert_eq!(
            decoded.envelope,
            SyncEnvelope::HapticDemo(HapticDemoRequest {
                running: true,
                pattern: Some(HapticPattern::Retry)
            })
        );
    }

    #[test]
    fn test_legacy_bounds_decode() {
        let decoded = decode_str(r#"{"lower":123,"upper":132}"#).unwrap();
        assert_eq!(decoded.envelope, SyncEnvelope::LegacyBounds { lower: 123, upper: 132 });
        assert!(matches!(
            decode_str(r#"{"lower":123}"#),
            Err(DecodeError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let decoded = decode_str(r#"{"workoutIsStarted":false,"battery":0.4}"#).unwrap();
        assert_eq!(decoded.envelope, SyncEnvelope::SessionSignal(false));
    }

    #[test]
    fn test_malformed_envelopes_are_rejected() {
        assert!(matches!(decode_str("not json"), Err(DecodeError::InvalidJson(_))));
        assert!(matches!(decode_str("[1,2]"), Err(DecodeError::NotAnObject)));
        assert!(matches!(decode_str(r#"{"origin":"x"}"#), Err(DecodeError::MissingPayload)));
        assert!(matches!(
            decode_str(r#"{"workoutIsStarted":"yes"}"#),
            Err(DecodeError::InvalidPayload { .. })
        ));
        assert!(matches!(
            decode_str(r#"{"settings":42}"#),
            Err(DecodeError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn test_two_payloads_are_ambiguous() {
        let err = decode_str(r#"{"workoutIsStarted":true,"hapticDemo":{"running":false}}"#).unwrap_err();
        match err {
            DecodeError::AmbiguousPayload(keys) => {
                assert_eq!(keys, vec!["workoutIsStarted".to_string(), "hapticDemo".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_kind_names_wire_key() {
        assert_eq!(SyncEnvelope::SessionSignal(true).kind(), "workoutIsStarted");
        assert_eq!(SyncEnvelope::LegacyBounds { lower: 1, upper: 2 }.kind(), "lower");
    }
}
