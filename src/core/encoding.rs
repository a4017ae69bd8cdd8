//! JSON wire encoding/decoding for feed messages

use crate::core::Reading;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Empty message")]
    Empty,
    #[error("Malformed reading: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Decode one feed message into a validated `Reading`.
pub fn decode_reading(payload: &str) -> Result<Reading, DecodeError> {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return Err(DecodeError::Empty);
    }

    let reading: Reading = serde_json::from_str(trimmed)?;
    validate_reading(&reading)?;
    Ok(reading)
}

/// Decode a binary frame. Non UTF-8 payloads are treated as malformed.
pub fn decode_reading_bytes(payload: &[u8]) -> Result<Reading, DecodeError> {
    let text = std::str::from_utf8(payload).map_err(|e| DecodeError::InvalidField {
        field: "payload",
        reason: e.to_string(),
    })?;
    decode_reading(text)
}

pub fn encode_reading(reading: &Reading) -> Result<String, DecodeError> {
    Ok(serde_json::to_string(reading)?)
}

fn validate_reading(reading: &Reading) -> Result<(), DecodeError> {
    if reading.zone_id.trim().is_empty() {
        return Err(DecodeError::InvalidField {
            field: "zoneId",
            reason: "must not be empty".to_string(),
        });
    }

    if !reading.energy_kw.is_finite() || reading.energy_kw < 0.0 {
        return Err(DecodeError::InvalidField {
            field: "energyKw",
            reason: format!("expected a finite non-negative number, got {}", reading.energy_kw),
        });
    }

    if !reading.temperature.is_finite() {
        return Err(DecodeError::InvalidField {
            field: "temperature",
            reason: "expected a finite number".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "timestamp": "2024-03-01T12:00:00Z",
        "zoneId": "hvac-1",
        "zoneName": "HVAC North",
        "energyKw": 42.5,
        "temperature": 21.3,
        "equipmentCount": 6
    }"#;

    #[test]
    fn test_decode_valid_reading() {
        let reading = decode_reading(VALID).unwrap();
        assert_eq!(reading.zone_id, "hvac-1");
        assert_eq!(reading.energy_kw, 42.5);
        assert_eq!(reading.equipment_count, 6);
        assert_eq!(reading.timestamp.to_rfc3339(), "2024-03-01T12:00:00+00:00");
    }

    #[test]
    fn test_decode_rejects_missing_field() {
        let payload = r#"{"timestamp":"2024-03-01T12:00:00Z","zoneId":"a","zoneName":"A","energyKw":1.0}"#;
        assert!(matches!(decode_reading(payload), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_decode_rejects_negative_equipment_count() {
        let payload = VALID.replace("\"equipmentCount\": 6", "\"equipmentCount\": -1");
        assert!(decode_reading(&payload).is_err());
    }

    #[test]
    fn test_decode_rejects_negative_energy() {
        let payload = VALID.replace("42.5", "-3.0");
        assert!(matches!(
            decode_reading(&payload),
            Err(DecodeError::InvalidField { field: "energyKw", .. })
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_reading("   "), Err(DecodeError::Empty)));
        assert!(decode_reading("not json").is_err());
        assert!(decode_reading_bytes(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_encoded_reading_decodes_to_same_value() {
        let reading = decode_reading(VALID).unwrap();
        let line = encode_reading(&reading).unwrap();
        assert!(line.contains("\"energyKw\":42.5"));
        assert_eq!(decode_reading(&line).unwrap(), reading);
    }
}
