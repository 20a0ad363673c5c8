//! Boundary with the flow export decoder.
//!
//! Turning binary NetFlow/IPFIX into records is the job of an upstream
//! converter. What arrives here is JSON using the exporter's element names.

use serde_json::Value;

use crate::error_handling::types::DecodeError;
use crate::flow::types::FlowRecord;

/// Turns one export datagram into zero or more flow records.
pub trait FlowDecoder: Send + Sync {
    fn decode(&self, packet: &[u8]) -> Result<Vec<FlowRecord>, DecodeError>;
}

/// Decoder for JSON encoded exports.
///
/// Accepts a single record, an array of records, an export envelope carrying a
/// `flows` array, or newline-delimited records.
#[derive(Debug, Default, Clone)]
pub struct JsonFlowDecoder;

impl JsonFlowDecoder {
    pub fn new() -> Self {
        Self
    }

    fn records_from_value(value: Value) -> Result<Vec<FlowRecord>, DecodeError> {
        let items = match value {
            Value::Array(items) => items,
            Value::Object(mut object) => match object.remove("flows") {
                Some(Value::Array(items)) => items,
                Some(other) => {
                    return Err(DecodeError::Malformed(format!(
                        "`flows` must be an array, got {}",
                        other
                    )))
                }
                None => vec![Value::Object(object)],
            },
            other => {
                return Err(DecodeError::Malformed(format!(
                    "expected an object or an array, got {}",
                    other
                )))
            }
        };

        items
            .into_iter()
            .map(|item| {
                serde_json::from_value(item).map_err(|e| DecodeError::Malformed(e.to_string()))
            })
            .collect()
    }
}

impl FlowDecoder for JsonFlowDecoder {
    fn decode(&self, packet: &[u8]) -> Result<Vec<FlowRecord>, DecodeError> {
        let text = std::str::from_utf8(packet).map_err(|_| DecodeError::InvalidUtf8)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(DecodeError::Empty);
        }

        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::records_from_value(value),
            // Not a single document, try one record per line.
            Err(_) if text.contains('\n') => {
                let mut records = Vec::new();
                for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    let value: Value = serde_json::from_str(line)
                        .map_err(|e| DecodeError::Malformed(e.to_string()))?;
                    records.extend(Self::records_from_value(value)?);
                }
                Ok(records)
            }
            Err(e) => Err(DecodeError::Malformed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = r#"{"ipv4_src_addr":"10.0.0.5","l4_src_port":4000,"ipv4_dst_addr":"8.8.8.8","l4_dst_port":443,"in_bytes":100}"#;

    #[test]
    fn test_single_object() {
        let records = JsonFlowDecoder::new().decode(RECORD.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].in_bytes, 100);
    }

    #[test]
    fn test_array_and_envelope() {
        let decoder = JsonFlowDecoder::new();
        let array = format!("[{},{}]", RECORD, RECORD);
        let envelope = format!(r#"{{"header":{{"version":9}},"flows":[{}]}}"#, RECORD);

        assert_eq!(decoder.decode(array.as_bytes()).unwrap().len(), 2);
        let records = decoder.decode(envelope.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].dest_port, 443);
    }

    #[test]
    fn test_newline_delimited() {
        let packet = format!("{}\n\n{}\n", RECORD, RECORD);
        assert_eq!(JsonFlowDecoder::new().decode(packet.as_bytes()).unwrap().len(), 2);
    }

    #[test]
    fn test_garbage_is_rejected() {
        let decoder = JsonFlowDecoder::new();
        assert!(matches!(decoder.decode(b""), Err(DecodeError::Empty)));
        assert!(matches!(decoder.decode(&[0xff, 0xfe, 0x00]), Err(DecodeError::InvalidUtf8)));
        assert!(matches!(decoder.decode(b"42"), Err(DecodeError::Malformed(_))));
        assert!(matches!(
            decoder.decode(br#"{"flows": 3}"#),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            decoder.decode(br#"{"ipv4_src_addr": "nope"}"#),
            Err(DecodeError::Malformed(_))
        ));
    }
}
