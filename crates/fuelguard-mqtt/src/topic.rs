use fuelguard_domain::{DomainError, DomainResult};

pub const DATA_TOPIC_FILTER: &str = "fuelguard/devices/+/data";
pub const STATUS_TOPIC_FILTER: &str = "fuelguard/devices/+/status";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Data,
    Status,
}

/// Parsed device topic `fuelguard/devices/{device_id}/{data|status}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTopic {
    pub device_id: String,
    pub kind: MessageKind,
}

pub fn parse_topic(topic: &str) -> DomainResult<ParsedTopic> {
    let parts: Vec<&str> = topic.split('/').collect();

    if parts.len() != 4 || parts[0] != "fuelguard" || parts[1] != "devices" {
        return Err(DomainError::InvalidInput(format!(
            "invalid topic '{}': expected 'fuelguard/devices/{{device_id}}/{{data|status}}'",
            topic
        )));
    }

    let device_id = parts[2];
    if device_id.is_empty() {
        return Err(DomainError::InvalidInput(
            "device id cannot be empty in topic".to_string(),
        ));
    }

    let kind = match parts[3] {
        "data" => MessageKind::Data,
        "status" => MessageKind::Status,
        other => {
            return Err(DomainError::InvalidInput(format!(
                "unknown message type '{}' in topic '{}'",
                other, topic
            )))
        }
    };

    Ok(ParsedTopic {
        device_id: device_id.to_string(),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data_topic() {
        let parsed = parse_topic("fuelguard/devices/dev_abc/data").unwrap();
        assert_eq!(parsed.device_id, "dev_abc");
        assert_eq!(parsed.kind, MessageKind::Data);
    }

    #[test]
    fn test_parse_status_topic() {
        let parsed = parse_topic("fuelguard/devices/dev_abc/status").unwrap();
        assert_eq!(parsed.kind, MessageKind::Status);
    }

    #[test]
    fn test_reject_wrong_prefix() {
        assert!(parse_topic("other/devices/dev_abc/data").is_err());
    }

    #[test]
    fn test_reject_wrong_segment_count() {
        assert!(parse_topic("fuelguard/devices/dev_abc").is_err());
        assert!(parse_topic("fuelguard/devices/dev_abc/data/extra").is_err());
    }

    #[test]
    fn test_reject_empty_device_id() {
        assert!(parse_topic("fuelguard/devices//data").is_err());
    }

    #[test]
    fn test_reject_unknown_kind() {
        assert!(parse_topic("fuelguard/devices/dev_abc/command").is_err());
    }
}
