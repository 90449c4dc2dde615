pub mod bridge;
pub mod dispatch;
pub mod topic;

pub use bridge::{MqttBridgeConfig, MqttIngestBridge};
pub use dispatch::{InboundMessage, MessageHandler, ShardedDispatcher};
pub use topic::{parse_topic, MessageKind, ParsedTopic, DATA_TOPIC_FILTER, STATUS_TOPIC_FILTER};
