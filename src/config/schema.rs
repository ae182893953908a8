//! JSON Schema Generation
//!
//! Generates JSON Schema for pollsync configuration validation.
//! Based on draft-07 of the JSON Schema specification.

use serde_json::json;
use serde_json::Value;

/// Generate the complete JSON schema for pollsync configuration
pub fn generate_config_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "Pollsync Configuration",
        "description": "Configuration schema for the pollsync poll cache",
        "type": "object",
        "properties": {
            "notificationCapacity": {
                "type": "integer",
                "description": "Buffer size of the poll-changed notification channel",
                "minimum": 1,
                "default": 256
            },
            "votesPageLimit": {
                "type": "integer",
                "description": "Page size used when listing voters without an explicit limit",
                "minimum": 1,
                "default": 20
            },
            "replyEmoji": {
                "type": "string",
                "description": "Prefix of the reply label",
                "default": "📊"
            },
            "replyFallback": {
                "type": "string",
                "description": "Reply label text used when a poll has no question",
                "default": "poll"
            },
            "logging": generate_logging_schema(),
        },
        "additionalProperties": false
    })
}

fn generate_logging_schema() -> Value {
    json!({
        "type": "object",
        "description": "Log output configuration",
        "properties": {
            "level": {
                "type": "string",
                "description": "EnvFilter directive, e.g. \"info\" or \"pollsync=debug\"",
                "default": "info"
            },
            "format": {
                "type": "string",
                "enum": ["text", "json"],
                "description": "Log line format",
                "default": "text"
            }
        },
        "additionalProperties": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollsConfig;

    #[test]
    fn test_schema_is_valid_json() {
        let schema = generate_config_schema();
        assert!(schema.is_object());
        assert_eq!(schema["$schema"], "http://json-schema.org/draft-07/schema#");
    }

    #[test]
    fn test_schema_covers_config_fields() {
        let schema = generate_config_schema();
        let properties = schema["properties"].as_object().unwrap();

        let config = serde_json::to_value(PollsConfig::default()).unwrap();
        for key in config.as_object().unwrap().keys() {
            assert!(properties.contains_key(key), "schema is missing {}", key);
        }
    }

    #[test]
    fn test_schema_defaults_match_config() {
        let schema = generate_config_schema();
        let config = serde_json::to_value(PollsConfig::default()).unwrap();
        assert_eq!(
            schema["properties"]["votesPageLimit"]["default"],
            config["votesPageLimit"]
        );
        assert_eq!(
            schema["properties"]["logging"]["properties"]["format"]["default"],
            config["logging"]["format"]
        );
    }
}
