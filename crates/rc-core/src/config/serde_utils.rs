//! Serde helpers for configuration durations
//!
//! Durations appear in the TOML file as plain integers. Timeouts and
//! retention windows are given in seconds, pacing delays in milliseconds to
//! match the `delay` field the broadcast form submits.

/// `Duration` as whole seconds
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// `Duration` as whole milliseconds
pub mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Pacing {
        #[serde(with = "duration_secs")]
        timeout: Duration,
        #[serde(with = "duration_millis")]
        delay: Duration,
    }

    #[test]
    fn test_duration_serialize() {
        let pacing = Pacing {
            timeout: Duration::from_secs(30),
            delay: Duration::from_millis(1500),
        };
        let json = serde_json::to_string(&pacing).unwrap();
        assert_eq!(json, r#"{"timeout":30,"delay":1500}"#);
    }

    #[test]
    fn test_duration_deserialize() {
        let pacing: Pacing = serde_json::from_str(r#"{"timeout":60,"delay":250}"#).unwrap();
        assert_eq!(pacing.timeout, Duration::from_secs(60));
        assert_eq!(pacing.delay, Duration::from_millis(250));
    }
}
