//! Channel topic codec.
//!
//! Every channel created for an event carries a topic like
//!
//! ```text
//! Foo CTF - pwn - [View on CTFTime](https://ctftime.org/event/2301/?id=1234&start=1716033600&finish=1716120000)
//! ```
//!
//! The query string of the link is the only state the sync keeps: it is read
//! back on every run to find out when the event behind a channel ended.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::Event;

const LINK_LABEL: &str = "View on CTFTime";

/// Topics without a `v` key are version 1.
const TOPIC_VERSION: u32 = 1;

fn link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\[View on CTFTime\]\((.*?)\)").expect("topic link pattern is valid")
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicError {
    #[error("topic has no catalog link")]
    MissingLink,

    #[error("catalog link {0:?} has no query string")]
    MissingQuery(String),

    #[error("topic is missing the {0:?} key")]
    MissingKey(&'static str),

    #[error("topic key {key:?} has invalid value {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("unsupported topic version {0:?}")]
    UnsupportedVersion(String),
}

/// Event metadata embedded in a channel topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelTopic {
    pub event_id: u64,
    /// Unix seconds
    pub start: i64,
    /// Unix seconds
    pub finish: i64,
}

impl ChannelTopic {
    pub fn from_event(event: &Event) -> Self {
        Self {
            event_id: event.ctf_id,
            start: event.start.timestamp(),
            finish: event.finish.timestamp(),
        }
    }

    /// Render the topic for a channel labelled `label` in the category of `event`.
    pub fn encode(label: &str, event: &Event) -> String {
        let topic = Self::from_event(event);
        format!(
            "{} - {} - [{}]({}?{})",
            event.title,
            label,
            LINK_LABEL,
            event.ctftime_url,
            topic.query()
        )
    }

    fn query(&self) -> String {
        format!(
            "id={}&start={}&finish={}",
            self.event_id, self.start, self.finish
        )
    }

    /// Parse the metadata back out of a channel topic.
    pub fn decode(topic: &str) -> Result<Self, TopicError> {
        let params = parse_params(topic)?;

        if let Some(version) = params.get("v") {
            if version.parse::<u32>().ok() != Some(TOPIC_VERSION) {
                return Err(TopicError::UnsupportedVersion(version.clone()));
            }
        }

        Ok(Self {
            event_id: required(&params, "id")?,
            start: timestamp(&params, "start")?,
            finish: timestamp(&params, "finish")?,
        })
    }
}

/// Raw key/value pairs of the topic link, or `None` when the topic carries
/// no catalog link.
pub fn decode_params(topic: &str) -> Option<HashMap<String, String>> {
    parse_params(topic).ok()
}

fn parse_params(topic: &str) -> Result<HashMap<String, String>, TopicError> {
    let link = link_pattern()
        .captures(topic)
        .and_then(|caps| caps.get(1))
        .ok_or(TopicError::MissingLink)?
        .as_str();

    let (_, query) = link
        .split_once('?')
        .ok_or_else(|| TopicError::MissingQuery(link.to_string()))?;

    Ok(url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect())
}

fn raw<'a>(params: &'a HashMap<String, String>, key: &'static str) -> Result<&'a str, TopicError> {
    params
        .get(key)
        .map(|v| v.as_str())
        .ok_or(TopicError::MissingKey(key))
}

fn required(params: &HashMap<String, String>, key: &'static str) -> Result<u64, TopicError> {
    let value = raw(params, key)?;
    value.parse().map_err(|_| TopicError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

// Older topics may carry float seconds.
fn timestamp(params: &HashMap<String, String>, key: &'static str) -> Result<i64, TopicError> {
    let value = raw(params, key)?;
    value
        .parse::<i64>()
        .ok()
        .or_else(|| {
            value
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        })
        .ok_or_else(|| TopicError::InvalidValue {
            key,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_event() -> Event {
        Event {
            id: 2301,
            ctf_id: 1234,
            title: "Foo CTF 2024".to_string(),
            description: "Jeopardy style CTF".to_string(),
            start: Utc.with_ymd_and_hms(2024, 5, 18, 12, 0, 0).unwrap(),
            finish: Utc.with_ymd_and_hms(2024, 5, 19, 12, 0, 0).unwrap(),
            url: "https://foo-ctf.example".to_string(),
            ctftime_url: "https://ctftime.org/event/2301/".to_string(),
            onsite: false,
            restrictions: "Open".to_string(),
            weight: 24.5,
        }
    }

    #[test]
    fn test_encode_format() {
        let topic = ChannelTopic::encode("pwn", &sample_event());
        assert_eq!(
            topic,
            "Foo CTF 2024 - pwn - [View on CTFTime](https://ctftime.org/event/2301/?id=1234&start=1716033600&finish=1716120000)"
        );
    }

    #[test]
    fn test_decode_encoded_topic() {
        let event = sample_event();
        for label in crate::DEFAULT_CHANNELS {
            let decoded = ChannelTopic::decode(&ChannelTopic::encode(label, &event)).unwrap();
            assert_eq!(decoded, ChannelTopic::from_event(&event));
        }
    }

    #[test]
    fn test_decode_params_as_strings() {
        let topic = ChannelTopic::encode("web", &sample_event());
        let params = decode_params(&topic).unwrap();
        assert_eq!(params["id"], "1234");
        assert_eq!(params["start"], "1716033600");
        assert_eq!(params["finish"], "1716120000");
    }

    #[test]
    fn test_decode_without_link() {
        assert_eq!(
            ChannelTopic::decode("just chatting about pwn"),
            Err(TopicError::MissingLink)
        );
        assert!(decode_params("just chatting about pwn").is_none());
    }

    #[test]
    fn test_decode_without_query() {
        let err = ChannelTopic::decode("x - [View on CTFTime](https://ctftime.org/event/1/)")
            .unwrap_err();
        assert!(matches!(err, TopicError::MissingQuery(_)));
    }

    #[test]
    fn test_decode_missing_finish() {
        let topic = "x - [View on CTFTime](https://ctftime.org/event/1/?id=1&start=5)";
        assert_eq!(
            ChannelTopic::decode(topic),
            Err(TopicError::MissingKey("finish"))
        );
    }

    #[test]
    fn test_decode_float_seconds() {
        let topic = "x - [View on CTFTime](https://ctftime.org/event/1/?id=1&start=5.0&finish=10.7)";
        let decoded = ChannelTopic::decode(topic).unwrap();
        assert_eq!(decoded.start, 5);
        assert_eq!(decoded.finish, 10);
    }

    #[test]
    fn test_decode_rejects_garbage_values() {
        let topic = "x - [View on CTFTime](https://ctftime.org/event/1/?id=abc&start=5&finish=10)";
        assert!(matches!(
            ChannelTopic::decode(topic),
            Err(TopicError::InvalidValue { key: "id", .. })
        ));
    }

    #[test]
    fn test_decode_versions() {
        let v1 = "x - [View on CTFTime](https://ctftime.org/event/1/?v=1&id=1&start=5&finish=10)";
        assert!(ChannelTopic::decode(v1).is_ok());

        let v2 = "x - [View on CTFTime](https://ctftime.org/event/1/?v=2&id=1&start=5&finish=10)";
        assert_eq!(
            ChannelTopic::decode(v2),
            Err(TopicError::UnsupportedVersion("2".to_string()))
        );
    }
}
