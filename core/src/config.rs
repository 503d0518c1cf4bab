//! Dispatcher configuration.
//!
//! Timeouts are whole-call budgets (connect, send, headers and body). The
//! defaults match what each helper has always used: three minutes for form
//! posts, two minutes for JSON and XML. Embedding applications can load the
//! struct from their own config files; durations are written as seconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http::BodyEncoding;

pub const DEFAULT_FORM_TIMEOUT: Duration = Duration::from_secs(180);
pub const DEFAULT_JSON_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_XML_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    #[serde(with = "secs")]
    pub form_timeout: Duration,
    #[serde(with = "secs")]
    pub json_timeout: Duration,
    #[serde(with = "secs")]
    pub xml_timeout: Duration,
    /// Overrides the HTTP client's default `User-Agent` when set.
    pub user_agent: Option<String>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            form_timeout: DEFAULT_FORM_TIMEOUT,
            json_timeout: DEFAULT_JSON_TIMEOUT,
            xml_timeout: DEFAULT_XML_TIMEOUT,
            user_agent: None,
        }
    }
}

impl DispatcherConfig {
    pub fn timeout_for(&self, encoding: BodyEncoding) -> Duration {
        match encoding {
            BodyEncoding::Form => self.form_timeout,
            BodyEncoding::Json => self.json_timeout,
            BodyEncoding::Xml => self.xml_timeout,
        }
    }
}

mod secs {
    use std::time::Duration;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}
