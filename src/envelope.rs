//! The proxy-event shapes exchanged with the hosting platform.
//!
//! Field names follow the API Gateway "proxy integration" JSON format so an
//! event can be deserialized straight from the host payload.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Multi-valued header (and metadata) map.
pub type MultiValueMap = HashMap<String, Vec<String>>;

/// Request body as delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Body {
    Text(String),
    Binary(Vec<u8>),
}

impl Body {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Body::Text(text) => text.as_bytes(),
            Body::Binary(bytes) => bytes,
        }
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Binary(bytes)
    }
}

/// One inbound invocation event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEnvelope {
    pub path: String,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub multi_value_headers: Option<MultiValueMap>,
    #[serde(default)]
    pub body: Option<Body>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

impl InboundEnvelope {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Attach a body that is already base64 text.
    pub fn with_encoded_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(Body::Text(body.into()));
        self.is_base64_encoded = true;
        self
    }

    /// Attach a body carried as-is.
    pub fn with_raw_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self.is_base64_encoded = false;
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_multi_value_header<I, V>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.multi_value_headers
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), values.into_iter().map(Into::into).collect());
        self
    }
}

/// The single response produced for an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundEnvelope {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_value_headers: Option<MultiValueMap>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

impl Default for OutboundEnvelope {
    fn default() -> Self {
        Self {
            status_code: http::StatusCode::OK.as_u16(),
            headers: None,
            multi_value_headers: None,
            body: String::new(),
            is_base64_encoded: false,
        }
    }
}

impl OutboundEnvelope {
    pub(crate) fn set_encoded_body(&mut self, body: String) {
        self.body = body;
        self.is_base64_encoded = true;
    }

    pub(crate) fn set_text_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
        self.is_base64_encoded = false;
    }
}
