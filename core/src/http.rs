//! Plain-data descriptions of outbound requests and the responses they
//! produce.
//!
//! # Design
//! A `RequestDescriptor` is built once and consumed by exactly one dispatch.
//! All fields are owned (`String`, `BTreeMap`) so descriptors can be moved
//! across threads and stored freely. `BTreeMap` keeps form fields and headers
//! in a stable order, which makes the encoded wire bytes deterministic.

use std::collections::BTreeMap;

use crate::types::BodyValue;

/// How the request body is encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    Form,
    Json,
    Xml,
}

impl BodyEncoding {
    pub fn content_type(self) -> &'static str {
        match self {
            BodyEncoding::Form => "application/x-www-form-urlencoded",
            BodyEncoding::Json => "application/json",
            BodyEncoding::Xml => "text/xml; charset=utf-8",
        }
    }

    /// Method used when the descriptor leaves it empty.
    pub(crate) fn default_method(self) -> &'static str {
        match self {
            BodyEncoding::Form => "GET",
            BodyEncoding::Json | BodyEncoding::Xml => "POST",
        }
    }
}

/// An outbound request for the form and JSON dispatchers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestDescriptor {
    pub method: String,
    pub url: String,
    /// `"user:pass"`; ignored unless longer than one character.
    pub auth: String,
    pub body: BTreeMap<String, BodyValue>,
    pub headers: BTreeMap<String, String>,
}

impl RequestDescriptor {
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_string(),
            url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn auth(mut self, auth: &str) -> Self {
        self.auth = auth.to_string();
        self
    }

    pub fn body_field(mut self, key: &str, value: impl Into<BodyValue>) -> Self {
        self.body.insert(key.to_string(), value.into());
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Split `auth` into user and password on the first colon.
    ///
    /// Returns `None` when `auth` is too short to carry credentials. A value
    /// without a colon is taken as a bare user name with an empty password.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if self.auth.len() <= 1 {
            return None;
        }
        Some(self.auth.split_once(':').unwrap_or((self.auth.as_str(), "")))
    }
}

/// A raw XML payload. Always sent as `POST` without auth or extra headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlRequest {
    pub url: String,
    pub body: String,
}

impl XmlRequest {
    pub fn new(url: &str, body: &str) -> Self {
        Self {
            url: url.to_string(),
            body: body.to_string(),
        }
    }
}

/// A fully read response.
///
/// Only produced after the status line, headers and the whole body have
/// been received; any partial read is reported as an error instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    pub status_code: u16,
    /// Lowercased header names; values in the order they arrived.
    pub header: BTreeMap<String, Vec<String>>,
    /// Status line without the protocol, e.g. `"200 OK"`.
    pub status: String,
    pub body: String,
}

impl ResponseRecord {
    /// First value of a header, looked up case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.header
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}
