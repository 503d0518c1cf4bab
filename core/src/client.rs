//! Blocking request dispatcher for form, JSON and XML payloads.
//!
//! # Design
//! `Dispatcher` holds only its configuration and carries no mutable state
//! between calls. Each variant is split into a `prepare_*` method that
//! produces the wire `Request` and a shared `execute` step that performs the
//! round-trip and drains the response. The three variants differ only in
//! their [`BodyEncoding`]; header merging, auth and error classification live
//! in one place.
//!
//! Every call builds its own agent, so no connection is shared between calls
//! and the connection is released before `send_*` returns, on success and on
//! every error path.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::{debug, trace};
use ureq::http::header::{ACCEPT, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT};
use ureq::http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Response};
use ureq::{Agent, Body};
use url::form_urlencoded;

use crate::config::DispatcherConfig;
use crate::error::DispatchError;
use crate::http::{BodyEncoding, RequestDescriptor, ResponseRecord, XmlRequest};
use crate::types::BodyValue;

/// Stateless, thread-safe dispatcher. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Build the wire request for a form-urlencoded dispatch.
    ///
    /// An empty body map is accepted and sent as an empty body. The encoded
    /// fields go in the body whatever the method, `GET` included.
    pub fn prepare_form(&self, req: &RequestDescriptor) -> Result<Request<Vec<u8>>, DispatchError> {
        let method = parse_method(&req.method, BodyEncoding::Form)?;
        let body = encode_form(&req.body)?.into_bytes();

        let mut request = self.build(BodyEncoding::Form, method, &req.url, body, &req.headers)?;
        let len = HeaderValue::from(request.body().len());
        request.headers_mut().insert(CONTENT_LENGTH, len);
        apply_basic_auth(&mut request, req.credentials());
        Ok(request)
    }

    /// Build the wire request for a JSON dispatch.
    pub fn prepare_json(&self, req: &RequestDescriptor) -> Result<Request<Vec<u8>>, DispatchError> {
        let method = parse_method(&req.method, BodyEncoding::Json)?;
        for (key, value) in &req.body {
            value.validate(key)?;
        }

        let body =
            serde_json::to_vec(&req.body).map_err(|e| DispatchError::Serialization(e.to_string()))?;

        let mut request = self.build(BodyEncoding::Json, method, &req.url, body, &req.headers)?;
        apply_basic_auth(&mut request, req.credentials());
        Ok(request)
    }

    /// Build the wire request for a raw XML post.
    pub fn prepare_xml(&self, req: &XmlRequest) -> Result<Request<Vec<u8>>, DispatchError> {
        self.build(
            BodyEncoding::Xml,
            Method::POST,
            &req.url,
            req.body.clone().into_bytes(),
            &BTreeMap::new(),
        )
    }

    pub fn send_form(&self, req: &RequestDescriptor) -> Result<ResponseRecord, DispatchError> {
        let request = self.prepare_form(req)?;
        self.execute(BodyEncoding::Form, request)
    }

    pub fn send_json(&self, req: &RequestDescriptor) -> Result<ResponseRecord, DispatchError> {
        let request = self.prepare_json(req)?;
        self.execute(BodyEncoding::Json, request)
    }

    pub fn send_xml(&self, req: &XmlRequest) -> Result<ResponseRecord, DispatchError> {
        let request = self.prepare_xml(req)?;
        self.execute(BodyEncoding::Xml, request)
    }

    /// Shared request construction. Defaults first, caller headers second so
    /// a caller header replaces a default of the same name.
    fn build(
        &self,
        encoding: BodyEncoding,
        method: Method,
        url: &str,
        body: Vec<u8>,
        caller_headers: &BTreeMap<String, String>,
    ) -> Result<Request<Vec<u8>>, DispatchError> {
        let mut request = Request::builder()
            .method(method)
            .uri(url)
            .body(body)
            .map_err(|e| DispatchError::Construction(format!("{url}: {e}")))?;

        let headers = request.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(encoding.content_type()));
        if encoding != BodyEncoding::Xml {
            headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        }
        if let Some(agent) = &self.config.user_agent {
            let value = HeaderValue::from_str(agent)
                .map_err(|e| DispatchError::Construction(format!("user agent: {e}")))?;
            headers.insert(USER_AGENT, value);
        }
        merge_headers(headers, caller_headers)?;
        Ok(request)
    }

    fn execute(
        &self,
        encoding: BodyEncoding,
        request: Request<Vec<u8>>,
    ) -> Result<ResponseRecord, DispatchError> {
        let url = request.uri().to_string();
        debug!(method = %request.method(), %url, ?encoding, "dispatching request");

        let agent = self.agent(encoding);
        let response = agent
            .run(request)
            .map_err(|source| DispatchError::Dispatch { url, source })?;
        read_response(response)
    }

    fn agent(&self, encoding: BodyEncoding) -> Agent {
        Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(self.config.timeout_for(encoding)))
            .build()
            .new_agent()
    }
}

/// Send a form request with the default configuration.
pub fn send_form(req: &RequestDescriptor) -> Result<ResponseRecord, DispatchError> {
    Dispatcher::default().send_form(req)
}

/// Send a JSON request with the default configuration.
pub fn send_json(req: &RequestDescriptor) -> Result<ResponseRecord, DispatchError> {
    Dispatcher::default().send_json(req)
}

/// Send an XML request with the default configuration.
pub fn send_xml(req: &XmlRequest) -> Result<ResponseRecord, DispatchError> {
    Dispatcher::default().send_xml(req)
}

fn parse_method(raw: &str, encoding: BodyEncoding) -> Result<Method, DispatchError> {
    let raw = if raw.is_empty() { encoding.default_method() } else { raw };
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
        .map_err(|e| DispatchError::Construction(format!("method `{raw}`: {e}")))
}

fn encode_form(body: &BTreeMap<String, BodyValue>) -> Result<String, DispatchError> {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in body {
        value.validate(key)?;
        serializer.append_pair(key, &value.to_form_value(key)?);
    }
    Ok(serializer.finish())
}

fn merge_headers(
    headers: &mut HeaderMap,
    caller: &BTreeMap<String, String>,
) -> Result<(), DispatchError> {
    for (name, value) in caller {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| DispatchError::Construction(format!("header name `{name}`: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| DispatchError::Construction(format!("header `{name}`: {e}")))?;
        headers.insert(name, value);
    }
    Ok(())
}

fn apply_basic_auth(request: &mut Request<Vec<u8>>, credentials: Option<(&str, &str)>) {
    let Some((user, password)) = credentials else {
        return;
    };
    let token = STANDARD.encode(format!("{user}:{password}"));
    // base64 output is always a valid header value
    if let Ok(mut value) = HeaderValue::from_str(&format!("Basic {token}")) {
        value.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, value);
    }
}

fn read_response(mut response: Response<Body>) -> Result<ResponseRecord, DispatchError> {
    let status = response.status();

    let mut header: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in response.headers() {
        header
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }

    let bytes = response
        .body_mut()
        .with_config()
        .limit(u64::MAX)
        .read_to_vec()
        .map_err(|e| DispatchError::Read(e.to_string()))?;

    debug!(status = status.as_u16(), bytes = bytes.len(), "response received");
    trace!(headers = ?header, "response headers");

    let reason = status.canonical_reason().unwrap_or_default();
    Ok(ResponseRecord {
        status_code: status.as_u16(),
        header,
        status: format!("{} {reason}", status.as_str()).trim_end().to_string(),
        body: String::from_utf8_lossy(&bytes).into_owned(),
    })
}
