#![forbid(unsafe_code)]

//! Minimal HTTP helper: send JSON, write the response back into globals.
//!
//! A response object is read as:
//!
//! - `{"redirect": url}` or `{"reload": true}`: returned as [`Navigation`]
//!   for the host to act on;
//! - `{"errors": {...}}`: each entry is written with `set_value`; array
//!   entries are joined with a space and written to `<key>-error`;
//! - `{"data": {...}}`: each entry is written with `set_value`, unless
//!   `errors` produced anything.
//!
//! `http` (native builds only) logs transport and decode failures and
//! returns `None`.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value as Json};
use trellis_core::{Error, Result};

use crate::globals::Globals;

/// What the host should do after a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Redirect(String),
    Reload,
}

/// One request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HttpRequest {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    #[serde(default)]
    pub body: Option<Json>,
}

fn default_method() -> String {
    "GET".to_owned()
}

impl HttpRequest {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: default_method(),
            headers: IndexMap::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn post(url: impl Into<String>, body: Json) -> Self {
        Self {
            method: "POST".to_owned(),
            body: Some(body),
            ..Self::get(url)
        }
    }

    /// Method as sent: trimmed and uppercased.
    #[must_use]
    pub fn normalized_method(&self) -> String {
        self.method.trim().to_uppercase()
    }
}

/// Send `request` and apply the response to `globals`.
#[cfg(not(target_arch = "wasm32"))]
pub fn http(globals: &Globals, request: &HttpRequest) -> Option<Navigation> {
    let outcome = send(request).and_then(|response| apply_response(globals, &response));
    match outcome {
        Ok(navigation) => navigation,
        Err(err) => {
            tracing::error!(url = %request.url, %err, "http request failed");
            None
        }
    }
}

/// Perform the request and decode the JSON body.
#[cfg(not(target_arch = "wasm32"))]
pub fn send(request: &HttpRequest) -> Result<Json> {
    let method = request.normalized_method();
    let method = reqwest::Method::from_bytes(method.as_bytes())
        .map_err(|e| Error::Http(format!("invalid method {method}: {e}")))?;
    let is_get = method == reqwest::Method::GET;

    let client = reqwest::blocking::Client::new();
    let mut builder = client
        .request(method, &request.url)
        .header("Content-Type", "application/json");
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if !is_get && let Some(body) = &request.body {
        builder = builder.json(body);
    }

    tracing::debug!(url = %request.url, "http request");
    let response = builder
        .send()
        .map_err(|e| Error::Http(format!("request to {} failed: {e}", request.url)))?;
    if !response.status().is_success() {
        return Err(Error::Http(format!(
            "request to {} failed with status {}",
            request.url,
            response.status()
        )));
    }
    response
        .json::<Json>()
        .map_err(|e| Error::Http(format!("response from {} is not JSON: {e}", request.url)))
}

fn is_set(value: Option<&Json>) -> bool {
    match value {
        None | Some(Json::Null) | Some(Json::Bool(false)) => false,
        Some(Json::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Apply a decoded response body.
pub fn apply_response(globals: &Globals, response: &Json) -> Result<Option<Navigation>> {
    if let Some(url) = response.get("redirect").and_then(Json::as_str)
        && !url.is_empty()
    {
        return Ok(Some(Navigation::Redirect(url.to_owned())));
    }
    if is_set(response.get("reload")) {
        return Ok(Some(Navigation::Reload));
    }

    let mut updates = Map::new();
    if let Some(Json::Object(errors)) = response.get("errors") {
        for (key, value) in errors {
            match value {
                Json::Array(parts) => {
                    let joined = parts
                        .iter()
                        .map(|p| p.as_str().map_or_else(|| p.to_string(), str::to_owned))
                        .collect::<Vec<_>>()
                        .join(" ");
                    updates.insert(format!("{key}-error"), Json::String(joined));
                }
                other => {
                    updates.insert(key.clone(), other.clone());
                }
            }
        }
    }
    if let Some(Json::Object(data)) = response.get("data") {
        if updates.is_empty() {
            updates = data.clone();
        } else {
            tracing::warn!("both errors and data are present in response, ignoring data");
        }
    }

    for (path, value) in updates {
        globals.set_json(&path, value)?;
    }
    Ok(None)
}
