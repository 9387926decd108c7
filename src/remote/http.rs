//! HTTP implementation of [`RemoteSubmitter`] backed by reqwest

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;

use super::{RemoteSubmitter, SubmitFailure, SubmitMethod};
use crate::config::RemoteConfig;

/// Submits step data over HTTP.
///
/// Relative targets are joined onto `base_url`; absolute `http(s)://`
/// targets are used as-is. No timeout or retry is applied here.
pub struct HttpSubmitter {
    base_url: Option<String>,
    client: Client,
}

impl HttpSubmitter {
    pub fn new(base_url: Option<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Use a preconfigured client (proxies, default headers, ...).
    pub fn with_client(base_url: Option<String>, client: Client) -> Self {
        Self {
            base_url: base_url.filter(|url| !url.is_empty()),
            client,
        }
    }

    pub fn from_config(config: &RemoteConfig) -> Self {
        Self::new(Some(config.base_url.clone()))
    }

    fn resolve_url(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            return target.to_string();
        }
        match &self.base_url {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                target.trim_start_matches('/')
            ),
            None => target.to_string(),
        }
    }

    fn method(method: SubmitMethod) -> Method {
        match method {
            SubmitMethod::Get => Method::GET,
            SubmitMethod::Post => Method::POST,
            SubmitMethod::Put => Method::PUT,
            SubmitMethod::Patch => Method::PATCH,
            SubmitMethod::Delete => Method::DELETE,
        }
    }
}

/// Flatten GET data into query pairs.
///
/// Accepts an object (`{"q": "x"}`) or a serialized form, i.e. a list of
/// `{"name": .., "value": ..}` entries, which may repeat names.
fn query_pairs(data: &Value) -> Result<Vec<(String, String)>, SubmitFailure> {
    match data {
        Value::Null => Ok(Vec::new()),
        Value::Object(fields) => Ok(fields
            .iter()
            .map(|(name, value)| (name.clone(), query_value(value)))
            .collect()),
        Value::Array(entries) => entries
            .iter()
            .map(|entry| match (entry.get("name"), entry.get("value")) {
                (Some(Value::String(name)), value) => Ok((
                    name.clone(),
                    value.map(query_value).unwrap_or_default(),
                )),
                _ => Err(SubmitFailure::transport(format!(
                    "GET data entry is not a name/value pair: {}",
                    entry
                ))),
            })
            .collect(),
        other => Err(SubmitFailure::transport(format!(
            "GET data must be an object or a name/value list, got {}",
            other
        ))),
    }
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl RemoteSubmitter for HttpSubmitter {
    async fn submit(
        &self,
        method: SubmitMethod,
        target: &str,
        data: Value,
    ) -> Result<Value, SubmitFailure> {
        let url = self.resolve_url(target);
        let mut request = self.client.request(Self::method(method), &url);

        request = match (method, &data) {
            (SubmitMethod::Get, _) => request.query(&query_pairs(&data)?),
            (_, Value::Null) => request,
            _ => request.json(&data),
        };

        tracing::debug!(method = %method, url = %url, "Submitting step data");

        let response = request
            .send()
            .await
            .map_err(|e| SubmitFailure::transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SubmitFailure::transport(e.to_string()))?;

        let body = if text.trim().is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        if status.is_success() {
            tracing::debug!(url = %url, status = %status, "Remote submit succeeded");
            Ok(body)
        } else {
            tracing::debug!(url = %url, status = %status, "Remote submit rejected");
            Err(SubmitFailure::from_response(status.as_u16(), body))
        }
    }
}
