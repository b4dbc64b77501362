use crate::config::toml_config::{DefaultsConfig, EndpointsConfig, UpstreamConfig};
use crate::domain::model::Credentials;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{BridgeError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, COOKIE, USER_AGENT};
use reqwest::multipart::Form;
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

const SEC_CH_UA: &str =
    "\"Chromium\";v=\"134\", \"Not:A-Brand\";v=\"24\", \"Google Chrome\";v=\"134\"";

/// Shared connection to the Practice Fusion web API. Credentials are bound per
/// call through [`PracticeFusionClient::session`].
pub struct PracticeFusionClient {
    http: Client,
    upstream: UpstreamConfig,
    defaults: DefaultsConfig,
    endpoints: EndpointsConfig,
}

impl PracticeFusionClient {
    pub fn new<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.upstream().timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            upstream: config.upstream().clone(),
            defaults: config.defaults().clone(),
            endpoints: config.endpoints().clone(),
        })
    }

    pub fn defaults(&self) -> &DefaultsConfig {
        &self.defaults
    }

    pub fn endpoints(&self) -> &EndpointsConfig {
        &self.endpoints
    }

    pub fn session(&self, credentials: Credentials) -> Session<'_> {
        Session {
            client: self,
            credentials,
        }
    }

    /// Builds an absolute upstream URL from a path template such as
    /// `/patients/{patientPracticeGuid}/transcripts`. Values are percent-encoded
    /// as single path segments.
    pub fn url(&self, template: &str, params: &[(&str, &str)]) -> Result<Url> {
        let segments = template
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| fill_segment(template, segment, params))
            .collect::<Result<Vec<_>>>()?;

        let mut url = Url::parse(&self.upstream.base_url).map_err(|e| {
            BridgeError::config(format!("Invalid base URL {}: {}", self.upstream.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| BridgeError::config("Base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(&segments);

        Ok(url)
    }
}

fn fill_segment(template: &str, segment: &str, params: &[(&str, &str)]) -> Result<String> {
    let mut out = String::with_capacity(segment.len());
    let mut rest = segment;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| {
            BridgeError::config(format!("Unterminated placeholder in endpoint: {}", template))
        })?;
        let name = &after[..end];
        let value = params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
            .ok_or_else(|| {
                BridgeError::config(format!(
                    "Unresolved parameter '{}' in endpoint: {}",
                    name, template
                ))
            })?;
        out.push_str(value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

/// A client bound to one set of credentials for the duration of a workflow.
pub struct Session<'a> {
    client: &'a PracticeFusionClient,
    credentials: Credentials,
}

impl<'a> Session<'a> {
    pub fn client(&self) -> &'a PracticeFusionClient {
        self.client
    }

    pub fn defaults(&self) -> &'a DefaultsConfig {
        &self.client.defaults
    }

    pub fn endpoints(&self) -> &'a EndpointsConfig {
        &self.client.endpoints
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            header_value("user_agent", &self.client.upstream.user_agent)?,
        );
        headers.insert(COOKIE, header_value("cookies", &self.credentials.cookies)?);
        let mut authorization = header_value("authorization", &self.credentials.authorization)?;
        authorization.set_sensitive(true);
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(
            HeaderName::from_static("sec-ch-ua"),
            HeaderValue::from_static(SEC_CH_UA),
        );
        Ok(headers)
    }

    pub async fn get(&self, template: &str, params: &[(&str, &str)]) -> Result<Value> {
        let url = self.client.url(template, params)?;
        self.send(Method::GET, url, &[], None, true).await
    }

    pub async fn get_with_query(
        &self,
        template: &str,
        params: &[(&str, &str)],
        query: &[(&str, String)],
    ) -> Result<Value> {
        let url = self.client.url(template, params)?;
        self.send(Method::GET, url, query, None, true).await
    }

    pub async fn post(&self, template: &str, params: &[(&str, &str)], body: &Value) -> Result<Value> {
        let url = self.client.url(template, params)?;
        self.send(Method::POST, url, &[], Some(body), false).await
    }

    pub async fn put(&self, template: &str, params: &[(&str, &str)], body: &Value) -> Result<Value> {
        let url = self.client.url(template, params)?;
        self.send(Method::PUT, url, &[], Some(body), true).await
    }

    /// PUT that is never retried, for upstream calls that create records.
    pub async fn put_once(
        &self,
        template: &str,
        params: &[(&str, &str)],
        body: &Value,
    ) -> Result<Value> {
        let url = self.client.url(template, params)?;
        self.send(Method::PUT, url, &[], Some(body), false).await
    }

    /// PUT to the template URL with one extra trailing path segment.
    pub async fn put_child(
        &self,
        template: &str,
        params: &[(&str, &str)],
        child: &str,
        body: &Value,
    ) -> Result<Value> {
        let mut url = self.client.url(template, params)?;
        url.path_segments_mut()
            .map_err(|_| BridgeError::config("Base URL cannot carry a path"))?
            .push(child);
        self.send(Method::PUT, url, &[], Some(body), true).await
    }

    pub async fn patch(&self, template: &str, params: &[(&str, &str)], body: &Value) -> Result<Value> {
        let url = self.client.url(template, params)?;
        self.send(Method::PATCH, url, &[], Some(body), false).await
    }

    pub async fn post_multipart(
        &self,
        template: &str,
        params: &[(&str, &str)],
        form: Form,
    ) -> Result<Value> {
        let url = self.client.url(template, params)?;
        tracing::debug!("POST {} (multipart)", url.path());
        let response = self
            .client
            .http
            .post(url)
            .headers(self.headers()?)
            .multipart(form)
            .send()
            .await?;
        handle_response(response).await
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, String)],
        body: Option<&Value>,
        retryable: bool,
    ) -> Result<Value> {
        let max_attempts = if retryable {
            self.client.upstream.retry_attempts + 1
        } else {
            1
        };
        let headers = self.headers()?;
        let mut attempt = 1;

        loop {
            tracing::debug!("{} {} (attempt {}/{})", method, url.path(), attempt, max_attempts);

            let mut request = self
                .client
                .http
                .request(method.clone(), url.clone())
                .headers(headers.clone());
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) if attempt < max_attempts && is_transient(response.status()) => {
                    tracing::warn!(
                        "{} {} answered {}, retrying",
                        method,
                        url.path(),
                        response.status()
                    );
                }
                Ok(response) => return handle_response(response).await,
                Err(e) if attempt < max_attempts && (e.is_connect() || e.is_timeout()) => {
                    tracing::warn!("{} {} failed: {}, retrying", method, url.path(), e);
                }
                Err(e) => return Err(e.into()),
            }

            tokio::time::sleep(Duration::from_millis(
                self.client.upstream.retry_delay_ms * u64::from(attempt),
            ))
            .await;
            attempt += 1;
        }
    }
}

fn header_value(field: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value.trim()).map_err(|_| {
        BridgeError::validation(field, "contains characters not allowed in an HTTP header")
    })
}

fn is_transient(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

async fn handle_response(response: reqwest::Response) -> Result<Value> {
    let status = response.status().as_u16();
    let body = response.bytes().await?;
    classify_response(status, &body)
}

/// Maps an upstream status and body onto a JSON value or a [`BridgeError`].
pub fn classify_response(status: u16, body: &[u8]) -> Result<Value> {
    let parsed = serde_json::from_slice::<Value>(body).ok();

    match status {
        200..=203 => Ok(match parsed {
            Some(value) => value,
            None if body.is_empty() => Value::Null,
            None => Value::String(String::from_utf8_lossy(body).into_owned()),
        }),
        204 => Ok(Value::Null),
        _ => {
            let body = parsed.unwrap_or_else(|| {
                json!({"error": {"message": "Unknown error", "code": status.to_string()}})
            });
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error")
                .to_string();
            let code = match body.pointer("/error/code") {
                Some(Value::String(code)) => code.clone(),
                Some(Value::Null) | None => status.to_string(),
                Some(other) => other.to_string(),
            };

            tracing::debug!("{} - {}", status, body);

            match status {
                400..=499 => Err(BridgeError::Upstream { status, body }),
                500..=u16::MAX => Err(BridgeError::UpstreamServer { message, code }),
                _ => Err(BridgeError::UpstreamUnexpected {
                    status,
                    message,
                    code,
                }),
            }
        }
    }
}
