// Dashboard API HTTP client
//
// Wraps `reqwest::Client` with base-URL joining, bearer auth, retry on
// throttling, `Link`-header pagination, and the `{"errors": [...]}` error
// envelope. Endpoint modules (networks, vlans, ports) are implemented as
// inherent methods in separate files to keep this module focused on
// transport mechanics.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{LINK, RETRY_AFTER};
use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::auth::bearer_headers;
use crate::error::Error;
use crate::transport::{RetryPolicy, TransportConfig};

/// Default Dashboard API root.
pub const DEFAULT_BASE_URL: &str = "https://api.meraki.com/api/v1";

// ── Error response shape from the Dashboard ─────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<String>,
}

// ── Client ──────────────────────────────────────────────────────────

/// Async client for the Meraki Dashboard API.
///
/// Authenticates with a bearer API key and communicates via JSON REST
/// endpoints under `/api/v1/`. Throttled (429) and 5xx responses are
/// retried according to the configured [`RetryPolicy`]; every other
/// failure is surfaced to the caller unchanged.
pub struct DashboardClient {
    http: reqwest::Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl DashboardClient {
    // ── Constructors ────────────────────────────────────────────────

    /// Build from an API key and transport config.
    ///
    /// Injects `Authorization: Bearer <key>` as a default header on every
    /// request.
    pub fn from_api_key(
        base_url: &str,
        api_key: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let headers = bearer_headers(api_key)?;
        let http = transport.build_client_with_headers(headers)?;
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            retry: transport.retry,
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(
        base_url: &str,
        http: reqwest::Client,
        retry: RetryPolicy,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            retry,
        })
    }

    /// The API root this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Ensure the base URL ends with a slash so relative joins append
    /// instead of replacing the last path segment.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    // ── URL builder ─────────────────────────────────────────────────

    /// Join a relative path (e.g. `"networks/N_1/appliance/vlans"`) onto the base URL.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ── HTTP verbs ──────────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let request = self.http.get(url).build()?;
        let resp = self.send(request).await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let request = self.http.post(url).json(body).build()?;
        let resp = self.send(request).await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let request = self.http.put(url).json(body).build()?;
        let resp = self.send(request).await?;
        self.handle_response(resp).await
    }

    /// GET every page of a list endpoint, following `Link: <...>; rel=next`.
    pub(crate) async fn get_all_pages<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, Error> {
        let mut url = self.url(path)?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));

        let mut all = Vec::new();
        let mut next = Some(url);

        while let Some(url) = next.take() {
            debug!("GET {url} (paginated)");
            let request = self.http.get(url).build()?;
            let resp = self.send(request).await?;
            next = next_page(resp.headers());
            let page: Vec<T> = self.handle_response(resp).await?;
            all.extend(page);
        }

        Ok(all)
    }

    // ── Retry loop ──────────────────────────────────────────────────

    /// Execute a request, retrying 429 and 5xx responses per the policy.
    ///
    /// Requests whose body cannot be cloned are sent exactly once.
    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, Error> {
        let mut attempt: u32 = 0;
        let mut pending = request;

        loop {
            let retry_copy = pending.try_clone();
            let resp = self.http.execute(pending).await?;
            let status = resp.status();
            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();

            match retry_copy {
                Some(next) if retryable && attempt < self.retry.max_retries => {
                    let delay = retry_after(resp.headers()).unwrap_or_else(|| self.retry.backoff(attempt));
                    warn!(
                        %status,
                        attempt = attempt + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "dashboard request throttled or failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    pending = next;
                }
                _ => return Ok(resp),
            }
        }
    }

    // ── Response handling ───────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview = &body[..body.len().min(200)];
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: StatusCode, resp: reqwest::Response) -> Error {
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = retry_after(resp.headers()).map_or(0, |d| d.as_secs());
            return Error::RateLimited { retry_after_secs };
        }

        let path = resp.url().path().to_owned();
        let raw = resp.text().await.unwrap_or_default();
        let messages = serde_json::from_str::<ErrorResponse>(&raw)
            .map(|e| e.errors)
            .unwrap_or_default();

        match status {
            StatusCode::UNAUTHORIZED => Error::Authentication {
                message: messages
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "invalid API key".into()),
            },
            StatusCode::NOT_FOUND if messages.is_empty() => Error::NotFound { path },
            _ => Error::Api {
                status: status.as_u16(),
                messages: if messages.is_empty() && !raw.is_empty() {
                    vec![raw[..raw.len().min(200)].to_owned()]
                } else if messages.is_empty() {
                    vec![status.to_string()]
                } else {
                    messages
                },
            },
        }
    }
}

// ── Header helpers ──────────────────────────────────────────────────

/// Parse `Retry-After` as whole seconds.
fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Extract the `rel=next` target from an RFC 8288 `Link` header.
fn next_page(headers: &reqwest::header::HeaderMap) -> Option<Url> {
    let raw = headers.get(LINK)?.to_str().ok()?;
    parse_next_link(raw)
}

fn parse_next_link(raw: &str) -> Option<Url> {
    raw.split(',').find_map(|segment| {
        let mut parts = segment.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|p| {
            let p = p.trim().replace('"', "");
            p.eq_ignore_ascii_case("rel=next")
        });
        if !is_next {
            return None;
        }
        let target = target.strip_prefix('<')?.strip_suffix('>')?;
        Url::parse(target).ok()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn next_link_is_found_among_others() {
        let raw = "<https://api.meraki.com/api/v1/organizations/1/networks?perPage=2>; rel=first, \
                   <https://api.meraki.com/api/v1/organizations/1/networks?startingAfter=N_2>; rel=next";
        let url = parse_next_link(raw).unwrap();
        assert_eq!(url.query(), Some("startingAfter=N_2"));
    }

    #[test]
    fn quoted_rel_is_accepted() {
        let raw = "<https://example.test/page2>; rel=\"next\"";
        assert!(parse_next_link(raw).is_some());
    }

    #[test]
    fn no_next_link_ends_pagination() {
        let raw = "<https://example.test/page1>; rel=first, <https://example.test/page1>; rel=last";
        assert!(parse_next_link(raw).is_none());
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let client = DashboardClient::from_reqwest(
            "https://api.meraki.com/api/v1",
            reqwest::Client::new(),
            RetryPolicy::none(),
        )
        .unwrap();
        assert_eq!(
            client.url("networks/N_1/appliance/vlans").unwrap().as_str(),
            "https://api.meraki.com/api/v1/networks/N_1/appliance/vlans"
        );
    }
}
