use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use gleaner_core::document::FetchedDocument;
use gleaner_core::error::AppError;
use gleaner_core::traits::Fetcher;
use reqwest::header::{ACCEPT, CONTENT_TYPE, LOCATION};
use reqwest::{Client, Response, redirect};
use url::{Host, Url};

const DEFAULT_MAX_BYTES: usize = 5 * 1024 * 1024;
const MAX_REDIRECTS: usize = 5;
const ACCEPT_DOCUMENTS: &str = "text/html,application/xhtml+xml,text/plain;q=0.9,*/*;q=0.5";

/// Downloads job pages and resumes over HTTP.
///
/// Redirects are followed by hand (at most five) so that every hop passes
/// the address check, not only the URL the caller supplied. The check
/// refuses hosts resolving to loopback, private, link-local and other
/// non-public ranges; [`allow_private_urls`](Self::allow_private_urls)
/// turns it off for local use.
///
/// Bodies are read up to `max_bytes` and decoded as UTF-8, replacing
/// invalid sequences.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
    public_only: bool,
    max_bytes: usize,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent("Gleaner/0.1 (job ingestion)")
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
            public_only: true,
            max_bytes: DEFAULT_MAX_BYTES,
        })
    }

    /// Reject documents larger than `max_bytes` (default 5 MiB).
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Allow hosts on private and loopback addresses.
    pub fn allow_private_urls(mut self) -> Self {
        self.public_only = false;
        self
    }

    async fn send(&self, url: &Url) -> Result<Response, AppError> {
        self.client
            .get(url.clone())
            .header(ACCEPT, ACCEPT_DOCUMENTS)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    AppError::NetworkError(format!("Connection failed: {e}"))
                } else {
                    AppError::HttpError(e.to_string())
                }
            })
    }

    /// Read the body, stopping as soon as it exceeds `max_bytes`.
    async fn read_body(&self, url: &Url, mut response: Response) -> Result<String, AppError> {
        let too_large = |bytes: u64| {
            AppError::ValidationError(format!(
                "Document at {url} is {bytes} bytes or more, limit is {}",
                self.max_bytes
            ))
        };

        if let Some(len) = response.content_length().filter(|len| *len > self.max_bytes as u64) {
            return Err(too_large(len));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))?
        {
            body.extend_from_slice(&chunk);
            if body.len() > self.max_bytes {
                return Err(too_large(body.len() as u64));
            }
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument, AppError> {
        let mut current =
            Url::parse(url).map_err(|e| AppError::ValidationError(format!("Invalid URL: {e}")))?;

        for hop in 0..=MAX_REDIRECTS {
            if self.public_only {
                check_public(&current).await?;
            }

            let response = self.send(&current).await?;
            let status = response.status();

            if status.is_redirection() {
                let Some(next) = redirect_target(&current, &response) else {
                    return Err(AppError::HttpError(format!(
                        "HTTP {} without a usable Location for {current}",
                        status.as_u16()
                    )));
                };
                if hop == MAX_REDIRECTS {
                    return Err(AppError::HttpError(format!(
                        "Too many redirects fetching {url}"
                    )));
                }
                tracing::debug!(from = %current, to = %next, status = status.as_u16(), "Redirect");
                current = next;
                continue;
            }

            if !status.is_success() {
                return Err(AppError::HttpError(format!(
                    "HTTP {} for {current}",
                    status.as_u16()
                )));
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let body = self.read_body(&current, response).await?;

            tracing::debug!(
                %url,
                final_url = %current,
                %content_type,
                bytes = body.len(),
                "Fetched"
            );

            return Ok(FetchedDocument {
                url: current.to_string(),
                body,
                content_type,
            });
        }

        Err(AppError::HttpError(format!("Too many redirects fetching {url}")))
    }
}

/// Absolute URL a redirect response points to, relative to `current`.
fn redirect_target(current: &Url, response: &Response) -> Option<Url> {
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    current.join(location).ok()
}

// ---------------------------------------------------------------------------
// Address check
// ---------------------------------------------------------------------------

/// Refuse URLs that are not http(s) or whose host is, or resolves to, a
/// non-public address.
async fn check_public(url: &Url) -> Result<(), AppError> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::ValidationError(format!(
            "URL scheme '{}' is not allowed (only http/https)",
            url.scheme()
        )));
    }

    let refuse = |ip: IpAddr| {
        AppError::ValidationError(format!("Refusing {url}: {ip} is not a public address"))
    };

    match url.host() {
        Some(Host::Ipv4(ip)) if is_blocked_v4(ip) => Err(refuse(IpAddr::V4(ip))),
        Some(Host::Ipv6(ip)) if is_blocked_v6(ip) => Err(refuse(IpAddr::V6(ip))),
        Some(Host::Ipv4(_) | Host::Ipv6(_)) => Ok(()),
        Some(Host::Domain(domain)) => {
            let port = url.port_or_known_default().unwrap_or(80);
            let addrs: Vec<IpAddr> = tokio::net::lookup_host((domain, port))
                .await
                .map_err(|e| {
                    AppError::NetworkError(format!("DNS resolution failed for {domain}: {e}"))
                })?
                .map(|addr| addr.ip())
                .collect();

            if addrs.is_empty() {
                return Err(AppError::NetworkError(format!(
                    "DNS resolution returned no addresses for {domain}"
                )));
            }
            match addrs.into_iter().find(|ip| is_blocked(*ip)) {
                Some(ip) => Err(refuse(ip)),
                None => Ok(()),
            }
        }
        None => Err(AppError::ValidationError(format!("URL {url} has no host"))),
    }
}

fn is_blocked(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_v4(v4),
        IpAddr::V6(v6) => is_blocked_v6(v6),
    }
}

fn is_blocked_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_documentation()
        || ip.is_multicast()
        || a == 0
        // 100.64.0.0/10 shared address space
        || (a == 100 && (64..128).contains(&b))
        // 198.18.0.0/15 benchmarking
        || (a == 198 && (b == 18 || b == 19))
}

fn is_blocked_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_blocked_v4(v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        // fe80::/10 link-local
        || (first & 0xffc0) == 0xfe80
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
}
