use std::time::Duration;

use reqwest::header::CONNECTION;
use reqwest::redirect::Policy;
use reqwest::{Client, Method};
use tokio::time::Instant;
use url::Url;

use crate::config::{Protocol, Target};
use crate::error::{BenchError, Result};
use crate::metric::RequestOutcome;

/// Connection parameters of a target, resolved once before its first stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub target: Target,
    pub scheme: Protocol,
    pub host: String,
    pub port: u16,
    /// Path and query as normalized by URL parsing, `/` when the URL has no path.
    /// Dot segments are removed and reserved query characters percent-encoded.
    pub path: String,
}

impl RequestTarget {
    /// Resolve `target` for a run using `protocol`.
    ///
    /// A URL without a scheme inherits `protocol`. An explicit scheme that differs
    /// from `protocol` is a configuration error naming the target.
    pub fn resolve(target: &Target, protocol: Protocol) -> Result<Self> {
        let raw = target.url.trim();
        let absolute = match explicit_scheme(raw) {
            Some(scheme) if scheme.eq_ignore_ascii_case(protocol.as_str()) => raw.to_string(),
            Some(scheme) => {
                return Err(BenchError::config(format!(
                    "Target {} uses scheme '{}' which does not match test protocol '{}'",
                    target.name, scheme, protocol
                )));
            }
            None if raw.starts_with("//") => format!("{protocol}:{raw}"),
            None => format!("{protocol}://{raw}"),
        };

        let url = Url::parse(&absolute).map_err(|e| {
            BenchError::config(format!(
                "Target {} has an invalid url '{}': {e}",
                target.name, target.url
            ))
        })?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                BenchError::config(format!("Target {} url has no host", target.name))
            })?
            .to_string();
        let port = url
            .port_or_known_default()
            .unwrap_or_else(|| protocol.default_port());
        let path = match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_string(),
        };

        Ok(Self {
            target: target.clone(),
            scheme: protocol,
            host,
            port,
            path: if path.is_empty() { "/".to_string() } else { path },
        })
    }

    /// Absolute URL every request of this target is sent to.
    pub fn endpoint(&self) -> String {
        format!("{}://{}:{}{}", self.scheme, self.host, self.port, self.path)
    }
}

/// Returns the scheme of `raw` when it starts with `<scheme>://`.
fn explicit_scheme(raw: &str) -> Option<&str> {
    let (scheme, _) = raw.split_once("://")?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

/// Fires single requests at one resolved target and measures them.
///
/// Connections are never reused: the client keeps no idle connection and every
/// request asks the server to close. Redirects are not followed, so a 3xx is
/// classified as received.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    method: Method,
    url: Url,
}

impl HttpProbe {
    pub fn new(target: &RequestTarget, method: &str, timeout: Duration) -> Result<Self> {
        let method = Method::from_bytes(method.as_bytes()).map_err(|_| {
            BenchError::config(format!("request '{method}' is not a valid HTTP method"))
        })?;
        let url = Url::parse(&target.endpoint()).map_err(|e| {
            BenchError::config(format!(
                "Target {} resolves to an invalid url: {e}",
                target.target.name
            ))
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .redirect(Policy::none())
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            method,
            url,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Send one request and read the full body.
    ///
    /// Latency runs from just before the request is sent until the body is read.
    /// Network errors, timeouts and body read errors are all failures.
    pub async fn fire(&self) -> RequestOutcome {
        let started = Instant::now();
        let response = self
            .client
            .request(self.method.clone(), self.url.clone())
            .header(CONNECTION, "close")
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(_) => return RequestOutcome::Failure,
        };
        let status = response.status();
        if response.bytes().await.is_err() {
            return RequestOutcome::Failure;
        }
        RequestOutcome::classify(status.as_u16(), started.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(url: &str, protocol: Protocol) -> Result<RequestTarget> {
        RequestTarget::resolve(&Target::new("lb", url), protocol)
    }

    #[test]
    fn missing_path_defaults_to_root() {
        let resolved = resolve("http://example.test", Protocol::Http).unwrap();
        assert_eq!(resolved.host, "example.test");
        assert_eq!(resolved.port, 80);
        assert_eq!(resolved.path, "/");
        assert_eq!(resolved.endpoint(), "http://example.test:80/");
    }

    #[test]
    fn query_is_appended_to_the_path() {
        let resolved = resolve("https://example.test:8443/api/v1?x=1&y=two", Protocol::Https)
            .unwrap();
        assert_eq!(resolved.port, 8443);
        assert_eq!(resolved.path, "/api/v1?x=1&y=two");
    }

    #[test]
    fn path_and_query_are_normalized() {
        let resolved = resolve("http://h/a/../b?x=o'neil", Protocol::Http).unwrap();
        assert_eq!(resolved.path, "/b?x=o%27neil");
        assert_eq!(resolved.endpoint(), "http://h:80/b?x=o%27neil");
    }

    #[test]
    fn https_defaults_to_443() {
        let resolved = resolve("https://example.test/health", Protocol::Https).unwrap();
        assert_eq!(resolved.port, 443);
        assert_eq!(resolved.scheme, Protocol::Https);
    }

    #[test]
    fn schemeless_url_inherits_the_protocol() {
        let resolved = resolve("127.0.0.1:9000/ping", Protocol::Http).unwrap();
        assert_eq!(resolved.host, "127.0.0.1");
        assert_eq!(resolved.port, 9000);
        assert_eq!(resolved.path, "/ping");

        let resolved = resolve("//example.test/", Protocol::Https).unwrap();
        assert_eq!(resolved.port, 443);
    }

    #[test]
    fn scheme_mismatch_names_the_target() {
        let err = RequestTarget::resolve(
            &Target::new("edge-proxy", "https://example.test"),
            Protocol::Http,
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(err.is_config());
        assert!(msg.contains("edge-proxy"), "{msg}");
        assert!(msg.contains("'https'"), "{msg}");
    }

    #[test]
    fn scheme_comparison_ignores_case() {
        assert!(resolve("HTTP://example.test", Protocol::Http).is_ok());
    }

    #[test]
    fn ipv6_hosts_keep_their_brackets() {
        let resolved = resolve("http://[::1]:8080/", Protocol::Http).unwrap();
        assert_eq!(resolved.endpoint(), "http://[::1]:8080/");
    }

    #[test]
    fn unparsable_url_is_a_config_error() {
        let err = resolve("http://exa mple.test", Protocol::Http).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn probe_rejects_an_invalid_method() {
        let target = resolve("http://127.0.0.1:1/", Protocol::Http).unwrap();
        let err = HttpProbe::new(&target, "BAD METHOD", Duration::from_secs(1)).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn probe_targets_the_resolved_endpoint() {
        let target = resolve("http://127.0.0.1:8080/a?b=c", Protocol::Http).unwrap();
        let probe = HttpProbe::new(&target, "GET", Duration::from_secs(1)).unwrap();
        assert_eq!(probe.url().as_str(), "http://127.0.0.1:8080/a?b=c");
    }

    #[tokio::test]
    async fn refused_connection_is_a_failure() {
        // Bind then drop to obtain a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let target = resolve(&format!("http://127.0.0.1:{port}/"), Protocol::Http).unwrap();
        let probe = HttpProbe::new(&target, "GET", Duration::from_millis(500)).unwrap();
        assert_eq!(probe.fire().await, RequestOutcome::Failure);
    }
}
