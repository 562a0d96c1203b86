use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{BenchError, Result};
use crate::executor::{Stage, plan_stages};

/// URL scheme used by every target of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::Http => 80,
            Protocol::Https => 443,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            other => Err(BenchError::config(format!(
                "Unsupported protocol '{other}': only http and https are supported"
            ))),
        }
    }
}

/// Parameters shared by every target of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestConfig {
    /// HTTP method, uppercased
    pub method: String,
    pub protocol: Protocol,
    /// Concurrency of the first stage
    pub min_clients: usize,
    /// Concurrency of the last stage
    pub max_clients: usize,
    /// Duration of each stage in seconds
    pub stage_interval_s: f64,
    /// Minimum spacing between request starts of one worker, in milliseconds
    pub request_delay_ms: f64,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: f64,
    pub stage_count: usize,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            protocol: Protocol::Http,
            min_clients: 1,
            max_clients: 1,
            stage_interval_s: 10.0,
            request_delay_ms: 0.0,
            request_timeout_ms: 1000.0,
            stage_count: 5,
        }
    }
}

impl TestConfig {
    pub fn stage_interval(&self) -> Duration {
        secs(self.stage_interval_s)
    }

    pub fn request_delay(&self) -> Duration {
        secs(self.request_delay_ms / 1000.0)
    }

    pub fn request_timeout(&self) -> Duration {
        secs(self.request_timeout_ms / 1000.0)
    }

    /// The stage plan of this test, shared by all targets.
    pub fn stages(&self) -> Vec<Stage> {
        plan_stages(
            self.min_clients,
            self.max_clients,
            self.stage_interval(),
            self.stage_count,
        )
    }

    /// Check the ranges the stage planner and the worker loop rely on.
    pub fn validate(&self) -> Result<()> {
        if reqwest::Method::from_bytes(self.method.as_bytes()).is_err() {
            return Err(BenchError::config(format!(
                "request '{}' is not a valid HTTP method",
                self.method
            )));
        }
        if self.min_clients < 1 {
            return Err(BenchError::config("min_clients must be at least 1"));
        }
        if self.max_clients < self.min_clients {
            return Err(BenchError::config(format!(
                "max_clients ({}) must not be lower than min_clients ({})",
                self.max_clients, self.min_clients
            )));
        }
        if self.stage_count < 1 {
            return Err(BenchError::config("stage_count must be at least 1"));
        }
        non_negative("stage_interval_s", self.stage_interval_s)?;
        non_negative("request_delay_ms", self.request_delay_ms)?;
        if !(self.request_timeout_ms.is_finite() && self.request_timeout_ms > 0.0) {
            return Err(BenchError::config(
                "request_timeout_ms must be a positive number",
            ));
        }
        Ok(())
    }
}

/// Negative or non-finite values collapse to zero instead of panicking.
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

fn non_negative(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(BenchError::config(format!(
            "{field} must be a non-negative number"
        )))
    }
}

/// One endpoint under test
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    /// Label used in progress lines and summaries
    pub name: String,
    /// Absolute URL
    pub url: String,
}

impl Target {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// A validated benchmark configuration: the test parameters and the ordered target list.
///
/// The file format is TOML:
///
/// ```toml
/// [test]
/// request = "GET"
/// protocol = "http"
/// min_clients = 1
/// max_clients = 50
/// stage_interval_s = 10
/// request_delay_ms = 0
/// request_timeout_ms = 1000
/// stage_count = 5
///
/// [[targets]]
/// name = "nginx"
/// url = "http://127.0.0.1:8080/health"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchConfig {
    pub test: TestConfig,
    pub targets: Vec<Target>,
}

impl BenchConfig {
    /// Read and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| BenchError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config = content.parse::<BenchConfig>()?;
        info!(
            "Loaded configuration from {} with {} target(s)",
            path.display(),
            config.targets.len()
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.test.validate()?;

        if self.targets.is_empty() {
            return Err(BenchError::config(
                "at least one [[targets]] entry is required",
            ));
        }
        let mut seen = HashSet::new();
        for target in &self.targets {
            if target.name.trim().is_empty() {
                return Err(BenchError::config("every target needs a non-empty name"));
            }
            if target.url.trim().is_empty() {
                return Err(BenchError::config(format!(
                    "target {} has an empty url",
                    target.name
                )));
            }
            if !seen.insert(target.name.as_str()) {
                return Err(BenchError::config(format!(
                    "target name {} is used more than once",
                    target.name
                )));
            }
        }
        Ok(())
    }
}

impl FromStr for BenchConfig {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(s)?;
        let test: TestConfig = raw
            .test
            .ok_or_else(|| BenchError::config("a [test] section is required"))?
            .try_into()?;
        let config = BenchConfig {
            test,
            targets: raw.targets,
        };
        config.validate()?;
        debug!("Parsed configuration: {config:?}");
        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    test: Option<RawTestSection>,
    #[serde(default)]
    targets: Vec<Target>,
}

/// The `[test]` section as written, before normalization.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawTestSection {
    #[serde(alias = "method")]
    request: String,
    protocol: String,
    min_clients: i64,
    max_clients: i64,
    stage_interval_s: f64,
    request_delay_ms: f64,
    request_timeout_ms: f64,
    stage_count: i64,
}

impl Default for RawTestSection {
    fn default() -> Self {
        let defaults = TestConfig::default();
        Self {
            request: defaults.method,
            protocol: defaults.protocol.to_string(),
            min_clients: defaults.min_clients as i64,
            max_clients: defaults.max_clients as i64,
            stage_interval_s: defaults.stage_interval_s,
            request_delay_ms: defaults.request_delay_ms,
            request_timeout_ms: defaults.request_timeout_ms,
            stage_count: defaults.stage_count as i64,
        }
    }
}

impl TryFrom<RawTestSection> for TestConfig {
    type Error = BenchError;

    fn try_from(raw: RawTestSection) -> Result<Self> {
        let count = |field: &str, value: i64| {
            usize::try_from(value)
                .map_err(|_| BenchError::config(format!("{field} must be at least 1")))
        };
        Ok(TestConfig {
            method: raw.request.trim().to_ascii_uppercase(),
            protocol: raw.protocol.parse()?,
            min_clients: count("min_clients", raw.min_clients)?,
            max_clients: count("max_clients", raw.max_clients)?,
            stage_interval_s: raw.stage_interval_s,
            request_delay_ms: raw.request_delay_ms,
            request_timeout_ms: raw.request_timeout_ms,
            stage_count: count("stage_count", raw.stage_count)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        [test]
        request = "post"
        protocol = "HTTPS"
        min_clients = 2
        max_clients = 20
        stage_interval_s = 2.5
        request_delay_ms = 10
        request_timeout_ms = 750
        stage_count = 3

        [[targets]]
        name = "haproxy"
        url = "https://lb-a.internal/health?deep=1"

        [[targets]]
        name = "envoy"
        url = "https://lb-b.internal/"
    "#;

    fn config_error(input: &str) -> String {
        match input.parse::<BenchConfig>() {
            Err(BenchError::Config(msg)) => msg,
            other => panic!("expected a configuration error, got {other:?}"),
        }
    }

    #[test]
    fn parses_a_full_configuration() {
        let config: BenchConfig = FULL.parse().unwrap();

        assert_eq!(config.test.method, "POST");
        assert_eq!(config.test.protocol, Protocol::Https);
        assert_eq!(config.test.min_clients, 2);
        assert_eq!(config.test.max_clients, 20);
        assert_eq!(config.test.stage_interval(), Duration::from_millis(2500));
        assert_eq!(config.test.request_delay(), Duration::from_millis(10));
        assert_eq!(config.test.request_timeout(), Duration::from_millis(750));
        assert_eq!(config.test.stage_count, 3);
        assert_eq!(
            config.targets,
            vec![
                Target::new("haproxy", "https://lb-a.internal/health?deep=1"),
                Target::new("envoy", "https://lb-b.internal/"),
            ]
        );
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config: BenchConfig = r#"
            [test]

            [[targets]]
            name = "local"
            url = "http://127.0.0.1:8080"
        "#
        .parse()
        .unwrap();

        assert_eq!(config.test, TestConfig::default());
        assert_eq!(config.test.stages().len(), 5);
    }

    #[test]
    fn method_alias_is_accepted() {
        let config: BenchConfig = r#"
            [test]
            method = "head"

            [[targets]]
            name = "local"
            url = "http://127.0.0.1:8080"
        "#
        .parse()
        .unwrap();
        assert_eq!(config.test.method, "HEAD");
    }

    #[test]
    fn test_section_is_required() {
        let msg = config_error(
            r#"
            [[targets]]
            name = "local"
            url = "http://127.0.0.1"
        "#,
        );
        assert!(msg.contains("[test]"), "{msg}");
    }

    #[test]
    fn unsupported_protocol_is_rejected() {
        let msg = config_error(
            r#"
            [test]
            protocol = "ftp"

            [[targets]]
            name = "local"
            url = "ftp://127.0.0.1"
        "#,
        );
        assert!(msg.contains("ftp"), "{msg}");
    }

    #[test]
    fn at_least_one_target_is_required() {
        let msg = config_error("[test]\n");
        assert!(msg.contains("targets"), "{msg}");
    }

    #[test]
    fn duplicate_target_names_are_rejected() {
        let msg = config_error(
            r#"
            [test]

            [[targets]]
            name = "lb"
            url = "http://a"

            [[targets]]
            name = "lb"
            url = "http://b"
        "#,
        );
        assert!(msg.contains("lb"), "{msg}");
    }

    #[test]
    fn inverted_client_range_is_rejected() {
        let msg = config_error(
            r#"
            [test]
            min_clients = 10
            max_clients = 5

            [[targets]]
            name = "lb"
            url = "http://a"
        "#,
        );
        assert!(msg.contains("max_clients"), "{msg}");
    }

    #[test]
    fn negative_counts_are_rejected() {
        let msg = config_error(
            r#"
            [test]
            min_clients = -1

            [[targets]]
            name = "lb"
            url = "http://a"
        "#,
        );
        assert!(msg.contains("min_clients"), "{msg}");
    }

    #[test]
    fn timeout_must_be_positive() {
        let msg = config_error(
            r#"
            [test]
            request_timeout_ms = 0

            [[targets]]
            name = "lb"
            url = "http://a"
        "#,
        );
        assert!(msg.contains("request_timeout_ms"), "{msg}");
    }

    #[test]
    fn invalid_method_is_rejected() {
        let msg = config_error(
            r#"
            [test]
            request = "GE T"

            [[targets]]
            name = "lb"
            url = "http://a"
        "#,
        );
        assert!(msg.contains("GE T"), "{msg}");
    }

    #[test]
    fn syntax_errors_surface_as_parse_errors() {
        let err = "[test\n".parse::<BenchConfig>().unwrap_err();
        assert!(matches!(err, BenchError::ConfigParse(_)));
    }

    #[test]
    fn scheme_mismatch_is_left_to_the_runner() {
        let config: BenchConfig = r#"
            [test]
            protocol = "http"

            [[targets]]
            name = "secure"
            url = "https://127.0.0.1"
        "#
        .parse()
        .unwrap();
        assert_eq!(config.targets.len(), 1);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = BenchConfig::load("does/not/exist.toml").unwrap_err();
        assert!(matches!(err, BenchError::ConfigFile { .. }));
        assert!(err.to_string().contains("does/not/exist.toml"));
    }

    #[test]
    fn protocol_parsing_is_case_insensitive() {
        assert_eq!("HTTP".parse::<Protocol>().unwrap(), Protocol::Http);
        assert_eq!(" https ".parse::<Protocol>().unwrap(), Protocol::Https);
        assert!("ws".parse::<Protocol>().is_err());
    }
}
