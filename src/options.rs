use std::time::Duration;

use crate::{retry::BackoffPolicy, Result, WormlyError};

/// Configures rate limiting, timeout and retry behavior.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientOptions {
    /// Request-rate ceiling shared by every call on one client.
    pub requests_per_second: f64,
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Growth factor applied to the delay after each retry.
    pub backoff_multiplier: f64,
    /// Upper bound for any single retry delay.
    pub max_backoff: Duration,
    /// Transport timeout for one attempt, used when the client builds its
    /// own `reqwest::Client`.
    pub timeout: Duration,
    /// Log request parameters and response bodies through the client logger.
    pub debug: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            requests_per_second: 3.0,
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(30),
            timeout: Duration::from_secs(30),
            debug: false,
        }
    }
}

impl ClientOptions {
    /// Checks the invariants the executor relies on.
    ///
    /// Client construction does not call this; it belongs to whatever loads
    /// the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.requests_per_second.is_finite() && self.requests_per_second > 0.0) {
            return Err(WormlyError::Config(format!(
                "requests_per_second must be a positive number, got {}",
                self.requests_per_second
            )));
        }
        if self.initial_backoff.is_zero() {
            return Err(WormlyError::Config(
                "initial_backoff must be greater than zero".to_owned(),
            ));
        }
        if !(self.backoff_multiplier.is_finite() && self.backoff_multiplier >= 1.0) {
            return Err(WormlyError::Config(format!(
                "backoff_multiplier must be at least 1, got {}",
                self.backoff_multiplier
            )));
        }
        if self.max_backoff < self.initial_backoff {
            return Err(WormlyError::Config(format!(
                "max_backoff ({:?}) must not be shorter than initial_backoff ({:?})",
                self.max_backoff, self.initial_backoff
            )));
        }
        if self.timeout.is_zero() {
            return Err(WormlyError::Config(
                "timeout must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }

    /// Reads overrides from `WORMLY_*` environment variables on top of the
    /// defaults, then validates the result.
    ///
    /// - `WORMLY_REQUESTS_PER_SECOND` (float)
    /// - `WORMLY_MAX_RETRIES` (integer)
    /// - `WORMLY_INITIAL_BACKOFF`, `WORMLY_MAX_BACKOFF`, `WORMLY_TIMEOUT`
    ///   (durations such as `1s`, `250ms`, `1m30s`)
    /// - `WORMLY_BACKOFF_MULTIPLIER` (float)
    /// - `WORMLY_DEBUG` (`true`/`false`/`1`/`0`)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ClientOptions::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(value) = read("WORMLY_REQUESTS_PER_SECOND") {
            options.requests_per_second = parse_number(&value, "WORMLY_REQUESTS_PER_SECOND")?;
        }
        if let Some(value) = read("WORMLY_MAX_RETRIES") {
            options.max_retries = value.trim().parse().map_err(|err| {
                WormlyError::Config(format!("WORMLY_MAX_RETRIES '{value}': {err}"))
            })?;
        }
        if let Some(value) = read("WORMLY_INITIAL_BACKOFF") {
            options.initial_backoff = parse_duration(&value).map_err(|err| {
                WormlyError::Config(format!("WORMLY_INITIAL_BACKOFF '{value}': {err}"))
            })?;
        }
        if let Some(value) = read("WORMLY_BACKOFF_MULTIPLIER") {
            options.backoff_multiplier = parse_number(&value, "WORMLY_BACKOFF_MULTIPLIER")?;
        }
        if let Some(value) = read("WORMLY_MAX_BACKOFF") {
            options.max_backoff = parse_duration(&value).map_err(|err| {
                WormlyError::Config(format!("WORMLY_MAX_BACKOFF '{value}': {err}"))
            })?;
        }
        if let Some(value) = read("WORMLY_TIMEOUT") {
            options.timeout = parse_duration(&value).map_err(|err| {
                WormlyError::Config(format!("WORMLY_TIMEOUT '{value}': {err}"))
            })?;
        }
        if let Some(value) = read("WORMLY_DEBUG") {
            options.debug = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    return Err(WormlyError::Config(format!(
                        "WORMLY_DEBUG must be a boolean, got '{other}'"
                    )))
                }
            };
        }

        options.validate()?;
        Ok(options)
    }

    pub(crate) fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            initial: self.initial_backoff,
            multiplier: self.backoff_multiplier,
            max: self.max_backoff,
        }
    }
}

fn parse_number(value: &str, name: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|err| WormlyError::Config(format!("{name} '{value}': {err}")))
}

/// Parses a duration string made of decimal numbers with unit suffixes,
/// e.g. `300ms`, `1.5s`, `1m30s`, `2h`. Accepted units: `ns`, `us`, `µs`,
/// `ms`, `s`, `m`, `h`. A bare `0` is accepted.
pub fn parse_duration(input: &str) -> std::result::Result<Duration, String> {
    let input = input.trim();
    if input == "0" {
        return Ok(Duration::ZERO);
    }
    if input.is_empty() {
        return Err("empty duration".to_owned());
    }
    if input.starts_with('-') {
        return Err("negative durations are not allowed".to_owned());
    }

    let mut rest = input.strip_prefix('+').unwrap_or(input);
    let mut total = Duration::ZERO;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(format!("expected a number in '{input}'"));
        }
        let number: f64 = rest[..number_len]
            .parse()
            .map_err(|_| format!("invalid number in '{input}'"))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit: f64 = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(format!("missing unit in '{input}'")),
            unit => return Err(format!("unknown unit '{unit}' in '{input}'")),
        };
        rest = &rest[unit_len..];

        let nanos = number * nanos_per_unit;
        if !nanos.is_finite() || nanos > u64::MAX as f64 {
            return Err(format!("duration '{input}' is out of range"));
        }
        total = total
            .checked_add(Duration::from_nanos(nanos.round() as u64))
            .ok_or_else(|| format!("duration '{input}' is out of range"))?;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, time::Duration};

    use super::{parse_duration, ClientOptions};
    use crate::WormlyError;

    #[test]
    fn defaults_are_valid() {
        let options = ClientOptions::default();
        options.validate().expect("defaults must validate");
        assert_eq!(options.requests_per_second, 3.0);
        assert_eq!(options.max_retries, 3);
        assert_eq!(options.initial_backoff, Duration::from_secs(1));
        assert_eq!(options.max_backoff, Duration::from_secs(30));
        assert!(!options.debug);
    }

    #[test]
    fn validate_rejects_broken_invariants() {
        let cases = [
            ClientOptions {
                requests_per_second: 0.0,
                ..ClientOptions::default()
            },
            ClientOptions {
                initial_backoff: Duration::ZERO,
                ..ClientOptions::default()
            },
            ClientOptions {
                backoff_multiplier: 0.5,
                ..ClientOptions::default()
            },
            ClientOptions {
                max_backoff: Duration::from_millis(10),
                ..ClientOptions::default()
            },
        ];
        for options in cases {
            assert!(
                matches!(options.validate(), Err(WormlyError::Config(_))),
                "{options:?} must be rejected"
            );
        }
    }

    #[test]
    fn parses_go_style_durations() {
        assert_eq!(parse_duration("1s"), Ok(Duration::from_secs(1)));
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("1m30s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("1.5h"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
        assert_eq!(parse_duration("10us"), Ok(Duration::from_micros(10)));
    }

    #[test]
    fn rejects_malformed_durations() {
        for input in ["", "10", "s", "5 parsecs", "-1s", "1x"] {
            assert!(parse_duration(input).is_err(), "'{input}' must fail");
        }
    }

    #[test]
    fn from_lookup_applies_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("WORMLY_REQUESTS_PER_SECOND", "10"),
            ("WORMLY_MAX_RETRIES", "5"),
            ("WORMLY_INITIAL_BACKOFF", "100ms"),
            ("WORMLY_MAX_BACKOFF", "2s"),
            ("WORMLY_DEBUG", "true"),
        ]);
        let options = ClientOptions::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
            .expect("options must load");

        assert_eq!(options.requests_per_second, 10.0);
        assert_eq!(options.max_retries, 5);
        assert_eq!(options.initial_backoff, Duration::from_millis(100));
        assert_eq!(options.max_backoff, Duration::from_secs(2));
        assert_eq!(options.backoff_multiplier, 2.0);
        assert!(options.debug);
    }

    #[test]
    fn from_lookup_reports_bad_values() {
        let err = ClientOptions::from_lookup(|name| {
            (name == "WORMLY_INITIAL_BACKOFF").then(|| "soon".to_owned())
        })
        .expect_err("must fail");
        assert!(err.to_string().contains("WORMLY_INITIAL_BACKOFF"));
    }
}
