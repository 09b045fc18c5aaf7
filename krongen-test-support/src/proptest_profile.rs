//! Environment-driven tuning shared by every property-test suite.
//!
//! `KRONGEN_PROPTEST_CASES` overrides the case count and `KRONGEN_PBT_FORK`
//! toggles forked execution. Invalid overrides fall back to the suite default
//! with a warning.

use std::env;

use thiserror::Error;

/// Environment variable controlling proptest case counts.
pub const CASES_ENV_KEY: &str = "KRONGEN_PROPTEST_CASES";
/// Environment variable controlling proptest process forking.
pub const FORK_ENV_KEY: &str = "KRONGEN_PBT_FORK";

/// Rejected override value.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum OverrideError {
    /// The case count was not a positive integer.
    #[error("expected a positive case count, got `{0}`")]
    Cases(String),
    /// The fork flag was not a recognised boolean.
    #[error("expected one of true/false/1/0/yes/no/on/off, got `{0}`")]
    Fork(String),
}

/// Case count and fork setting for one property suite.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ProptestProfile {
    cases: u32,
    fork: bool,
}

impl ProptestProfile {
    /// Applies the process environment to the suite defaults.
    ///
    /// # Examples
    /// ```
    /// use krongen_test_support::proptest_profile::ProptestProfile;
    ///
    /// let profile = ProptestProfile::from_env(64, false);
    /// assert!(profile.cases() > 0);
    /// ```
    #[must_use]
    pub fn from_env(default_cases: u32, default_fork: bool) -> Self {
        Self::resolve(
            env::var(CASES_ENV_KEY).ok().as_deref(),
            env::var(FORK_ENV_KEY).ok().as_deref(),
            default_cases,
            default_fork,
        )
    }

    /// Applies raw override values to the suite defaults.
    #[must_use]
    pub fn resolve(
        cases: Option<&str>,
        fork: Option<&str>,
        default_cases: u32,
        default_fork: bool,
    ) -> Self {
        Self {
            cases: apply(CASES_ENV_KEY, cases, default_cases, parse_cases),
            fork: apply(FORK_ENV_KEY, fork, default_fork, parse_fork),
        }
    }

    /// Number of cases to run per property.
    #[must_use]
    pub const fn cases(&self) -> u32 {
        self.cases
    }

    /// Whether cases run in forked subprocesses.
    #[must_use]
    pub const fn fork(&self) -> bool {
        self.fork
    }
}

fn apply<T>(
    key: &'static str,
    raw: Option<&str>,
    default: T,
    parse: fn(&str) -> Result<T, OverrideError>,
) -> T {
    let Some(raw) = raw else {
        return default;
    };
    parse(raw).unwrap_or_else(|error| {
        tracing::warn!(env = key, %error, "ignoring property-test override");
        default
    })
}

fn parse_cases(raw: &str) -> Result<u32, OverrideError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|&cases| cases > 0)
        .ok_or_else(|| OverrideError::Cases(raw.to_owned()))
}

fn parse_fork(raw: &str) -> Result<bool, OverrideError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(OverrideError::Fork(raw.to_owned())),
    }
}
