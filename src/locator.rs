//! Remote file locators
//!
//! A locator addresses one file object on the remote store as
//! `namespace:path.suffix`, e.g. `prod:certs/web.crt`.
//!
//! - namespace: `[a-z0-9_-]{1,64}`
//! - path: `[a-z0-9_/-]{1,256}` followed by `.crt`, `.key`, `.yml` or `.json`
//!
//! Parsing is pure: nothing is read from disk or the network.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{RelayError, Result};

static LOCATOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z0-9_-]{1,64}):([a-z0-9_/-]{1,256}\.(?:crt|key|yml|json))$")
        .expect("locator pattern is valid")
});

/// A validated `namespace:path` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    namespace: String,
    path: String,
}

impl Locator {
    /// Parse a destination string. The whole string must match the grammar.
    pub fn parse(destination: &str) -> Result<Self> {
        let caps = LOCATOR_RE
            .captures(destination)
            .ok_or_else(|| RelayError::InvalidLocator(destination.to_string()))?;

        Ok(Self {
            namespace: caps[1].to_string(),
            path: caps[2].to_string(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Path inside the namespace, suffix included
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment, used as the file object's name
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

impl FromStr for Locator {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}
