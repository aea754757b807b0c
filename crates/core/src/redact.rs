// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret redaction for structured logging.
//!
//! Tokens forwarded into project containers (`GITHUB_TOKEN`, `GITLAB_TOKEN`,
//! `BITBUCKET_TOKEN`, `GIT_TOKEN`) are read once from the process
//! environment at startup and never logged verbatim. [`SecretRedactor`]
//! holds that denylist and is threaded explicitly through components that
//! log — no thread-local or ambient global, per the "no ambient state"
//! design note.

use std::collections::HashSet;

/// Environment variable names recognized as git hosting credentials.
pub const GIT_AUTH_ENV_VARS: &[&str] =
    &["GITHUB_TOKEN", "GITLAB_TOKEN", "BITBUCKET_TOKEN", "GIT_TOKEN"];

const REDACTED: &str = "<redacted>";

/// Holds the set of secret values a logger must never print verbatim.
///
/// Built once at process start from the environment, then passed by value
/// (it's cheap to clone — an `Arc`-free `HashSet<String>` of a handful of
/// short strings) to every component that formats log output.
#[derive(Debug, Clone, Default)]
pub struct SecretRedactor {
    denylist: HashSet<String>,
}

impl SecretRedactor {
    /// Collect values of [`GIT_AUTH_ENV_VARS`] present in the process
    /// environment into a redaction denylist.
    pub fn from_env() -> Self {
        let denylist = GIT_AUTH_ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .filter(|v| !v.is_empty())
            .collect();
        Self { denylist }
    }

    /// Build a redactor from an explicit set of secret values (for tests).
    pub fn from_values(values: impl IntoIterator<Item = String>) -> Self {
        Self { denylist: values.into_iter().filter(|v| !v.is_empty()).collect() }
    }

    /// Replace every occurrence of a denylisted value in `text` with a
    /// redaction marker. Cheap no-op when the denylist is empty.
    pub fn redact(&self, text: &str) -> String {
        if self.denylist.is_empty() {
            return text.to_string();
        }
        let mut out = text.to_string();
        for secret in &self.denylist {
            out = out.replace(secret.as_str(), REDACTED);
        }
        out
    }

    /// True if `value` is exactly one of the denylisted secrets.
    pub fn is_secret(&self, value: &str) -> bool {
        self.denylist.contains(value)
    }
}
