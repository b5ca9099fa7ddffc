// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use mismetas_app::{ActiveActivity, CursorAction, FrontendState};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// HTTP client for the goal backend. One instance per process; cloning is
/// cheap and clones share the underlying connection pool, which is what the
/// worker-thread dispatch relies on.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("backend.base_url must not be empty");
        }
        let parsed = Url::parse(&base_url)
            .with_context(|| format!("invalid backend.base_url {base_url:?}"))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            bail!(
                "backend.base_url {base_url:?} must use http or https, got {}",
                parsed.scheme()
            );
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Primes the backend session. Called once before the first fetch.
    pub fn load(&self) -> Result<()> {
        self.post_unit("load", serde_json::json!({}))
    }

    /// Reads the authoritative state snapshot. `None` means the backend has
    /// nothing to report yet; callers must leave their caches untouched.
    pub fn fetch(&self) -> Result<Option<FrontendState>> {
        let response = self
            .http
            .get(format!("{}/fetch", self.base_url))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let body = response.text().context("read fetch response")?;
        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(None);
        }
        let state: FrontendState =
            serde_json::from_str(trimmed).context("decode fetch snapshot")?;
        Ok(Some(state))
    }

    /// Submits a commandline buffer, mode marker already stripped. The
    /// backend's result is implementation-defined and discarded here.
    pub fn app_command(&self, command: &str) -> Result<()> {
        self.post_unit("app_command", serde_json::json!({ "command": command }))
    }

    pub fn cursor_action(&self, action: CursorAction) -> Result<()> {
        self.post_unit(
            "cursor_action",
            serde_json::json!({ "cursorAction": action.as_str() }),
        )
    }

    pub fn set_active_activity(&self, activity: ActiveActivity) -> Result<()> {
        self.post_unit(
            "set_active_activity",
            serde_json::json!({ "newActiveActivity": activity.as_str() }),
        )
    }

    fn post_unit(&self, endpoint: &str, body: serde_json::Value) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/{endpoint}", self.base_url))
            .json(&body)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &text));
        }

        let _ = response.text();
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- start the goal backend and check [backend].base_url ({})",
        base_url,
        error
    )
}

/// Surfaces the backend's own error text verbatim when it sent one; the
/// commandline displays this string untouched.
fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(error) = parsed.error
        && !error.is_empty()
    {
        return anyhow!("{error}");
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() < 200 && !trimmed.contains('{') {
        return anyhow!("{trimmed}");
    }

    anyhow!("backend returned {}", status.as_u16())
}
