// File: client.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026
// - Volker Schwaberow <volker@schwaberow.de>

use crate::config::ExecutorConfig;
use crate::requests::CompiledRequest;
use log::{debug, warn};
use std::time::Duration;

/// Redirects allowed when a template enables them without a limit.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

const RETRY_WAIT_MIN: Duration = Duration::from_secs(1);
const RETRY_WAIT_MAX: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectDecision {
    Follow,
    Stop,
}

/// Pure redirect decision, re-evaluated on every hop. `previous` is
/// the cumulative number of requests already made in the chain,
/// including the original one.
pub fn redirect_decision(
    follow_redirects: bool,
    max_redirects: usize,
    previous: usize,
) -> RedirectDecision {
    if !follow_redirects {
        return RedirectDecision::Stop;
    }
    let cap = if max_redirects == 0 {
        DEFAULT_MAX_REDIRECTS
    } else {
        max_redirects
    };
    if previous > cap {
        RedirectDecision::Stop
    } else {
        RedirectDecision::Follow
    }
}

/// Retry schedule that keeps no per-host backoff state, suited to
/// spraying requests over many distinct targets. Exponential waits,
/// capped at ten seconds regardless of the retry count.
#[derive(Debug, Clone)]
pub struct SprayRetryPolicy {
    retries: u32,
    wait_min: Duration,
    wait_max: Duration,
}

impl SprayRetryPolicy {
    pub fn new(retries: u32) -> Self {
        Self {
            retries,
            wait_min: RETRY_WAIT_MIN,
            wait_max: RETRY_WAIT_MAX,
        }
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Wait before the retry following failed attempt `attempt`
    /// (0-indexed): wait_min doubled per attempt, capped at wait_max.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(31);
        self.wait_min.saturating_mul(factor).min(self.wait_max)
    }
}

/// One reusable transport-configured client plus its retry schedule.
/// Only transport-level failures are retried; any HTTP response, even
/// a 5xx, counts as a completed attempt.
#[derive(Debug, Clone)]
pub struct RetryClient {
    client: reqwest::Client,
    policy: SprayRetryPolicy,
}

impl RetryClient {
    pub fn new(client: reqwest::Client, policy: SprayRetryPolicy) -> Self {
        Self { client, policy }
    }

    pub async fn send(&self, request: &CompiledRequest) -> Result<reqwest::Response, reqwest::Error> {
        let mut attempt: u32 = 0;
        loop {
            match self.send_once(request).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    if attempt >= self.policy.retries() {
                        return Err(err);
                    }
                    let wait = self.policy.backoff(attempt);
                    debug!(
                        "request to {} failed ({}), retry {} of {} in {:?}",
                        request.url,
                        err,
                        attempt + 1,
                        self.policy.retries(),
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn send_once(&self, request: &CompiledRequest) -> Result<reqwest::Response, reqwest::Error> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        builder.send().await
    }
}

/// Builds the transport-configured client for one executor.
///
/// Certificate verification is disabled on purpose: probed targets
/// routinely present self-signed or otherwise non-conforming
/// certificates. Connection reuse is disabled so no connection state
/// leaks between test payloads. A proxy URL that fails to parse is
/// logged and skipped, falling back to direct dialing.
pub fn build_http_client(
    config: &ExecutorConfig,
    follow_redirects: bool,
    max_redirects: usize,
) -> Result<reqwest::Client, reqwest::Error> {
    let policy = reqwest::redirect::Policy::custom(move |attempt| {
        match redirect_decision(follow_redirects, max_redirects, attempt.previous().len()) {
            RedirectDecision::Follow => attempt.follow(),
            RedirectDecision::Stop => attempt.stop(),
        }
    });

    let mut builder = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(config.timeout()))
        .redirect(policy);

    if let Some(socks_url) = config.socks_proxy_url() {
        match reqwest::Proxy::all(socks_url) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(err) => warn!(
                "invalid socks proxy url {}, falling back to direct connection: {}",
                socks_url, err
            ),
        }
    }
    if let Some(proxy_url) = config.proxy_url() {
        match reqwest::Proxy::all(proxy_url) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(err) => warn!(
                "invalid proxy url {}, falling back to direct connection: {}",
                proxy_url, err
            ),
        }
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(false, 0, 1, RedirectDecision::Stop)]
    #[case(false, 5, 1, RedirectDecision::Stop)]
    #[case(true, 0, 10, RedirectDecision::Follow)]
    #[case(true, 0, 11, RedirectDecision::Stop)]
    #[case(true, 3, 3, RedirectDecision::Follow)]
    #[case(true, 3, 4, RedirectDecision::Stop)]
    #[case(true, 15, 11, RedirectDecision::Follow)]
    #[case(true, 15, 16, RedirectDecision::Stop)]
    fn test_redirect_decision(
        #[case] follow: bool,
        #[case] max: usize,
        #[case] previous: usize,
        #[case] expected: RedirectDecision,
    ) {
        assert_eq!(redirect_decision(follow, max, previous), expected);
    }

    #[test]
    fn test_redirects_disabled_stops_on_first_opportunity() {
        for previous in 0..20 {
            assert_eq!(
                redirect_decision(false, 0, previous),
                RedirectDecision::Stop
            );
        }
    }

    #[test]
    fn test_spray_backoff_doubles_then_caps() {
        let policy = SprayRetryPolicy::new(10);
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
        assert_eq!(policy.backoff(3), Duration::from_secs(8));
        assert_eq!(policy.backoff(4), Duration::from_secs(10));
        assert_eq!(policy.backoff(30), Duration::from_secs(10));
    }

    #[test]
    fn test_client_builds_with_malformed_socks_url() {
        let mut config = ExecutorConfig::new();
        config.set_socks_proxy_url(Some("://not-a-proxy".to_string()));
        let client = build_http_client(&config, false, 0);
        assert!(client.is_ok());
    }
}
