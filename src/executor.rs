// File: executor.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026
// - Volker Schwaberow <volker@schwaberow.de>

use crate::client::{build_http_client, RetryClient, SprayRetryPolicy};
use crate::config::ExecutorConfig;
use crate::error::ExecuteError;
use crate::matcher::{Matcher, MatcherCondition};
use crate::output::{OutputEntry, OutputWriter};
use crate::requests::{CompiledRequest, HttpRequestSpec, LazyHeaders};
use crate::template::Template;
use log::{debug, info, warn};
use std::sync::Arc;

/// Configuration for one executor: the template request to drive, the
/// shared output sink and the client options.
pub struct HttpExecutorOptions {
    pub template: Arc<Template>,
    pub request: HttpRequestSpec,
    pub output: Arc<OutputWriter>,
    pub config: ExecutorConfig,
}

/// Drives one template request block against one target URL.
///
/// The executor owns its client; nothing but the output sink is shared
/// with other executors, so many of them can run concurrently.
pub struct HttpExecutor {
    client: RetryClient,
    template: Arc<Template>,
    request: HttpRequestSpec,
    output: Arc<OutputWriter>,
}

impl HttpExecutor {
    pub fn new(options: HttpExecutorOptions) -> Result<Self, reqwest::Error> {
        let client = build_http_client(
            &options.config,
            options.request.redirects,
            options.request.max_redirects,
        )?;
        Ok(Self {
            client: RetryClient::new(client, SprayRetryPolicy::new(options.config.retries())),
            template: options.template,
            request: options.request,
            output: options.output,
        })
    }

    /// Learns what a generic not-found response looks like on this
    /// target before any auto matcher is evaluated.
    ///
    /// Two probes with random path tokens of 16 and 32 characters are
    /// issued; distinct lengths reduce the chance of colliding with a
    /// real resource. For every auto matcher in the spec a fresh
    /// instance bound to this URL is returned; the template's own
    /// matcher list is never touched, so concurrent executions of the
    /// same template cannot observe each other's baselines.
    pub async fn configure_auto_baseline(&self, url: &str) -> Result<Vec<Matcher>, ExecuteError> {
        if !self.request.matchers.iter().any(Matcher::is_auto) {
            return Ok(Vec::new());
        }

        let probes = vec![
            self.request.compile_calibration(url, 16)?,
            self.request.compile_calibration(url, 32)?,
        ];

        let mut observations = Vec::with_capacity(probes.len());
        for probe in &probes {
            let response = self
                .client
                .send(probe)
                .await
                .map_err(ExecuteError::Transport)?;
            let status = response.status().as_u16();
            let data = response.bytes().await.map_err(ExecuteError::Read)?;
            debug!(
                "calibration probe {} -> status {}, {} bytes",
                probe.url,
                status,
                data.len()
            );
            observations.push((data.len(), status));
        }

        let mut overlay = Vec::new();
        for matcher in self.request.matchers.iter().filter(|m| m.is_auto()) {
            let mut bound = matcher.clone();
            bound.target = Some(url.to_string());
            for (size, status) in &observations {
                bound.record_baseline(*size, *status);
            }
            overlay.push(bound);
        }
        Ok(overlay)
    }

    /// Executes the compiled requests for one target, feeding each
    /// response through the matcher/extractor pipeline. Absence of
    /// matches is not an error.
    pub async fn execute(&self, url: &str) -> Result<(), ExecuteError> {
        let compiled = self.request.compile_for(url)?;

        // A failed calibration downgrades auto matchers to an empty
        // baseline instead of aborting the target.
        let overlay = match self.configure_auto_baseline(url).await {
            Ok(overlay) => overlay,
            Err(err) => {
                warn!("auto calibration failed for {}: {}", url, err);
                Vec::new()
            }
        };

        'requests: for request in &compiled {
            let response = self
                .client
                .send(request)
                .await
                .map_err(ExecuteError::Transport)?;
            let status = response.status().as_u16();
            let header_map = response.headers().clone();
            let data = response.bytes().await.map_err(ExecuteError::Read)?;

            let mut headers = LazyHeaders::new(&header_map);
            let condition = self.request.matchers_condition;

            for matcher in self.request.matchers.iter().chain(overlay.iter()) {
                if let Some(target) = &matcher.target {
                    if target != url {
                        continue;
                    }
                }
                let header_text = if matcher.part.needs_headers() {
                    headers.get()
                } else {
                    ""
                };
                if !matcher.matches(status, &data, header_text) {
                    if condition == MatcherCondition::And {
                        continue 'requests;
                    }
                } else if condition == MatcherCondition::Or && self.request.extractors.is_empty() {
                    self.write_output(request, Some(matcher), &[])?;
                }
            }

            let mut extracted = Vec::new();
            for extractor in &self.request.extractors {
                let header_text = if extractor.part().needs_headers() {
                    headers.get()
                } else {
                    ""
                };
                extracted.extend(extractor.extract(&data, header_text));
            }

            if !extracted.is_empty() || condition == MatcherCondition::And {
                self.write_output(request, None, &extracted)?;
            }
        }
        Ok(())
    }

    fn write_output(
        &self,
        request: &CompiledRequest,
        matcher: Option<&Matcher>,
        extracted: &[String],
    ) -> Result<(), ExecuteError> {
        let entry = OutputEntry {
            template_id: self.template.id.clone(),
            url: request.url.to_string(),
            matcher_name: matcher.map(Matcher::display_name),
            extracted_results: extracted.to_vec(),
        };
        info!("{} matched on {}", self.template.id, entry.url);
        self.output.write(&entry).map_err(ExecuteError::Output)
    }

    /// Flushes the shared output sink. Call once at teardown.
    pub fn close(&self) -> Result<(), ExecuteError> {
        self.output.close().map_err(ExecuteError::Output)
    }
}
