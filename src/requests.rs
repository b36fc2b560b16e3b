// File: requests.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026
// - Volker Schwaberow <volker@schwaberow.de>

use crate::error::TemplateError;
use crate::extractor::Extractor;
use crate::matcher::{Matcher, MatcherCondition};
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::header::HeaderMap;
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const BASE_URL_PLACEHOLDER: &str = "{{BaseURL}}";

/// One HTTP request block of a template. A single spec may expand to
/// many compiled requests, one per path entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpRequestSpec {
    pub method: String,
    pub path: Vec<String>,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
    pub matchers: Vec<Matcher>,
    #[serde(rename = "matchers-condition")]
    pub matchers_condition: MatcherCondition,
    pub extractors: Vec<Extractor>,
    pub redirects: bool,
    #[serde(rename = "max-redirects")]
    pub max_redirects: usize,
}

impl Default for HttpRequestSpec {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            path: Vec::new(),
            headers: HashMap::new(),
            body: None,
            matchers: Vec::new(),
            matchers_condition: MatcherCondition::default(),
            extractors: Vec::new(),
            redirects: false,
            max_redirects: 0,
        }
    }
}

/// A concrete, fully parameterized request for one target.
#[derive(Debug, Clone)]
pub struct CompiledRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

impl HttpRequestSpec {
    fn method(&self) -> Result<Method, TemplateError> {
        Method::from_bytes(self.method.as_bytes())
            .map_err(|_| TemplateError::Method(self.method.clone()))
    }

    /// Compiles every path of the spec against one target URL, in
    /// declaration order.
    pub fn compile_for(&self, target: &str) -> Result<Vec<CompiledRequest>, TemplateError> {
        let method = self.method()?;
        let base = target.trim_end_matches('/');
        let mut compiled = Vec::with_capacity(self.path.len());
        for path in &self.path {
            let raw = if path.contains(BASE_URL_PLACEHOLDER) {
                path.replace(BASE_URL_PLACEHOLDER, base)
            } else if path.starts_with("http://") || path.starts_with("https://") {
                path.clone()
            } else {
                format!("{}/{}", base, path.trim_start_matches('/'))
            };
            let url = Url::parse(&raw).map_err(|e| TemplateError::Target(format!("{}: {}", raw, e)))?;
            compiled.push(CompiledRequest {
                method: method.clone(),
                url,
                headers: self.headers.clone(),
                body: self.body.clone(),
            });
        }
        Ok(compiled)
    }

    /// Compiles one calibration probe against a pseudo-random path of
    /// `token_length` alphanumeric characters under the target.
    pub fn compile_calibration(
        &self,
        target: &str,
        token_length: usize,
    ) -> Result<CompiledRequest, TemplateError> {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(token_length)
            .map(char::from)
            .collect();
        let raw = format!("{}/{}", target.trim_end_matches('/'), token);
        let url = Url::parse(&raw).map_err(|e| TemplateError::Target(format!("{}: {}", raw, e)))?;
        Ok(CompiledRequest {
            method: Method::GET,
            url,
            headers: self.headers.clone(),
            body: None,
        })
    }
}

/// Renders a header map as one "name: value" line per header.
pub fn headers_to_string(headers: &HeaderMap) -> String {
    let mut text = String::new();
    for (name, value) in headers {
        text.push_str(name.as_str());
        text.push_str(": ");
        match value.to_str() {
            Ok(value) => text.push_str(value),
            Err(_) => text.push_str(&String::from_utf8_lossy(value.as_bytes())),
        }
        text.push('\n');
    }
    text
}

/// Header text rendered at most once per response, and only when a
/// matcher or extractor actually asks for it.
pub struct LazyHeaders<'a> {
    headers: &'a HeaderMap,
    cached: Option<String>,
    builds: u32,
}

impl<'a> LazyHeaders<'a> {
    pub fn new(headers: &'a HeaderMap) -> Self {
        Self {
            headers,
            cached: None,
            builds: 0,
        }
    }

    pub fn get(&mut self) -> &str {
        if self.cached.is_none() {
            self.cached = Some(headers_to_string(self.headers));
            self.builds += 1;
        }
        self.cached.as_deref().unwrap_or_default()
    }

    pub fn builds(&self) -> u32 {
        self.builds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};

    fn spec_with_paths(paths: &[&str]) -> HttpRequestSpec {
        HttpRequestSpec {
            path: paths.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_compile_substitutes_base_url() {
        let spec = spec_with_paths(&["{{BaseURL}}/admin/", "{{BaseURL}}/.git/config"]);
        let compiled = spec.compile_for("http://example.com/").unwrap();
        assert_eq!(compiled.len(), 2);
        assert_eq!(compiled[0].url.as_str(), "http://example.com/admin/");
        assert_eq!(compiled[1].url.as_str(), "http://example.com/.git/config");
    }

    #[test]
    fn test_compile_joins_relative_path() {
        let spec = spec_with_paths(&["robots.txt"]);
        let compiled = spec.compile_for("http://example.com").unwrap();
        assert_eq!(compiled[0].url.as_str(), "http://example.com/robots.txt");
    }

    #[test]
    fn test_compile_preserves_order() {
        let spec = spec_with_paths(&["{{BaseURL}}/a", "{{BaseURL}}/b", "{{BaseURL}}/c"]);
        let compiled = spec.compile_for("http://example.com").unwrap();
        let paths: Vec<&str> = compiled.iter().map(|r| r.url.path()).collect();
        assert_eq!(paths, vec!["/a", "/b", "/c"]);
    }

    #[test]
    fn test_compile_invalid_target_fails() {
        let spec = spec_with_paths(&["{{BaseURL}}/x"]);
        assert!(spec.compile_for("not a url").is_err());
    }

    #[test]
    fn test_compile_invalid_method_fails() {
        let mut spec = spec_with_paths(&["{{BaseURL}}/x"]);
        spec.method = "GE T".to_string();
        assert!(spec.compile_for("http://example.com").is_err());
    }

    #[test]
    fn test_calibration_token_length() {
        let spec = HttpRequestSpec::default();
        for length in [16usize, 32] {
            let probe = spec
                .compile_calibration("http://example.com", length)
                .unwrap();
            let path = probe.url.path();
            assert_eq!(path.len(), length + 1, "path is /<token>");
            assert!(path[1..].chars().all(|c| c.is_ascii_alphanumeric()));
            assert_eq!(probe.method, Method::GET);
        }
    }

    #[test]
    fn test_calibration_probes_are_distinct() {
        let spec = HttpRequestSpec::default();
        let a = spec.compile_calibration("http://example.com", 16).unwrap();
        let b = spec.compile_calibration("http://example.com", 16).unwrap();
        assert_ne!(a.url, b.url);
    }

    #[test]
    fn test_lazy_headers_builds_at_most_once() {
        let mut map = HeaderMap::new();
        map.insert(
            HeaderName::from_static("server"),
            HeaderValue::from_static("nginx"),
        );
        let mut lazy = LazyHeaders::new(&map);
        assert_eq!(lazy.builds(), 0);
        let first = lazy.get().to_string();
        let second = lazy.get().to_string();
        assert_eq!(first, second);
        assert_eq!(lazy.builds(), 1);
        assert_eq!(first, "server: nginx\n");
    }
}
