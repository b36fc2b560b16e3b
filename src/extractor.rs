// File: extractor.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026
// - Volker Schwaberow <volker@schwaberow.de>

use crate::error::TemplateError;
use crate::matcher::ResponsePart;
use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    #[default]
    Regex,
    Kval,
}

/// Declarative extraction rule producing zero or more strings per
/// response. Read-only during execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Extractor {
    #[serde(rename = "type")]
    pub kind: ExtractorKind,
    pub name: Option<String>,
    pub part: ResponsePart,
    pub regex: Vec<String>,
    /// Capture group reported for regex extraction; 0 is the whole match.
    pub group: usize,
    /// Header names looked up for kval extraction.
    pub kval: Vec<String>,
    #[serde(skip)]
    compiled_regex: Vec<Regex>,
}

impl Extractor {
    pub fn compile(&mut self) -> Result<(), TemplateError> {
        if !self.regex.is_empty() {
            self.compiled_regex = self
                .regex
                .iter()
                .map(|pattern| Regex::new(pattern))
                .collect::<Result<Vec<_>, _>>()?;
        }
        Ok(())
    }

    pub fn part(&self) -> ResponsePart {
        self.part
    }

    /// Runs the extractor over one response. The body is scanned as
    /// raw bytes; only matched fragments are rendered to text. Results
    /// keep discovery order; duplicates are not removed.
    pub fn extract(&self, body: &[u8], headers: &str) -> Vec<String> {
        match self.kind {
            ExtractorKind::Regex => self.extract_regex(body, headers),
            ExtractorKind::Kval => self.extract_kval(headers),
        }
    }

    fn selected_slices<'a>(&self, body: &'a [u8], headers: &'a str) -> Vec<&'a [u8]> {
        match self.part {
            ResponsePart::Body => vec![body],
            ResponsePart::Header => vec![headers.as_bytes()],
            ResponsePart::All => vec![body, headers.as_bytes()],
        }
    }

    fn extract_regex(&self, body: &[u8], headers: &str) -> Vec<String> {
        let mut results = Vec::new();
        for regex in &self.compiled_regex {
            for slice in self.selected_slices(body, headers) {
                for captures in regex.captures_iter(slice) {
                    if let Some(found) = captures.get(self.group) {
                        results.push(String::from_utf8_lossy(found.as_bytes()).into_owned());
                    }
                }
            }
        }
        results
    }

    // Header text is rendered as one "name: value" line per header.
    fn extract_kval(&self, headers: &str) -> Vec<String> {
        let mut results = Vec::new();
        for key in &self.kval {
            for line in headers.lines() {
                if let Some((name, value)) = line.split_once(':') {
                    if name.trim().eq_ignore_ascii_case(key) {
                        results.push(value.trim().to_string());
                    }
                }
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled(mut extractor: Extractor) -> Extractor {
        extractor.compile().expect("extractor should compile");
        extractor
    }

    #[test]
    fn test_regex_extractor_discovery_order() {
        let extractor = compiled(Extractor {
            kind: ExtractorKind::Regex,
            regex: vec![r"user-\d+".to_string()],
            ..Default::default()
        });
        let results = extractor.extract(b"user-2 then user-7 then user-2", "");
        assert_eq!(results, vec!["user-2", "user-7", "user-2"]);
    }

    #[test]
    fn test_regex_extractor_tolerates_binary_surroundings() {
        let extractor = compiled(Extractor {
            kind: ExtractorKind::Regex,
            regex: vec![r"token=[a-f0-9]{8}".to_string()],
            ..Default::default()
        });
        let body = [&[0x89u8, 0xff, 0xfe][..], &b"token=deadbeef"[..], &[0x00, 0xa0][..]].concat();
        assert_eq!(extractor.extract(&body, ""), vec!["token=deadbeef"]);
    }

    #[test]
    fn test_regex_extractor_capture_group() {
        let extractor = compiled(Extractor {
            kind: ExtractorKind::Regex,
            regex: vec![r"version=(\d+\.\d+)".to_string()],
            group: 1,
            ..Default::default()
        });
        let results = extractor.extract(b"version=2.4 version=5.1", "");
        assert_eq!(results, vec!["2.4", "5.1"]);
    }

    #[test]
    fn test_regex_extractor_header_part() {
        let extractor = compiled(Extractor {
            kind: ExtractorKind::Regex,
            part: ResponsePart::Header,
            regex: vec![r"nginx/[\d.]+".to_string()],
            ..Default::default()
        });
        let results = extractor.extract(b"nginx/9.9 in body ignored", "server: nginx/1.18.0");
        assert_eq!(results, vec!["nginx/1.18.0"]);
    }

    #[test]
    fn test_regex_extractor_all_part_scans_body_before_headers() {
        let extractor = compiled(Extractor {
            kind: ExtractorKind::Regex,
            part: ResponsePart::All,
            regex: vec![r"v\d+".to_string()],
            ..Default::default()
        });
        let results = extractor.extract(b"app v2", "server: engine v1\n");
        assert_eq!(results, vec!["v2", "v1"]);
    }

    #[test]
    fn test_kval_extractor_case_insensitive() {
        let extractor = Extractor {
            kind: ExtractorKind::Kval,
            part: ResponsePart::Header,
            kval: vec!["X-Powered-By".to_string()],
            ..Default::default()
        };
        let headers = "server: nginx\nx-powered-by: PHP/7.4.3";
        assert_eq!(extractor.extract(b"", headers), vec!["PHP/7.4.3"]);
    }

    #[test]
    fn test_kval_extractor_missing_header() {
        let extractor = Extractor {
            kind: ExtractorKind::Kval,
            kval: vec!["x-missing".to_string()],
            ..Default::default()
        };
        assert!(extractor.extract(b"", "server: nginx").is_empty());
    }

    #[test]
    fn test_invalid_regex_fails_compile() {
        let mut extractor = Extractor {
            kind: ExtractorKind::Regex,
            regex: vec!["(".to_string()],
            ..Default::default()
        };
        assert!(extractor.compile().is_err());
    }
}
