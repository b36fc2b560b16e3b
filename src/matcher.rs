// File: matcher.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026
// - Volker Schwaberow <volker@schwaberow.de>

use crate::error::TemplateError;
use aho_corasick::AhoCorasick;
use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherKind {
    Status,
    Size,
    #[default]
    Word,
    Regex,
    Binary,
    Auto,
}

impl std::fmt::Display for MatcherKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatcherKind::Status => write!(f, "status"),
            MatcherKind::Size => write!(f, "size"),
            MatcherKind::Word => write!(f, "word"),
            MatcherKind::Regex => write!(f, "regex"),
            MatcherKind::Binary => write!(f, "binary"),
            MatcherKind::Auto => write!(f, "auto"),
        }
    }
}

/// Response part a matcher or extractor inspects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponsePart {
    #[default]
    Body,
    Header,
    All,
}

impl ResponsePart {
    /// True when evaluating this part needs the rendered header text.
    pub fn needs_headers(&self) -> bool {
        matches!(self, ResponsePart::Header | ResponsePart::All)
    }
}

/// Composition rule for multiple matchers on one request, and for
/// multiple patterns inside one matcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherCondition {
    And,
    #[default]
    Or,
}

/// Declarative predicate over a response.
///
/// Pattern fields are raw template data; `compile()` builds the
/// Aho-Corasick automata and regexes once at template load. The
/// `target` field is never read from a template: calibration sets it
/// on per-target instances so the matcher only applies to that URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Matcher {
    #[serde(rename = "type")]
    pub kind: MatcherKind,
    pub name: Option<String>,
    pub part: ResponsePart,
    pub condition: MatcherCondition,
    pub words: Vec<String>,
    pub regex: Vec<String>,
    pub binary: Vec<String>,
    pub status: Vec<u16>,
    pub size: Vec<usize>,
    #[serde(skip)]
    pub target: Option<String>,
    #[serde(skip)]
    word_automaton: Option<AhoCorasick>,
    #[serde(skip)]
    binary_automaton: Option<AhoCorasick>,
    #[serde(skip)]
    compiled_regex: Vec<Regex>,
}

impl Matcher {
    /// Builds the pattern automata. Must run once after template load,
    /// before the matcher is evaluated.
    pub fn compile(&mut self) -> Result<(), TemplateError> {
        if !self.words.is_empty() {
            self.word_automaton = Some(AhoCorasick::new(&self.words)?);
        }
        if !self.binary.is_empty() {
            let mut patterns = Vec::with_capacity(self.binary.len());
            for pattern in &self.binary {
                patterns.push(hex::decode(pattern)?);
            }
            self.binary_automaton = Some(AhoCorasick::new(&patterns)?);
        }
        if !self.regex.is_empty() {
            self.compiled_regex = self
                .regex
                .iter()
                .map(|pattern| Regex::new(pattern))
                .collect::<Result<Vec<_>, _>>()?;
        }
        Ok(())
    }

    pub fn is_auto(&self) -> bool {
        self.kind == MatcherKind::Auto
    }

    /// Name reported in output when this matcher triggers an emission.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.kind.to_string())
    }

    /// Records one calibration observation. Sizes and statuses already
    /// present are not appended again.
    pub fn record_baseline(&mut self, size: usize, status: u16) {
        if !self.size.contains(&size) {
            self.size.push(size);
        }
        if !self.status.contains(&status) {
            self.status.push(status);
        }
    }

    /// Evaluates the matcher against one response.
    ///
    /// `body` is the raw response body; size, auto and binary checks
    /// work on exact byte counts and byte patterns, word and regex
    /// patterns are searched as their UTF-8 byte encodings. `headers`
    /// may be empty when `part` does not ask for it; the caller
    /// renders header text lazily.
    pub fn matches(&self, status: u16, body: &[u8], headers: &str) -> bool {
        match self.kind {
            MatcherKind::Status => self.status.iter().any(|s| *s == status),
            MatcherKind::Size => self.size.iter().any(|s| *s == body.len()),
            MatcherKind::Word => self.match_automaton(self.word_automaton.as_ref(), self.words.len(), body, headers),
            MatcherKind::Binary => self.match_automaton(self.binary_automaton.as_ref(), self.binary.len(), body, headers),
            MatcherKind::Regex => self.match_regex(body, headers),
            MatcherKind::Auto => self.match_auto(status, body),
        }
    }

    fn selected_slices<'a>(&self, body: &'a [u8], headers: &'a str) -> Vec<&'a [u8]> {
        match self.part {
            ResponsePart::Body => vec![body],
            ResponsePart::Header => vec![headers.as_bytes()],
            ResponsePart::All => vec![body, headers.as_bytes()],
        }
    }

    fn match_automaton(
        &self,
        automaton: Option<&AhoCorasick>,
        pattern_count: usize,
        body: &[u8],
        headers: &str,
    ) -> bool {
        let Some(automaton) = automaton else {
            return false;
        };
        let mut seen = vec![false; pattern_count];
        for slice in self.selected_slices(body, headers) {
            // overlapping search so one hit cannot shadow another pattern
            for found in automaton.find_overlapping_iter(slice) {
                seen[found.pattern().as_usize()] = true;
            }
        }
        match self.condition {
            MatcherCondition::And => seen.iter().all(|s| *s),
            MatcherCondition::Or => seen.iter().any(|s| *s),
        }
    }

    fn match_regex(&self, body: &[u8], headers: &str) -> bool {
        if self.compiled_regex.is_empty() {
            return false;
        }
        let slices = self.selected_slices(body, headers);
        let matched = |regex: &Regex| slices.iter().any(|slice| regex.is_match(slice));
        match self.condition {
            MatcherCondition::And => self.compiled_regex.iter().all(matched),
            MatcherCondition::Or => self.compiled_regex.iter().any(matched),
        }
    }

    // An auto matcher passes when the response is distinguishable from
    // the learned not-found baseline. An empty baseline passes.
    fn match_auto(&self, status: u16, body: &[u8]) -> bool {
        !(self.size.contains(&body.len()) && self.status.contains(&status))
    }
}
