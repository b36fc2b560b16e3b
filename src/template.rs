// File: template.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026
// - Volker Schwaberow <volker@schwaberow.de>

use crate::error::TemplateError;
use crate::requests::HttpRequestSpec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateInfo {
    pub name: String,
    pub author: Option<String>,
    pub severity: Option<String>,
    pub description: Option<String>,
}

/// A probing template: one identifier plus the HTTP request blocks to
/// run against each target.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Template {
    pub id: String,
    pub info: TemplateInfo,
    pub requests: Vec<HttpRequestSpec>,
}

impl Template {
    pub fn from_json(data: &str) -> Result<Self, TemplateError> {
        let mut template: Template = serde_json::from_str(data)?;
        template.compile()?;
        Ok(template)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TemplateError> {
        let data = fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// Builds every matcher and extractor automaton in the template.
    pub fn compile(&mut self) -> Result<(), TemplateError> {
        for request in &mut self.requests {
            for matcher in &mut request.matchers {
                matcher.compile()?;
            }
            for extractor in &mut request.extractors {
                extractor.compile()?;
            }
        }
        Ok(())
    }
}
