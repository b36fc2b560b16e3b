// File: error.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026
// - Volker Schwaberow <volker@schwaberow.de>

use thiserror::Error;

/// Errors raised while loading or compiling a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("could not read template file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse template: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid regex pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid binary pattern: {0}")]
    Binary(#[from] hex::FromHexError),

    #[error("could not build pattern automaton: {0}")]
    Automaton(#[from] aho_corasick::BuildError),

    #[error("invalid request method: {0}")]
    Method(String),

    #[error("invalid target url: {0}")]
    Target(String),
}

/// Errors raised while executing a template against one target.
///
/// The variant distinguishes compile, send and read failures so a
/// caller can tell which stage of the request pipeline broke.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("could not make http request: {0}")]
    Compile(#[from] TemplateError),

    #[error("could not make http request: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("could not read http body: {0}")]
    Read(#[source] reqwest::Error),

    #[error("could not write output: {0}")]
    Output(#[source] std::io::Error),
}
