// File: lib.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026
// - Volker Schwaberow <volker@schwaberow.de>

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::module_inception)]
#![allow(clippy::bool_assert_comparison)]
#![allow(clippy::new_without_default)]

pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod extractor;
pub mod matcher;
pub mod output;
pub mod requests;
pub mod template;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_imports() {
        let _ = config::ExecutorConfig::default();
        let _ = matcher::Matcher::default();
        let _ = extractor::Extractor::default();
        let _ = requests::HttpRequestSpec::default();
        let _ = template::Template::default();
        let _ = client::SprayRetryPolicy::new(1);
        let _ = output::OutputWriter::stdout(output::OutputFormat::Text);
    }
}
