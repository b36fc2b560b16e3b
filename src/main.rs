// File: main.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::{Context, Result};
use clap::Parser;
use futures::stream::{FuturesUnordered, StreamExt};
use log::{error, info, warn};
use simple_logger::SimpleLogger;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tprobe::config::ExecutorConfig;
use tprobe::executor::{HttpExecutor, HttpExecutorOptions};
use tprobe::output::{OutputFormat, OutputWriter};
use tprobe::template::Template;

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
struct Cli {
    #[arg(short = 't', long = "template", required = true, help = "Template file to run, repeatable")]
    templates: Vec<PathBuf>,

    #[arg(short = 'l', long = "list", help = "File with target URLs, one per line (default: stdin)")]
    list: Option<PathBuf>,

    #[arg(short = 'o', long = "output", help = "Write findings to a file instead of stdout")]
    output: Option<PathBuf>,

    #[arg(long = "json", help = "Emit findings as JSON lines")]
    json: bool,

    #[arg(long = "timeout", default_value_t = 5, help = "HTTP request timeout in seconds")]
    timeout: u64,

    #[arg(long = "retries", default_value_t = 1, help = "Transport-level retries per request")]
    retries: u32,

    #[arg(long = "proxy-url", help = "Forward proxy URL")]
    proxy_url: Option<String>,

    #[arg(long = "proxy-socks-url", help = "SOCKS5 proxy URL, credentials may be inline")]
    proxy_socks_url: Option<String>,

    #[arg(short = 'c', long = "concurrency", default_value_t = 10, help = "Concurrent target executions")]
    concurrency: usize,

    #[arg(long = "log-level", default_value = "warn")]
    log_level: String,
}

fn read_targets(list: Option<&PathBuf>) -> Result<Vec<String>> {
    let lines: Vec<String> = match list {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("could not read target list {}", path.display()))?
            .lines()
            .map(|l| l.to_string())
            .collect(),
        None => io::stdin()
            .lock()
            .lines()
            .collect::<io::Result<_>>()
            .context("could not read targets from stdin")?,
    };

    let mut targets = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("http://") || line.starts_with("https://") {
            targets.push(line.to_string());
        } else {
            targets.push(format!("http://{}", line));
        }
    }
    Ok(targets)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = cli
        .log_level
        .parse::<log::LevelFilter>()
        .unwrap_or(log::LevelFilter::Warn);
    SimpleLogger::new().with_level(level).init()?;

    let mut templates = Vec::new();
    for path in &cli.templates {
        let template = Template::from_file(path)
            .with_context(|| format!("could not load template {}", path.display()))?;
        info!("loaded template {}", template.id);
        templates.push(Arc::new(template));
    }

    let targets = read_targets(cli.list.as_ref())?;
    if targets.is_empty() {
        warn!("no targets to probe");
        return Ok(());
    }

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    let output = Arc::new(match &cli.output {
        Some(path) => OutputWriter::to_file(path, format)
            .with_context(|| format!("could not open output file {}", path.display()))?,
        None => OutputWriter::stdout(format),
    });

    let mut config = ExecutorConfig::new();
    config.set_timeout(cli.timeout);
    config.set_retries(cli.retries);
    config.set_proxy_url(cli.proxy_url.clone());
    config.set_socks_proxy_url(cli.proxy_socks_url.clone());

    let semaphore = Arc::new(Semaphore::new(cli.concurrency));
    let mut tasks = FuturesUnordered::new();

    for template in &templates {
        for request in &template.requests {
            for target in &targets {
                let template = Arc::clone(template);
                let request = request.clone();
                let output = Arc::clone(&output);
                let config = config.clone();
                let semaphore = Arc::clone(&semaphore);
                let target = target.clone();

                tasks.push(tokio::spawn(async move {
                    let _permit = match semaphore.acquire().await {
                        Ok(permit) => permit,
                        Err(_) => return,
                    };
                    let executor = match HttpExecutor::new(HttpExecutorOptions {
                        template: Arc::clone(&template),
                        request,
                        output,
                        config,
                    }) {
                        Ok(executor) => executor,
                        Err(err) => {
                            error!("could not create executor for {}: {}", target, err);
                            return;
                        }
                    };
                    // A failing target never takes the other tasks down.
                    if let Err(err) = executor.execute(&target).await {
                        warn!("template {} failed on {}: {}", template.id, target, err);
                    }
                }));
            }
        }
    }

    while let Some(task) = tasks.next().await {
        if let Err(err) = task {
            error!("executor task panicked: {}", err);
        }
    }

    output.close().context("could not flush output")?;
    Ok(())
}
