//! Collection cycle orchestration against the Typesense diagnostics API.

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::descriptors::{DescriptorTable, MetricDescriptor, metrics_table, stats_table};
use crate::mapping::{RawDocument, Sample, sample_stream};

/// Header carrying the admin API key on every upstream request.
const API_KEY_HEADER: &str = "x-typesense-api-key";

/// Per-request deadline. The diagnostics endpoints answer from memory;
/// anything slower is treated as an outage for this cycle.
const FETCH_TIMEOUT: Duration = Duration::from_millis(500);

/// One of the two upstream diagnostic documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Metrics,
    Stats,
}

impl Target {
    /// Cycle order is fixed: metrics first, then stats.
    pub const ALL: [Target; 2] = [Target::Metrics, Target::Stats];

    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Metrics => "metrics",
            Target::Stats => "stats",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from one fetch attempt. Already logged at the failure site; the
/// cycle reacts by aborting its remaining targets.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid JSON body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors constructing a collector.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Pull-based collector for one Typesense cluster.
///
/// Everything here is read-only after construction except the cycle guard,
/// which serializes concurrent scrapes so they never issue overlapping
/// upstream requests or interleave their mapping passes.
pub struct TypesenseCollector {
    endpoint: String,
    api_key: String,
    cluster: String,
    client: Client,
    metrics: DescriptorTable,
    stats: DescriptorTable,
    cycle: Mutex<()>,
    shutdown: watch::Receiver<bool>,
}

/// Shareable collector handle.
pub type SharedCollector = Arc<TypesenseCollector>;

impl TypesenseCollector {
    pub fn new(config: &Config, shutdown: watch::Receiver<bool>) -> Result<Self, CollectorError> {
        let client = Client::builder().timeout(FETCH_TIMEOUT).build()?;

        Ok(Self {
            endpoint: config.base_url(),
            api_key: config.api_key.clone(),
            cluster: config.cluster.clone(),
            client,
            metrics: metrics_table(),
            stats: stats_table(),
            cycle: Mutex::new(()),
            shutdown,
        })
    }

    /// Every descriptor this collector can emit, both tables. No network
    /// access; callable at any time.
    pub fn describe(&self) -> impl Iterator<Item = &MetricDescriptor> {
        self.metrics.values().chain(self.stats.values())
    }

    /// Run one full collection cycle and return the produced samples.
    ///
    /// Targets are fetched and mapped in fixed order. A fetch failure aborts
    /// the remainder of the cycle; whatever earlier targets produced is
    /// returned as-is. The scrape caller never sees a hard error — an
    /// upstream outage yields an empty sample set.
    pub async fn collect(&self) -> Vec<Sample> {
        let _cycle = self.cycle.lock().await;

        let mut samples = Vec::new();
        for target in Target::ALL {
            let document = match self.fetch(target).await {
                Ok(document) => document,
                Err(_) => return samples,
            };

            let table = match target {
                Target::Metrics => &self.metrics,
                Target::Stats => &self.stats,
            };
            samples.extend(sample_stream(
                target,
                &document,
                table,
                &self.cluster,
                self.shutdown.clone(),
            ));
        }
        samples
    }

    /// Fetch and decode one diagnostics document.
    async fn fetch(&self, target: Target) -> Result<RawDocument, FetchError> {
        let url = format!("{}/{}.json", self.endpoint, target);
        let start = Instant::now();
        info!(cluster = %self.cluster, url = %url, "collecting {target}");

        let response = match self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                error!(%target, error = %err, "error fetching diagnostics");
                return Err(err.into());
            }
        };

        if response.status() != StatusCode::OK {
            // Best effort: an error status usually carries an unparseable
            // body, which the decode below turns into a failed target.
            warn!(%target, status = %response.status(), "unexpected response status");
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                error!(%target, error = %err, "error reading response body");
                return Err(err.into());
            }
        };

        let document: RawDocument = match serde_json::from_str(&body) {
            Ok(document) => document,
            Err(err) => {
                error!(%target, error = %err, "error decoding diagnostics body");
                return Err(err.into());
            }
        };

        info!(
            %target,
            count = document.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "collecting {target} completed"
        );
        Ok(document)
    }
}

/// Render samples in the Prometheus text exposition format (0.0.4).
///
/// Samples are grouped by metric name so HELP/TYPE headers appear once per
/// family; everything upstream reports is an instantaneous gauge.
pub fn render(samples: &[Sample]) -> String {
    let mut by_name: BTreeMap<&str, Vec<&Sample>> = BTreeMap::new();
    for sample in samples {
        by_name.entry(sample.desc.name).or_default().push(sample);
    }

    let mut output = String::with_capacity(samples.len() * 80);
    for (name, family) in by_name {
        let desc = family[0].desc;
        writeln!(output, "# HELP {} {}", name, desc.help).ok();
        writeln!(output, "# TYPE {name} gauge").ok();

        for sample in family {
            writeln!(
                output,
                "{}{} {}",
                name,
                format_labels(desc.labels, &sample.labels),
                format_value(sample.value)
            )
            .ok();
        }
    }
    output
}

/// Format label names and values as `{a="x",b="y"}`.
fn format_labels(names: &[&str], values: &[String]) -> String {
    let parts: Vec<String> = names
        .iter()
        .zip(values)
        .map(|(name, value)| format!("{}=\"{}\"", name, escape_label_value(value)))
        .collect();

    format!("{{{}}}", parts.join(","))
}

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Format a floating point value for the exposition output.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}
