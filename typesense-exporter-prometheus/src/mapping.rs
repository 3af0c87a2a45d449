//! Coercion of decoded diagnostic documents into metric samples.

use std::collections::VecDeque;

use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::collector::Target;
use crate::descriptors::{DescriptorTable, MetricDescriptor};

/// One decoded diagnostics document. Transient; discarded after one cycle.
pub type RawDocument = Map<String, Value>;

/// One concrete observation of a metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub desc: MetricDescriptor,
    pub value: f64,
    /// Label values, positionally matching `desc.labels`.
    pub labels: Vec<String>,
}

/// Lazily maps one document's fields to samples.
///
/// Single pass over the document, in map iteration order; once consumed or
/// canceled it yields nothing further. Fields absent from the descriptor
/// table produce nothing, and a malformed value skips only its own key.
pub struct SampleStream<'a> {
    target: Target,
    table: &'a DescriptorTable,
    cluster: &'a str,
    fields: serde_json::map::Iter<'a>,
    pending: VecDeque<Sample>,
    shutdown: watch::Receiver<bool>,
    done: bool,
}

/// Map `document` against `table`, attaching `cluster` as the first label
/// value of every sample.
pub fn sample_stream<'a>(
    target: Target,
    document: &'a RawDocument,
    table: &'a DescriptorTable,
    cluster: &'a str,
    shutdown: watch::Receiver<bool>,
) -> SampleStream<'a> {
    SampleStream {
        target,
        table,
        cluster,
        fields: document.iter(),
        pending: VecDeque::new(),
        shutdown,
        done: false,
    }
}

impl Iterator for SampleStream<'_> {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        loop {
            if let Some(sample) = self.pending.pop_front() {
                return Some(sample);
            }
            if self.done {
                return None;
            }
            if *self.shutdown.borrow() {
                info!(target = %self.target, "shutdown signaled, stopping collection");
                self.done = true;
                return None;
            }

            let Some((key, value)) = self.fields.next() else {
                self.done = true;
                return None;
            };
            let Some(desc) = self.table.get(key.as_str()) else {
                continue;
            };

            match self.target {
                Target::Metrics => self.map_metric(key, value, *desc),
                Target::Stats => self.map_stat(key, value, *desc),
            }
        }
    }
}

impl SampleStream<'_> {
    fn flat(&self, desc: MetricDescriptor, value: f64) -> Sample {
        Sample {
            desc,
            value,
            labels: vec![self.cluster.to_string()],
        }
    }

    /// Metrics document values are numeric strings on current servers and
    /// plain numbers on older ones; both shapes are accepted.
    fn map_metric(&mut self, key: &str, value: &Value, desc: MetricDescriptor) {
        match value {
            Value::String(raw) => match raw.parse::<f64>() {
                Ok(parsed) => {
                    debug!(key, value = parsed, "collected metric");
                    let sample = self.flat(desc, parsed);
                    self.pending.push_back(sample);
                }
                Err(err) => {
                    error!(key, value = %raw, error = %err, "error converting metric value");
                }
            },
            Value::Number(number) => {
                if let Some(parsed) = number.as_f64() {
                    debug!(key, value = parsed, "collected metric");
                    let sample = self.flat(desc, parsed);
                    self.pending.push_back(sample);
                }
            }
            other => {
                debug!(key, shape = ?other, "skipping metric with unexpected shape");
            }
        }
    }

    /// Stats values are plain numbers, except the per-endpoint breakdowns
    /// which nest `{endpoint: number}` under a two-label descriptor. Other
    /// shapes under known keys are skipped without failing the document.
    fn map_stat(&mut self, key: &str, value: &Value, desc: MetricDescriptor) {
        match value {
            Value::Object(endpoints) if desc.labels.len() == 2 => {
                for (endpoint, nested) in endpoints {
                    let Some(parsed) = nested.as_f64() else {
                        continue;
                    };
                    debug!(key, endpoint = %endpoint, value = parsed, "collected stat");
                    let sample = Sample {
                        desc,
                        value: parsed,
                        labels: vec![self.cluster.to_string(), endpoint.clone()],
                    };
                    self.pending.push_back(sample);
                }
            }
            Value::Number(number) if desc.labels.len() == 1 => {
                if let Some(parsed) = number.as_f64() {
                    debug!(key, value = parsed, "collected stat");
                    let sample = self.flat(desc, parsed);
                    self.pending.push_back(sample);
                }
            }
            _ => {}
        }
    }
}
