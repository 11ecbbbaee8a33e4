//! Labelled series storage.
//!
//! Each family guards its series map with one mutex. Updates are short (a map
//! lookup and an add), so contention stays low and no increment is ever lost.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::exposition::{write_header, write_sample};

type LabelValues = Vec<String>;

pub(crate) struct CounterFamily {
    name: &'static str,
    help: &'static str,
    label_names: &'static [&'static str],
    series: Mutex<BTreeMap<LabelValues, u64>>,
}

impl CounterFamily {
    pub(crate) fn new(
        name: &'static str,
        help: &'static str,
        label_names: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            help,
            label_names,
            series: Mutex::new(BTreeMap::new()),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn inc(&self, label_values: &[&str]) {
        debug_assert_eq!(label_values.len(), self.label_names.len());
        let Ok(mut series) = self.series.lock() else {
            tracing::warn!(family = self.name, "Counter lock poisoned; dropping sample");
            return;
        };
        let key = label_values.iter().map(|v| (*v).to_string()).collect();
        *series.entry(key).or_insert(0) += 1;
    }

    pub(crate) fn value(&self, labels: &[(&str, &str)]) -> Option<u64> {
        let key = ordered_values(self.label_names, labels)?;
        self.series.lock().ok()?.get(&key).copied()
    }

    pub(crate) fn total(&self) -> u64 {
        self.series
            .lock()
            .map(|series| series.values().sum())
            .unwrap_or(0)
    }

    pub(crate) fn render(&self, out: &mut String) {
        write_header(out, self.name, self.help, "counter");
        let Ok(series) = self.series.lock() else {
            tracing::warn!(family = self.name, "Counter lock poisoned; omitting from snapshot");
            return;
        };
        for (values, count) in series.iter() {
            let labels = zip_labels(self.label_names, values);
            write_sample(out, self.name, &labels, None, &count.to_string());
        }
    }
}

#[derive(Debug, Clone)]
struct HistogramState {
    /// Per-bucket (non-cumulative) counts; the last slot is the +Inf overflow.
    counts: Vec<u64>,
    sum: f64,
    count: u64,
}

pub(crate) struct HistogramFamily {
    name: &'static str,
    help: &'static str,
    label_names: &'static [&'static str],
    bounds: &'static [f64],
    series: Mutex<BTreeMap<LabelValues, HistogramState>>,
}

impl HistogramFamily {
    pub(crate) fn new(
        name: &'static str,
        help: &'static str,
        label_names: &'static [&'static str],
        bounds: &'static [f64],
    ) -> Self {
        Self {
            name,
            help,
            label_names,
            bounds,
            series: Mutex::new(BTreeMap::new()),
        }
    }

    pub(crate) fn observe(&self, label_values: &[&str], value: f64) {
        debug_assert_eq!(label_values.len(), self.label_names.len());
        let Ok(mut series) = self.series.lock() else {
            tracing::warn!(family = self.name, "Histogram lock poisoned; dropping sample");
            return;
        };
        let key = label_values.iter().map(|v| (*v).to_string()).collect();
        let state = series.entry(key).or_insert_with(|| HistogramState {
            counts: vec![0; self.bounds.len() + 1],
            sum: 0.0,
            count: 0,
        });
        let slot = self
            .bounds
            .iter()
            .position(|bound| value <= *bound)
            .unwrap_or(self.bounds.len());
        state.counts[slot] += 1;
        state.sum += value;
        state.count += 1;
    }

    pub(crate) fn render(&self, out: &mut String) {
        write_header(out, self.name, self.help, "histogram");
        let Ok(series) = self.series.lock() else {
            tracing::warn!(family = self.name, "Histogram lock poisoned; omitting from snapshot");
            return;
        };
        let bucket_name = format!("{}_bucket", self.name);
        let sum_name = format!("{}_sum", self.name);
        let count_name = format!("{}_count", self.name);
        for (values, state) in series.iter() {
            let labels = zip_labels(self.label_names, values);
            let mut cumulative = 0;
            for (index, bucket) in state.counts.iter().enumerate() {
                cumulative += bucket;
                let le = self
                    .bounds
                    .get(index)
                    .map_or_else(|| "+Inf".to_string(), ToString::to_string);
                write_sample(out, &bucket_name, &labels, Some(&le), &cumulative.to_string());
            }
            write_sample(out, &sum_name, &labels, None, &state.sum.to_string());
            write_sample(out, &count_name, &labels, None, &state.count.to_string());
        }
    }
}

/// Gauge family created on demand by `set_gauge`.
#[derive(Debug, Default)]
pub(crate) struct GaugeSeries {
    samples: BTreeMap<Vec<(String, String)>, f64>,
}

impl GaugeSeries {
    pub(crate) fn set(&mut self, labels: &[(&str, &str)], value: f64) {
        self.samples.insert(canonical_labels(labels), value);
    }

    pub(crate) fn get(&self, labels: &[(&str, &str)]) -> Option<f64> {
        self.samples.get(&canonical_labels(labels)).copied()
    }

    pub(crate) fn render(&self, name: &str, out: &mut String) {
        write_header(out, name, "Gauge set by the application", "gauge");
        for (labels, value) in &self.samples {
            let labels: Vec<(&str, &str)> = labels
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            write_sample(out, name, &labels, None, &value.to_string());
        }
    }
}

fn canonical_labels(labels: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut owned: Vec<(String, String)> = labels
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    owned.sort();
    owned
}

fn ordered_values(label_names: &[&str], labels: &[(&str, &str)]) -> Option<LabelValues> {
    if labels.len() != label_names.len() {
        return None;
    }
    label_names
        .iter()
        .map(|name| {
            labels
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| (*value).to_string())
        })
        .collect()
}

fn zip_labels<'a>(names: &'a [&'static str], values: &'a [String]) -> Vec<(&'a str, &'a str)> {
    names
        .iter()
        .zip(values)
        .map(|(name, value)| (*name, value.as_str()))
        .collect()
}
