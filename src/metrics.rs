//! Prometheus metrics collection for hostpulse
//!
//! Two registries are built at startup and never share instrument names:
//! - [`AppMetrics`] counts application requests by path
//! - [`HostMetrics`] exposes host statistics as pull gauges
//!
//! Both are explicit objects handed to the handlers that need them. Nothing
//! is registered with the process-global default registry.

use prometheus::core::{Collector, Desc, Describer};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Gauge, IntCounterVec, Opts, Registry, TextEncoder};
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::sampler::{HostSampler, HostStat, Sample};

/// Name of the per-path application request counter
pub const APP_REQUESTS_TOTAL: &str = "app_requests_total";

/// Registry wrapper that remembers the names it registered
struct NamedRegistry {
    registry: Registry,
    names: Vec<String>,
}

impl NamedRegistry {
    fn new() -> Self {
        Self {
            registry: Registry::new(),
            names: Vec::new(),
        }
    }

    /// Register a collector, failing with `AlreadyReg` on a duplicate name
    fn register(&mut self, collector: Box<dyn Collector>) -> Result<(), prometheus::Error> {
        let names: Vec<String> = collector
            .desc()
            .iter()
            .map(|desc| desc.fq_name.clone())
            .collect();
        self.registry.register(collector)?;
        self.names.extend(names);
        Ok(())
    }
}

/// Application request metrics
///
/// Cheap to clone; clones share the same registry and counters.
#[derive(Clone)]
pub struct AppMetrics {
    registry: Arc<Registry>,
    names: Arc<[String]>,
    requests_total: IntCounterVec,
}

impl AppMetrics {
    /// Create the application registry with `app_requests_total{path}`
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let mut registry = NamedRegistry::new();

        // Label values are raw request paths, so cardinality is bounded only
        // by what clients request.
        let requests_total = IntCounterVec::new(
            Opts::new(APP_REQUESTS_TOTAL, "Total HTTP requests"),
            &["path"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry.registry),
            names: registry.names.into(),
            requests_total,
        })
    }

    /// Count one request for `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the label set does not match the counter.
    pub fn record_request(&self, path: &str) -> Result<(), prometheus::Error> {
        self.requests_total
            .get_metric_with_label_values(&[path])?
            .inc();
        Ok(())
    }

    /// Current count for `path`, 0 if the path was never requested
    ///
    /// Reads through a registry gather so that looking up an unseen path
    /// does not create a series for it.
    pub fn request_count(&self, path: &str) -> u64 {
        self.counter_values()
            .into_iter()
            .find(|(label, _)| label == path)
            .map(|(_, count)| count)
            .unwrap_or(0)
    }

    /// Sum of `app_requests_total` across every path
    pub fn total_requests(&self) -> u64 {
        self.counter_values().into_iter().map(|(_, count)| count).sum()
    }

    /// Names registered in this registry
    pub fn metric_names(&self) -> &[String] {
        &self.names
    }

    /// Collect every registered metric family
    pub fn collect(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Gather all metrics and encode them in Prometheus text format
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        encode_text(&self.collect())
    }

    fn counter_values(&self) -> Vec<(String, u64)> {
        self.collect()
            .iter()
            .filter(|mf| mf.name() == APP_REQUESTS_TOTAL)
            .flat_map(|mf| mf.get_metric().iter())
            .map(|m| {
                let path = m
                    .label
                    .iter()
                    .find(|lp| lp.name() == "path")
                    .map(|lp| lp.value().to_string())
                    .unwrap_or_default();
                (path, m.counter.value.unwrap_or(0.0) as u64)
            })
            .collect()
    }
}

/// Gauge whose value is pulled from a [`Sample`] at collect time
///
/// Holds no value between scrapes. Each collect samples once and reports
/// that reading in a freshly built gauge, so concurrent scrapes never see
/// each other's values.
pub struct PullGauge {
    opts: Opts,
    desc: Desc,
    source: Box<dyn Sample>,
}

impl PullGauge {
    /// Create a pull gauge named `name` reading from `source`
    ///
    /// # Errors
    ///
    /// Returns an error if `name` or `help` is not a valid metric descriptor.
    pub fn new(
        name: &str,
        help: &str,
        source: impl Sample + 'static,
    ) -> Result<Self, prometheus::Error> {
        let opts = Opts::new(name, help);
        let desc = opts.describe()?;
        Ok(Self {
            opts,
            desc,
            source: Box::new(source),
        })
    }
}

impl Collector for PullGauge {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.desc]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let value = self.source.sample();

        // Opts were validated by `describe()` in `new`
        match Gauge::with_opts(self.opts.clone()) {
            Ok(gauge) => {
                gauge.set(value);
                gauge.collect()
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    metric = %self.desc.fq_name,
                    "Failed to build gauge for collect"
                );
                Vec::new()
            }
        }
    }
}

/// Host resource metrics
///
/// Every gather calls the sampler once per gauge. Cheap to clone.
#[derive(Clone)]
pub struct HostMetrics {
    registry: Arc<Registry>,
    names: Arc<[String]>,
}

impl HostMetrics {
    /// Create the host registry with one pull gauge per [`HostStat`]
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new(sampler: Arc<dyn HostSampler>) -> Result<Self, prometheus::Error> {
        let mut registry = NamedRegistry::new();

        for stat in HostStat::ALL {
            let sampler = Arc::clone(&sampler);
            let gauge = PullGauge::new(stat.metric_name(), stat.help(), move || {
                sampler.read(stat)
            })?;
            registry.register(Box::new(gauge))?;
        }

        Ok(Self {
            registry: Arc::new(registry.registry),
            names: registry.names.into(),
        })
    }

    /// Names registered in this registry
    pub fn metric_names(&self) -> &[String] {
        &self.names
    }

    /// Sample the host and collect every gauge
    pub fn collect(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Sample the host and encode every gauge in Prometheus text format
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        encode_text(&self.collect())
    }
}

/// Fail if the application and host registries share any metric name
pub fn ensure_disjoint(app: &AppMetrics, host: &HostMetrics) -> AppResult<()> {
    let host_names: HashSet<&str> = host.metric_names().iter().map(String::as_str).collect();

    match app
        .metric_names()
        .iter()
        .find(|name| host_names.contains(name.as_str()))
    {
        Some(name) => Err(AppError::MetricNameClash { name: name.clone() }),
        None => Ok(()),
    }
}

/// Encode metric families in the Prometheus text exposition format
fn encode_text(metric_families: &[MetricFamily]) -> Result<String, prometheus::Error> {
    let metric_count = metric_families.len();

    tracing::debug!(
        metric_family_count = metric_count,
        "Encoding metrics to Prometheus text format"
    );

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(metric_families, &mut buffer)
        .map_err(|e| {
            let metric_names: Vec<_> = metric_families.iter().map(|mf| mf.name()).collect();

            tracing::error!(
                error = %e,
                metric_family_count = metric_count,
                metric_names = ?metric_names,
                "Prometheus text encoder failed"
            );

            e
        })?;

    String::from_utf8(buffer).map_err(|e| {
        tracing::error!(
            invalid_byte_index = e.utf8_error().valid_up_to(),
            "Prometheus encoder produced invalid UTF-8"
        );

        prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e))
    })
}
