//! Host statistics sampling
//!
//! Each statistic is read live from the OS when a scrape asks for it. There
//! is no background refresh and no cached value. A read that fails reports
//! `0` so that a scrape never fails because of a transient OS error.

use std::path::PathBuf;
use std::sync::Mutex;
use sysinfo::System;

/// A zero-argument read of a current value
///
/// Pull gauges hold one of these and call it at scrape time. Closures
/// returning `f64` implement it directly.
pub trait Sample: Send + Sync {
    fn sample(&self) -> f64;
}

impl<F> Sample for F
where
    F: Fn() -> f64 + Send + Sync,
{
    fn sample(&self) -> f64 {
        self()
    }
}

/// Host statistics exported by the metrics listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostStat {
    CpuPercent,
    MemoryTotalBytes,
    MemoryUsedBytes,
    DiskTotalBytes,
    DiskUsedBytes,
    UptimeSeconds,
}

impl HostStat {
    /// Every statistic, in exposition order
    pub const ALL: [HostStat; 6] = [
        HostStat::CpuPercent,
        HostStat::MemoryTotalBytes,
        HostStat::MemoryUsedBytes,
        HostStat::DiskTotalBytes,
        HostStat::DiskUsedBytes,
        HostStat::UptimeSeconds,
    ];

    /// Prometheus metric name for this statistic
    pub fn metric_name(&self) -> &'static str {
        match self {
            HostStat::CpuPercent => "host_cpu_percent",
            HostStat::MemoryTotalBytes => "host_memory_total_bytes",
            HostStat::MemoryUsedBytes => "host_memory_used_bytes",
            HostStat::DiskTotalBytes => "host_disk_total_bytes",
            HostStat::DiskUsedBytes => "host_disk_used_bytes",
            HostStat::UptimeSeconds => "host_uptime_seconds",
        }
    }

    /// Prometheus help text for this statistic
    pub fn help(&self) -> &'static str {
        match self {
            HostStat::CpuPercent => "Total CPU usage percent",
            HostStat::MemoryTotalBytes => "Total system memory in bytes",
            HostStat::MemoryUsedBytes => "Used system memory in bytes",
            HostStat::DiskTotalBytes => "Total disk bytes for root",
            HostStat::DiskUsedBytes => "Used disk bytes for root",
            HostStat::UptimeSeconds => "System uptime in seconds",
        }
    }
}

/// Source of host statistics
///
/// Implementors only provide `try_read`. `read` applies the zero-substitution
/// rule: a missing, non-finite or negative reading is reported as `0`.
pub trait HostSampler: Send + Sync + 'static {
    /// Read one statistic, `None` when the OS query failed
    fn try_read(&self, stat: HostStat) -> Option<f64>;

    /// Read one statistic, substituting `0` for any failure
    fn read(&self, stat: HostStat) -> f64 {
        match self.try_read(stat) {
            Some(value) if value.is_finite() && value >= 0.0 => value,
            other => {
                tracing::trace!(
                    metric = stat.metric_name(),
                    reading = ?other,
                    "Host statistic unavailable, reporting 0"
                );
                0.0
            }
        }
    }
}

/// `HostSampler` backed by the `sysinfo` crate
///
/// CPU usage is computed against the previous CPU read, so the `System`
/// handle is kept between scrapes. The first scrape reports usage since the
/// sampler was created.
pub struct SystemSampler {
    system: Mutex<System>,
    disk_mount_point: PathBuf,
}

impl SystemSampler {
    /// Create a sampler whose disk gauges report the filesystem holding
    /// `disk_mount_point`
    ///
    /// Any path on the filesystem works; it does not have to be the mount
    /// point itself.
    pub fn new(disk_mount_point: impl Into<PathBuf>) -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();

        Self {
            system: Mutex::new(system),
            disk_mount_point: disk_mount_point.into(),
        }
    }

    /// Path whose filesystem backs the disk gauges
    pub fn disk_mount_point(&self) -> &std::path::Path {
        &self.disk_mount_point
    }

    fn cpu_percent(&self) -> Option<f64> {
        let mut system = self.system.lock().ok()?;
        system.refresh_cpu_usage();
        if system.cpus().is_empty() {
            return None;
        }
        Some(f64::from(system.global_cpu_usage()))
    }

    /// `(total, used)` RAM in bytes
    ///
    /// Used is sysinfo's `total - available`, which counts reclaimable page
    /// cache and slab as free. It can read slightly lower than a
    /// `total - free - buffers - cached` figure on hosts with a large shmem
    /// or unreclaimable slab footprint.
    fn memory(&self) -> Option<(u64, u64)> {
        let mut system = self.system.lock().ok()?;
        system.refresh_memory();
        let total = system.total_memory();
        if total == 0 {
            return None;
        }
        Some((total, system.used_memory()))
    }

    /// `(total, used)` bytes of the filesystem at the configured path
    ///
    /// Used is `blocks - free` like `df`, so blocks reserved for root count
    /// as unused.
    #[cfg(unix)]
    fn disk(&self) -> Option<(u64, u64)> {
        let stat = nix::sys::statvfs::statvfs(self.disk_mount_point.as_path()).ok()?;
        Some(filesystem_usage(
            stat.blocks() as u64,
            stat.blocks_free() as u64,
            stat.fragment_size() as u64,
        ))
    }

    #[cfg(not(unix))]
    fn disk(&self) -> Option<(u64, u64)> {
        None
    }

    fn uptime(&self) -> Option<f64> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return None;
        }
        Some(System::uptime() as f64)
    }
}

/// `(total, used)` bytes from statvfs block counts
fn filesystem_usage(blocks: u64, blocks_free: u64, fragment_size: u64) -> (u64, u64) {
    let total = blocks.saturating_mul(fragment_size);
    let used = blocks
        .saturating_sub(blocks_free)
        .saturating_mul(fragment_size);
    (total, used)
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new("/")
    }
}

impl HostSampler for SystemSampler {
    fn try_read(&self, stat: HostStat) -> Option<f64> {
        match stat {
            HostStat::CpuPercent => self.cpu_percent(),
            HostStat::MemoryTotalBytes => self.memory().map(|(total, _)| total as f64),
            HostStat::MemoryUsedBytes => self.memory().map(|(_, used)| used as f64),
            HostStat::DiskTotalBytes => self.disk().map(|(total, _)| total as f64),
            HostStat::DiskUsedBytes => self.disk().map(|(_, used)| used as f64),
            HostStat::UptimeSeconds => self.uptime(),
        }
    }
}
