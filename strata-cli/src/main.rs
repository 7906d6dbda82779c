//! Strata driver - ingests synthetic CPU samples, commits and queries them
//!
//! Usage: `strata [DATA_DIR] [HOSTS] [SAMPLES_PER_HOST]`
//!
//! `STRATA_COMMIT_THRESHOLD` overrides the commit threshold and `RUST_LOG`
//! the log filter.

use anyhow::{bail, Context};
use rand::Rng;
use std::path::{Path, PathBuf};
use std::time::Instant;
use strata_core::{label_set, Engine, EngineConfig, LabelSet, Query};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Driver configuration
#[derive(Debug, Clone)]
struct DriverConfig {
    /// Ingestion root
    data_dir: PathBuf,
    /// Distinct hosts, one series each
    hosts: usize,
    /// Samples appended per host
    samples_per_host: i64,
    /// Engine commit threshold
    commit_threshold: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(strata_core::config::DATA_DIR),
            hosts: 4,
            samples_per_host: 10_000,
            commit_threshold: strata_core::config::COMMIT_THRESHOLD,
        }
    }
}

impl DriverConfig {
    fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();
        let mut args = std::env::args().skip(1);

        if let Some(dir) = args.next() {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(hosts) = args.next() {
            config.hosts = hosts.parse().context("HOSTS must be a positive integer")?;
        }
        if let Some(samples) = args.next() {
            config.samples_per_host = samples
                .parse()
                .context("SAMPLES_PER_HOST must be an integer")?;
        }
        if let Ok(threshold) = std::env::var("STRATA_COMMIT_THRESHOLD") {
            config.commit_threshold = threshold
                .parse()
                .context("STRATA_COMMIT_THRESHOLD must be a positive integer")?;
        }

        if config.hosts == 0 {
            bail!("HOSTS must be at least 1");
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = DriverConfig::from_env()?;
    info!("Starting Strata driver {}", strata_core::VERSION);
    info!("Data directory: {:?}", config.data_dir);

    let mut engine = Engine::open(
        EngineConfig::new(&config.data_dir).with_commit_threshold(config.commit_threshold),
    )?;

    let hosts: Vec<LabelSet> = (0..config.hosts)
        .map(|i| label_set([("host", format!("host-{}", i))]))
        .collect();

    ingest(&mut engine, &hosts, config.samples_per_host)?;

    let mid = config.samples_per_host / 2;
    run_find(&engine, "all", &Query::new())?;
    run_find(&engine, "one host", &Query::new().series(hosts[0].clone()))?;
    run_find(&engine, "second half", &Query::new().range_start(mid))?;
    run_find(
        &engine,
        "one host, window",
        &Query::new()
            .metric("cpu")
            .series(hosts[0].clone())
            .range(mid, mid + 100),
    )?;

    info!(
        "Disk usage: {} bytes",
        disk_usage(&config.data_dir).context("measuring disk usage")?
    );
    engine.close();
    Ok(())
}

/// Append one sample per host per tick, committing whenever the engine allows
fn ingest(engine: &mut Engine, hosts: &[LabelSet], samples_per_host: i64) -> anyhow::Result<()> {
    let mut rng = rand::thread_rng();
    let started = Instant::now();
    let mut chunks = 0usize;

    for ts in 0..samples_per_host {
        for labels in hosts {
            engine.append("cpu", labels, ts, rng.gen_range(0.0..1.0));
        }
        if engine.commit()?.is_written() {
            chunks += 1;
        }
    }
    if engine.flush()?.is_written() {
        chunks += 1;
    }

    info!(
        "Ingested {} samples into {} chunks in {:?}",
        samples_per_host * hosts.len() as i64,
        chunks,
        started.elapsed()
    );
    Ok(())
}

fn run_find(engine: &Engine, name: &str, query: &Query) -> anyhow::Result<()> {
    let started = Instant::now();
    let mut series_count = 0usize;
    let mut sample_count = 0usize;

    for series in engine.find(query)? {
        series_count += 1;
        for sample in series {
            sample?;
            sample_count += 1;
        }
    }

    info!(
        "Find [{}]: {} series, {} samples in {:?}",
        name,
        series_count,
        sample_count,
        started.elapsed()
    );
    Ok(())
}

fn disk_usage(path: &Path) -> std::io::Result<u64> {
    let mut total = 0;
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        total += if metadata.is_dir() {
            disk_usage(&entry.path())?
        } else {
            metadata.len()
        };
    }
    Ok(total)
}
