/// Hybrid parallel sort engine.
///
/// One invocation moves through `Configured -> Partitioned -> Sorting ->
/// Combining -> Done`:
/// - small batches (below the threshold) count buckets per partition and
///   decode the shared histogram;
/// - larger batches merge sort each partition and tournament-merge the runs.
///
/// Workers are OS threads from a pool built fresh for each run, one per
/// partition. Nothing is combined until every worker has returned.
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use rayon::ThreadPool;

use super::combine::{copy_back, histogram_decode, tournament_merge};
use super::error::SortError;
use super::hash::{DEFAULT_BUCKET_RANGE, KeyHasher, NAME_SECTIONS};
use super::histogram::SharedHistogram;
use super::key::SortKey;
use super::partition::{Partition, split};
use super::pass::{counting_pass, merge_sort_pass};
use crate::record::Record;

/// Default worker cap.
pub const DEFAULT_WORKERS: usize = 5;
/// Records each worker should ideally own.
pub const DEFAULT_PARTITION_SIZE: usize = 1000;
/// Batches smaller than this use the counting path.
pub const DEFAULT_THRESHOLD: usize = 43;
/// Largest accepted batch.
pub const DEFAULT_MAX_RECORDS: usize = 50_000;
/// Longest accepted name, in bytes.
pub const DEFAULT_MAX_NAME_LEN: usize = 128;

/// How the per-partition algorithm is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    /// Counting below the threshold, merge at or above it.
    #[default]
    Auto,
    /// Always the counting path.
    Counting,
    /// Always the merge path.
    Merge,
}

impl FromStr for Algorithm {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Algorithm::Auto),
            "counting" | "count" => Ok(Algorithm::Counting),
            "merge" => Ok(Algorithm::Merge),
            other => Err(SortError::Config(format!(
                "unknown algorithm '{}' (expected auto, counting or merge)",
                other
            ))),
        }
    }
}

/// The algorithm pair actually used by one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Counting pass + histogram decode.
    Counting,
    /// Merge sort pass + tournament merge.
    Merge,
}

impl Strategy {
    /// Pick the strategy for a batch of `n` records.
    pub fn select(n: usize, config: &EngineConfig) -> Strategy {
        match config.algorithm {
            Algorithm::Counting => Strategy::Counting,
            Algorithm::Merge => Strategy::Merge,
            Algorithm::Auto if n < config.threshold => Strategy::Counting,
            Algorithm::Auto => Strategy::Merge,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Counting => f.write_str("counting sort"),
            Strategy::Merge => f.write_str("merge sort"),
        }
    }
}

/// Tunables for one engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub workers: usize,
    pub partition_size: usize,
    pub threshold: usize,
    pub bucket_range: usize,
    pub max_records: usize,
    pub max_name_len: usize,
    pub algorithm: Algorithm,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            workers: DEFAULT_WORKERS,
            partition_size: DEFAULT_PARTITION_SIZE,
            threshold: DEFAULT_THRESHOLD,
            bucket_range: DEFAULT_BUCKET_RANGE,
            max_records: DEFAULT_MAX_RECORDS,
            max_name_len: DEFAULT_MAX_NAME_LEN,
            algorithm: Algorithm::Auto,
        }
    }
}

impl EngineConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_partition_size(mut self, size: usize) -> Self {
        self.partition_size = size;
        self
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_bucket_range(mut self, range: usize) -> Self {
        self.bucket_range = range;
        self
    }

    pub fn with_max_records(mut self, max: usize) -> Self {
        self.max_records = max;
        self
    }

    pub fn with_max_name_len(mut self, max: usize) -> Self {
        self.max_name_len = max;
        self
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Reject tunables the engine cannot run with.
    pub fn validate(&self) -> Result<(), SortError> {
        if self.workers == 0 {
            return Err(SortError::Config("worker count must be at least 1".into()));
        }
        if self.partition_size == 0 {
            return Err(SortError::Config("partition size must be at least 1".into()));
        }
        if self.bucket_range < NAME_SECTIONS {
            return Err(SortError::Config(format!(
                "bucket range must be at least {}",
                NAME_SECTIONS
            )));
        }
        if self.bucket_range > i64::MAX as usize {
            return Err(SortError::Config("bucket range is too large".into()));
        }
        if self.max_name_len == 0 {
            return Err(SortError::Config("maximum name length must be at least 1".into()));
        }
        Ok(())
    }
}

/// Engine lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Configured,
    Partitioned,
    Sorting,
    Combining,
    Done,
}

/// What one run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortReport {
    pub key: SortKey,
    pub records: usize,
    pub strategy: Strategy,
    pub partitions: usize,
    pub elapsed: Duration,
    /// Process-wide peak RSS in bytes when the run finished, if the
    /// platform reports it.
    pub peak_rss: Option<u64>,
}

impl fmt::Display for SortReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sorted {} records by {} using {} across {} partition(s) in {:.3}s",
            self.records,
            self.key,
            self.strategy,
            self.partitions,
            self.elapsed.as_secs_f64()
        )?;
        if let Some(bytes) = self.peak_rss {
            write!(f, ", peak RSS {} KiB", bytes / 1024)?;
        }
        Ok(())
    }
}

/// Sorted records plus the run report.
#[derive(Debug)]
pub struct SortOutcome {
    pub records: Vec<Record>,
    pub report: SortReport,
}

/// Single-use sort engine; `run` consumes it.
#[derive(Debug)]
pub struct SortEngine {
    config: EngineConfig,
    key: SortKey,
    records: Vec<Record>,
    phase: Phase,
}

impl SortEngine {
    /// Validate the configuration and batch size. Nothing is allocated yet.
    pub fn new(records: Vec<Record>, key: SortKey, config: EngineConfig) -> Result<Self, SortError> {
        config.validate()?;
        if records.len() > config.max_records {
            return Err(SortError::TooManyRecords {
                count: records.len(),
                limit: config.max_records,
            });
        }
        Ok(SortEngine {
            config,
            key,
            records,
            phase: Phase::Configured,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn key(&self) -> SortKey {
        self.key
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The strategy `run` will use for this batch.
    pub fn strategy(&self) -> Strategy {
        Strategy::select(self.records.len(), &self.config)
    }

    fn enter(&mut self, phase: Phase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "engine phase");
        self.phase = phase;
    }

    /// Partition, sort on workers, wait for all of them, combine.
    pub fn run(mut self) -> Result<SortOutcome, SortError> {
        let started = Instant::now();
        let strategy = self.strategy();
        let n = self.records.len();

        let partitions = if n == 0 {
            0
        } else {
            let parts = split(&self.records, self.config.partition_size, self.config.workers)?;
            let count = parts.len();
            self.enter(Phase::Partitioned);
            tracing::debug!(records = n, partitions = count, %strategy, "partitioned");

            match strategy {
                Strategy::Counting => self.run_counting(parts)?,
                Strategy::Merge => self.run_merge(parts)?,
            }
            count
        };
        self.enter(Phase::Done);

        let report = SortReport {
            key: self.key,
            records: n,
            strategy,
            partitions,
            elapsed: started.elapsed(),
            peak_rss: crate::common::peak_rss_bytes(),
        };
        tracing::info!(
            records = report.records,
            key = %report.key,
            strategy = %report.strategy,
            partitions = report.partitions,
            elapsed_ms = report.elapsed.as_millis() as u64,
            peak_rss = report.peak_rss,
            "sort finished"
        );
        Ok(SortOutcome {
            records: self.records,
            report,
        })
    }

    fn run_counting(&mut self, mut parts: Vec<Partition>) -> Result<(), SortError> {
        let hasher = KeyHasher::new(self.key, self.config.bucket_range);
        let shared = SharedHistogram::new();

        self.enter(Phase::Sorting);
        let pool = build_pool(parts.len())?;
        run_workers(&pool, &mut parts, |part| {
            counting_pass(&part.records, hasher, &shared).map(|local| {
                tracing::trace!(
                    partition = part.index,
                    buckets = local.occupied(),
                    "local histogram folded"
                );
            })
        })?;
        drop(pool);
        // Histograms are folded in; the partition copies are no longer needed.
        drop(parts);

        self.enter(Phase::Combining);
        let histogram = shared.into_inner()?;
        debug_assert_eq!(histogram.total(), self.records.len());
        histogram_decode(&mut self.records, histogram, hasher)
    }

    fn run_merge(&mut self, mut parts: Vec<Partition>) -> Result<(), SortError> {
        let key = self.key;

        self.enter(Phase::Sorting);
        let pool = build_pool(parts.len())?;
        run_workers(&pool, &mut parts, |part| merge_sort_pass(&mut part.records, key))?;
        drop(pool);

        self.enter(Phase::Combining);
        let chunks = copy_back(&mut self.records, parts)?;
        let merged = tournament_merge(&mut self.records, chunks, key)?;
        debug_assert_eq!(merged.map(|c| c.len()), Some(self.records.len()));
        Ok(())
    }
}

/// Build a fixed-size pool with one thread per partition.
fn build_pool(threads: usize) -> Result<ThreadPool, SortError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("lazysort-worker-{}", i))
        .build()?;
    Ok(pool)
}

/// Run `pass` on every partition, one spawned task each, and return only
/// after all of them have finished. The first worker error is returned.
fn run_workers<F>(pool: &ThreadPool, parts: &mut [Partition], pass: F) -> Result<(), SortError>
where
    F: Fn(&mut Partition) -> Result<(), SortError> + Sync,
{
    let mut outcomes: Vec<Result<(), SortError>> = Vec::new();
    outcomes
        .try_reserve_exact(parts.len())
        .map_err(SortError::alloc("worker results"))?;
    outcomes.resize_with(parts.len(), || Ok(()));

    let pass = &pass;
    pool.scope(|scope| {
        for (part, outcome) in parts.iter_mut().zip(outcomes.iter_mut()) {
            scope.spawn(move |_| *outcome = pass(part));
        }
    });

    outcomes.into_iter().collect()
}

/// Sort `records` by `key` in one call.
pub fn sort_records(
    records: Vec<Record>,
    key: SortKey,
    config: &EngineConfig,
) -> Result<SortOutcome, SortError> {
    SortEngine::new(records, key, config.clone())?.run()
}
