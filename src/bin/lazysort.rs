use std::fs::File;
use std::io::{self, Write};
use std::process;

use anyhow::Context;
use clap::Parser;

use lazysort::common::{io::read_input, logging, report_error};
use lazysort::record::{IntakeLimits, RecordError, parse_batch, write_batch};
use lazysort::sort::{
    Algorithm, DEFAULT_BUCKET_RANGE, DEFAULT_MAX_NAME_LEN, DEFAULT_MAX_RECORDS,
    DEFAULT_PARTITION_SIZE, DEFAULT_THRESHOLD, DEFAULT_WORKERS, EngineConfig, SortError,
    find_disorder, sort_records,
};

/// Exit status for bad input, bad flags, or an unsorted --check.
const EXIT_USER: i32 = 1;
/// Exit status for resource and I/O failures.
const EXIT_FATAL: i32 = 2;

#[derive(Parser)]
#[command(
    name = "lazysort",
    version,
    about = "Sort name/id/timestamp records with a hybrid parallel counting/merge sort"
)]
struct Cli {
    /// Input file ('-' for standard input)
    #[arg(default_value = "-")]
    input: String,

    /// Write result to FILE instead of standard output
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<String>,

    /// Maximum number of worker threads
    #[arg(short = 'j', long = "workers", value_name = "N", default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Records each worker should ideally own
    #[arg(long = "partition-size", value_name = "N", default_value_t = DEFAULT_PARTITION_SIZE)]
    partition_size: usize,

    /// Batches smaller than N records use counting sort
    #[arg(long = "threshold", value_name = "N", default_value_t = DEFAULT_THRESHOLD)]
    threshold: usize,

    /// Number of counting-sort buckets
    #[arg(long = "bucket-range", value_name = "N", default_value_t = DEFAULT_BUCKET_RANGE)]
    bucket_range: usize,

    /// Largest accepted record count
    #[arg(long = "max-records", value_name = "N", default_value_t = DEFAULT_MAX_RECORDS)]
    max_records: usize,

    /// Longest accepted name, in bytes
    #[arg(long = "max-name-len", value_name = "N", default_value_t = DEFAULT_MAX_NAME_LEN)]
    max_name_len: usize,

    /// Per-partition algorithm: auto, counting or merge
    #[arg(long = "algorithm", value_name = "ALGO", default_value = "auto")]
    algorithm: String,

    /// Check whether the records are already sorted; do not sort
    #[arg(short = 'c', long = "check")]
    check: bool,

    /// Print strategy, partition count and elapsed time to stderr
    #[arg(long = "stats")]
    stats: bool,

    /// Log filter (overrides LAZYSORT_LOG), e.g. debug or lazysort=trace
    #[arg(long = "log-level", value_name = "LEVEL")]
    log_level: Option<String>,
}

/// Failure with the exit status it maps to.
struct Failure {
    code: i32,
    message: String,
}

impl From<SortError> for Failure {
    fn from(e: SortError) -> Self {
        let code = if e.is_user_error() { EXIT_USER } else { EXIT_FATAL };
        Failure {
            code,
            message: e.to_string(),
        }
    }
}

impl From<RecordError> for Failure {
    fn from(e: RecordError) -> Self {
        let code = if e.is_user_error() { EXIT_USER } else { EXIT_FATAL };
        let message = match e {
            RecordError::Io(ref err) => lazysort::io_error_msg(err),
            ref other => other.to_string(),
        };
        Failure { code, message }
    }
}

impl From<anyhow::Error> for Failure {
    fn from(e: anyhow::Error) -> Self {
        let message = match e.downcast_ref::<io::Error>() {
            Some(err) => format!("{}: {}", e, lazysort::io_error_msg(err)),
            None => format!("{:#}", e),
        };
        Failure {
            code: EXIT_FATAL,
            message,
        }
    }
}

fn build_config(cli: &Cli) -> Result<EngineConfig, SortError> {
    let algorithm: Algorithm = cli.algorithm.parse()?;
    let config = EngineConfig::default()
        .with_workers(cli.workers)
        .with_partition_size(cli.partition_size)
        .with_threshold(cli.threshold)
        .with_bucket_range(cli.bucket_range)
        .with_max_records(cli.max_records)
        .with_max_name_len(cli.max_name_len)
        .with_algorithm(algorithm);
    config.validate()?;
    Ok(config)
}

fn run(cli: &Cli) -> Result<(), Failure> {
    let config = build_config(cli)?;

    let data = read_input(&cli.input).with_context(|| format!("cannot read {}", cli.input))?;
    let batch = parse_batch(&data, &IntakeLimits::from(&config))?;
    drop(data);

    if cli.check {
        if let Some(i) = find_disorder(&batch.records, batch.key) {
            let r = &batch.records[i];
            return Err(Failure {
                code: EXIT_USER,
                message: format!("record {}: disorder: {} {} {}", i + 1, r.name, r.id, r.timestamp),
            });
        }
        return Ok(());
    }

    let key = batch.key;
    let outcome = sort_records(batch.records, key, &config)?;
    if cli.stats {
        eprintln!("{}", outcome.report);
    }

    match cli.output {
        Some(ref path) => {
            let mut file =
                File::create(path).with_context(|| format!("cannot create {}", path))?;
            write_batch(&mut file, key, &outcome.records)
                .with_context(|| format!("write failed: {}", path))?;
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            write_batch(&mut lock, key, &outcome.records).context("write failed")?;
            lock.flush().context("write failed")?;
        }
    }
    Ok(())
}

fn main() {
    lazysort::reset_sigpipe();
    let cli = Cli::parse();
    logging::init_with_level(&logging::resolve_level(cli.log_level.as_deref()));

    if let Err(f) = run(&cli) {
        report_error(&f.message);
        process::exit(f.code);
    }
}
