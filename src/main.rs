//! Command line front end.
//!
//! Loads text records into the memory array, then runs one of the demo
//! workloads over a sample of the rows.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use pcmbench::workload::{
    capitalize_records, count_matching, is_sorted_by_first_record, load_text_records,
    order_rows_by_first_record,
};
use pcmbench::{
    BenchConfig, ConcurrencyModel, DEFAULT_BANKS, DEFAULT_ROW_BYTE_SIZE, DEFAULT_ROWS_PER_BANK,
    Harness, Operation, PartitionPolicy, ShufflePolicy,
};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ShuffleArg {
    Uniform,
    BankAware,
    BankGrouped,
}

impl From<ShuffleArg> for ShufflePolicy {
    fn from(arg: ShuffleArg) -> Self {
        match arg {
            ShuffleArg::Uniform => ShufflePolicy::Uniform,
            ShuffleArg::BankAware => ShufflePolicy::BankAware,
            ShuffleArg::BankGrouped => ShufflePolicy::BankGrouped,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PartitionArg {
    Even,
    ContentionFree,
}

impl From<PartitionArg> for PartitionPolicy {
    fn from(arg: PartitionArg) -> Self {
        match arg {
            PartitionArg::Even => PartitionPolicy::EvenSplit,
            PartitionArg::ContentionFree => PartitionPolicy::ContentionFree,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ConcurrencyArg {
    Threaded,
    Cooperative,
}

impl From<ConcurrencyArg> for ConcurrencyModel {
    fn from(arg: ConcurrencyArg) -> Self {
        match arg {
            ConcurrencyArg::Threaded => ConcurrencyModel::Threaded,
            ConcurrencyArg::Cooperative => ConcurrencyModel::Cooperative,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// count the records that contain --word (or every record)
    Count,
    /// upper-case every record
    Capitalize,
    /// sort the rows of each slot by their first record
    Sort,
}

#[derive(Parser, Debug)]
#[command(name = "pcmbench")]
#[command(about = "Partition a bank-organized memory array among workers", long_about = None)]
struct Cli {
    /// Number of banks
    #[arg(long, env = "PCM_BANKS", default_value_t = DEFAULT_BANKS)]
    banks: usize,

    /// Number of rows in each bank
    #[arg(long, env = "PCM_ROWS_PER_BANK", default_value_t = DEFAULT_ROWS_PER_BANK)]
    rows_per_bank: usize,

    /// Size of each row in bytes
    #[arg(long, env = "PCM_ROW_BYTES", default_value_t = DEFAULT_ROW_BYTE_SIZE)]
    row_bytes: usize,

    /// Number of worker slots [default: one per bank]
    #[arg(long, env = "PCM_THREADS")]
    threads: Option<usize>,

    /// Number of rows to sample [default: every row]
    #[arg(short, long, env = "PCM_SAMPLE")]
    sample: Option<usize>,

    /// How the row indices get ordered
    #[arg(long, env = "PCM_SHUFFLE", value_enum, default_value = "uniform")]
    shuffle: ShuffleArg,

    /// How the sampled rows get assigned to slots
    #[arg(long, env = "PCM_PARTITION", value_enum, default_value = "even")]
    partition: PartitionArg,

    /// How the workers are provided
    #[arg(long, env = "PCM_CONCURRENCY", value_enum, default_value = "threaded")]
    concurrency: ConcurrencyArg,

    /// Seed for the shuffle [default: derived from the clock]
    #[arg(long, env = "PCM_SEED")]
    seed: Option<u64>,

    /// Text file whose lines are loaded as records
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// What to do with the sampled rows
    #[arg(short, long, value_enum, default_value = "count")]
    mode: Mode,

    /// Only count records that contain this text
    #[arg(short, long)]
    word: Option<String>,
}

impl Cli {
    fn bench_config(&self) -> BenchConfig {
        BenchConfig {
            bank_count: self.banks,
            rows_per_bank: self.rows_per_bank,
            row_byte_size: self.row_bytes,
            num_threads: self.threads,
            sample: self.sample,
            shuffle: self.shuffle.into(),
            partition: self.partition.into(),
            concurrency: self.concurrency.into(),
            seed: self.seed,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let harness = Harness::new(&cli.bench_config()).context("invalid configuration")?;
    let plan = harness.plan().context("unable to partition the rows")?;

    let stats = &plan.sample_stats;
    println!("sampling:\t{}", stats.sampling_fraction());
    match stats.max_over_avg() {
        Some(ratio) => println!(
            "max/avg({}/{}):\t{}",
            stats.max_rows_per_bank, stats.avg_rows_per_bank, ratio
        ),
        None => println!(
            "max/avg({}/{}):\tundefined",
            stats.max_rows_per_bank, stats.avg_rows_per_bank
        ),
    }
    println!("max slots per bank:\t{}", plan.max_slots_per_bank);

    let mut buffer = harness.allocate_buffer()?;
    if let Some(path) = &cli.input {
        let file =
            File::open(path).with_context(|| format!("unable to open {}", path.display()))?;
        let n_records = load_text_records(&mut buffer, BufReader::new(file))?;
        println!("records loaded:\t{n_records}");
    }

    match cli.mode {
        Mode::Count => {
            let needle = cli.word.as_deref().map(str::as_bytes);
            let count = |row: &[u8]| count_matching(row, needle);
            let report = harness.execute(&plan, &mut buffer, Operation::Count(&count))?;
            println!("records counted:\t{}", report.total);
            println!("elapsed:\t{:?}", report.elapsed);
        }
        Mode::Capitalize => {
            let capitalize = |row: &mut [u8]| {
                capitalize_records(row);
            };
            let report = harness.execute(&plan, &mut buffer, Operation::Transform(&capitalize))?;
            println!("elapsed:\t{:?}", report.elapsed);
        }
        Mode::Sort => {
            // n rounds of odd-even transposition sort a list of n rows
            let n_rounds = plan.rows_per_slot().into_iter().max().unwrap_or(0);
            let compare = order_rows_by_first_record;
            for _ in 0..n_rounds {
                harness.execute(&plan, &mut buffer, Operation::PairwiseEven(&compare))?;
                harness.execute(&plan, &mut buffer, Operation::PairwiseOdd(&compare))?;
            }
            let sorted = plan.assignments.iter().all(|rows| {
                is_sorted_by_first_record(rows.iter().map(|&r| buffer.row(r)))
            });
            println!("rounds:\t{n_rounds}");
            println!("sorted within each slot:\t{sorted}");
        }
    }
    Ok(())
}
