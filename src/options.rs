use clap::{Args, Parser};
use log::LevelFilter;

use crate::backend::AllocationSettings;

#[derive(Clone, Debug, Parser)]
#[clap(author, version, about)]
pub struct Options {
    /// Input files in the textual assembly form
    #[clap(required = true)]
    pub input: Vec<String>,

    /// Output file, the allocated assembly is written to stdout when absent
    #[clap(short, long)]
    pub output: Option<String>,

    #[clap(flatten)]
    pub allocation: AllocationOptions,

    /// Logging verbosity, repeat for more
    #[clap(short, long, parse(from_occurrences))]
    pub verbose: u8,
}

#[derive(Clone, Debug, Args)]
pub struct AllocationOptions {
    /// Spill rounds per function before giving up
    #[clap(long = "max-rounds", default_value_t = 16)]
    pub max_rounds: usize,

    /// Do not coalesce moves
    #[clap(long = "no-coalesce")]
    pub no_coalesce: bool,

    /// Do not save and restore callee saved registers
    #[clap(long = "no-callee-saved")]
    pub no_callee_saved: bool,

    /// Check the internal invariants of the allocator
    #[clap(long)]
    pub verify: bool,

    /// Print a summary of every allocated function
    #[clap(long)]
    pub report: bool,
}

impl Options {
    pub fn verbosity(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

impl From<&AllocationOptions> for AllocationSettings {
    fn from(options: &AllocationOptions) -> Self {
        AllocationSettings {
            max_rounds: options.max_rounds,
            coalesce: !options.no_coalesce,
            callee_saved: !options.no_callee_saved,
            verify: options.verify,
        }
    }
}

/// Gets command line options and input using clap.
/// Returns an Options struct representing the fully parsed options
pub fn get() -> Options {
    Options::parse()
}
