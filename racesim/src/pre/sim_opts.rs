use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    author = "Alexander Heilmeier <alexander.heilmeier@tum.de>",
    name = "RS-WE",
    about = "A race weekend simulator: knockout qualifying, paired races and championship standings"
)]
pub struct SimOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug logging
    #[clap(short, long)]
    pub debug: bool,

    /// Simulate the whole season instead of a single weekend
    #[clap(short, long)]
    pub season: bool,

    /// Print a line per lap while the races are simulated (single weekend only)
    #[clap(short, long)]
    pub live: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set number of seasons to simulate, values > 1 run a Monte-Carlo batch of seasons
    #[clap(short, long, default_value = "1")]
    pub no_sim_runs: u32,

    /// Set path to the roster file
    #[clap(short, long, default_value = "input/parameters/roster.json")]
    pub roster_path: PathBuf,

    /// Set path to the simulation constants file (OPTIONAL: if not set, defaults are used)
    #[clap(short, long)]
    pub consts_path: Option<PathBuf>,

    /// Set seed of the random number generator (OPTIONAL: if not set, seeded from entropy)
    #[clap(long)]
    pub seed: Option<u64>,

    /// Set season year
    #[clap(short, long, default_value = "2024")]
    pub year: u32,
}
