use anyhow::Context;
use clap::Parser;
use racesim::core::rng::sim_rng;
use racesim::core::roster::Roster;
use racesim::core::season::Season;
use racesim::core::weekend::{SimConstants, WeekendOutcome};
use racesim::interfaces::live_interface::RaceState;
use racesim::post::championship::{career_totals, print_standings, standings, StandingKind};
use racesim::pre::read_sim_pars::{load_sim_constants, read_roster};
use racesim::pre::sim_opts::SimOpts;
use rayon::prelude::*;
use std::collections::HashMap;
use std::thread;
use std::time::Instant;
use tracing::info;

fn print_weekend(outcome: &WeekendOutcome) {
    outcome.qualifying.print_grid();
    println!();
    outcome.race1.print_classification();
    println!();
    outcome.race2.print_classification();
    println!();
}

fn print_championships(season: &Season, roster: &Roster) -> anyhow::Result<()> {
    for kind in [StandingKind::Driver, StandingKind::Team, StandingKind::Manufacturer] {
        let table = standings(season, roster, kind)?;
        print_standings(&table, kind);
        println!();
    }
    Ok(())
}

/// run_weekend simulates the first round of the season. In live mode the simulation runs in its
/// own thread and the main thread prints the race state after every lap.
fn run_weekend(sim_opts: &SimOpts, roster: Roster, sim_consts: SimConstants) -> anyhow::Result<()> {
    let mut season = Season::for_roster(sim_opts.year, &roster);

    let outcome = if sim_opts.live {
        let (tx, rx) = flume::unbounded::<RaceState>();
        let seed = sim_opts.seed;
        let sim_thread = thread::spawn(move || {
            let mut rng = sim_rng(seed);
            season.simulate_next_weekend_live(&roster, &sim_consts, &mut rng, &tx)
        });

        for race_state in rx.iter() {
            if race_state.is_final() {
                println!("INFO: {} finished", race_state.race_id);
            } else {
                println!("{}", race_state.format_lap());
            }
        }

        sim_thread
            .join()
            .map_err(|_| anyhow::anyhow!("Simulation thread panicked!"))??
    } else {
        let mut rng = sim_rng(sim_opts.seed);
        season.simulate_next_weekend(&roster, &sim_consts, &mut rng)?
    };

    print_weekend(&outcome);
    Ok(())
}

fn run_season(sim_opts: &SimOpts, roster: &Roster, sim_consts: &SimConstants) -> anyhow::Result<()> {
    let mut season = Season::for_roster(sim_opts.year, roster);
    let mut rng = sim_rng(sim_opts.seed);

    while let Some(round) = season.next_pending_round() {
        let outcome = season
            .simulate_next_weekend(roster, sim_consts, &mut rng)
            .context(format!("Failed to simulate round {}!", round))?;
        if sim_opts.debug {
            print_weekend(&outcome);
        }
        info!(
            "Round {} done, season progress {:.0}%",
            round,
            season.progress() * 100.0
        );
    }

    print_championships(&season, roster)?;

    let updated = career_totals(roster, &season)?;
    if let Some(champion) = updated.drivers().iter().find(|d| {
        roster
            .driver(&d.id)
            .map_or(false, |old| d.championships > old.championships)
    }) {
        println!(
            "RESULT: {} ({}) is the {} champion, career: {} wins, {} podiums, {} titles",
            champion.name, champion.id, season.year, champion.wins, champion.podiums, champion.championships
        );
    }
    Ok(())
}

/// run_monte_carlo simulates many independent seasons in parallel and counts the titles per
/// driver. Run i uses seed + i if a seed is given.
fn run_monte_carlo(sim_opts: &SimOpts, roster: &Roster, sim_consts: &SimConstants) -> anyhow::Result<()> {
    let champions: Vec<String> = (0..sim_opts.no_sim_runs)
        .into_par_iter()
        .map(|run| -> anyhow::Result<String> {
            let mut rng = sim_rng(sim_opts.seed.map(|seed| seed.wrapping_add(run as u64)));
            let mut season = Season::for_roster(sim_opts.year, roster);
            season.simulate_full_season(roster, sim_consts, &mut rng)?;
            let table = standings(&season, roster, StandingKind::Driver)?;
            Ok(table.first().map(|s| s.id.to_owned()).unwrap_or_default())
        })
        .collect::<anyhow::Result<Vec<String>>>()?;

    let mut titles: HashMap<&str, u32> = HashMap::new();
    for champion in champions.iter().filter(|c| !c.is_empty()) {
        *titles.entry(champion.as_str()).or_insert(0) += 1;
    }
    let mut titles: Vec<(&str, u32)> = titles.into_iter().collect();
    titles.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    println!("RESULT: Titles after {} simulated seasons", sim_opts.no_sim_runs);
    for (driver_id, no_titles) in titles.iter() {
        println!(
            "{:<10} {:>6} ({:5.1}%)",
            driver_id,
            no_titles,
            100.0 * *no_titles as f64 / sim_opts.no_sim_runs as f64
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get simulation options from the command line arguments
    let sim_opts: SimOpts = SimOpts::parse();

    let default_filter = if sim_opts.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    // get roster and simulation constants
    info!("Reading roster from {:?}", sim_opts.roster_path);
    let roster = read_roster(&sim_opts.roster_path)?;
    let sim_consts = load_sim_constants(sim_opts.consts_path.as_deref())?;

    if roster.active_tracks().next().is_none() {
        anyhow::bail!("Roster contains no active tracks, nothing to simulate!");
    }

    // EXECUTION -----------------------------------------------------------------------------------
    let t_start = Instant::now();

    if sim_opts.no_sim_runs > 1 {
        info!("Running {} seasons in parallel", sim_opts.no_sim_runs);
        run_monte_carlo(&sim_opts, &roster, &sim_consts)?;
    } else if sim_opts.season {
        run_season(&sim_opts, &roster, &sim_consts)?;
    } else {
        run_weekend(&sim_opts, roster, sim_consts)?;
    }

    info!("Execution time: {}ms", t_start.elapsed().as_millis());
    Ok(())
}
