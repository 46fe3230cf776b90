use crate::core::race::{GridSlot, Race, RaceConfig};
use crate::core::roster::Roster;
use crate::core::season::RaceRecord;
use crate::error::Result;
use crate::interfaces::live_interface::RaceState;
use crate::post::race_result::RaceOutcome;
use flume::Sender;
use rand::Rng;
use tracing::{debug, info, warn};

/// simulate_race runs a complete race from the given grid and returns the classification.
pub fn simulate_race<R: Rng + ?Sized>(
    race_record: &RaceRecord,
    grid: &[GridSlot],
    roster: &Roster,
    race_cfg: &RaceConfig,
    rng: &mut R,
) -> Result<RaceOutcome> {
    handle_race(race_record, grid, roster, race_cfg, rng, None)
}

/// handle_race creates and simulates a race on the basis of the inserted parameters, and returns
/// the results for post-processing. If a sender is inserted, the race state is sent after every
/// lap and a final message carrying the classification is sent at the end. A listener hanging up
/// does not stop the race.
pub fn handle_race<R: Rng + ?Sized>(
    race_record: &RaceRecord,
    grid: &[GridSlot],
    roster: &Roster,
    race_cfg: &RaceConfig,
    rng: &mut R,
    tx: Option<&Sender<RaceState>>,
) -> Result<RaceOutcome> {
    let mut race = Race::new(race_record, grid, roster, race_cfg, rng)?;
    let mut tx = tx;

    while let Some(summary) = race.simulate_lap(rng) {
        debug!(
            "{}: lap {}/{} leader {}",
            race.race_id,
            summary.lap,
            race.tot_no_laps,
            summary.leader.as_deref().unwrap_or("-")
        );

        if let Some(sender) = tx {
            if sender.send(race.get_race_state()).is_err() {
                warn!("{}: live listener disconnected", race.race_id);
                tx = None;
            }
        }
    }

    let result = race.get_race_result();
    if let Some(sender) = tx {
        let mut final_msg = race.get_race_state();
        final_msg.final_result = Some(result.clone());
        if sender.send(final_msg).is_err() {
            warn!("{}: live listener disconnected before the final result", race.race_id);
        }
    }

    match result.winner() {
        Some(winner) => info!("{}: {} wins", result.race_id, winner.driver_id),
        None => info!("{}: no classified finisher", result.race_id),
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::sim_rng;
    use crate::core::roster::fixtures;
    use crate::core::weather::WeatherKind;
    use crate::post::race_result::RaceType;

    fn setup(laps: u32) -> (Roster, RaceRecord, Vec<GridSlot>) {
        let roster = fixtures::roster(6);
        let record = RaceRecord::new("live-r1", 1, "k00", "Track k00", laps, 100.0, WeatherKind::Sunny, RaceType::Main);
        let grid = roster
            .active_driver_ids()
            .into_iter()
            .enumerate()
            .map(|(i, driver_id)| GridSlot {
                position: i as u32 + 1,
                driver_id,
            })
            .collect();
        (roster, record, grid)
    }

    #[test]
    fn streams_one_state_per_lap_plus_final() {
        let (roster, record, grid) = setup(12);
        let cfg = RaceConfig::default();
        let (tx, rx) = flume::unbounded();
        let mut rng = sim_rng(Some(31));
        let outcome = handle_race(&record, &grid, &roster, &cfg, &mut rng, Some(&tx)).unwrap();
        drop(tx);

        let states: Vec<RaceState> = rx.iter().collect();
        assert_eq!(states.len(), 13);
        assert!(states[..12]
            .iter()
            .enumerate()
            .all(|(i, s)| s.lap == i as u32 + 1 && !s.is_final()));
        assert_eq!(states[12].final_result.as_ref(), Some(&outcome));
    }

    #[test]
    fn streaming_does_not_change_the_result() {
        let (roster, record, grid) = setup(12);
        let cfg = RaceConfig::default();
        let (tx, _rx) = flume::unbounded();

        let streamed = handle_race(&record, &grid, &roster, &cfg, &mut sim_rng(Some(32)), Some(&tx)).unwrap();
        let silent = simulate_race(&record, &grid, &roster, &cfg, &mut sim_rng(Some(32))).unwrap();
        assert_eq!(streamed, silent);
    }

    #[test]
    fn disconnected_listener_does_not_abort() {
        let (roster, record, grid) = setup(5);
        let cfg = RaceConfig::default();
        let (tx, rx) = flume::unbounded();
        drop(rx);
        let outcome = handle_race(&record, &grid, &roster, &cfg, &mut sim_rng(Some(33)), Some(&tx)).unwrap();
        assert_eq!(outcome.results.len(), 6);
    }
}
