use crate::core::track::Track;
use crate::core::weekend::{SimConstants, Weekend, WeekendOutcome};
use crate::core::roster::Roster;
use crate::core::weather::WeatherKind;
use crate::error::{EntityKind, Result, SimError};
use crate::interfaces::live_interface::RaceState;
use crate::post::race_result::{RaceResult, RaceType};
use flume::Sender;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

/// RaceRecord is one entry of the season calendar. The weekend orchestrator writes `completed`
/// and `results` back once both races of a weekend are done.
///
/// * `round` - Weekend number in the calendar (two races share one round)
/// * `distance` - (km) Race distance
/// * `weather` - Base weather the race starts in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceRecord {
    pub id: String,
    pub round: u32,
    pub track_id: String,
    pub track_name: String,
    pub laps: u32,
    pub distance: f64,
    pub weather: WeatherKind,
    pub race_type: RaceType,
    pub completed: bool,
    pub results: Option<Vec<RaceResult>>,
}

impl RaceRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: &str,
        round: u32,
        track_id: &str,
        track_name: &str,
        laps: u32,
        distance: f64,
        weather: WeatherKind,
        race_type: RaceType,
    ) -> RaceRecord {
        RaceRecord {
            id: id.to_owned(),
            round,
            track_id: track_id.to_owned(),
            track_name: track_name.to_owned(),
            laps,
            distance,
            weather,
            race_type,
            completed: false,
            results: None,
        }
    }

    /// for_track creates a calendar entry taking laps, distance and weather from the track.
    pub fn for_track(id: &str, round: u32, track: &Track, race_type: RaceType) -> RaceRecord {
        RaceRecord::new(
            id,
            round,
            &track.id,
            &track.name,
            track.laps,
            track.distance,
            track.weather,
            race_type,
        )
    }

    pub fn mark_completed(&mut self, results: Vec<RaceResult>) {
        self.completed = true;
        self.results = Some(results);
    }

    /// completed_results returns the results of a completed race, None otherwise.
    pub fn completed_results(&self) -> Option<&[RaceResult]> {
        if self.completed {
            self.results.as_deref()
        } else {
            None
        }
    }
}

/// Season holds the calendar of one year. A season is completed once every race in it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub year: u32,
    pub races: Vec<RaceRecord>,
    pub completed: bool,
}

/// generate_calendar creates one weekend per track in the given order, each consisting of a main
/// race followed by an inverted-grid race.
pub fn generate_calendar<'a, I>(year: u32, tracks: I) -> Season
where
    I: IntoIterator<Item = &'a Track>,
{
    let mut races = Vec::new();
    for (i, track) in tracks.into_iter().enumerate() {
        let round = i as u32 + 1;
        races.push(RaceRecord::for_track(
            &format!("{}-{:02}-r1", year, round),
            round,
            track,
            RaceType::Main,
        ));
        races.push(RaceRecord::for_track(
            &format!("{}-{:02}-r2", year, round),
            round,
            track,
            RaceType::Inverted,
        ));
    }
    Season::new(year, races)
}

impl Season {
    pub fn new(year: u32, races: Vec<RaceRecord>) -> Season {
        let mut season = Season {
            year,
            races,
            completed: false,
        };
        season.update_completed();
        season
    }

    /// for_roster creates the calendar of a year from the active tracks of a roster.
    pub fn for_roster(year: u32, roster: &Roster) -> Season {
        generate_calendar(year, roster.active_tracks())
    }

    fn update_completed(&mut self) {
        self.completed = self.races.iter().all(|race| race.completed);
    }

    // ---------------------------------------------------------------------------------------------
    // PROGRESS ------------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// next_pending_round returns the round of the first race that is not completed yet.
    pub fn next_pending_round(&self) -> Option<u32> {
        self.races
            .iter()
            .find(|race| !race.completed)
            .map(|race| race.round)
    }

    pub fn completed_races(&self) -> impl Iterator<Item = &RaceRecord> {
        self.races.iter().filter(|race| race.completed)
    }

    pub fn no_completed_races(&self) -> usize {
        self.completed_races().count()
    }

    pub fn no_rounds(&self) -> u32 {
        self.races.iter().map(|race| race.round).max().unwrap_or(0)
    }

    /// progress returns the completed share of the calendar in [0, 1].
    pub fn progress(&self) -> f64 {
        if self.races.is_empty() {
            return 0.0;
        }
        self.no_completed_races() as f64 / self.races.len() as f64
    }

    /// weekend returns the main and the inverted race of a round.
    pub fn weekend(&self, round: u32) -> Result<(&RaceRecord, &RaceRecord)> {
        Ok((
            self.find_race(round, RaceType::Main)?,
            self.find_race(round, RaceType::Inverted)?,
        ))
    }

    fn find_race(&self, round: u32, race_type: RaceType) -> Result<&RaceRecord> {
        self.races
            .iter()
            .find(|race| race.round == round && race.race_type == race_type)
            .ok_or_else(|| {
                SimError::not_found(
                    EntityKind::Race,
                    &format!("{}-{:02} {}", self.year, round, race_type),
                )
            })
    }

    // ---------------------------------------------------------------------------------------------
    // SIMULATION ----------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// simulate_next_weekend runs qualifying and both races of the next pending round and stores
    /// the results on the race records.
    pub fn simulate_next_weekend<R: Rng + ?Sized>(
        &mut self,
        roster: &Roster,
        sim_consts: &SimConstants,
        rng: &mut R,
    ) -> Result<WeekendOutcome> {
        self.run_next_weekend(roster, sim_consts, rng, None)
    }

    /// simulate_next_weekend_live does the same as simulate_next_weekend but sends the race state
    /// after every lap of both races.
    pub fn simulate_next_weekend_live<R: Rng + ?Sized>(
        &mut self,
        roster: &Roster,
        sim_consts: &SimConstants,
        rng: &mut R,
        tx: &Sender<RaceState>,
    ) -> Result<WeekendOutcome> {
        self.run_next_weekend(roster, sim_consts, rng, Some(tx))
    }

    /// simulate_full_season simulates all remaining weekends in calendar order.
    pub fn simulate_full_season<R: Rng + ?Sized>(
        &mut self,
        roster: &Roster,
        sim_consts: &SimConstants,
        rng: &mut R,
    ) -> Result<Vec<WeekendOutcome>> {
        let mut outcomes = Vec::new();
        while self.next_pending_round().is_some() {
            outcomes.push(self.simulate_next_weekend(roster, sim_consts, rng)?);
        }
        info!("Season {} completed after {} weekends", self.year, outcomes.len());
        Ok(outcomes)
    }

    fn run_next_weekend<R: Rng + ?Sized>(
        &mut self,
        roster: &Roster,
        sim_consts: &SimConstants,
        rng: &mut R,
        tx: Option<&Sender<RaceState>>,
    ) -> Result<WeekendOutcome> {
        let round = self
            .next_pending_round()
            .ok_or(SimError::NoRacesRemaining(self.year))?;
        let (race1, race2) = self.weekend(round)?;
        info!(
            "Season {}: round {}/{} at {}",
            self.year,
            round,
            self.no_rounds(),
            race1.track_name
        );

        let mut weekend = Weekend::new(race1.to_owned(), race2.to_owned(), roster, sim_consts)?;
        if let Some(tx) = tx {
            weekend = weekend.with_live(tx.to_owned());
        }
        let outcome = weekend.simulate(rng)?;

        for record in [&outcome.race1_record, &outcome.race2_record] {
            if let Some(race) = self.races.iter_mut().find(|race| race.id == record.id) {
                *race = record.to_owned();
            }
        }
        self.update_completed();
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::sim_rng;
    use crate::core::roster::fixtures;

    #[test]
    fn calendar_pairs_races_per_track() {
        let roster = fixtures::roster(4);
        let season = Season::for_roster(2024, &roster);

        assert_eq!(season.races.len(), 24);
        assert_eq!(season.no_rounds(), 12);
        for pair in season.races.chunks(2) {
            assert_eq!(pair[0].round, pair[1].round);
            assert_eq!(pair[0].track_id, pair[1].track_id);
            assert_eq!(pair[0].race_type, RaceType::Main);
            assert_eq!(pair[1].race_type, RaceType::Inverted);
        }
        assert!(!season.completed);
        assert_eq!(season.next_pending_round(), Some(1));
    }

    #[test]
    fn next_weekend_completes_one_round() {
        let roster = fixtures::roster(12);
        let mut season = Season::for_roster(2024, &roster);
        let sim_consts = SimConstants::default();
        let mut rng = sim_rng(Some(41));

        let outcome = season.simulate_next_weekend(&roster, &sim_consts, &mut rng).unwrap();
        assert_eq!(outcome.round, 1);
        assert_eq!(season.no_completed_races(), 2);
        assert_eq!(season.next_pending_round(), Some(2));
        assert!(season.races[0].completed_results().is_some());
        assert!(season.races[1].completed_results().is_some());
        assert!(season.races[2].completed_results().is_none());
        assert!((season.progress() - 2.0 / 24.0).abs() < 1e-12);
    }

    #[test]
    fn full_season_then_no_races_remaining() {
        let roster = Roster::new(&fixtures::roster_pars(10, 3)).unwrap();
        let mut season = Season::for_roster(2025, &roster);
        let sim_consts = SimConstants::default();
        let mut rng = sim_rng(Some(42));

        let outcomes = season.simulate_full_season(&roster, &sim_consts, &mut rng).unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(season.completed);
        assert_eq!(season.progress(), 1.0);
        assert_eq!(
            season.simulate_next_weekend(&roster, &sim_consts, &mut rng).unwrap_err(),
            SimError::NoRacesRemaining(2025)
        );
    }

    #[test]
    fn same_seed_same_season() {
        let roster = Roster::new(&fixtures::roster_pars(10, 2)).unwrap();
        let sim_consts = SimConstants::default();

        let mut a = Season::for_roster(2024, &roster);
        let mut b = Season::for_roster(2024, &roster);
        a.simulate_full_season(&roster, &sim_consts, &mut sim_rng(Some(7))).unwrap();
        b.simulate_full_season(&roster, &sim_consts, &mut sim_rng(Some(7))).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_weekend_is_not_found() {
        let roster = fixtures::roster(4);
        let season = Season::for_roster(2024, &roster);
        assert!(matches!(
            season.weekend(99),
            Err(SimError::NotFound {
                kind: EntityKind::Race,
                ..
            })
        ));
    }
}
