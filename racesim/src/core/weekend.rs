use crate::core::handle_race::handle_race;
use crate::core::qualifying::{run_knockout, QualifyingConfig, QualifyingOutcome};
use crate::core::race::{grid_from_qualifying, GridSlot, RaceConfig};
use crate::core::roster::Roster;
use crate::core::season::RaceRecord;
use crate::core::weather::WeatherCondition;
use crate::error::{Result, SimError};
use crate::interfaces::live_interface::RaceState;
use crate::post::race_result::{RaceOutcome, RaceResult, RaceType};
use flume::Sender;
use helpers::general::reverse_head;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Number of Race 1 finishers whose order is reversed for the Race 2 grid.
pub const GRID_INVERT_COUNT: usize = 10;

/// * `invert_count` - Size of the reversed block at the front of an inverted grid
/// * `invert_race1_grid` - Also reverse the front block of the qualifying grid for Race 1
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct WeekendConfig {
    pub invert_count: usize,
    pub invert_race1_grid: bool,
}

impl Default for WeekendConfig {
    fn default() -> Self {
        WeekendConfig {
            invert_count: GRID_INVERT_COUNT,
            invert_race1_grid: false,
        }
    }
}

/// SimConstants groups all tunable parameters of a weekend. Every field has a default, so a
/// constants file only needs to contain the values it changes.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct SimConstants {
    pub qualifying: QualifyingConfig,
    pub race: RaceConfig,
    pub weekend: WeekendConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekendState {
    Qualifying,
    Race1,
    Race2,
    Complete,
}

impl WeekendState {
    pub fn name(&self) -> &'static str {
        match self {
            WeekendState::Qualifying => "qualifying",
            WeekendState::Race1 => "race1",
            WeekendState::Race2 => "race2",
            WeekendState::Complete => "complete",
        }
    }
}

/// WeekendOutcome is what a completed weekend hands back to the season: both updated race records
/// plus everything that happened on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekendOutcome {
    pub round: u32,
    pub qualifying: QualifyingOutcome,
    pub race1_grid: Vec<GridSlot>,
    pub race1: RaceOutcome,
    pub race2_grid: Vec<GridSlot>,
    pub race2: RaceOutcome,
    pub race1_record: RaceRecord,
    pub race2_record: RaceRecord,
}

type CompletionCallback<'a> = Box<dyn FnOnce(&RaceRecord, &RaceRecord) + 'a>;

/// Weekend runs qualifying -> race 1 -> race 2 -> complete. Each step can only be taken from the
/// state before it.
pub struct Weekend<'a> {
    state: WeekendState,
    race1_record: RaceRecord,
    race2_record: RaceRecord,
    roster: &'a Roster,
    sim_consts: &'a SimConstants,
    participants: Vec<String>,
    qualifying: Option<QualifyingOutcome>,
    race1_grid: Vec<GridSlot>,
    race1: Option<RaceOutcome>,
    race2_grid: Vec<GridSlot>,
    race2: Option<RaceOutcome>,
    live: Option<Sender<RaceState>>,
    on_complete: Option<CompletionCallback<'a>>,
}

impl<'a> Weekend<'a> {
    /// new prepares a weekend for all active drivers of the roster.
    pub fn new(
        race1_record: RaceRecord,
        race2_record: RaceRecord,
        roster: &'a Roster,
        sim_consts: &'a SimConstants,
    ) -> Result<Weekend<'a>> {
        if race1_record.race_type != RaceType::Main || race2_record.race_type != RaceType::Inverted {
            return Err(SimError::InvalidParameter(format!(
                "weekend needs a main and an inverted race, got {} ({}) and {} ({})",
                race1_record.id, race1_record.race_type, race2_record.id, race2_record.race_type
            )));
        }
        roster.track(&race1_record.track_id)?;
        roster.track(&race2_record.track_id)?;

        let participants = roster.active_driver_ids();
        if participants.is_empty() {
            return Err(SimError::EmptyField("Weekend"));
        }

        Ok(Weekend {
            state: WeekendState::Qualifying,
            race1_record,
            race2_record,
            roster,
            sim_consts,
            participants,
            qualifying: None,
            race1_grid: Vec::new(),
            race1: None,
            race2_grid: Vec::new(),
            race2: None,
            live: None,
            on_complete: None,
        })
    }

    /// with_live sends the race state of both races to the given channel after every lap.
    pub fn with_live(mut self, tx: Sender<RaceState>) -> Weekend<'a> {
        self.live = Some(tx);
        self
    }

    /// on_complete registers a callback receiving both completed race records.
    pub fn on_complete<F>(mut self, callback: F) -> Weekend<'a>
    where
        F: FnOnce(&RaceRecord, &RaceRecord) + 'a,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn state(&self) -> WeekendState {
        self.state
    }

    pub fn qualifying(&self) -> Option<&QualifyingOutcome> {
        self.qualifying.as_ref()
    }

    pub fn race1(&self) -> Option<&RaceOutcome> {
        self.race1.as_ref()
    }

    pub fn race2(&self) -> Option<&RaceOutcome> {
        self.race2.as_ref()
    }

    /// expect_state checks that `step` is the next step of the weekend.
    fn expect_state(&self, step: WeekendState) -> Result<()> {
        if self.state != step {
            return Err(SimError::InvalidTransition {
                from: self.state.name(),
                to: step.name(),
            });
        }
        Ok(())
    }

    // ---------------------------------------------------------------------------------------------
    // TRANSITIONS ---------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// run_qualifying plays Q1 to Q3 in the starting weather of Race 1.
    pub fn run_qualifying<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<&QualifyingOutcome> {
        self.expect_state(WeekendState::Qualifying)?;
        let track = self.roster.track(&self.race1_record.track_id)?;
        let weather = WeatherCondition::new(1, self.race1_record.weather);

        info!("{}: qualifying at {}", self.race1_record.id, track.name);
        let outcome = run_knockout(
            &self.participants,
            &weather,
            track,
            self.roster,
            &self.sim_consts.qualifying,
            rng,
        )?;
        if outcome.grid.len() != self.participants.len() {
            return Err(SimError::InvalidGrid(format!(
                "qualifying returned {} grid slots for {} participants",
                outcome.grid.len(),
                self.participants.len()
            )));
        }

        self.state = WeekendState::Race1;
        Ok(self.qualifying.insert(outcome))
    }

    /// run_race1 starts Race 1 from the qualifying grid, with the front block reversed if the
    /// weekend is configured that way.
    pub fn run_race1<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<&RaceOutcome> {
        self.expect_state(WeekendState::Race1)?;
        let qualifying = self
            .qualifying
            .as_ref()
            .ok_or(SimError::EmptyField("Qualifying grid"))?;

        let mut grid = grid_from_qualifying(&qualifying.grid);
        if self.sim_consts.weekend.invert_race1_grid {
            grid = invert_grid(&grid, self.sim_consts.weekend.invert_count);
        }

        let outcome = handle_race(
            &self.race1_record,
            &grid,
            self.roster,
            &self.sim_consts.race,
            rng,
            self.live.as_ref(),
        )?;
        self.race1_grid = grid;
        self.state = WeekendState::Race2;
        Ok(self.race1.insert(outcome))
    }

    /// run_race2 starts Race 2 from the inverted Race 1 result and completes the weekend: both
    /// race records are marked completed and the completion callback is called.
    pub fn run_race2<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<&RaceOutcome> {
        self.expect_state(WeekendState::Race2)?;
        let race1 = self
            .race1
            .as_ref()
            .ok_or(SimError::EmptyField("Race 1 result"))?;

        let grid = build_inverted_grid(&race1.results, self.sim_consts.weekend.invert_count);
        let outcome = handle_race(
            &self.race2_record,
            &grid,
            self.roster,
            &self.sim_consts.race,
            rng,
            self.live.as_ref(),
        )?;

        self.race1_record.mark_completed(race1.results.to_owned());
        self.race2_record.mark_completed(outcome.results.to_owned());
        self.race2_grid = grid;
        self.state = WeekendState::Complete;
        info!("Round {} complete", self.race1_record.round);

        if let Some(callback) = self.on_complete.take() {
            callback(&self.race1_record, &self.race2_record);
        }
        Ok(self.race2.insert(outcome))
    }

    /// simulate runs all remaining steps of the weekend and returns its outcome.
    pub fn simulate<R: Rng + ?Sized>(mut self, rng: &mut R) -> Result<WeekendOutcome> {
        if self.state == WeekendState::Qualifying {
            self.run_qualifying(rng)?;
        }
        if self.state == WeekendState::Race1 {
            self.run_race1(rng)?;
        }
        if self.state == WeekendState::Race2 {
            self.run_race2(rng)?;
        }
        self.into_outcome()
    }

    /// into_outcome hands back the results of a completed weekend.
    pub fn into_outcome(self) -> Result<WeekendOutcome> {
        let not_done = SimError::InvalidTransition {
            from: self.state.name(),
            to: WeekendState::Complete.name(),
        };
        match (self.state, self.qualifying, self.race1, self.race2) {
            (WeekendState::Complete, Some(qualifying), Some(race1), Some(race2)) => Ok(WeekendOutcome {
                round: self.race1_record.round,
                qualifying,
                race1_grid: self.race1_grid,
                race1,
                race2_grid: self.race2_grid,
                race2,
                race1_record: self.race1_record,
                race2_record: self.race2_record,
            }),
            _ => Err(not_done),
        }
    }
}

/// build_inverted_grid creates the Race 2 grid from a Race 1 classification: the first
/// `invert_count` finishers in reverse order, then the remaining finishers unchanged and finally
/// the drivers that did not finish, in classification order.
pub fn build_inverted_grid(results: &[RaceResult], invert_count: usize) -> Vec<GridSlot> {
    let mut classified: Vec<&RaceResult> = results.iter().collect();
    classified.sort_by_key(|r| r.position);

    let mut order: Vec<&str> = classified
        .iter()
        .filter(|r| !r.dnf)
        .map(|r| r.driver_id.as_str())
        .collect();
    reverse_head(&mut order, invert_count);
    order.extend(classified.iter().filter(|r| r.dnf).map(|r| r.driver_id.as_str()));

    renumber(order)
}

/// invert_grid reverses the first `invert_count` slots of a grid.
pub fn invert_grid(grid: &[GridSlot], invert_count: usize) -> Vec<GridSlot> {
    let mut order: Vec<&str> = grid.iter().map(|slot| slot.driver_id.as_str()).collect();
    reverse_head(&mut order, invert_count);
    renumber(order)
}

fn renumber(order: Vec<&str>) -> Vec<GridSlot> {
    order
        .into_iter()
        .enumerate()
        .map(|(i, driver_id)| GridSlot {
            position: i as u32 + 1,
            driver_id: driver_id.to_owned(),
        })
        .collect()
}
