use crate::core::car::{Car, CarStatus};
use crate::core::driver::rating_deficit;
use crate::core::pit_stop::{generate_pit_stops, PitConfig, PitStop};
use crate::core::qualifying::QualifyingResult;
use crate::core::roster::Roster;
use crate::core::season::RaceRecord;
use crate::core::tireset::TireConfig;
use crate::core::weather::{WeatherCondition, WeatherKind, WeatherSchedule};
use crate::error::{Result, SimError};
use crate::interfaces::live_interface::{CarState, RaceState};
use crate::post::race_result::{classify, RaceOutcome};
use helpers::general::{argsort, SortOrder};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// * `skill_ms` - (ms) Loss per lap of a skill-0 driver compared to a skill-100 driver
/// * `consistency_ms` - (ms) Maximum random loss per lap of a consistency-0 driver
/// * `team_ms`, `manufacturer_ms` - (ms) Loss per lap of a 0-rated team/manufacturer
/// * `cloudy_ms` - (ms) Loss per lap in cloudy conditions
/// * `rain_ms` - (ms) Loss per lap in full rain for an average driver, scaled down with skill
/// * `tire_mismatch_factor` - Multiplier on the rain loss when running slicks in the rain
/// * `wets_on_dry_ms` - (ms) Loss per lap when running wets on a dry track
/// * `fuel_effect_ms` - (ms) Gain per lap at the end of the race due to the lighter car
/// * `jitter_std_ms` - (ms) Standard deviation of the random lap time component
/// * `t_loss_firstlap_ms` - (ms) Loss of the first lap due to the standing start
/// * `t_loss_gridpos_ms` - (ms) Additional first lap loss per grid position
/// * `min_laptime_factor` - Fastest possible lap relative to the track base lap time
/// * `dnf_rate` - Base probability per lap that a car retires
/// * `mandatory_penalty_s` - (s) Penalty for finishing without the mandatory stop
/// * `fastest_lap_eligible` - Fastest lap bonus only goes to a finisher within this many positions
/// * `weather_change_chance` - Probability of one weather change during the race
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RaceConfig {
    pub skill_ms: f64,
    pub consistency_ms: f64,
    pub team_ms: f64,
    pub manufacturer_ms: f64,
    pub cloudy_ms: f64,
    pub rain_ms: f64,
    pub tire_mismatch_factor: f64,
    pub wets_on_dry_ms: f64,
    pub fuel_effect_ms: f64,
    pub jitter_std_ms: f64,
    pub t_loss_firstlap_ms: f64,
    pub t_loss_gridpos_ms: f64,
    pub min_laptime_factor: f64,
    pub dnf_rate: f64,
    pub mandatory_penalty_s: f64,
    pub fastest_lap_eligible: usize,
    pub weather_change_chance: f64,
    pub tires: TireConfig,
    pub pit: PitConfig,
}

impl Default for RaceConfig {
    fn default() -> Self {
        RaceConfig {
            skill_ms: 2500.0,
            consistency_ms: 1200.0,
            team_ms: 1500.0,
            manufacturer_ms: 2000.0,
            cloudy_ms: 300.0,
            rain_ms: 4000.0,
            tire_mismatch_factor: 2.0,
            wets_on_dry_ms: 2500.0,
            fuel_effect_ms: 1500.0,
            jitter_std_ms: 250.0,
            t_loss_firstlap_ms: 3000.0,
            t_loss_gridpos_ms: 200.0,
            min_laptime_factor: 0.95,
            dnf_rate: 0.0006,
            mandatory_penalty_s: 30.0,
            fastest_lap_eligible: 10,
            weather_change_chance: 0.3,
            tires: TireConfig::default(),
            pit: PitConfig::default(),
        }
    }
}

/// GridSlot is one starting position of a race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSlot {
    pub position: u32,
    pub driver_id: String,
}

/// grid_from_qualifying turns the final qualifying order into a starting grid.
pub fn grid_from_qualifying(qualifying_grid: &[QualifyingResult]) -> Vec<GridSlot> {
    qualifying_grid
        .iter()
        .map(|result| GridSlot {
            position: result.position,
            driver_id: result.driver_id.to_owned(),
        })
        .collect()
}

/// validate_grid checks that a grid is non-empty, numbered 1..N in order and free of duplicates.
pub fn validate_grid(grid: &[GridSlot]) -> Result<()> {
    if grid.is_empty() {
        return Err(SimError::EmptyField("Starting grid"));
    }
    let mut seen = HashSet::with_capacity(grid.len());
    for (i, slot) in grid.iter().enumerate() {
        if slot.position != i as u32 + 1 {
            return Err(SimError::InvalidGrid(format!(
                "expected position {} but found {} for driver '{}'",
                i + 1,
                slot.position,
                slot.driver_id
            )));
        }
        if !seen.insert(slot.driver_id.as_str()) {
            return Err(SimError::InvalidGrid(format!(
                "driver '{}' appears twice",
                slot.driver_id
            )));
        }
    }
    Ok(())
}

/// LapSummary reports what happened on one simulated lap.
#[derive(Debug, Clone, PartialEq)]
pub struct LapSummary {
    pub lap: u32,
    pub weather: WeatherCondition,
    pub leader: Option<String>,
    pub pitted: Vec<String>,
    pub retired: Vec<String>,
}

/// Race simulates one race lap by lap. Weather and pit stops are planned when the race is created,
/// the lap loop only reads them.
#[derive(Debug)]
pub struct Race<'a> {
    pub race_id: String,
    pub race: &'a RaceRecord,
    pub tot_no_laps: u32,
    pub cur_lap: u32,
    pub base_laptime_ms: f64,
    pub weather: WeatherSchedule,
    pub pit_stops: Vec<PitStop>,
    pub cars_list: Vec<Car>,
    running_order: Vec<usize>,
    car_idxs: HashMap<String, usize>,
    cfg: &'a RaceConfig,
}

impl<'a> Race<'a> {
    /// new validates the grid against the roster and plans weather and pit stops.
    pub fn new<R: Rng + ?Sized>(
        race: &'a RaceRecord,
        grid: &[GridSlot],
        roster: &Roster,
        cfg: &'a RaceConfig,
        rng: &mut R,
    ) -> Result<Race<'a>> {
        validate_grid(grid)?;
        let track = roster.track(&race.track_id)?;

        let weather = WeatherSchedule::generate(race.weather, race.laps, cfg.weather_change_chance, rng);
        Race::with_weather(race, grid, roster, cfg, track.base_laptime_ms, weather, rng)
    }

    /// with_weather creates a race with a given weather schedule instead of a generated one.
    pub fn with_weather<R: Rng + ?Sized>(
        race: &'a RaceRecord,
        grid: &[GridSlot],
        roster: &Roster,
        cfg: &'a RaceConfig,
        base_laptime_ms: f64,
        weather: WeatherSchedule,
        rng: &mut R,
    ) -> Result<Race<'a>> {
        validate_grid(grid)?;

        // create cars in grid order
        let mut cars_list: Vec<Car> = Vec::with_capacity(grid.len());
        for slot in grid.iter() {
            let driver = roster.active_driver(&slot.driver_id)?;
            let team = roster.team(&driver.team_id)?;
            let manufacturer = roster.manufacturer(&driver.manufacturer_id)?;
            cars_list.push(Car::new(
                driver,
                team,
                manufacturer,
                slot.position,
                weather.starting(),
            ));
        }

        let participants: Vec<(String, f64)> = cars_list
            .iter()
            .map(|car| (car.driver_id.to_owned(), car.facilities))
            .collect();
        let pit_stops = generate_pit_stops(&participants, race.laps, &cfg.pit, rng);

        let car_idxs = cars_list
            .iter()
            .enumerate()
            .map(|(i, car)| (car.driver_id.to_owned(), i))
            .collect();

        Ok(Race {
            race_id: race.id.to_owned(),
            race,
            tot_no_laps: race.laps,
            cur_lap: 0,
            base_laptime_ms,
            weather,
            pit_stops,
            running_order: (0..cars_list.len()).collect(),
            cars_list,
            car_idxs,
            cfg,
        })
    }

    // ---------------------------------------------------------------------------------------------
    // MAIN METHOD ---------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// simulate_lap advances the race by one lap. Returns None once the race is finished.
    pub fn simulate_lap<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<LapSummary> {
        if self.is_finished() {
            return None;
        }
        let lap = self.cur_lap + 1;

        // weather for this lap
        let weather = *self.weather.at_lap(lap);
        if weather.lap == lap && lap > 1 {
            info!("{}: weather turns {} on lap {}", self.race_id, weather.condition, lap);
        }

        // pit stops scheduled for this lap
        let pitted = self.handle_pit_stops(lap, &weather);

        // lap times of all cars still running
        for i in 0..self.cars_list.len() {
            if !self.cars_list[i].is_running() {
                continue;
            }
            let laptime = self.calc_laptime(i, lap, &weather, rng);
            self.cars_list[i].complete_lap(laptime, self.tot_no_laps, &self.cfg.tires);
        }

        // retirements
        let retired = self.handle_retirements(lap, rng);

        // re-rank cars still running
        self.update_running_order();
        self.cur_lap = lap;

        Some(LapSummary {
            lap,
            weather,
            leader: self
                .running_order
                .first()
                .map(|&i| self.cars_list[i].driver_id.to_owned()),
            pitted,
            retired,
        })
    }

    // ---------------------------------------------------------------------------------------------
    // RACE SIMULATOR PARTS ------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    fn handle_pit_stops(&mut self, lap: u32, weather: &WeatherCondition) -> Vec<String> {
        let laps_remaining = self.tot_no_laps + 1 - lap;
        let mut pitted = Vec::new();

        for pit_stop in self.pit_stops.iter_mut().filter(|s| s.lap == lap) {
            let idx = match self.car_idxs.get(&pit_stop.driver_id) {
                Some(&idx) => idx,
                None => continue,
            };
            let car = &mut self.cars_list[idx];
            if !car.is_running() {
                continue;
            }
            car.perform_pitstop(pit_stop, weather, laps_remaining, self.tot_no_laps);
            pit_stop.executed = true;
            debug!(
                "{}: {} pits on lap {} ({:?}, {:.1}s)",
                self.race_id, pit_stop.driver_id, lap, pit_stop.reason, pit_stop.duration
            );
            pitted.push(pit_stop.driver_id.to_owned());
        }
        pitted
    }

    /// calc_laptime returns the lap time (ms) of a car on the given lap.
    fn calc_laptime<R: Rng + ?Sized>(
        &self,
        idx: usize,
        lap: u32,
        weather: &WeatherCondition,
        rng: &mut R,
    ) -> f64 {
        let cfg = self.cfg;
        let car = &self.cars_list[idx];
        let skill_deficit = rating_deficit(car.skill);

        let progress = if self.tot_no_laps > 0 {
            lap as f64 / self.tot_no_laps as f64
        } else {
            1.0
        };

        let consistency_penalty = rating_deficit(car.consistency) * cfg.consistency_ms * rng.gen::<f64>();

        let weather_penalty = match weather.condition {
            WeatherKind::Sunny | WeatherKind::Cloudy => {
                let cloud = if weather.condition == WeatherKind::Cloudy {
                    cfg.cloudy_ms
                } else {
                    0.0
                };
                if car.tireset.matches_weather(weather) {
                    cloud
                } else {
                    cloud + cfg.wets_on_dry_ms
                }
            }
            WeatherKind::Rainy => {
                let rain = cfg.rain_ms * weather.rain_intensity() * (0.5 + skill_deficit);
                if car.tireset.matches_weather(weather) {
                    rain
                } else {
                    rain * cfg.tire_mismatch_factor
                }
            }
        };

        let tire_penalty =
            car.tireset
                .t_add_tireset(progress, car.reliability_factor(), &cfg.tires);

        // the car gets lighter the fewer laps are left
        let fuel_bonus = cfg.fuel_effect_ms * progress;

        let start_penalty = if lap == 1 {
            cfg.t_loss_firstlap_ms + (car.p_grid.saturating_sub(1)) as f64 * cfg.t_loss_gridpos_ms
        } else {
            0.0
        };

        let std_dev = cfg.jitter_std_ms * car.aggression_factor();
        let jitter = if std_dev > 0.0 {
            Normal::new(0.0, std_dev)
                .map(|normal| normal.sample(rng))
                .unwrap_or(0.0)
        } else {
            0.0
        };

        let laptime = self.base_laptime_ms
            + skill_deficit * cfg.skill_ms
            + consistency_penalty
            + rating_deficit(car.team_performance) * cfg.team_ms
            + rating_deficit(car.manufacturer_performance) * cfg.manufacturer_ms
            + weather_penalty
            + tire_penalty
            - fuel_bonus
            + jitter;

        laptime.max(self.base_laptime_ms * cfg.min_laptime_factor) + start_penalty
    }

    /// dnf_probability returns the per-lap retirement probability of a car. Consistent drivers and
    /// reliable manufacturers retire less often, aggressive drivers more often.
    pub fn dnf_probability(&self, car: &Car) -> f64 {
        let exposure = 1.0 + rating_deficit(car.consistency) + rating_deficit(car.reliability);
        (self.cfg.dnf_rate * exposure * car.aggression_factor()).clamp(0.0, 1.0)
    }

    fn handle_retirements<R: Rng + ?Sized>(&mut self, lap: u32, rng: &mut R) -> Vec<String> {
        let mut retired = Vec::new();
        for i in 0..self.cars_list.len() {
            if !self.cars_list[i].is_running() {
                continue;
            }
            let p_dnf = self.dnf_probability(&self.cars_list[i]);
            if rng.gen_bool(p_dnf) {
                let car = &mut self.cars_list[i];
                car.retire(lap, rng);
                info!(
                    "{}: {} retires on lap {} ({})",
                    self.race_id,
                    car.driver_id,
                    lap,
                    car.dnf_reason.as_deref().unwrap_or("unknown")
                );
                retired.push(car.driver_id.to_owned());
            }
        }
        retired
    }

    fn update_running_order(&mut self) {
        let running: Vec<usize> = (0..self.cars_list.len())
            .filter(|&i| self.cars_list[i].is_running())
            .collect();
        let times: Vec<f64> = running.iter().map(|&i| self.cars_list[i].total_time).collect();
        self.running_order = argsort(&times, SortOrder::Ascending)
            .into_iter()
            .map(|k| running[k])
            .collect();
    }

    // ---------------------------------------------------------------------------------------------
    // METHODS (HELPERS) ---------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    pub fn is_finished(&self) -> bool {
        self.cur_lap >= self.tot_no_laps
    }

    /// running_order returns the cars still running, leader first.
    pub fn running_order(&self) -> impl Iterator<Item = &Car> {
        self.running_order.iter().map(move |&i| &self.cars_list[i])
    }

    pub fn get_race_state(&self) -> RaceState {
        let leader_time = self.running_order().next().map(|car| car.total_time);
        let mut car_states: Vec<CarState> = self
            .running_order()
            .enumerate()
            .map(|(i, car)| CarState::new(car, i as u32 + 1, leader_time))
            .collect();
        let no_running = car_states.len() as u32;
        car_states.extend(
            self.cars_list
                .iter()
                .filter(|car| car.status == CarStatus::Dnf)
                .enumerate()
                .map(|(i, car)| CarState::new(car, no_running + i as u32 + 1, leader_time)),
        );

        RaceState {
            race_id: self.race_id.to_owned(),
            lap: self.cur_lap,
            tot_no_laps: self.tot_no_laps,
            weather: *self.weather.at_lap(self.cur_lap.max(1)),
            car_states,
            final_result: None,
        }
    }

    /// get_race_result finalizes the race: mandatory stop penalties, classification, points and
    /// the fastest lap bonus.
    pub fn get_race_result(&self) -> RaceOutcome {
        RaceOutcome {
            race_id: self.race_id.to_owned(),
            race_type: self.race.race_type,
            tot_no_laps: self.tot_no_laps,
            results: classify(
                &self.cars_list,
                self.cfg.mandatory_penalty_s * 1000.0,
                self.cfg.fastest_lap_eligible,
            ),
            pit_stops: self.pit_stops.to_owned(),
            weather_history: self.weather.entries().to_vec(),
        }
    }
}
