use crate::core::driver::{rating_deficit, Driver};
use crate::core::pit_stop::{PitReason, PitStop};
use crate::core::roster::{Manufacturer, Team};
use crate::core::tireset::{TireCompound, TireConfig, Tireset};
use crate::core::weather::WeatherCondition;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

const FUEL_FULL: f64 = 100.0;

const DNF_REASONS: [&str; 10] = [
    "Engine failure",
    "Gearbox failure",
    "Hydraulics",
    "Brake failure",
    "Suspension damage",
    "Power unit",
    "Collision",
    "Spun off",
    "Puncture",
    "Electrical issue",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CarStatus {
    Racing,
    Pit,
    Dnf,
}

/// Car holds the race state of one participant. The car copies the ratings it needs from the
/// roster when it is created, so a race never reads the roster again once it is running.
#[derive(Debug, Clone)]
pub struct Car {
    pub driver_id: String,
    pub team_id: String,
    pub manufacturer_id: String,
    pub p_grid: u32,
    pub status: CarStatus,
    pub total_time: f64,
    pub laps_completed: u32,
    pub tireset: Tireset,
    pub fuel: f64,
    pub pit_stops_completed: u32,
    pub mandatory_pit_completed: bool,
    pub best_lap: f64,
    pub last_lap: f64,
    pub dnf_reason: Option<String>,
    pub dnf_lap: Option<u32>,
    // ratings (0-100) copied from the roster
    pub skill: f64,
    pub consistency: f64,
    pub aggression: f64,
    pub team_performance: f64,
    pub facilities: f64,
    pub manufacturer_performance: f64,
    pub reliability: f64,
}

impl Car {
    pub fn new(
        driver: &Driver,
        team: &Team,
        manufacturer: &Manufacturer,
        p_grid: u32,
        start_weather: &WeatherCondition,
    ) -> Car {
        Car {
            driver_id: driver.id.to_owned(),
            team_id: team.id.to_owned(),
            manufacturer_id: manufacturer.id.to_owned(),
            p_grid,
            status: CarStatus::Racing,
            total_time: 0.0,
            laps_completed: 0,
            tireset: Tireset::new(TireCompound::for_weather(start_weather)),
            fuel: FUEL_FULL,
            pit_stops_completed: 0,
            mandatory_pit_completed: false,
            best_lap: f64::INFINITY,
            last_lap: 0.0,
            dnf_reason: None,
            dnf_lap: None,
            skill: driver.skill,
            consistency: driver.consistency,
            aggression: driver.aggression,
            team_performance: (team.reputation + team.facilities) / 2.0,
            facilities: team.facilities,
            manufacturer_performance: manufacturer.performance,
            reliability: manufacturer.reliability,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status != CarStatus::Dnf
    }

    /// 1.0 for a perfectly reliable manufacturer, up to 2.0 for the least reliable one.
    pub fn reliability_factor(&self) -> f64 {
        1.0 + rating_deficit(self.reliability)
    }

    /// Aggression-neutral value is 1.0; calm drivers (0) get 0.5, hot-headed ones (100) 1.5.
    pub fn aggression_factor(&self) -> f64 {
        0.5 + self.aggression / 100.0
    }

    /// complete_lap adds the lap time, records the best lap and wears tires and fuel.
    pub fn complete_lap(&mut self, laptime: f64, tot_no_laps: u32, tire_cfg: &TireConfig) {
        self.total_time += laptime;
        self.last_lap = laptime;
        if laptime < self.best_lap {
            self.best_lap = laptime;
        }
        self.laps_completed += 1;

        let fuel_per_lap = if tot_no_laps > 0 {
            FUEL_FULL / tot_no_laps as f64
        } else {
            0.0
        };
        self.fuel = (self.fuel - fuel_per_lap).max(0.0);
        self.tireset.drive_lap(tire_cfg, self.reliability_factor());

        if self.status == CarStatus::Pit {
            self.status = CarStatus::Racing;
        }
    }

    /// perform_pitstop executes a scheduled stop: time loss, fresh tires matching the current
    /// weather and fuel topped up to what is needed for the remaining laps.
    pub fn perform_pitstop(
        &mut self,
        pit_stop: &PitStop,
        weather: &WeatherCondition,
        laps_remaining: u32,
        tot_no_laps: u32,
    ) {
        self.total_time += pit_stop.duration * 1000.0;
        self.tireset = Tireset::new(TireCompound::for_weather(weather));
        let fuel_needed = if tot_no_laps > 0 {
            FUEL_FULL * laps_remaining as f64 / tot_no_laps as f64
        } else {
            0.0
        };
        self.fuel = self.fuel.max(fuel_needed);
        self.pit_stops_completed += 1;
        if pit_stop.reason == PitReason::Mandatory {
            self.mandatory_pit_completed = true;
        }
        self.status = CarStatus::Pit;
    }

    /// retire freezes the car: from now on it neither accumulates time nor laps.
    pub fn retire<R: Rng + ?Sized>(&mut self, lap: u32, rng: &mut R) {
        let reason = DNF_REASONS
            .choose(rng)
            .copied()
            .unwrap_or("Mechanical failure");
        self.status = CarStatus::Dnf;
        self.dnf_reason = Some(reason.to_owned());
        self.dnf_lap = Some(lap);
    }
}
