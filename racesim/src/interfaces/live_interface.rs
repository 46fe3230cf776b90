use crate::core::car::{Car, CarStatus};
use crate::core::weather::WeatherCondition;
use crate::post::race_result::RaceOutcome;

/// CarState is the per-lap snapshot of one car sent to live listeners.
///
/// * `gap` - (ms) Gap to the leader, None for the leader itself and for retired cars
#[derive(Debug, Clone, PartialEq)]
pub struct CarState {
    pub position: u32,
    pub driver_id: String,
    pub team_id: String,
    pub status: CarStatus,
    pub laps_completed: u32,
    pub total_time: f64,
    pub gap: Option<f64>,
    pub last_lap: f64,
    pub tire_condition: f64,
    pub pit_stops_completed: u32,
}

impl CarState {
    pub fn new(car: &Car, position: u32, leader_time: Option<f64>) -> CarState {
        let gap = match (car.status, leader_time) {
            (CarStatus::Dnf, _) | (_, None) => None,
            (_, Some(t_leader)) if position > 1 => Some(car.total_time - t_leader),
            _ => None,
        };
        CarState {
            position,
            driver_id: car.driver_id.to_owned(),
            team_id: car.team_id.to_owned(),
            status: car.status,
            laps_completed: car.laps_completed,
            total_time: car.total_time,
            gap,
            last_lap: car.last_lap,
            tire_condition: car.tireset.condition,
            pit_stops_completed: car.pit_stops_completed,
        }
    }
}

/// RaceState is sent once per simulated lap. The last message of a race carries the final
/// classification in `final_result`.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceState {
    pub race_id: String,
    pub lap: u32,
    pub tot_no_laps: u32,
    pub weather: WeatherCondition,
    pub car_states: Vec<CarState>,
    pub final_result: Option<RaceOutcome>,
}

impl RaceState {
    pub fn is_final(&self) -> bool {
        self.final_result.is_some()
    }

    /// format_lap returns a one-line summary of the running order for console output.
    pub fn format_lap(&self) -> String {
        let leaders: Vec<String> = self
            .car_states
            .iter()
            .filter(|c| c.status != CarStatus::Dnf)
            .take(3)
            .map(|c| match c.gap {
                Some(gap) => format!("{} +{:.3}s", c.driver_id, gap / 1000.0),
                None => c.driver_id.to_owned(),
            })
            .collect();
        let no_dnf = self
            .car_states
            .iter()
            .filter(|c| c.status == CarStatus::Dnf)
            .count();
        format!(
            "{} lap {}/{} [{}] {} | DNF: {}",
            self.race_id,
            self.lap,
            self.tot_no_laps,
            self.weather.condition,
            leaders.join(", "),
            no_dnf
        )
    }
}
