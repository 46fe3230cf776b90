use crate::core::car::Car;
use crate::core::pit_stop::PitStop;
use crate::core::weather::WeatherCondition;
use helpers::general::{argsort, SortOrder};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt::Write;

/// Championship points by finishing position (index = position - 1). Positions beyond the table
/// score nothing.
pub const POINTS_TABLE: [u32; 10] = [25, 18, 15, 12, 10, 8, 6, 4, 2, 1];

pub const FASTEST_LAP_BONUS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceType {
    /// Race 1, started from the qualifying grid
    Main,
    /// Race 2, started from the inverted Race 1 result
    Inverted,
}

impl std::fmt::Display for RaceType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            RaceType::Main => write!(f, "main"),
            RaceType::Inverted => write!(f, "inverted"),
        }
    }
}

/// points_for_position returns the table points of a 1-based finishing position.
pub fn points_for_position(position: u32) -> u32 {
    if position == 0 {
        return 0;
    }
    POINTS_TABLE
        .get(position as usize - 1)
        .copied()
        .unwrap_or(0)
}

/// RaceResult is one line of the final classification.
///
/// * `lap_time` - (ms) Best lap of the driver, None if the driver did not complete a lap
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RaceResult {
    pub position: u32,
    pub driver_id: String,
    pub team_id: String,
    pub manufacturer_id: String,
    pub points: u32,
    pub fastest_lap: bool,
    pub dnf: bool,
    pub dnf_reason: Option<String>,
    pub lap_time: Option<f64>,
    pub total_time: f64,
    pub laps_completed: u32,
    pub penalty: f64,
}

/// RaceOutcome is everything a finished race hands back: the classification plus the weather and
/// pit stops that shaped it.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RaceOutcome {
    pub race_id: String,
    pub race_type: RaceType,
    pub tot_no_laps: u32,
    pub results: Vec<RaceResult>,
    pub pit_stops: Vec<PitStop>,
    pub weather_history: Vec<WeatherCondition>,
}

impl RaceOutcome {
    pub fn winner(&self) -> Option<&RaceResult> {
        self.results.iter().find(|r| r.position == 1 && !r.dnf)
    }

    /// finishers returns the non-DNF results in finishing order.
    pub fn finishers(&self) -> impl Iterator<Item = &RaceResult> {
        self.results.iter().filter(|r| !r.dnf)
    }

    /// print_classification prints the final classification to the console output.
    pub fn print_classification(&self) {
        print!("{}", self.format_classification());
    }

    pub fn format_classification(&self) -> String {
        let mut out = String::new();
        let leader_time = self.finishers().next().map(|r| r.total_time);

        // writing into a String cannot fail
        let _ = writeln!(
            &mut out,
            "RESULT: {} ({} race, {} laps)",
            self.race_id, self.race_type, self.tot_no_laps
        );
        let _ = writeln!(
            &mut out,
            "{:>3}  {:<10} {:<10} {:>12} {:>10} {:>4}",
            "pos", "driver", "team", "time/gap", "best lap", "pts"
        );
        for result in self.results.iter() {
            let time_str = if result.dnf {
                format!(
                    "DNF ({})",
                    result.dnf_reason.as_deref().unwrap_or("unknown")
                )
            } else if result.position == 1 {
                format_laptime(result.total_time)
            } else {
                format!("+{:.3}s", (result.total_time - leader_time.unwrap_or(0.0)) / 1000.0)
            };
            let best = result
                .lap_time
                .map(format_laptime)
                .unwrap_or_else(|| "-".to_owned());
            let _ = writeln!(
                &mut out,
                "{:>3}  {:<10} {:<10} {:>12} {:>10}{} {:>3}",
                result.position,
                result.driver_id,
                result.team_id,
                time_str,
                best,
                if result.fastest_lap { "*" } else { " " },
                result.points
            );
        }
        out
    }
}

/// format_laptime renders milliseconds as m:ss.mmm.
pub fn format_laptime(t_ms: f64) -> String {
    if !t_ms.is_finite() {
        return "no time".to_owned();
    }
    let t_ms = t_ms.max(0.0).round() as u64;
    let minutes = t_ms / 60_000;
    let seconds = (t_ms % 60_000) / 1000;
    let millis = t_ms % 1000;
    format!("{}:{:02}.{:03}", minutes, seconds, millis)
}

/// classify builds the final classification from the cars at the end of a race.
///
/// * cars that skipped their mandatory stop get `mandatory_penalty_ms` added
/// * non-DNF cars are ordered by total time, DNF cars follow by laps completed (most first, ties
/// keep the stored order)
/// * points come from the table for finishers, DNF always scores 0
/// * the finisher with the fastest lap among the first `fastest_lap_eligible` positions gets the
/// bonus point
pub fn classify(cars: &[Car], mandatory_penalty_ms: f64, fastest_lap_eligible: usize) -> Vec<RaceResult> {
    let penalties: Vec<f64> = cars
        .iter()
        .map(|car| {
            if car.is_running() && !car.mandatory_pit_completed {
                mandatory_penalty_ms
            } else {
                0.0
            }
        })
        .collect();

    let finisher_idxs: Vec<usize> = cars
        .iter()
        .enumerate()
        .filter(|(_, car)| car.is_running())
        .map(|(i, _)| i)
        .collect();
    let finisher_times: Vec<f64> = finisher_idxs
        .iter()
        .map(|&i| cars[i].total_time + penalties[i])
        .collect();
    let mut dnf_idxs: Vec<usize> = cars
        .iter()
        .enumerate()
        .filter(|(_, car)| !car.is_running())
        .map(|(i, _)| i)
        .collect();
    dnf_idxs.sort_by_key(|&i| Reverse(cars[i].laps_completed));

    let order: Vec<usize> = argsort(&finisher_times, SortOrder::Ascending)
        .into_iter()
        .map(|k| finisher_idxs[k])
        .chain(dnf_idxs)
        .collect();

    let mut results: Vec<RaceResult> = order
        .iter()
        .enumerate()
        .map(|(pos_idx, &i)| {
            let car = &cars[i];
            let dnf = !car.is_running();
            let position = pos_idx as u32 + 1;
            RaceResult {
                position,
                driver_id: car.driver_id.to_owned(),
                team_id: car.team_id.to_owned(),
                manufacturer_id: car.manufacturer_id.to_owned(),
                points: if dnf { 0 } else { points_for_position(position) },
                fastest_lap: false,
                dnf,
                dnf_reason: car.dnf_reason.to_owned(),
                lap_time: if car.best_lap.is_finite() {
                    Some(car.best_lap)
                } else {
                    None
                },
                total_time: car.total_time + penalties[i],
                laps_completed: car.laps_completed,
                penalty: penalties[i],
            }
        })
        .collect();

    // fastest lap bonus, first occurrence wins a tie
    let mut fastest: Option<(usize, f64)> = None;
    for (i, result) in results
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.dnf)
        .take(fastest_lap_eligible)
    {
        if let Some(lap_time) = result.lap_time {
            if fastest.map_or(true, |(_, best)| lap_time < best) {
                fastest = Some((i, lap_time));
            }
        }
    }
    if let Some((i, _)) = fastest {
        results[i].fastest_lap = true;
        results[i].points += FASTEST_LAP_BONUS;
    }

    results
}
