use crate::core::driver::clamp_rating;
use crate::core::track::lap_window;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PitReason {
    Mandatory,
    Strategy,
    Damage,
}

/// * `lap` - Lap (1-based) at whose start the stop is taken
/// * `duration` - (s) Standstill plus pit lane time loss
/// * `executed` - Set by the race once the stop was actually made (false for stops of drivers who
/// retired before)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitStop {
    pub lap: u32,
    pub driver_id: String,
    pub duration: f64,
    pub reason: PitReason,
    pub executed: bool,
}

/// * `base_duration` - (s) Stop duration of a team with zero facilities
/// * `facilities_gain` - (s) Reduction for a team with facilities 100
/// * `duration_jitter` - (s) Symmetric random spread of every stop
/// * `min_duration` - (s) Fastest possible stop
/// * `mandatory_window` - Race fractions [start, end) of the mandatory stop window
/// * `strategy_chance` - Probability of an additional late strategic stop
/// * `strategy_window` - Race fractions [start, end) of the strategic stop
/// * `strategy_extra` - (s) Additional time of a strategic stop
/// * `damage_chance` - Probability of a damage stop at any point of the race
/// * `damage_extra` - (s) Range of additional repair time [min, max]
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct PitConfig {
    pub base_duration: f64,
    pub facilities_gain: f64,
    pub duration_jitter: f64,
    pub min_duration: f64,
    pub mandatory_window: [f64; 2],
    pub strategy_chance: f64,
    pub strategy_window: [f64; 2],
    pub strategy_extra: f64,
    pub damage_chance: f64,
    pub damage_extra: [f64; 2],
}

impl Default for PitConfig {
    fn default() -> Self {
        PitConfig {
            base_duration: 25.0,
            facilities_gain: 5.0,
            duration_jitter: 2.0,
            min_duration: 20.0,
            mandatory_window: [0.3, 0.7],
            strategy_chance: 0.15,
            strategy_window: [0.7, 0.95],
            strategy_extra: 2.0,
            damage_chance: 0.05,
            damage_extra: [10.0, 25.0],
        }
    }
}

impl PitConfig {
    /// stop_duration returns the time (s) of a regular stop for a team with the given facilities.
    pub fn stop_duration<R: Rng + ?Sized>(&self, facilities: f64, rng: &mut R) -> f64 {
        let jitter = if self.duration_jitter > 0.0 {
            rng.gen_range(-self.duration_jitter..=self.duration_jitter)
        } else {
            0.0
        };
        let duration =
            self.base_duration - clamp_rating(facilities) / 100.0 * self.facilities_gain + jitter;
        duration.max(self.min_duration)
    }
}

/// generate_pit_stops plans all stops of a race before it starts. Every participant gets exactly
/// one mandatory stop inside the mandatory window, optionally a late strategic stop and optionally
/// a damage stop. The returned list is sorted by lap (stable with respect to grid order).
///
/// * `participants` - (driver id, team facilities) in grid order
pub fn generate_pit_stops<R: Rng + ?Sized>(
    participants: &[(String, f64)],
    tot_no_laps: u32,
    pit_cfg: &PitConfig,
    rng: &mut R,
) -> Vec<PitStop> {
    let mut pit_stops = Vec::with_capacity(participants.len() * 2);
    if tot_no_laps == 0 {
        return pit_stops;
    }

    let mandatory_window = lap_window(
        tot_no_laps,
        pit_cfg.mandatory_window[0],
        pit_cfg.mandatory_window[1],
    );
    let strategy_window = lap_window(
        tot_no_laps,
        pit_cfg.strategy_window[0],
        pit_cfg.strategy_window[1],
    );

    for (driver_id, facilities) in participants.iter() {
        pit_stops.push(PitStop {
            lap: rng.gen_range(mandatory_window.clone()),
            driver_id: driver_id.to_owned(),
            duration: pit_cfg.stop_duration(*facilities, rng),
            reason: PitReason::Mandatory,
            executed: false,
        });

        if rng.gen_bool(pit_cfg.strategy_chance.clamp(0.0, 1.0)) {
            pit_stops.push(PitStop {
                lap: rng.gen_range(strategy_window.clone()),
                driver_id: driver_id.to_owned(),
                duration: pit_cfg.stop_duration(*facilities, rng) + pit_cfg.strategy_extra,
                reason: PitReason::Strategy,
                executed: false,
            });
        }

        if rng.gen_bool(pit_cfg.damage_chance.clamp(0.0, 1.0)) {
            let extra = rng.gen_range(pit_cfg.damage_extra[0]..=pit_cfg.damage_extra[1].max(pit_cfg.damage_extra[0]));
            pit_stops.push(PitStop {
                lap: rng.gen_range(1..=tot_no_laps),
                driver_id: driver_id.to_owned(),
                duration: pit_cfg.stop_duration(*facilities, rng) + extra,
                reason: PitReason::Damage,
                executed: false,
            });
        }
    }

    pit_stops.sort_by_key(|pit_stop| pit_stop.lap);
    pit_stops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::sim_rng;

    fn field(n: usize) -> Vec<(String, f64)> {
        (0..n).map(|i| (format!("d{}", i), 10.0 * i as f64)).collect()
    }

    #[test]
    fn exactly_one_mandatory_stop_per_driver_inside_window() {
        let mut rng = sim_rng(Some(11));
        let participants = field(20);
        let stops = generate_pit_stops(&participants, 50, &PitConfig::default(), &mut rng);

        for (driver_id, _) in participants.iter() {
            let mandatory: Vec<&PitStop> = stops
                .iter()
                .filter(|s| &s.driver_id == driver_id && s.reason == PitReason::Mandatory)
                .collect();
            assert_eq!(mandatory.len(), 1);
            assert!((15..35).contains(&mandatory[0].lap));
        }
        assert!(stops.windows(2).all(|w| w[0].lap <= w[1].lap));
    }

    #[test]
    fn durations_respect_floor_and_facilities() {
        let cfg = PitConfig::default();
        let mut rng = sim_rng(Some(12));
        for _ in 0..500 {
            let best = cfg.stop_duration(100.0, &mut rng);
            let worst = cfg.stop_duration(0.0, &mut rng);
            assert!(best >= cfg.min_duration && best <= 22.0);
            assert!(worst >= 23.0 && worst <= 27.0);
        }
    }

    #[test]
    fn optional_stops_can_be_disabled() {
        let cfg = PitConfig {
            strategy_chance: 0.0,
            damage_chance: 0.0,
            ..PitConfig::default()
        };
        let mut rng = sim_rng(Some(13));
        let stops = generate_pit_stops(&field(5), 3, &cfg, &mut rng);
        assert_eq!(stops.len(), 5);
        assert!(stops.iter().all(|s| s.lap >= 1 && s.lap <= 3));
    }

    #[test]
    fn forced_strategy_stops_fall_in_late_window() {
        let cfg = PitConfig {
            strategy_chance: 1.0,
            damage_chance: 0.0,
            ..PitConfig::default()
        };
        let mut rng = sim_rng(Some(15));
        let participants = field(20);
        let stops = generate_pit_stops(&participants, 50, &cfg, &mut rng);

        assert_eq!(stops.len(), 40);
        for (driver_id, _) in participants.iter() {
            let strategy: Vec<&PitStop> = stops
                .iter()
                .filter(|s| &s.driver_id == driver_id && s.reason == PitReason::Strategy)
                .collect();
            assert_eq!(strategy.len(), 1);
            // 0.7 * 50 = 35, 0.95 * 50 = 47.5
            assert!((35..48).contains(&strategy[0].lap), "lap {}", strategy[0].lap);
        }
    }

    #[test]
    fn forced_damage_stops_carry_repair_time() {
        let cfg = PitConfig {
            duration_jitter: 0.0,
            strategy_chance: 0.0,
            damage_chance: 1.0,
            ..PitConfig::default()
        };
        let mut rng = sim_rng(Some(16));
        let participants = field(10);
        let stops = generate_pit_stops(&participants, 30, &cfg, &mut rng);

        assert_eq!(stops.len(), 20);
        for (driver_id, facilities) in participants.iter() {
            let damage: Vec<&PitStop> = stops
                .iter()
                .filter(|s| &s.driver_id == driver_id && s.reason == PitReason::Damage)
                .collect();
            assert_eq!(damage.len(), 1);
            assert!(damage[0].lap >= 1 && damage[0].lap <= 30);

            let regular = cfg.stop_duration(*facilities, &mut rng);
            let extra = damage[0].duration - regular;
            assert!(
                extra >= cfg.damage_extra[0] - 1e-9 && extra <= cfg.damage_extra[1] + 1e-9,
                "extra {}",
                extra
            );
        }
    }

    #[test]
    fn zero_lap_race_has_no_stops() {
        let mut rng = sim_rng(Some(14));
        assert!(generate_pit_stops(&field(3), 0, &PitConfig::default(), &mut rng).is_empty());
    }
}
