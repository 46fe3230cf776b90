use crate::core::weather::WeatherCondition;
use serde::{Deserialize, Serialize};

const MAX_TIRE_PENALTY_MS: f64 = 8000.0; // maximum loss per lap once the tires fall off the cliff

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TireCompound {
    Dry,
    Wet,
}

impl TireCompound {
    /// for_weather returns the compound a team fits for the given conditions.
    pub fn for_weather(weather: &WeatherCondition) -> TireCompound {
        if weather.is_wet() {
            TireCompound::Wet
        } else {
            TireCompound::Dry
        }
    }
}

/// * `degr_progress_ms` - (ms) Loss at the end of the race caused by track evolution/rubbering
/// * `degr_wear_ms` - (ms) Loss per percent of tire condition used up
/// * `wear_per_lap` - (%) Condition lost per lap with a perfectly reliable car
/// * `cliff_condition` - (%) Condition below which the tires fall off the cliff
/// * `k_cliff` - (ms/%^2) Quadratic cliff coefficient
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct TireConfig {
    pub degr_progress_ms: f64,
    pub degr_wear_ms: f64,
    pub wear_per_lap: f64,
    pub cliff_condition: f64,
    pub k_cliff: f64,
}

impl Default for TireConfig {
    fn default() -> Self {
        TireConfig {
            degr_progress_ms: 600.0,
            degr_wear_ms: 18.0,
            wear_per_lap: 2.0,
            cliff_condition: 20.0,
            k_cliff: 12.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tireset {
    pub compound: TireCompound,
    pub condition: f64,
    pub age_cur_stint: u32,
}

impl Tireset {
    pub fn new(compound: TireCompound) -> Tireset {
        Tireset {
            compound,
            condition: 100.0,
            age_cur_stint: 0,
        }
    }

    /// drive_lap wears the tires by one lap. `reliability_factor` is 1.0 for a perfectly reliable
    /// car and grows up to 2.0 for the least reliable one.
    pub fn drive_lap(&mut self, tire_cfg: &TireConfig, reliability_factor: f64) {
        self.condition = (self.condition - tire_cfg.wear_per_lap * reliability_factor).max(0.0);
        self.age_cur_stint += 1;
    }

    /// matches_weather is false when slicks are used in the rain or wets on a dry track.
    pub fn matches_weather(&self, weather: &WeatherCondition) -> bool {
        self.compound == TireCompound::for_weather(weather)
    }

    /// t_add_tireset returns the current time loss (ms) due to tire degradation.
    ///
    /// * `linear part`: (progress * degr_progress_ms + used_condition * degr_wear_ms) * reliability_factor
    /// * `cliff`: k_cliff * (cliff_condition - condition)^2, capped
    ///
    /// `progress` is the race progress lap / tot_no_laps in 0..=1.
    pub fn t_add_tireset(&self, progress: f64, reliability_factor: f64, tire_cfg: &TireConfig) -> f64 {
        let used = 100.0 - self.condition;
        let linear_degr = (progress.clamp(0.0, 1.0) * tire_cfg.degr_progress_ms
            + used * tire_cfg.degr_wear_ms)
            * reliability_factor;

        let cliff_penalty = if self.condition < tire_cfg.cliff_condition {
            let over = tire_cfg.cliff_condition - self.condition;
            (tire_cfg.k_cliff * over.powf(2.0)).min(MAX_TIRE_PENALTY_MS)
        } else {
            0.0
        };

        linear_degr + cliff_penalty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::weather::WeatherKind;
    use approx::assert_relative_eq;

    #[test]
    fn fresh_tires_only_lose_progress_time() {
        let cfg = TireConfig::default();
        let tires = Tireset::new(TireCompound::Dry);
        assert_relative_eq!(tires.t_add_tireset(0.0, 1.0, &cfg), 0.0);
        assert_relative_eq!(tires.t_add_tireset(1.0, 1.0, &cfg), cfg.degr_progress_ms);
    }

    #[test]
    fn worn_tires_are_slower_and_cliff_is_capped() {
        let cfg = TireConfig::default();
        let mut tires = Tireset::new(TireCompound::Dry);
        let fresh = tires.t_add_tireset(0.5, 1.0, &cfg);
        for _ in 0..30 {
            tires.drive_lap(&cfg, 1.0);
        }
        assert_relative_eq!(tires.condition, 40.0);
        assert!(tires.t_add_tireset(0.5, 1.0, &cfg) > fresh);

        for _ in 0..100 {
            tires.drive_lap(&cfg, 2.0);
        }
        assert_relative_eq!(tires.condition, 0.0);
        let worst = tires.t_add_tireset(1.0, 2.0, &cfg);
        assert!(worst <= (cfg.degr_progress_ms + 100.0 * cfg.degr_wear_ms) * 2.0 + MAX_TIRE_PENALTY_MS);
    }

    #[test]
    fn compound_follows_weather() {
        let rain = WeatherCondition::new(1, WeatherKind::Rainy);
        let sun = WeatherCondition::new(1, WeatherKind::Sunny);
        assert_eq!(TireCompound::for_weather(&rain), TireCompound::Wet);
        assert!(!Tireset::new(TireCompound::Dry).matches_weather(&rain));
        assert!(Tireset::new(TireCompound::Dry).matches_weather(&sun));
    }
}
