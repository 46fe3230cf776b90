use crate::core::track::lap_window;
use crate::error::{Result, SimError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherKind {
    Sunny,
    Cloudy,
    Rainy,
}

impl Default for WeatherKind {
    fn default() -> Self {
        WeatherKind::Sunny
    }
}

impl std::fmt::Display for WeatherKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            WeatherKind::Sunny => "sunny",
            WeatherKind::Cloudy => "cloudy",
            WeatherKind::Rainy => "rainy",
        };
        write!(f, "{}", name)
    }
}

/// * `lap` - First lap (1-based) this condition applies to
/// * `condition` - Weather kind
/// * `intensity` - (0-1) Rain intensity, only set for rainy conditions
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct WeatherCondition {
    pub lap: u32,
    pub condition: WeatherKind,
    pub intensity: Option<f64>,
}

const DEFAULT_RAIN_INTENSITY: f64 = 0.7;

impl WeatherCondition {
    pub fn new(lap: u32, condition: WeatherKind) -> WeatherCondition {
        WeatherCondition {
            lap,
            condition,
            intensity: None,
        }
    }

    pub fn is_wet(&self) -> bool {
        self.condition == WeatherKind::Rainy
    }

    /// Rain intensity in 0..=1, 0 when dry.
    pub fn rain_intensity(&self) -> f64 {
        if self.is_wet() {
            self.intensity
                .unwrap_or(DEFAULT_RAIN_INTENSITY)
                .clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// WeatherSchedule is the fixed, pre-generated sequence of weather conditions of a race. The entry
/// for lap 1 is always present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSchedule {
    entries: Vec<WeatherCondition>,
}

impl WeatherSchedule {
    /// constant returns a schedule that keeps the given weather for the whole race.
    pub fn constant(condition: WeatherKind) -> WeatherSchedule {
        let mut start = WeatherCondition::new(1, condition);
        if condition == WeatherKind::Rainy {
            start.intensity = Some(DEFAULT_RAIN_INTENSITY);
        }
        WeatherSchedule {
            entries: vec![start],
        }
    }

    /// from_entries validates a hand-made schedule: it must start at lap 1 and the laps must be
    /// strictly increasing.
    pub fn from_entries(entries: Vec<WeatherCondition>) -> Result<WeatherSchedule> {
        match entries.first() {
            Some(first) if first.lap == 1 => {}
            _ => {
                return Err(SimError::InvalidParameter(
                    "weather schedule must start at lap 1".to_owned(),
                ))
            }
        }
        if entries.windows(2).any(|w| w[0].lap >= w[1].lap) {
            return Err(SimError::InvalidParameter(
                "weather schedule laps must be strictly increasing".to_owned(),
            ));
        }
        Ok(WeatherSchedule { entries })
    }

    /// generate builds the race weather before the race starts. With probability `change_chance`
    /// exactly one transition is scheduled inside the middle of the race; rain turning to cloud
    /// may clear up to sunshine later on.
    pub fn generate<R: Rng + ?Sized>(
        base: WeatherKind,
        tot_no_laps: u32,
        change_chance: f64,
        rng: &mut R,
    ) -> WeatherSchedule {
        let mut start = WeatherCondition::new(1, base);
        if base == WeatherKind::Rainy {
            start.intensity = Some(rng.gen_range(0.3..=1.0));
        }
        let mut entries = vec![start];

        let window = lap_window(tot_no_laps, 0.3, 0.7);
        // a change on lap 1 would overwrite the starting weather
        let window = window.start.max(2)..window.end;

        if !window.is_empty() && rng.gen_bool(change_chance.clamp(0.0, 1.0)) {
            let change_lap = rng.gen_range(window);
            let next = match base {
                WeatherKind::Sunny => {
                    if rng.gen_bool(0.6) {
                        WeatherKind::Cloudy
                    } else {
                        WeatherKind::Rainy
                    }
                }
                WeatherKind::Cloudy => {
                    if rng.gen_bool(0.5) {
                        WeatherKind::Sunny
                    } else {
                        WeatherKind::Rainy
                    }
                }
                WeatherKind::Rainy => WeatherKind::Cloudy,
            };

            let mut change = WeatherCondition::new(change_lap, next);
            if next == WeatherKind::Rainy {
                change.intensity = Some(rng.gen_range(0.3..=1.0));
            }
            entries.push(change);
            debug!("Weather change scheduled: {} -> {} on lap {}", base, next, change_lap);

            if base == WeatherKind::Rainy && change_lap < tot_no_laps && rng.gen_bool(0.5) {
                let clear_lap = rng.gen_range(change_lap + 1..=tot_no_laps);
                entries.push(WeatherCondition::new(clear_lap, WeatherKind::Sunny));
                debug!("Track clearing up to sunny on lap {}", clear_lap);
            }
        }

        WeatherSchedule { entries }
    }

    /// at_lap returns the latest condition whose lap is <= the given lap.
    pub fn at_lap(&self, lap: u32) -> &WeatherCondition {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.lap <= lap)
            .unwrap_or(&self.entries[0])
    }

    pub fn entries(&self) -> &[WeatherCondition] {
        &self.entries
    }

    pub fn starting(&self) -> &WeatherCondition {
        &self.entries[0]
    }
}
