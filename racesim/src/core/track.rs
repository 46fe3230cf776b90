use crate::core::weather::WeatherKind;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// * `id` - Unique track id, e.g. "monza"
/// * `name` - Track name
/// * `laps` - Race distance in laps
/// * `distance` - (km) Race distance
/// * `base_laptime` - (s) Reference lap time of a perfect car/driver combination in the dry
/// * `weather` - Base weather the race weekend starts with
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TrackPars {
    pub id: String,
    pub name: String,
    pub laps: u32,
    pub distance: f64,
    pub base_laptime: f64,
    #[serde(default)]
    pub weather: WeatherKind,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub laps: u32,
    pub distance: f64,
    pub base_laptime_ms: f64,
    pub weather: WeatherKind,
    pub active: bool,
}

impl Track {
    pub fn new(track_pars: &TrackPars) -> Track {
        Track {
            id: track_pars.id.to_owned(),
            name: track_pars.name.to_owned(),
            laps: track_pars.laps,
            distance: track_pars.distance,
            base_laptime_ms: track_pars.base_laptime * 1000.0,
            weather: track_pars.weather,
            active: track_pars.active,
        }
    }
}

/// lap_window returns the half-open lap range [start_frac * laps, end_frac * laps) used for the
/// mandatory pit window and weather changes. The range always contains at least one lap in
/// 1..=laps (for laps > 0), so short races still get a valid window.
pub fn lap_window(tot_no_laps: u32, start_frac: f64, end_frac: f64) -> Range<u32> {
    if tot_no_laps == 0 {
        return 0..0;
    }
    let laps = tot_no_laps as f64;
    let start = ((laps * start_frac).floor() as u32).max(1).min(tot_no_laps);
    let end = ((laps * end_frac).ceil() as u32)
        .max(start + 1)
        .min(tot_no_laps + 1);
    start..end
}
