use serde::{Deserialize, Serialize};

/// * `id` - Unique driver id, e.g. "ver"
/// * `name` - Driver name, e.g. Max Verstappen
/// * `skill` - (0-100) Raw pace, enters every lap time
/// * `consistency` - (0-100) Lap-to-lap stability, also lowers DNF risk and qualifying pressure
/// * `aggression` - (0-100) Raises lap-time variance and incident risk
/// * `team_id` - Team the driver races for
/// * `manufacturer_id` - Power unit / chassis supplier
/// * `wins`, `podiums`, `championships` - Career totals
/// * `active` - False once the driver has left the grid (soft delete)
/// * `joined_year` - Season the driver entered the roster
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DriverPars {
    pub id: String,
    pub name: String,
    pub skill: f64,
    pub consistency: f64,
    #[serde(default = "default_aggression")]
    pub aggression: f64,
    pub team_id: String,
    pub manufacturer_id: String,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub podiums: u32,
    #[serde(default)]
    pub championships: u32,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub joined_year: u32,
}

fn default_aggression() -> f64 {
    50.0
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Driver {
    pub id: String,
    pub name: String,
    pub skill: f64,
    pub consistency: f64,
    pub aggression: f64,
    pub team_id: String,
    pub manufacturer_id: String,
    pub wins: u32,
    pub podiums: u32,
    pub championships: u32,
    pub active: bool,
    pub joined_year: u32,
}

impl Driver {
    pub fn new(driver_pars: &DriverPars) -> Driver {
        Driver {
            id: driver_pars.id.to_owned(),
            name: driver_pars.name.to_owned(),
            skill: clamp_rating(driver_pars.skill),
            consistency: clamp_rating(driver_pars.consistency),
            aggression: clamp_rating(driver_pars.aggression),
            team_id: driver_pars.team_id.to_owned(),
            manufacturer_id: driver_pars.manufacturer_id.to_owned(),
            wins: driver_pars.wins,
            podiums: driver_pars.podiums,
            championships: driver_pars.championships,
            active: driver_pars.active,
            joined_year: driver_pars.joined_year,
        }
    }
}

/// rating_deficit maps a 0-100 rating onto the missing share 0.0 (rating 100) .. 1.0 (rating 0).
pub fn rating_deficit(rating: f64) -> f64 {
    (100.0 - clamp_rating(rating)) / 100.0
}

pub fn clamp_rating(rating: f64) -> f64 {
    if rating.is_nan() {
        0.0
    } else {
        rating.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ratings_are_clamped_on_creation() {
        let pars: DriverPars = serde_json::from_str(
            r#"{"id":"x","name":"X","skill":140,"consistency":-3,"team_id":"t","manufacturer_id":"m"}"#,
        )
        .unwrap();
        let driver = Driver::new(&pars);
        assert_relative_eq!(driver.skill, 100.0);
        assert_relative_eq!(driver.consistency, 0.0);
        assert_relative_eq!(driver.aggression, 50.0);
        assert!(driver.active);
    }

    #[test]
    fn deficits_span_zero_to_one() {
        assert_relative_eq!(rating_deficit(100.0), 0.0);
        assert_relative_eq!(rating_deficit(0.0), 1.0);
        assert_relative_eq!(rating_deficit(75.0), 0.25);
    }
}
