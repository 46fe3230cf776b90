use crate::core::driver::{clamp_rating, Driver, DriverPars};
use crate::core::track::{Track, TrackPars};
use crate::error::{EntityKind, Result, SimError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// * `reputation` - (0-100) Operational quality, lowers lap times
/// * `facilities` - (0-100) Factory and pit crew quality, lowers lap times and pit stop durations
/// * `budget` - (M) Available budget, informational
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub reputation: f64,
    pub facilities: f64,
    #[serde(default)]
    pub budget: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// * `performance` - (0-100) Raw car pace
/// * `reliability` - (0-100) Lowers tyre wear and mechanical DNF risk
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Manufacturer {
    pub id: String,
    pub name: String,
    pub performance: f64,
    pub reliability: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// RosterPars is the raw, deserialized reference dataset.
#[derive(Debug, Deserialize, Clone)]
pub struct RosterPars {
    pub drivers: Vec<DriverPars>,
    pub teams: Vec<Team>,
    pub manufacturers: Vec<Manufacturer>,
    #[serde(default)]
    pub tracks: Vec<TrackPars>,
}

/// Roster is an immutable snapshot of all drivers, teams, manufacturers and tracks. Lifecycle
/// changes (retirements, new entries) never mutate a snapshot in place but return a new one, so a
/// simulation always runs against the exact data it was started with.
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    drivers: Vec<Driver>,
    teams: Vec<Team>,
    manufacturers: Vec<Manufacturer>,
    tracks: Vec<Track>,
}

impl Roster {
    /// new validates the dataset: ids must be unique per entity kind and every driver must point
    /// to an existing team and manufacturer.
    pub fn new(roster_pars: &RosterPars) -> Result<Roster> {
        let roster = Roster {
            drivers: roster_pars.drivers.iter().map(Driver::new).collect(),
            teams: roster_pars
                .teams
                .iter()
                .map(|team| Team {
                    reputation: clamp_rating(team.reputation),
                    facilities: clamp_rating(team.facilities),
                    ..team.to_owned()
                })
                .collect(),
            manufacturers: roster_pars
                .manufacturers
                .iter()
                .map(|manufacturer| Manufacturer {
                    performance: clamp_rating(manufacturer.performance),
                    reliability: clamp_rating(manufacturer.reliability),
                    ..manufacturer.to_owned()
                })
                .collect(),
            tracks: roster_pars.tracks.iter().map(Track::new).collect(),
        };
        roster.validate()?;
        Ok(roster)
    }

    fn validate(&self) -> Result<()> {
        check_unique(EntityKind::Driver, self.drivers.iter().map(|d| d.id.as_str()))?;
        check_unique(EntityKind::Team, self.teams.iter().map(|t| t.id.as_str()))?;
        check_unique(
            EntityKind::Manufacturer,
            self.manufacturers.iter().map(|m| m.id.as_str()),
        )?;
        check_unique(EntityKind::Track, self.tracks.iter().map(|t| t.id.as_str()))?;

        for driver in self.drivers.iter() {
            self.team(&driver.team_id)?;
            self.manufacturer(&driver.manufacturer_id)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------------------------------
    // LOOKUPS -------------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    pub fn driver(&self, id: &str) -> Result<&Driver> {
        self.drivers
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| SimError::not_found(EntityKind::Driver, id))
    }

    pub fn team(&self, id: &str) -> Result<&Team> {
        self.teams
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| SimError::not_found(EntityKind::Team, id))
    }

    pub fn manufacturer(&self, id: &str) -> Result<&Manufacturer> {
        self.manufacturers
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| SimError::not_found(EntityKind::Manufacturer, id))
    }

    pub fn track(&self, id: &str) -> Result<&Track> {
        self.tracks
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| SimError::not_found(EntityKind::Track, id))
    }

    /// active_driver resolves a driver that is allowed to take part in a session. The driver, its
    /// team and its manufacturer must all be active.
    pub fn active_driver(&self, id: &str) -> Result<&Driver> {
        let driver = self.driver(id)?;
        if !driver.active {
            return Err(SimError::InactiveEntity {
                kind: EntityKind::Driver,
                id: id.to_owned(),
            });
        }
        let team = self.team(&driver.team_id)?;
        if !team.active {
            return Err(SimError::InactiveEntity {
                kind: EntityKind::Team,
                id: team.id.to_owned(),
            });
        }
        let manufacturer = self.manufacturer(&driver.manufacturer_id)?;
        if !manufacturer.active {
            return Err(SimError::InactiveEntity {
                kind: EntityKind::Manufacturer,
                id: manufacturer.id.to_owned(),
            });
        }
        Ok(driver)
    }

    /// is_eligible is true if the driver and its whole affiliation are active.
    fn is_eligible(&self, driver: &Driver) -> bool {
        driver.active
            && self.team(&driver.team_id).map_or(false, |t| t.active)
            && self
                .manufacturer(&driver.manufacturer_id)
                .map_or(false, |m| m.active)
    }

    pub fn drivers(&self) -> &[Driver] {
        &self.drivers
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn manufacturers(&self) -> &[Manufacturer] {
        &self.manufacturers
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Drivers that may take part in a simulation. Drivers of a retired team or manufacturer are
    /// left out as well.
    pub fn active_drivers(&self) -> impl Iterator<Item = &Driver> {
        self.drivers.iter().filter(move |d| self.is_eligible(d))
    }

    pub fn active_teams(&self) -> impl Iterator<Item = &Team> {
        self.teams.iter().filter(|t| t.active)
    }

    pub fn active_manufacturers(&self) -> impl Iterator<Item = &Manufacturer> {
        self.manufacturers.iter().filter(|m| m.active)
    }

    pub fn active_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(|t| t.active)
    }

    /// Ids of all active drivers in roster order, i.e. the default qualifying field.
    pub fn active_driver_ids(&self) -> Vec<String> {
        self.active_drivers().map(|d| d.id.to_owned()).collect()
    }

    // ---------------------------------------------------------------------------------------------
    // LIFECYCLE COMMANDS --------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    pub fn retire_driver(&self, id: &str) -> Result<Roster> {
        self.driver(id)?;
        let mut roster = self.clone();
        for driver in roster.drivers.iter_mut().filter(|d| d.id == id) {
            driver.active = false;
        }
        Ok(roster)
    }

    pub fn retire_team(&self, id: &str) -> Result<Roster> {
        self.team(id)?;
        let mut roster = self.clone();
        for team in roster.teams.iter_mut().filter(|t| t.id == id) {
            team.active = false;
        }
        Ok(roster)
    }

    pub fn retire_manufacturer(&self, id: &str) -> Result<Roster> {
        self.manufacturer(id)?;
        let mut roster = self.clone();
        for manufacturer in roster.manufacturers.iter_mut().filter(|m| m.id == id) {
            manufacturer.active = false;
        }
        Ok(roster)
    }

    /// with_driver adds a new driver (or replaces the one with the same id) and returns the
    /// resulting snapshot.
    pub fn with_driver(&self, driver_pars: &DriverPars) -> Result<Roster> {
        let mut roster = self.clone();
        let driver = Driver::new(driver_pars);
        match roster.drivers.iter_mut().find(|d| d.id == driver.id) {
            Some(existing) => *existing = driver,
            None => roster.drivers.push(driver),
        }
        roster.validate()?;
        Ok(roster)
    }

    /// with_drivers replaces the whole driver list, e.g. after career totals were updated.
    pub(crate) fn with_drivers(&self, drivers: Vec<Driver>) -> Roster {
        Roster {
            drivers,
            ..self.clone()
        }
    }
}

fn check_unique<'a>(kind: EntityKind, ids: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(SimError::InvalidParameter(format!(
                "duplicate {} id '{}'",
                kind, id
            )));
        }
    }
    Ok(())
}

/// index_by_id maps ids to their index in iteration order.
pub(crate) fn index_by_id<'a>(ids: impl Iterator<Item = &'a str>) -> HashMap<&'a str, usize> {
    ids.enumerate().map(|(i, id)| (id, i)).collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::core::weather::WeatherKind;

    pub fn driver_pars(id: &str, skill: f64, consistency: f64, team: &str, manu: &str) -> DriverPars {
        DriverPars {
            id: id.to_owned(),
            name: format!("Driver {}", id),
            skill,
            consistency,
            aggression: 50.0,
            team_id: team.to_owned(),
            manufacturer_id: manu.to_owned(),
            wins: 0,
            podiums: 0,
            championships: 0,
            active: true,
            joined_year: 2020,
        }
    }

    pub fn team(id: &str) -> Team {
        Team {
            id: id.to_owned(),
            name: format!("Team {}", id),
            reputation: 70.0,
            facilities: 70.0,
            budget: 100.0,
            active: true,
        }
    }

    pub fn manufacturer(id: &str) -> Manufacturer {
        Manufacturer {
            id: id.to_owned(),
            name: format!("Manufacturer {}", id),
            performance: 75.0,
            reliability: 80.0,
            active: true,
        }
    }

    pub fn track(id: &str, laps: u32) -> TrackPars {
        TrackPars {
            id: id.to_owned(),
            name: format!("Track {}", id),
            laps,
            distance: laps as f64 * 5.0,
            base_laptime: 90.0,
            weather: WeatherKind::Sunny,
            active: true,
        }
    }

    /// Twenty drivers in ten teams on two manufacturers, skills descending from 90.
    pub fn roster_pars(no_drivers: usize, no_tracks: usize) -> RosterPars {
        let teams: Vec<Team> = (0..10).map(|i| team(&format!("t{}", i))).collect();
        let manufacturers = vec![manufacturer("m0"), manufacturer("m1")];
        let drivers = (0..no_drivers)
            .map(|i| {
                driver_pars(
                    &format!("d{:02}", i),
                    90.0 - i as f64,
                    80.0,
                    &format!("t{}", (i / 2) % 10),
                    &format!("m{}", i % 2),
                )
            })
            .collect();
        let tracks = (0..no_tracks).map(|i| track(&format!("k{:02}", i), 20)).collect();
        RosterPars {
            drivers,
            teams,
            manufacturers,
            tracks,
        }
    }

    pub fn roster(no_drivers: usize) -> Roster {
        Roster::new(&roster_pars(no_drivers, 12)).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn unknown_ids_fail_with_not_found() {
        let roster = roster(4);
        assert_eq!(
            roster.driver("nobody").unwrap_err(),
            SimError::not_found(EntityKind::Driver, "nobody")
        );
        assert!(matches!(roster.team("x"), Err(SimError::NotFound { .. })));
    }

    #[test]
    fn driver_with_unknown_team_is_rejected() {
        let mut pars = roster_pars(2, 1);
        pars.drivers[0].team_id = "ghost".to_owned();
        assert_eq!(
            Roster::new(&pars).unwrap_err(),
            SimError::not_found(EntityKind::Team, "ghost")
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut pars = roster_pars(2, 1);
        pars.drivers[1].id = pars.drivers[0].id.clone();
        assert!(matches!(
            Roster::new(&pars),
            Err(SimError::InvalidParameter(_))
        ));
    }

    #[test]
    fn retire_returns_new_snapshot() {
        let roster = roster(4);
        let retired = roster.retire_driver("d01").unwrap();
        assert!(roster.driver("d01").unwrap().active);
        assert!(!retired.driver("d01").unwrap().active);
        assert_eq!(retired.active_drivers().count(), 3);
        assert!(matches!(
            retired.active_driver("d01"),
            Err(SimError::InactiveEntity { .. })
        ));
    }

    #[test]
    fn retired_team_and_manufacturer_leave_active_views() {
        let roster = roster(4);
        let retired = roster
            .retire_team("t0")
            .and_then(|r| r.retire_manufacturer("m1"))
            .unwrap();
        assert_eq!(retired.active_teams().count(), 9);
        assert_eq!(retired.active_manufacturers().count(), 1);
        assert_eq!(roster.active_teams().count(), 10);
        assert!(retired.retire_team("nope").is_err());
    }

    #[test]
    fn retired_team_takes_its_drivers_out() {
        // d00 and d01 drive for t0
        let retired = roster(6).retire_team("t0").unwrap();
        assert_eq!(retired.active_driver_ids(), vec!["d02", "d03", "d04", "d05"]);
        assert_eq!(
            retired.active_driver("d00").unwrap_err(),
            SimError::InactiveEntity {
                kind: EntityKind::Team,
                id: "t0".to_owned(),
            }
        );
        assert!(retired.driver("d00").unwrap().active);
    }

    #[test]
    fn retired_manufacturer_takes_its_drivers_out() {
        // odd drivers use m1
        let retired = roster(6).retire_manufacturer("m1").unwrap();
        assert_eq!(retired.active_driver_ids(), vec!["d00", "d02", "d04"]);
        assert_eq!(
            retired.active_driver("d03").unwrap_err(),
            SimError::InactiveEntity {
                kind: EntityKind::Manufacturer,
                id: "m1".to_owned(),
            }
        );
    }

    #[test]
    fn with_driver_appends_and_validates() {
        let roster = roster(2);
        let rookie = driver_pars("rookie", 60.0, 60.0, "t3", "m1");
        let bigger = roster.with_driver(&rookie).unwrap();
        assert_eq!(bigger.drivers().len(), 3);
        assert_eq!(roster.drivers().len(), 2);

        let broken = driver_pars("broken", 60.0, 60.0, "t3", "nope");
        assert!(roster.with_driver(&broken).is_err());
    }
}
