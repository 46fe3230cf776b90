use crate::core::roster::{index_by_id, Roster};
use crate::core::season::Season;
use crate::error::Result;
use crate::post::race_result::RaceResult;
use serde::Serialize;
use std::cmp::Reverse;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StandingKind {
    Driver,
    Team,
    Manufacturer,
}

impl StandingKind {
    /// result_id returns the id a race result counts for in this kind of standings.
    fn result_id<'r>(&self, result: &'r RaceResult) -> &'r str {
        match self {
            StandingKind::Driver => &result.driver_id,
            StandingKind::Team => &result.team_id,
            StandingKind::Manufacturer => &result.manufacturer_id,
        }
    }
}

/// Standing is one line of a championship table.
///
/// * `fastest_laps` - Number of fastest lap bonuses, only counted in driver standings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standing {
    pub id: String,
    pub position: u32,
    pub points: u32,
    pub wins: u32,
    pub podiums: u32,
    pub fastest_laps: Option<u32>,
}

impl Standing {
    fn new(id: &str, kind: StandingKind) -> Standing {
        Standing {
            id: id.to_owned(),
            position: 0,
            points: 0,
            wins: 0,
            podiums: 0,
            fastest_laps: match kind {
                StandingKind::Driver => Some(0),
                _ => None,
            },
        }
    }

    fn add_result(&mut self, result: &RaceResult) {
        self.points += result.points;
        if !result.dnf && result.position == 1 {
            self.wins += 1;
        }
        if !result.dnf && result.position <= 3 {
            self.podiums += 1;
        }
        if result.fastest_lap {
            if let Some(fastest_laps) = self.fastest_laps.as_mut() {
                *fastest_laps += 1;
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------
// MAIN METHOD -------------------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------

/// standings recomputes a championship table from all completed races of a season. Every active
/// roster entity gets an entry, even without points. Results of entities that are known to the
/// roster but inactive are not counted; results referencing unknown ids are an error.
///
/// Entries are sorted by points, then wins, then podiums (all descending); full ties keep the
/// roster order.
pub fn standings(season: &Season, roster: &Roster, kind: StandingKind) -> Result<Vec<Standing>> {
    let active_ids: Vec<&str> = match kind {
        StandingKind::Driver => roster.active_drivers().map(|d| d.id.as_str()).collect(),
        StandingKind::Team => roster.active_teams().map(|t| t.id.as_str()).collect(),
        StandingKind::Manufacturer => roster
            .active_manufacturers()
            .map(|m| m.id.as_str())
            .collect(),
    };
    let idxs = index_by_id(active_ids.iter().copied());
    let mut table: Vec<Standing> = active_ids.iter().map(|id| Standing::new(id, kind)).collect();

    for race in season.races.iter() {
        let results = match race.completed_results() {
            Some(results) => results,
            None => continue,
        };
        for result in results.iter() {
            let id = kind.result_id(result);
            match idxs.get(id) {
                Some(&idx) => table[idx].add_result(result),
                None => check_known(roster, kind, id)?,
            }
        }
    }

    table.sort_by_key(|s| (Reverse(s.points), Reverse(s.wins), Reverse(s.podiums)));
    for (i, standing) in table.iter_mut().enumerate() {
        standing.position = i as u32 + 1;
    }
    Ok(table)
}

/// check_known fails with NotFound if the id is not part of the roster at all.
fn check_known(roster: &Roster, kind: StandingKind, id: &str) -> Result<()> {
    match kind {
        StandingKind::Driver => roster.driver(id).map(|_| ()),
        StandingKind::Team => roster.team(id).map(|_| ()),
        StandingKind::Manufacturer => roster.manufacturer(id).map(|_| ()),
    }
}

// -------------------------------------------------------------------------------------------------
// DERIVED VIEWS -----------------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------

/// form returns the finishing positions of an entity in its last `last_n` completed races,
/// oldest first. For teams and manufacturers the best placed car counts.
pub fn form(season: &Season, kind: StandingKind, id: &str, last_n: usize) -> Vec<u32> {
    let positions: Vec<u32> = season
        .completed_races()
        .filter_map(|race| {
            race.results
                .as_ref()?
                .iter()
                .filter(|result| kind.result_id(result) == id)
                .map(|result| result.position)
                .min()
        })
        .collect();
    let skip = positions.len().saturating_sub(last_n);
    positions[skip..].to_vec()
}

/// points_gap returns the points the entry at `position` is behind the leader.
pub fn points_gap(standings: &[Standing], position: u32) -> Option<u32> {
    let leader = standings.iter().find(|s| s.position == 1)?;
    let entry = standings.iter().find(|s| s.position == position)?;
    Some(leader.points.saturating_sub(entry.points))
}

/// rank_change compares two standings tables: previous position minus current position, i.e.
/// positive if the entity moved up. None if the entity is missing in either table.
pub fn rank_change(current: &[Standing], previous: &[Standing], id: &str) -> Option<i64> {
    let cur = current.iter().find(|s| s.id == id)?;
    let prev = previous.iter().find(|s| s.id == id)?;
    Some(prev.position as i64 - cur.position as i64)
}

/// position_change computes the standings of both seasons and returns the rank change of an
/// entity between them.
pub fn position_change(
    current: &Season,
    previous: &Season,
    roster: &Roster,
    kind: StandingKind,
    id: &str,
) -> Result<Option<i64>> {
    let cur = standings(current, roster, kind)?;
    let prev = standings(previous, roster, kind)?;
    Ok(rank_change(&cur, &prev, id))
}

/// career_totals returns a new roster snapshot with the wins and podiums of a season added to the
/// driver career totals. The champion of a completed season also gets the title.
pub fn career_totals(roster: &Roster, season: &Season) -> Result<Roster> {
    let table = standings(season, roster, StandingKind::Driver)?;
    let award_title = season.completed && season.no_completed_races() > 0;

    let drivers = roster
        .drivers()
        .iter()
        .map(|driver| {
            let mut driver = driver.to_owned();
            if let Some(standing) = table.iter().find(|s| s.id == driver.id) {
                driver.wins += standing.wins;
                driver.podiums += standing.podiums;
                if award_title && standing.position == 1 && standing.points > 0 {
                    driver.championships += 1;
                }
            }
            driver
        })
        .collect();
    Ok(roster.with_drivers(drivers))
}

// -------------------------------------------------------------------------------------------------
// CONSOLE OUTPUT ----------------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------

pub fn format_standings(standings: &[Standing], kind: StandingKind) -> String {
    let mut out = String::new();
    let title = match kind {
        StandingKind::Driver => "DRIVERS",
        StandingKind::Team => "TEAMS",
        StandingKind::Manufacturer => "MANUFACTURERS",
    };
    let leader_points = standings.first().map_or(0, |s| s.points);

    let _ = writeln!(&mut out, "{} CHAMPIONSHIP", title);
    let _ = writeln!(
        &mut out,
        "{:>3}  {:<12} {:>5} {:>5} {:>5} {:>5} {:>4}",
        "pos", "id", "pts", "gap", "wins", "pods", "fl"
    );
    for standing in standings.iter() {
        let _ = writeln!(
            &mut out,
            "{:>3}  {:<12} {:>5} {:>5} {:>5} {:>5} {:>4}",
            standing.position,
            standing.id,
            standing.points,
            leader_points.saturating_sub(standing.points),
            standing.wins,
            standing.podiums,
            standing
                .fastest_laps
                .map_or_else(|| "-".to_owned(), |n| n.to_string())
        );
    }
    out
}

pub fn print_standings(standings: &[Standing], kind: StandingKind) {
    print!("{}", format_standings(standings, kind));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::roster::fixtures;
    use crate::core::season::generate_calendar;
    use crate::error::{EntityKind, SimError};

    fn result(position: u32, driver_id: &str, team_id: &str, points: u32, dnf: bool) -> RaceResult {
        RaceResult {
            position,
            driver_id: driver_id.to_owned(),
            team_id: team_id.to_owned(),
            manufacturer_id: "m0".to_owned(),
            points,
            fastest_lap: false,
            dnf,
            dnf_reason: if dnf { Some("Gearbox failure".to_owned()) } else { None },
            lap_time: None,
            total_time: 0.0,
            laps_completed: 0,
            penalty: 0.0,
        }
    }

    fn season_with(results: Vec<Vec<RaceResult>>) -> Season {
        let roster = fixtures::roster(4);
        let mut season = generate_calendar(2024, roster.active_tracks());
        for (race, res) in season.races.iter_mut().zip(results.into_iter()) {
            race.mark_completed(res);
        }
        season
    }

    #[test]
    fn zero_completed_races_gives_zeroed_table_in_roster_order() {
        let roster = fixtures::roster(4);
        let season = generate_calendar(2024, roster.active_tracks());
        let table = standings(&season, &roster, StandingKind::Driver).unwrap();

        assert_eq!(table.len(), 4);
        for (i, s) in table.iter().enumerate() {
            assert_eq!(s.id, format!("d{:02}", i));
            assert_eq!(s.position, i as u32 + 1);
            assert_eq!((s.points, s.wins, s.podiums), (0, 0, 0));
            assert_eq!(s.fastest_laps, Some(0));
        }

        let teams = standings(&season, &roster, StandingKind::Team).unwrap();
        assert_eq!(teams.len(), 10);
        assert!(teams.iter().all(|s| s.fastest_laps.is_none()));
    }

    #[test]
    fn sorts_by_points_then_wins_then_podiums() {
        let mut r1 = vec![
            result(1, "d03", "t1", 25, false),
            result(2, "d02", "t1", 18, false),
            result(3, "d01", "t0", 15, false),
            result(4, "d00", "t0", 0, true),
        ];
        r1[1].fastest_lap = true;
        r1[1].points += 1;
        let r2 = vec![
            result(1, "d02", "t1", 25, false),
            result(2, "d03", "t1", 18, false),
            result(3, "d00", "t0", 15, false),
            result(4, "d01", "t0", 12, false),
        ];
        let season = season_with(vec![r1, r2]);
        let roster = fixtures::roster(4);
        let table = standings(&season, &roster, StandingKind::Driver).unwrap();

        let order: Vec<&str> = table.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(order, vec!["d02", "d03", "d01", "d00"]);
        assert_eq!(table[0].points, 44);
        assert_eq!(table[0].fastest_laps, Some(1));
        assert_eq!(table[1].points, 43);
        assert_eq!(table[3].podiums, 1);
        assert_eq!(table[3].wins, 0);

        let teams = standings(&season, &roster, StandingKind::Team).unwrap();
        assert_eq!(teams[0].id, "t1");
        assert_eq!(teams[0].points, 87);
        assert_eq!(teams[0].wins, 2);
    }

    #[test]
    fn tie_on_points_is_broken_by_wins() {
        let r1 = vec![result(1, "d01", "t0", 25, false), result(2, "d00", "t0", 18, false)];
        let r2 = vec![result(1, "d00", "t0", 7, false), result(2, "d01", "t0", 0, false)];
        let season = season_with(vec![r1, r2]);
        let table = standings(&season, &fixtures::roster(4), StandingKind::Driver).unwrap();
        assert_eq!(table[0].points, 25);
        assert_eq!(table[1].points, 25);
        assert_eq!(table[0].wins, table[1].wins);
        // both on one win and two podiums: roster order decides
        assert_eq!(table[0].id, "d00");
    }

    #[test]
    fn standings_are_idempotent() {
        let season = season_with(vec![vec![result(1, "d01", "t0", 25, false)]]);
        let roster = fixtures::roster(4);
        assert_eq!(
            standings(&season, &roster, StandingKind::Driver).unwrap(),
            standings(&season, &roster, StandingKind::Driver).unwrap()
        );
    }

    #[test]
    fn unknown_and_inactive_ids() {
        let roster = fixtures::roster(4);
        let season = season_with(vec![vec![result(1, "ghost", "t0", 25, false)]]);
        assert_eq!(
            standings(&season, &roster, StandingKind::Driver).unwrap_err(),
            SimError::not_found(EntityKind::Driver, "ghost")
        );

        let season = season_with(vec![vec![result(1, "d01", "t0", 25, false)]]);
        let retired = roster.retire_driver("d01").unwrap();
        let table = standings(&season, &retired, StandingKind::Driver).unwrap();
        assert_eq!(table.len(), 3);
        assert!(table.iter().all(|s| s.points == 0));
    }

    #[test]
    fn form_gap_and_rank_change() {
        let season = season_with(vec![
            vec![result(1, "d00", "t0", 25, false), result(2, "d01", "t0", 18, false)],
            vec![result(1, "d01", "t0", 25, false), result(2, "d00", "t0", 18, false)],
            vec![result(1, "d01", "t0", 25, false), result(2, "d00", "t0", 18, false)],
        ]);
        assert_eq!(form(&season, StandingKind::Driver, "d00", 2), vec![2, 2]);
        assert_eq!(form(&season, StandingKind::Driver, "d00", 10), vec![1, 2, 2]);
        assert_eq!(form(&season, StandingKind::Team, "t0", 3), vec![1, 1, 1]);
        assert!(form(&season, StandingKind::Driver, "d03", 3).is_empty());

        let roster = fixtures::roster(4);
        let table = standings(&season, &roster, StandingKind::Driver).unwrap();
        assert_eq!(points_gap(&table, 1), Some(0));
        assert_eq!(points_gap(&table, 2), Some(7));
        assert_eq!(points_gap(&table, 9), None);

        let previous = season_with(vec![vec![
            result(1, "d03", "t1", 25, false),
            result(2, "d00", "t0", 18, false),
            result(3, "d01", "t0", 15, false),
        ]]);
        // d01: 3rd before, 1st now
        assert_eq!(
            position_change(&season, &previous, &roster, StandingKind::Driver, "d01").unwrap(),
            Some(2)
        );
        assert_eq!(
            position_change(&season, &previous, &roster, StandingKind::Driver, "d01").unwrap(),
            position_change(&season, &previous, &roster, StandingKind::Driver, "d01").unwrap()
        );
        assert_eq!(rank_change(&table, &table, "nobody"), None);
    }

    #[test]
    fn career_totals_add_season_to_drivers() {
        let roster = fixtures::roster(4);
        let mut season = season_with(vec![vec![
            result(1, "d02", "t1", 25, false),
            result(2, "d00", "t0", 18, false),
        ]]);

        // season still running: no title
        let updated = career_totals(&roster, &season).unwrap();
        assert_eq!(updated.driver("d02").unwrap().wins, 1);
        assert_eq!(updated.driver("d02").unwrap().championships, 0);
        assert_eq!(updated.driver("d00").unwrap().podiums, 1);
        assert_eq!(roster.driver("d02").unwrap().wins, 0);

        season.races.truncate(1);
        let season = Season::new(season.year, season.races);
        let updated = career_totals(&roster, &season).unwrap();
        assert_eq!(updated.driver("d02").unwrap().championships, 1);
        assert_eq!(updated.driver("d00").unwrap().championships, 0);
    }

    #[test]
    fn format_standings_lists_every_entry() {
        let roster = fixtures::roster(4);
        let season = generate_calendar(2024, roster.active_tracks());
        let table = standings(&season, &roster, StandingKind::Manufacturer).unwrap();
        let out = format_standings(&table, StandingKind::Manufacturer);
        assert!(out.starts_with("MANUFACTURERS CHAMPIONSHIP"));
        assert_eq!(out.lines().count(), 2 + table.len());
    }
}
