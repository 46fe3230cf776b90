use crate::core::driver::rating_deficit;
use crate::core::roster::Roster;
use crate::core::track::Track;
use crate::core::weather::{WeatherCondition, WeatherKind};
use crate::error::{Result, SimError};
use crate::post::race_result::format_laptime;
use helpers::general::{argsort, SortOrder};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write;
use tracing::{debug, info};

/// Drivers advancing from Q1 into Q2.
pub const Q1_CUTOFF: usize = 15;
/// Drivers advancing from Q2 into Q3.
pub const Q2_CUTOFF: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Session {
    Q1,
    Q2,
    Q3,
}

impl Session {
    pub fn next(&self) -> Option<Session> {
        match self {
            Session::Q1 => Some(Session::Q2),
            Session::Q2 => Some(Session::Q3),
            Session::Q3 => None,
        }
    }
}

impl std::fmt::Display for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            Session::Q1 => "Q1",
            Session::Q2 => "Q2",
            Session::Q3 => "Q3",
        };
        write!(f, "{}", name)
    }
}

/// * `q1_cutoff`, `q2_cutoff` - Number of drivers advancing out of Q1 and Q2
/// * `attempts` - Flying laps per driver and session, the best one counts
/// * `skill_ms` - (ms) Loss of a skill-0 driver compared to a skill-100 driver
/// * `team_ms`, `manufacturer_ms` - (ms) Same for team and manufacturer ratings
/// * `cloudy_ms` - (ms) Loss in cloudy conditions
/// * `rain_ms` - (ms) Loss in full rain for an average driver, scaled down with skill
/// * `q2_pressure_ms`, `q3_pressure_ms` - (ms) Pressure loss of a consistency-0 driver
/// * `jitter_std_ms` - (ms) Standard deviation of the random lap time component
/// * `min_laptime_factor` - Fastest possible lap relative to the track base lap time
/// * `lap_deletion_chance` - Probability that a single attempt is deleted (track limits)
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct QualifyingConfig {
    pub q1_cutoff: usize,
    pub q2_cutoff: usize,
    pub attempts: u32,
    pub skill_ms: f64,
    pub team_ms: f64,
    pub manufacturer_ms: f64,
    pub cloudy_ms: f64,
    pub rain_ms: f64,
    pub q2_pressure_ms: f64,
    pub q3_pressure_ms: f64,
    pub jitter_std_ms: f64,
    pub min_laptime_factor: f64,
    pub lap_deletion_chance: f64,
}

impl Default for QualifyingConfig {
    fn default() -> Self {
        QualifyingConfig {
            q1_cutoff: Q1_CUTOFF,
            q2_cutoff: Q2_CUTOFF,
            attempts: 2,
            skill_ms: 2500.0,
            team_ms: 1500.0,
            manufacturer_ms: 2000.0,
            cloudy_ms: 500.0,
            rain_ms: 4000.0,
            q2_pressure_ms: 300.0,
            q3_pressure_ms: 600.0,
            jitter_std_ms: 200.0,
            min_laptime_factor: 0.95,
            lap_deletion_chance: 0.02,
        }
    }
}

/// QualifyingResult is one line of a session classification or of the final grid.
///
/// * `best_lap` - (ms) Best valid lap, infinite if the driver did not set one
/// * `gap` - (ms) Gap to the session leader, 0 for the leader
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualifyingResult {
    pub position: u32,
    pub driver_id: String,
    pub best_lap: f64,
    pub gap: f64,
    pub eliminated: bool,
    pub eliminated_in: Option<Session>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionResult {
    pub session: Session,
    pub results: Vec<QualifyingResult>,
}

impl SessionResult {
    pub fn advancing(&self) -> impl Iterator<Item = &QualifyingResult> {
        self.results.iter().filter(|r| !r.eliminated)
    }

    pub fn eliminated(&self) -> impl Iterator<Item = &QualifyingResult> {
        self.results.iter().filter(|r| r.eliminated)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualifyingOutcome {
    pub sessions: Vec<SessionResult>,
    pub grid: Vec<QualifyingResult>,
}

impl QualifyingOutcome {
    pub fn pole_position(&self) -> Option<&QualifyingResult> {
        self.grid.first()
    }

    /// print_grid prints the final starting grid to the console output.
    pub fn print_grid(&self) {
        print!("{}", self.format_grid());
    }

    pub fn format_grid(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(&mut out, "STARTING GRID");
        for result in self.grid.iter() {
            let out_in = result
                .eliminated_in
                .map_or_else(String::new, |session| format!("(out in {})", session));
            let _ = writeln!(
                &mut out,
                "{:>3}  {:<10} {:>10} {:>10} {}",
                result.position,
                result.driver_id,
                format_laptime(result.best_lap),
                if result.position == 1 {
                    "-".to_owned()
                } else if result.gap.is_finite() {
                    format!("+{:.3}s", result.gap / 1000.0)
                } else {
                    "no time".to_owned()
                },
                out_in
            );
        }
        out
    }
}

/// Per-driver data needed during qualifying, copied from the roster once at the start.
#[derive(Debug, Clone)]
struct Entrant {
    driver_id: String,
    skill: f64,
    consistency: f64,
    team_performance: f64,
    manufacturer_performance: f64,
}

/// Qualifying runs the three knockout sessions one after another. Each call of
/// `run_next_session` plays one session, so a caller can display intermediate results.
#[derive(Debug)]
pub struct Qualifying<'a> {
    cfg: &'a QualifyingConfig,
    base_laptime_ms: f64,
    weather: WeatherCondition,
    entrants: Vec<Entrant>,
    remaining: Vec<usize>,
    next_session: Option<Session>,
    sessions: Vec<SessionResult>,
}

impl<'a> Qualifying<'a> {
    /// new validates the participant list against the roster: every driver must exist, be active,
    /// appear only once and have a known team and manufacturer.
    pub fn new(
        participants: &[String],
        weather: &WeatherCondition,
        track: &Track,
        roster: &Roster,
        cfg: &'a QualifyingConfig,
    ) -> Result<Qualifying<'a>> {
        if participants.is_empty() {
            return Err(SimError::EmptyField("Qualifying"));
        }

        let mut seen = HashSet::new();
        let mut entrants = Vec::with_capacity(participants.len());
        for driver_id in participants.iter() {
            if !seen.insert(driver_id.as_str()) {
                return Err(SimError::InvalidGrid(format!(
                    "driver '{}' entered qualifying twice",
                    driver_id
                )));
            }
            let driver = roster.active_driver(driver_id)?;
            let team = roster.team(&driver.team_id)?;
            let manufacturer = roster.manufacturer(&driver.manufacturer_id)?;
            entrants.push(Entrant {
                driver_id: driver.id.to_owned(),
                skill: driver.skill,
                consistency: driver.consistency,
                team_performance: (team.reputation + team.facilities) / 2.0,
                manufacturer_performance: manufacturer.performance,
            });
        }

        Ok(Qualifying {
            cfg,
            base_laptime_ms: track.base_laptime_ms,
            weather: *weather,
            remaining: (0..entrants.len()).collect(),
            entrants,
            next_session: Some(Session::Q1),
            sessions: Vec::with_capacity(3),
        })
    }

    pub fn next_session(&self) -> Option<Session> {
        self.next_session
    }

    pub fn is_finished(&self) -> bool {
        self.next_session.is_none()
    }

    pub fn sessions(&self) -> &[SessionResult] {
        &self.sessions
    }

    /// run_next_session plays the next session and eliminates the drivers below its cutoff.
    /// Returns None once Q3 has been played.
    pub fn run_next_session<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<&SessionResult> {
        let session = self.next_session?;

        let best_laps: Vec<f64> = self
            .remaining
            .iter()
            .map(|&idx| self.calc_best_lap(&self.entrants[idx], session, rng))
            .collect();

        let cutoff = match session {
            Session::Q1 => self.cfg.q1_cutoff,
            Session::Q2 => self.cfg.q2_cutoff,
            Session::Q3 => usize::MAX,
        };
        let (results, advancing) = rank_session(&self.remaining, &best_laps, &self.entrants, session, cutoff);

        info!(
            "{} finished: {} advance, {} eliminated",
            session,
            advancing.len(),
            results.len() - advancing.len()
        );

        self.remaining = advancing;
        self.next_session = session.next();
        self.sessions.push(SessionResult { session, results });
        self.sessions.last()
    }

    /// into_outcome assembles the final grid: Q3 order, then the drivers eliminated in Q2 in their
    /// Q2 order, then the Q1 eliminations in their Q1 order, renumbered 1..N.
    pub fn into_outcome(self) -> Result<QualifyingOutcome> {
        if !self.is_finished() {
            return Err(SimError::InvalidTransition {
                from: "qualifying",
                to: "grid",
            });
        }

        let mut grid: Vec<QualifyingResult> = Vec::with_capacity(self.entrants.len());
        for session in self.sessions.iter().rev() {
            let block = session.results.iter().filter(|r| match session.session {
                Session::Q3 => true,
                _ => r.eliminated,
            });
            grid.extend(block.cloned());
        }
        for (i, result) in grid.iter_mut().enumerate() {
            result.position = i as u32 + 1;
        }

        Ok(QualifyingOutcome {
            sessions: self.sessions,
            grid,
        })
    }

    // ---------------------------------------------------------------------------------------------
    // LAP TIME MODEL ------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    fn calc_best_lap<R: Rng + ?Sized>(&self, entrant: &Entrant, session: Session, rng: &mut R) -> f64 {
        let mut best = f64::INFINITY;
        for _ in 0..self.cfg.attempts.max(1) {
            if rng.gen_bool(self.cfg.lap_deletion_chance.clamp(0.0, 1.0)) {
                debug!("{}: lap of {} deleted", session, entrant.driver_id);
                continue;
            }
            best = best.min(self.calc_laptime(entrant, session, rng));
        }
        best
    }

    /// calc_laptime returns one qualifying lap (ms): base time plus driver, team, manufacturer,
    /// weather and session pressure losses plus random jitter.
    fn calc_laptime<R: Rng + ?Sized>(&self, entrant: &Entrant, session: Session, rng: &mut R) -> f64 {
        let cfg = self.cfg;
        let skill_deficit = rating_deficit(entrant.skill);

        let weather_penalty = match self.weather.condition {
            WeatherKind::Sunny => 0.0,
            WeatherKind::Cloudy => cfg.cloudy_ms,
            // rain rewards skill: a skill-100 driver loses half of what an average one does
            WeatherKind::Rainy => cfg.rain_ms * self.weather.rain_intensity() * (0.5 + skill_deficit),
        };

        let pressure_ms = match session {
            Session::Q1 => 0.0,
            Session::Q2 => cfg.q2_pressure_ms,
            Session::Q3 => cfg.q3_pressure_ms,
        };
        let pressure_penalty = rating_deficit(entrant.consistency) * pressure_ms;

        let jitter = if cfg.jitter_std_ms > 0.0 {
            Normal::new(0.0, cfg.jitter_std_ms)
                .map(|normal| normal.sample(rng))
                .unwrap_or(0.0)
        } else {
            0.0
        };

        let laptime = self.base_laptime_ms
            + skill_deficit * cfg.skill_ms
            + rating_deficit(entrant.team_performance) * cfg.team_ms
            + rating_deficit(entrant.manufacturer_performance) * cfg.manufacturer_ms
            + weather_penalty
            + pressure_penalty
            + jitter;

        laptime.max(self.base_laptime_ms * cfg.min_laptime_factor)
    }
}

/// rank_session sorts a session by best lap (no time last), assigns dense positions and gaps and
/// marks everybody below the cutoff as eliminated. Returns the results and the entrant indices
/// that advance, in session order.
fn rank_session(
    remaining: &[usize],
    best_laps: &[f64],
    entrants: &[Entrant],
    session: Session,
    cutoff: usize,
) -> (Vec<QualifyingResult>, Vec<usize>) {
    let order = argsort(best_laps, SortOrder::Ascending);
    let leader_lap = order.first().map(|&k| best_laps[k]).unwrap_or(f64::INFINITY);
    let no_advancing = cutoff.min(order.len());

    let mut results = Vec::with_capacity(order.len());
    let mut advancing = Vec::with_capacity(no_advancing);
    for (i, &k) in order.iter().enumerate() {
        let eliminated = i >= no_advancing;
        let gap = if i == 0 {
            0.0
        } else if best_laps[k].is_finite() && leader_lap.is_finite() {
            best_laps[k] - leader_lap
        } else {
            f64::INFINITY
        };
        if !eliminated {
            advancing.push(remaining[k]);
        }
        results.push(QualifyingResult {
            position: i as u32 + 1,
            driver_id: entrants[remaining[k]].driver_id.to_owned(),
            best_lap: best_laps[k],
            gap,
            eliminated,
            eliminated_in: if eliminated { Some(session) } else { None },
        });
    }
    (results, advancing)
}

/// run_knockout plays Q1, Q2 and Q3 for the given participants and returns all session results
/// plus the final grid.
pub fn run_knockout<R: Rng + ?Sized>(
    participants: &[String],
    weather: &WeatherCondition,
    track: &Track,
    roster: &Roster,
    cfg: &QualifyingConfig,
    rng: &mut R,
) -> Result<QualifyingOutcome> {
    let mut qualifying = Qualifying::new(participants, weather, track, roster, cfg)?;
    while qualifying.run_next_session(rng).is_some() {}
    let outcome = qualifying.into_outcome()?;
    if let Some(pole) = outcome.pole_position() {
        info!("Pole position: {} ({:.3}s)", pole.driver_id, pole.best_lap / 1000.0);
    }
    Ok(outcome)
}
