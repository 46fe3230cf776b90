use thiserror::Error;

/// SimError covers every data-validity problem the simulator can detect. All of them are checked
/// at the entry points (qualifying, race setup, weekend transitions, season manager, standings),
/// never inside the lap loop.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("{kind} '{id}' not found in roster")]
    NotFound { kind: EntityKind, id: String },

    #[error("{kind} '{id}' is inactive and cannot take part in a simulation")]
    InactiveEntity { kind: EntityKind, id: String },

    #[error("{0} has no participants")]
    EmptyField(&'static str),

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Invalid weekend transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("Season {0} has no races left to simulate")]
    NoRacesRemaining(u32),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Driver,
    Team,
    Manufacturer,
    Track,
    Race,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            EntityKind::Driver => "Driver",
            EntityKind::Team => "Team",
            EntityKind::Manufacturer => "Manufacturer",
            EntityKind::Track => "Track",
            EntityKind::Race => "Race",
        };
        write!(f, "{}", name)
    }
}

impl SimError {
    pub fn not_found(kind: EntityKind, id: &str) -> SimError {
        SimError::NotFound {
            kind,
            id: id.to_owned(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
