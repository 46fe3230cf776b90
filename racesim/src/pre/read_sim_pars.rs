use crate::core::roster::{Roster, RosterPars};
use crate::core::weekend::SimConstants;
use anyhow::Context;
use std::fs::OpenOptions;
use std::path::Path;

/// read_roster_pars reads the JSON roster file and decodes it into the roster parameters struct.
pub fn read_roster_pars(filepath: &Path) -> anyhow::Result<RosterPars> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open roster file {}!",
            filepath.display()
        ))?;
    let pars = serde_json::from_reader(&fh).context(format!(
        "Failed to parse roster file {}!",
        filepath.display()
    ))?;
    Ok(pars)
}

/// read_roster reads and validates the roster.
pub fn read_roster(filepath: &Path) -> anyhow::Result<Roster> {
    let roster_pars = read_roster_pars(filepath)?;
    let roster = Roster::new(&roster_pars).context(format!(
        "Roster file {} contains invalid data!",
        filepath.display()
    ))?;
    Ok(roster)
}

/// read_sim_constants reads the simulation constants from a JSON file. Missing entries keep their
/// default values.
pub fn read_sim_constants(filepath: &Path) -> anyhow::Result<SimConstants> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open simulation constants file {}!",
            filepath.display()
        ))?;

    let pars = serde_json::from_reader(&fh).context(format!(
        "Failed to parse simulation constants file {}!",
        filepath.display()
    ))?;
    Ok(pars)
}

/// load_sim_constants returns the defaults if no constants file is given.
pub fn load_sim_constants(filepath: Option<&Path>) -> anyhow::Result<SimConstants> {
    match filepath {
        Some(filepath) => read_sim_constants(filepath),
        None => Ok(SimConstants::default()),
    }
}
