pub mod championship;
pub mod race_result;
