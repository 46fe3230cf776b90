pub mod car;
pub mod driver;
pub mod handle_race;
pub mod pit_stop;
pub mod qualifying;
pub mod race;
pub mod rng;
pub mod roster;
pub mod season;
pub mod tireset;
pub mod track;
pub mod weather;
pub mod weekend;
