pub mod live_interface;
