pub mod bridge;
pub mod config;
pub mod console;
pub mod socket;
pub mod transport;
