pub mod domain;
pub mod frameworks;
pub mod interface_adapters;

pub use frameworks::config::RelayConfig;
pub use frameworks::server::{run, run_until, run_with_config};
