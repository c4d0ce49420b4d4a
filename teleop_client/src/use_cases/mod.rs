pub mod client;
pub mod status_board;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::UnifiedClient;
pub use status_board::StatusBoard;
