// Domain layer: transport-independent relay rules.

pub mod framing;

pub use framing::{FramingError, LineFramer};
