//! Write path: synthetic generation and duration derivation

pub mod duration;
pub mod generator;

pub use duration::{derive, DurationStrategy};
pub use generator::{GeneratorConfig, LogGenerator};
