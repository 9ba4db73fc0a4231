//! Core functionalities.
mod agent;
mod env;
mod policy;
mod step;
pub use agent::Agent;
pub use env::Env;
pub use policy::{Configurable, Policy};
use std::fmt::Debug;
pub use step::{Info, Step};

/// Observation of an environment.
///
/// Vectorized environments are not supported, so an object of this trait
/// always holds the observation of a single environment.
pub trait Obs: Clone + Debug {}

/// Action of an environment.
pub trait Act: Clone + Debug {}
