//! REINFORCE agent.
mod base;
mod config;
mod model;

pub use base::Reinforce;
pub use config::{Hyperparameters, ReinforceConfig, ReturnMode};
pub use model::ReinforceModel;
