//! Cart-pole environment.
//!
//! A pole is attached by an unactuated joint to a cart moving along a
//! frictionless track. The agent pushes the cart to the left or to the right
//! and receives a reward of `1` for every step the pole stays upright.
//!
//! ```rust
//! use reinforce_cartpole_env::{CartPoleAct, CartPoleConfig, CartPoleEnv};
//! use reinforce_core::Env;
//!
//! let config = CartPoleConfig::default().max_episode_steps(200);
//! let mut env = CartPoleEnv::build(&config, 42).unwrap();
//! let obs = env.reset().unwrap();
//! assert!(obs.0.iter().all(|v| v.abs() <= 0.05));
//!
//! let (step, _) = env.step(&CartPoleAct(1)).unwrap();
//! assert_eq!(step.reward, 1.0);
//! ```
mod base;
mod config;
pub use base::{CartPoleAct, CartPoleEnv, CartPoleObs};
pub use config::CartPoleConfig;
