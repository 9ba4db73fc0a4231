//! REINFORCE, the vanilla policy gradient algorithm, in Rust.
//!
//! The agent consists of the following crates:
//!
//! * [reinforce-core](reinforce_core) provides the traits between agents and
//!   environments, the per-episode trajectory with its discounted return,
//!   records of training metrics and the episode-driven trainer.
//! * [reinforce-candle-agent](reinforce_candle_agent) implements the agent on
//!   [candle](https://crates.io/crates/candle-core): a softmax policy network,
//!   categorical action sampling and the policy gradient update.
//! * [reinforce-cartpole-env](reinforce_cartpole_env) is the classic cart-pole
//!   task in pure Rust.
//! * [reinforce-tensorboard](reinforce_tensorboard) writes records which can be
//!   shown in Tensorboard.
//!
//! `examples/reinforce_cartpole.rs` trains the agent on cart-pole.
pub use reinforce_candle_agent;
pub use reinforce_cartpole_env;
pub use reinforce_core;
pub use reinforce_tensorboard;
