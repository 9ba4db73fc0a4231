use super::CartPoleConfig;
use anyhow::Result;
use log::{trace, warn};
use reinforce_core::{error::ReinforceError, record::Record, Act, Env, Obs, Step};

const GRAVITY: f64 = 9.8;
const MASS_CART: f64 = 1.0;
const MASS_POLE: f64 = 0.1;
const TOTAL_MASS: f64 = MASS_CART + MASS_POLE;
/// Half of the pole's length.
const LENGTH: f64 = 0.5;
const POLE_MASS_LENGTH: f64 = MASS_POLE * LENGTH;
const FORCE_MAG: f64 = 10.0;
/// Seconds between state updates.
const TAU: f64 = 0.02;
const THETA_THRESHOLD_RADIANS: f64 = 12.0 * 2.0 * std::f64::consts::PI / 360.0;
const X_THRESHOLD: f64 = 2.4;
const N_ACTIONS: usize = 2;

/// Observation of [`CartPoleEnv`]: cart position, cart velocity, pole angle
/// and pole angular velocity.
#[derive(Clone, Debug, PartialEq)]
pub struct CartPoleObs(pub [f32; 4]);

impl Obs for CartPoleObs {}

impl From<CartPoleObs> for Vec<f32> {
    fn from(obs: CartPoleObs) -> Self {
        obs.0.to_vec()
    }
}

/// Action of [`CartPoleEnv`]: `0` pushes the cart to the left, `1` to the right.
#[derive(Clone, Debug, PartialEq)]
pub struct CartPoleAct(pub usize);

impl Act for CartPoleAct {}

impl From<usize> for CartPoleAct {
    fn from(a: usize) -> Self {
        Self(a)
    }
}

/// Cart-pole environment with Euler integration of the classic dynamics.
///
/// An episode terminates when the cart leaves `[-2.4, 2.4]` or the pole
/// leans more than 12 degrees, and is truncated after
/// [`CartPoleConfig::max_episode_steps`] steps.
pub struct CartPoleEnv {
    config: CartPoleConfig,
    seed: u64,
    rng: fastrand::Rng,
    state: [f64; 4],
    n_steps: usize,
    is_done: bool,
}

impl CartPoleEnv {
    fn obs(&self) -> CartPoleObs {
        let [x, x_dot, theta, theta_dot] = self.state;
        CartPoleObs([x as f32, x_dot as f32, theta as f32, theta_dot as f32])
    }

    fn reset_state(&mut self) -> CartPoleObs {
        for v in self.state.iter_mut() {
            *v = self.rng.f64() * 0.1 - 0.05;
        }
        self.n_steps = 0;
        self.is_done = false;
        self.obs()
    }

    fn update_state(&mut self, action: usize) {
        let [x, x_dot, theta, theta_dot] = self.state;
        let force = match action {
            1 => FORCE_MAG,
            _ => -FORCE_MAG,
        };
        let cos_theta = theta.cos();
        let sin_theta = theta.sin();

        let temp = (force + POLE_MASS_LENGTH * theta_dot * theta_dot * sin_theta) / TOTAL_MASS;
        let theta_acc = (GRAVITY * sin_theta - cos_theta * temp)
            / (LENGTH * (4.0 / 3.0 - MASS_POLE * cos_theta * cos_theta / TOTAL_MASS));
        let x_acc = temp - POLE_MASS_LENGTH * theta_acc * cos_theta / TOTAL_MASS;

        self.state = [
            x + TAU * x_dot,
            x_dot + TAU * x_acc,
            theta + TAU * theta_dot,
            theta_dot + TAU * theta_acc,
        ];
    }

    fn is_terminated(&self) -> bool {
        let [x, _, theta, _] = self.state;
        x.abs() > X_THRESHOLD || theta.abs() > THETA_THRESHOLD_RADIANS
    }
}

impl Env for CartPoleEnv {
    type Config = CartPoleConfig;
    type Obs = CartPoleObs;
    type Act = CartPoleAct;
    type Info = ();

    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        let seed = seed as u64;
        Ok(Self {
            config: config.clone(),
            seed,
            rng: fastrand::Rng::with_seed(seed),
            state: [0.0; 4],
            n_steps: 0,
            is_done: false,
        })
    }

    fn reset(&mut self) -> Result<CartPoleObs> {
        Ok(self.reset_state())
    }

    /// Resets with an initial state depending only on the seed and `ix`.
    fn reset_with_index(&mut self, ix: usize) -> Result<CartPoleObs> {
        self.rng = fastrand::Rng::with_seed(self.seed.wrapping_add(ix as u64));
        Ok(self.reset_state())
    }

    fn step(&mut self, act: &CartPoleAct) -> Result<(Step<Self>, Record)> {
        let action = act.0;
        if action >= N_ACTIONS {
            return Err(ReinforceError::InvalidAction {
                action,
                n_actions: N_ACTIONS,
            }
            .into());
        }

        let reward = match self.is_done {
            true => {
                warn!("step() called after the episode ended; call reset() first");
                0.0
            }
            false => 1.0,
        };

        self.update_state(action);
        self.n_steps += 1;
        let is_terminated = self.is_terminated();
        let is_truncated = !is_terminated && self.n_steps >= self.config.max_episode_steps;
        self.is_done = self.is_done || is_terminated || is_truncated;
        trace!("CartPole step {}: {:?}", self.n_steps, self.state);

        let step = Step::new(
            self.obs(),
            act.clone(),
            reward,
            is_terminated,
            is_truncated,
            (),
        );
        Ok((step, Record::empty()))
    }
}
