use anyhow::Result;
use candle_core::Device;
use clap::Parser;
use log::info;
use reinforce_candle_agent::{
    mlp::{Mlp, MlpConfig},
    reinforce::{Reinforce, ReinforceConfig},
};
use reinforce_cartpole_env::{CartPoleConfig, CartPoleEnv};
use reinforce_core::{
    record::AggregateRecorder, Agent, Configurable, DefaultEvaluator, Env as _, Evaluator as _,
    Trainer, TrainerConfig,
};
use reinforce_tensorboard::TensorboardRecorder;
use serde::Serialize;
use std::{fs, path::Path};

const DIM_OBS: usize = 4;
const DIM_ACT: usize = 2;
const LR: f64 = 0.01;
const DISCOUNT_RATE: f64 = 0.99;
const UNITS: [usize; 1] = [64];
const MAX_EPISODES: usize = 1000;
const MAX_EPISODE_STEPS: usize = 500;
const EVAL_INTERVAL: usize = 50;
const N_EPISODES_PER_EVAL: usize = 5;
const ROLLING_SCORE_WINDOW: usize = 100;
const SCORE_REQUIRED_TO_WIN: f32 = 475.0;
const SEED: u64 = 42;
const MODEL_DIR: &str = "./reinforce/examples/model/reinforce_cartpole";

type Env = CartPoleEnv;
type Agent_ = Reinforce<Env, Mlp>;
type Evaluator = DefaultEvaluator<Env>;

mod config {
    use super::*;

    #[derive(Serialize)]
    pub struct ReinforceCartpoleConfig {
        pub env_config: CartPoleConfig,
        pub agent_config: ReinforceConfig<MlpConfig>,
        pub trainer_config: TrainerConfig,
    }

    impl ReinforceCartpoleConfig {
        pub fn new(max_episodes: usize, model_dir: &str, eval_interval: usize) -> Self {
            let trainer_config = TrainerConfig::default()
                .max_episodes(max_episodes)
                .eval_interval(eval_interval)
                .flush_record_interval(10)
                .save_interval(eval_interval)
                .rolling_score_window(ROLLING_SCORE_WINDOW)
                .score_required_to_win(SCORE_REQUIRED_TO_WIN)
                .model_dir(model_dir);
            Self {
                env_config: create_env_config(),
                agent_config: create_agent_config(DIM_OBS, DIM_ACT),
                trainer_config,
            }
        }
    }

    pub fn create_env_config() -> CartPoleConfig {
        CartPoleConfig::default().max_episode_steps(MAX_EPISODE_STEPS)
    }

    pub fn create_agent_config(in_dim: usize, out_dim: usize) -> ReinforceConfig<MlpConfig> {
        let device = Device::cuda_if_available(0).unwrap_or(Device::Cpu);
        let policy_config = MlpConfig::policy(in_dim, UNITS.to_vec(), out_dim);
        ReinforceConfig::default()
            .policy_config(policy_config)
            .learning_rate(LR)
            .discount_rate(DISCOUNT_RATE)
            .device(device)
            .seed(SEED)
    }
}

use config::{create_agent_config, create_env_config, ReinforceCartpoleConfig};

/// Train/eval REINFORCE agent in cartpole environment
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Train REINFORCE agent, not evaluate
    #[arg(short, long, default_value_t = false)]
    train: bool,

    /// Evaluate REINFORCE agent, not train
    #[arg(short, long, default_value_t = false)]
    eval: bool,
}

fn save_config(config: &ReinforceCartpoleConfig, model_dir: &str) -> Result<()> {
    fs::create_dir_all(model_dir)?;
    let path = Path::new(model_dir).join("config.yaml");
    fs::write(&path, serde_yaml::to_string(config)?)?;
    info!("Save config into {:?}", path);
    Ok(())
}

fn train(max_episodes: usize, model_dir: &str, eval_interval: usize) -> Result<()> {
    let config = ReinforceCartpoleConfig::new(max_episodes, model_dir, eval_interval);
    save_config(&config, model_dir)?;
    let mut recorder: Box<dyn AggregateRecorder> = Box::new(TensorboardRecorder::new(model_dir));
    let mut trainer = Trainer::build(config.trainer_config.clone());

    let env = Env::build(&config.env_config, SEED as _)?;
    let mut agent = Agent_::build(config.agent_config)?;
    let mut evaluator = Evaluator::new(&config.env_config, SEED as i64 + 1, N_EPISODES_PER_EVAL)?;

    let results = trainer.train(env, &mut agent, &mut recorder, &mut evaluator)?;

    match results.solved_at_episode {
        Some(episode) => info!("Solved at episode {}", episode),
        None => info!("Not solved in {} episodes", results.n_episodes()),
    }
    info!(
        "Max episode return = {}, max rolling return = {:.2}, time taken = {:?}",
        results.max_episode_score, results.max_rolling_score, results.time_taken
    );

    Ok(())
}

fn eval(model_dir: &str) -> Result<()> {
    let mut agent = {
        let mut agent = Agent_::build(create_agent_config(DIM_OBS, DIM_ACT))?;
        agent.load_params(Path::new(model_dir))?;
        agent.eval();
        agent
    };

    let record = Evaluator::new(&create_env_config(), 0, N_EPISODES_PER_EVAL)?.evaluate(&mut agent)?;
    info!("{:?}", record);

    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.train {
        train(MAX_EPISODES, MODEL_DIR, EVAL_INTERVAL)?;
    } else if args.eval {
        eval(&(MODEL_DIR.to_owned() + "/best"))?;
    } else {
        train(MAX_EPISODES, MODEL_DIR, EVAL_INTERVAL)?;
        eval(&(MODEL_DIR.to_owned() + "/best"))?;
    }

    Ok(())
}
