use anyhow::Result;
use reinforce_candle_agent::{
    mlp::{Mlp, MlpConfig},
    reinforce::{Reinforce, ReinforceConfig, ReturnMode},
};
use reinforce_cartpole_env::{CartPoleConfig, CartPoleEnv, CartPoleObs};
use reinforce_core::{
    record::{AggregateRecorder, BufferedRecorder, NullRecorder},
    Agent, Configurable, DefaultEvaluator, Env, Trainer, TrainerConfig,
};
use tempdir::TempDir;

type Agent_ = Reinforce<CartPoleEnv, Mlp>;

fn agent_config(seed: u64) -> ReinforceConfig<MlpConfig> {
    ReinforceConfig::default()
        .policy_config(MlpConfig::policy(4, vec![16], 2))
        .learning_rate(0.01)
        .discount_rate(0.99)
        .seed(seed)
}

fn env_config() -> CartPoleConfig {
    CartPoleConfig::default().max_episode_steps(50)
}

#[test]
fn test_train_cartpole() -> Result<()> {
    let env = CartPoleEnv::build(&env_config(), 0)?;
    let mut agent = Agent_::build(agent_config(0))?;
    let mut evaluator = DefaultEvaluator::<CartPoleEnv>::new(&env_config(), 1, 2)?;
    let mut recorder: Box<dyn AggregateRecorder> = Box::new(NullRecorder::new());
    let mut trainer = Trainer::build(TrainerConfig::default().max_episodes(20).eval_interval(10));

    let results = trainer.train(env, &mut agent, &mut recorder, &mut evaluator)?;

    assert_eq!(results.n_episodes(), 20);
    assert_eq!(agent.n_opts(), 20);
    assert!(agent.is_train());
    assert!(results
        .episode_scores
        .iter()
        .all(|&s| s >= 1.0 && s <= 50.0));
    assert!(results.max_episode_score >= results.max_rolling_score);
    Ok(())
}

#[test]
fn test_reward_to_go_training() -> Result<()> {
    let env = CartPoleEnv::build(&env_config(), 0)?;
    let mut agent = Agent_::build(agent_config(0).return_mode(ReturnMode::RewardToGo))?;
    let mut evaluator = DefaultEvaluator::<CartPoleEnv>::new(&env_config(), 1, 1)?;
    let mut recorder: Box<dyn AggregateRecorder> = Box::new(BufferedRecorder::new());
    let mut trainer = Trainer::build(TrainerConfig::default().max_episodes(5));

    let results = trainer.train(env, &mut agent, &mut recorder, &mut evaluator)?;

    assert_eq!(results.n_episodes(), 5);
    assert_eq!(agent.n_opts(), 5);
    Ok(())
}

#[test]
fn test_save_and_load_params() -> Result<()> {
    let tmp_dir = TempDir::new("reinforce_params")?;
    let obs = CartPoleObs([0.01, -0.02, 0.03, 0.04]);

    let agent1 = Agent_::build(agent_config(1))?;
    agent1.save_params(tmp_dir.path())?;
    assert!(tmp_dir.path().join("policy.safetensors").is_file());

    let mut agent2 = Agent_::build(agent_config(2))?;
    agent2.load_params(tmp_dir.path())?;

    let probs1 = agent1.action_probs(&obs)?;
    let probs2 = agent2.action_probs(&obs)?;
    for (p1, p2) in probs1.iter().zip(probs2.iter()) {
        assert!((p1 - p2).abs() < 1e-6);
    }
    Ok(())
}

#[test]
fn test_invalid_config_is_rejected() {
    assert!(Agent_::build(agent_config(0).discount_rate(1.1)).is_err());
    assert!(Agent_::build(agent_config(0).learning_rate(0.0)).is_err());
    assert!(Agent_::build(ReinforceConfig::default()).is_err());
}

#[test]
fn test_build_from_yaml() -> Result<()> {
    let tmp_dir = TempDir::new("reinforce_config")?;
    let path = tmp_dir.path().join("agent.yaml");
    agent_config(3).save(&path)?;

    let mut agent = Agent_::build_from_path(&path)?;
    agent.eval();
    let mut env = CartPoleEnv::build(&env_config(), 0)?;
    let obs = env.reset()?;
    let act = reinforce_core::Policy::sample(&mut agent, &obs)?;
    assert!(act.0 < 2);
    Ok(())
}
