use anyhow::Result;
use clap::Parser;
use log::info;
use pixel_dqn::{
    candle_agent::{
        cnn::{Cnn, CnnConfig},
        dqn::{Dqn, DqnConfig, DqnModel, DqnModelConfig},
        opt::OptimizerConfig,
    },
    core::{
        record::BufferedRecorder,
        Agent, Env as _, ObsFilter as _, Policy as _, ReplayMemoryConfig, Trainer, TrainerConfig,
    },
    corridor::{Corridor, CorridorConfig},
    frame::{FramePreprocessor, FramePreprocessorConfig, State},
};
use std::path::Path;

const N_ACTIONS: usize = 3;
const MAX_EPISODES: usize = 300;
const MAX_STEPS_PER_EPISODE: usize = 200;
const SAVE_INTERVAL: usize = 50;
const RANDOM_RATE: f64 = 0.1;
const N_EPISODES_PER_EVAL: usize = 5;
const MODEL_DIR: &str = "./pixel-dqn/examples/model/dqn_corridor";

type CorridorAgent = Dqn<State, DqnModel<Cnn>>;

/// Train/eval DQN agent in the corridor environment
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Train DQN agent, not evaluate
    #[arg(short, long, default_value_t = false)]
    train: bool,

    /// Evaluate DQN agent, not train
    #[arg(short, long, default_value_t = false)]
    eval: bool,

    /// The number of training episodes
    #[arg(long, default_value_t = MAX_EPISODES)]
    episodes: usize,

    /// Directory of the trained model
    #[arg(long, default_value_t = MODEL_DIR.to_string())]
    model_dir: String,
}

mod config {
    use super::*;

    pub struct DqnCorridorConfig {
        pub env_config: CorridorConfig,
        pub preprocessor_config: FramePreprocessorConfig,
        pub agent_config: DqnConfig,
        pub model_config: DqnModelConfig<CnnConfig>,
        pub trainer_config: TrainerConfig,
    }

    impl DqnCorridorConfig {
        pub fn new(env_config: CorridorConfig, max_episodes: usize, model_dir: &str) -> Result<Self> {
            let preprocessor_config = FramePreprocessorConfig::default();
            let [h, w] = FramePreprocessor::build(&preprocessor_config)?
                .state_shape(env_config.height, env_config.width)?;
            let model_config = create_model_config(h, w);
            let agent_config = DqnConfig::default().memory_config(ReplayMemoryConfig::default());
            let trainer_config = TrainerConfig::default()
                .max_episodes(max_episodes)
                .max_steps_per_episode(MAX_STEPS_PER_EPISODE)
                .random_rate(RANDOM_RATE)
                .save_interval(SAVE_INTERVAL)
                .model_dir(model_dir);

            Ok(Self {
                env_config,
                preprocessor_config,
                agent_config,
                model_config,
                trainer_config,
            })
        }
    }

    pub fn create_model_config(h: usize, w: usize) -> DqnModelConfig<CnnConfig> {
        let cnn_config = CnnConfig::default().in_shape([h, w]);
        DqnModelConfig::default()
            .q_config(cnn_config)
            .out_dim(N_ACTIONS)
            .opt_config(OptimizerConfig::default())
    }
}

use config::DqnCorridorConfig;

fn train(env_config: CorridorConfig, max_episodes: usize, model_dir: &str) -> Result<()> {
    let config = DqnCorridorConfig::new(env_config, max_episodes, model_dir)?;
    let preprocessor = FramePreprocessor::build(&config.preprocessor_config)?;
    let mut agent = CorridorAgent::build_with_model(config.agent_config, config.model_config)?;
    let mut recorder = BufferedRecorder::new();
    let mut trainer =
        Trainer::<Corridor, _>::build(config.trainer_config, config.env_config, preprocessor)?;

    trainer.train(&mut agent, &mut recorder)?;

    let returns = recorder
        .iter()
        .map(|r| r.get_scalar("return"))
        .collect::<Result<Vec<_>, _>>()?;
    let n = returns.len().min(10);
    if n > 0 {
        let mean = returns[returns.len() - n..].iter().sum::<f32>() / n as f32;
        info!("Mean return of the last {} episodes: {:.3}", n, mean);
    }

    Ok(())
}

fn eval(env_config: CorridorConfig, model_dir: &str) -> Result<()> {
    let config = DqnCorridorConfig::new(env_config, 0, model_dir)?;
    let mut preprocessor = FramePreprocessor::build(&config.preprocessor_config)?;
    let mut agent = CorridorAgent::build_with_model(config.agent_config, config.model_config)?;
    agent.load_params(Path::new(model_dir))?;
    agent.eval();

    let mut env = Corridor::build(&config.env_config, 1)?;
    for episode in 0..N_EPISODES_PER_EVAL {
        env.reset()?;
        let mut obs = preprocessor.filt(env.observe()?.obs)?;
        let mut ret = 0.0;
        for _ in 0..MAX_STEPS_PER_EPISODE {
            env.apply(&agent.sample(&obs)?)?;
            let o = env.observe()?;
            ret += o.reward;
            if o.is_done {
                break;
            }
            obs = preprocessor.filt(o.obs)?;
        }
        info!("Evaluation episode {}: return = {:.3}", episode, ret);
    }

    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let best_dir = Path::new(&args.model_dir).join("best");
    let best_dir = best_dir.to_string_lossy();

    if args.train {
        train(CorridorConfig::default(), args.episodes, &args.model_dir)?;
    } else if args.eval {
        eval(CorridorConfig::default(), &best_dir)?;
    } else {
        train(CorridorConfig::default(), args.episodes, &args.model_dir)?;
        eval(CorridorConfig::default(), &best_dir)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{eval, train, CorridorConfig};
    use anyhow::Result;
    use tempdir::TempDir;

    #[test]
    fn test_dqn_corridor() -> Result<()> {
        let tmp_dir = TempDir::new("dqn_corridor")?;
        let model_dir = match tmp_dir.as_ref().to_str() {
            Some(s) => s,
            None => panic!("Failed to get string of temporary directory"),
        };
        // 40x60 states, every convolution of the default network tiles its input
        let env_config = CorridorConfig::default().frame_size(400, 600, 50).length(12);
        train(env_config.clone(), 3, model_dir)?;
        eval(env_config, &(model_dir.to_owned() + "/best"))?;
        Ok(())
    }
}
