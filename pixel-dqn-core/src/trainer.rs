//! Train [`Agent`] episode by episode.
mod config;
use crate::{
    record::{Record, RecordValue::Scalar, Recorder},
    Agent, Env, MemoryCategory, ObsFilter, Transition,
};
use anyhow::Result;
pub use config::TrainerConfig;
use log::{debug, info};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::path::Path;

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Manages the episodic training loop.
///
/// # Training loop
///
/// 1. Build the environment with [`TrainerConfig::seed`].
/// 2. For each episode:
///     1. Reset the environment, observe and filter the first state `o_0`.
///     2. At every decision tick `t`, the agent samples `a_t`, the environment applies
///        it and reports `(frame, r_t, is_done)`; the frame is filtered into `o_t+1`
///        and the transition `(o_t, a_t, r_t, o_t+1, is_done)` is stored in the
///        agent's replay memory. The category is `Random` with probability
///        [`TrainerConfig::random_rate`] and `Default` otherwise.
///     3. The episode ends when `is_done` is reported or after
///        [`TrainerConfig::max_steps_per_episode`] ticks.
///     4. If the return of the episode is the best so far and
///        [`TrainerConfig::remember_best`] is set, the transitions of the episode are
///        also stored in the `Best` category.
///     5. [`Agent::replay`] then [`Agent::target_train`].
///     6. A record with `episode`, `return` and `steps`, merged with the record of the
///        replay step, is written to the recorder.
///
/// # Interaction of objects
///
/// ```mermaid
/// graph LR
///     A[Agent]-->|DiscreteAct|B[Env]
///     B -->|Frame, reward, done|C[ObsFilter]
///     C -->|State|A
///     A -->|Transition|D[ReplayMemory]
///     D -->|batch|A
/// ```
pub struct Trainer<E, F>
where
    E: Env,
    F: ObsFilter<E::Obs>,
{
    env_config: E::Config,
    obs_filter: F,
    config: TrainerConfig,
    rng: SmallRng,
}

impl<E, F> Trainer<E, F>
where
    E: Env,
    F: ObsFilter<E::Obs>,
    F::Output: Clone,
{
    /// Constructs a trainer.
    pub fn build(config: TrainerConfig, env_config: E::Config, obs_filter: F) -> Result<Self> {
        config.validate()?;
        let rng = SmallRng::seed_from_u64(config.seed as u64);

        Ok(Self {
            env_config,
            obs_filter,
            config,
            rng,
        })
    }

    fn category(&mut self) -> MemoryCategory {
        if self.config.random_rate > 0.0 && self.rng.gen::<f64>() < self.config.random_rate {
            MemoryCategory::Random
        } else {
            MemoryCategory::Default
        }
    }

    fn save_model<A: Agent<F::Output>>(agent: &A, model_dir: &Path) -> Result<()> {
        agent.save_params(model_dir)?;
        info!("Saved the model in {:?}", model_dir);
        Ok(())
    }

    /// Runs an episode, storing its transitions in the agent's memory.
    ///
    /// Returns the return of the episode and, if `keep` is `true`, its transitions.
    fn run_episode<A>(
        &mut self,
        env: &mut E,
        agent: &mut A,
        keep: bool,
    ) -> Result<(f32, usize, Vec<Transition<F::Output>>)>
    where
        A: Agent<F::Output>,
    {
        env.reset()?;
        let init = env.observe()?;
        let mut obs = self.obs_filter.filt(init.obs)?;
        let mut kept = vec![];
        let mut ret = 0f32;
        let mut steps = 0;

        loop {
            let act = agent.sample(&obs)?;
            env.apply(&act)?;
            let observation = env.observe()?;
            let next_obs = self.obs_filter.filt(observation.obs)?;
            steps += 1;
            ret += observation.reward;

            let tr = Transition::new(
                obs,
                act,
                observation.reward,
                next_obs.clone(),
                observation.is_done,
            );
            if keep {
                kept.push(tr.clone());
            }
            let category = self.category();
            agent.remember(category, tr);
            obs = next_obs;

            if observation.is_done {
                break;
            }
            if steps >= self.config.max_steps_per_episode {
                debug!("Episode truncated after {} steps", steps);
                break;
            }
        }

        Ok((ret, steps, kept))
    }

    /// Train the agent.
    pub fn train<A>(&mut self, agent: &mut A, recorder: &mut dyn Recorder) -> Result<()>
    where
        A: Agent<F::Output>,
    {
        let mut env = E::build(&self.env_config, self.config.seed)?;
        let mut best_return = f32::MIN;
        agent.train();

        for episode in 0..self.config.max_episodes {
            let keep = self.config.remember_best;
            let (ret, steps, transitions) = self.run_episode(&mut env, agent, keep)?;

            let is_best = ret > best_return;
            if is_best {
                best_return = ret;
                for tr in transitions {
                    agent.remember(MemoryCategory::Best, tr);
                }
            }

            let mut record = Record::from_slice(&[
                ("episode", Scalar(episode as f32)),
                ("return", Scalar(ret)),
                ("steps", Scalar(steps as f32)),
            ]);
            if let Some(r) = agent.replay()? {
                record.merge_inplace(r);
            }
            agent.target_train()?;

            info!(
                "Episode {}: return = {:.3}, steps = {}{}",
                episode,
                ret,
                steps,
                if is_best { " (best)" } else { "" }
            );

            if let Some(model_dir) = &self.config.model_dir {
                let model_dir = Path::new(model_dir);
                if is_best {
                    Self::save_model(agent, &model_dir.join("best"))?;
                }
                if (episode + 1) % self.config.save_interval == 0 {
                    Self::save_model(agent, &model_dir.join(format!("{}", episode + 1)))?;
                }
            }

            recorder.write(record);
        }
        recorder.flush();

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        dummy::{DummyEnv, DummyEnvConfig, IdentityFilter},
        record::BufferedRecorder,
        DiscreteAct, Policy,
    };

    /// Always moves right and counts calls.
    #[derive(Default)]
    struct CountingAgent {
        remembered: Vec<(MemoryCategory, Transition<Vec<f32>>)>,
        n_replays: usize,
        n_target_trains: usize,
    }

    impl Policy<Vec<f32>> for CountingAgent {
        fn sample(&mut self, _obs: &Vec<f32>) -> Result<DiscreteAct> {
            Ok(DiscreteAct::new(2))
        }
    }

    impl Agent<Vec<f32>> for CountingAgent {
        fn train(&mut self) {}

        fn eval(&mut self) {}

        fn is_train(&self) -> bool {
            true
        }

        fn remember(&mut self, category: MemoryCategory, transition: Transition<Vec<f32>>) {
            self.remembered.push((category, transition));
        }

        fn replay(&mut self) -> Result<Option<Record>> {
            self.n_replays += 1;
            Ok(Some(Record::from_scalar("loss", 0.0)))
        }

        fn target_train(&mut self) -> Result<()> {
            self.n_target_trains += 1;
            Ok(())
        }

        fn save_params(&self, _path: &Path) -> Result<()> {
            Ok(())
        }

        fn load_params(&mut self, _path: &Path) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_episode_boundaries() -> Result<()> {
        let config = TrainerConfig::default().max_episodes(3);
        let env_config = DummyEnvConfig { length: 4 };
        let mut trainer = Trainer::<DummyEnv, _>::build(config, env_config, IdentityFilter)?;
        let mut agent = CountingAgent::default();
        let mut recorder = BufferedRecorder::new();

        trainer.train(&mut agent, &mut recorder)?;

        assert_eq!(agent.n_replays, 3);
        assert_eq!(agent.n_target_trains, 3);
        assert_eq!(recorder.len(), 3);

        // Every episode has the same return, so only the first one is the best.
        let n_best = agent
            .remembered
            .iter()
            .filter(|(c, _)| *c == MemoryCategory::Best)
            .count();
        assert_eq!(n_best, 4);
        let n_default = agent
            .remembered
            .iter()
            .filter(|(c, _)| *c == MemoryCategory::Default)
            .count();
        assert_eq!(n_default, 12);

        let record = recorder.iter().next().unwrap();
        assert_eq!(record.get_scalar("return")?, 4.0);
        assert_eq!(record.get_scalar("steps")?, 4.0);
        assert_eq!(record.get_scalar("loss")?, 0.0);
        Ok(())
    }

    #[test]
    fn test_transitions_chain_and_terminate() -> Result<()> {
        let config = TrainerConfig::default()
            .max_episodes(1)
            .remember_best(false);
        let env_config = DummyEnvConfig { length: 3 };
        let mut trainer = Trainer::<DummyEnv, _>::build(config, env_config, IdentityFilter)?;
        let mut agent = CountingAgent::default();

        trainer.train(&mut agent, &mut crate::record::NullRecorder::default())?;

        let trs: Vec<_> = agent.remembered.iter().map(|(_, tr)| tr).collect();
        assert_eq!(trs.len(), 3);
        for w in trs.windows(2) {
            assert_eq!(w[0].next_obs, w[1].obs);
        }
        assert!(!trs[0].is_done && !trs[1].is_done && trs[2].is_done);
        assert_eq!(trs[2].next_obs, vec![3.0]);
        assert_eq!(trs[2].reward, 1.0);
        Ok(())
    }

    #[test]
    fn test_truncation() -> Result<()> {
        let config = TrainerConfig::default()
            .max_episodes(1)
            .max_steps_per_episode(2)
            .random_rate(1.0);
        let env_config = DummyEnvConfig { length: 10 };
        let mut trainer = Trainer::<DummyEnv, _>::build(config, env_config, IdentityFilter)?;
        let mut agent = CountingAgent::default();

        trainer.train(&mut agent, &mut crate::record::NullRecorder::default())?;

        let random: Vec<_> = agent
            .remembered
            .iter()
            .filter(|(c, _)| *c == MemoryCategory::Random)
            .collect();
        assert_eq!(random.len(), 2);
        assert!(random.iter().all(|(_, tr)| !tr.is_done));
        Ok(())
    }
}
