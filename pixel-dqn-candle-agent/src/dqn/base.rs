//! DQN agent implemented with candle.
use super::{config::DqnConfig, explorer::EpsilonGreedy, model::DqnModel, DqnModelConfig};
use crate::{
    model::SubModel1,
    util::{argmax, check_finite, max_value, tmp_path, OutDim},
};
use anyhow::Result;
use candle_core::Tensor;
use log::{debug, info, trace};
use pixel_dqn_core::{
    error::PixelDqnError,
    record::{Record, RecordValue::Scalar},
    Agent, DiscreteAct, MemoryCategory, Policy, ReplayMemory, Transition, ValueApproximator,
};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufReader, Write},
    path::Path,
};

const QNET_FILE: &str = "qnet.safetensors";
const QNET_TGT_FILE: &str = "qnet_tgt.safetensors";
const META_FILE: &str = "meta.yaml";
const FORMAT_VERSION: u32 = 1;

/// Probability of a random action in evaluation mode.
const EVAL_RANDOM_RATE: f64 = 0.01;

/// Metadata written next to the parameters by [`Agent::save_params`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct DqnMeta {
    /// Version of the layout of the saved directory.
    pub version: u32,

    /// The number of actions of the networks.
    pub n_actions: usize,

    /// Epsilon at the time of saving.
    pub epsilon: f64,
}

/// DQN agent.
///
/// Owns the policy network `qnet`, the target network `qnet_tgt` and the replay
/// memory. `qnet` is changed only by gradient steps in [`Agent::replay`] and
/// `qnet_tgt` only by soft updates in [`Agent::target_train`].
///
/// States of type `O` are converted into the input of the networks with
/// [`TryInto`], e.g., `State` into a candle [`Tensor`].
pub struct Dqn<O, V>
where
    V: ValueApproximator,
{
    qnet: V,
    qnet_tgt: V,
    memory: ReplayMemory<Transition<O>>,
    explorer: EpsilonGreedy,
    epsilon: f64,
    batch_size: usize,
    discount_factor: f32,
    tau: f64,
    batched_update: bool,
    train: bool,
    n_opts: usize,
    rng: SmallRng,
}

impl<O, V> Dqn<O, V>
where
    O: Clone + TryInto<V::Input>,
    <O as TryInto<V::Input>>::Error: std::error::Error + Send + Sync + 'static,
    V: ValueApproximator,
{
    /// Constructs DQN agent from the policy and target networks.
    ///
    /// The networks are used as given; they are not synchronized.
    pub fn build(config: DqnConfig, qnet: V, qnet_tgt: V) -> Result<Self> {
        config.validate()?;
        if qnet.n_actions() == 0 || qnet.n_actions() != qnet_tgt.n_actions() {
            return Err(PixelDqnError::Config(format!(
                "The networks have {} and {} actions",
                qnet.n_actions(),
                qnet_tgt.n_actions()
            ))
            .into());
        }
        let memory = ReplayMemory::build(&config.memory_config)?;

        Ok(Self {
            qnet,
            qnet_tgt,
            memory,
            epsilon: config.explorer.eps_start,
            explorer: config.explorer,
            batch_size: config.batch_size,
            discount_factor: config.discount_factor as f32,
            tau: config.tau,
            batched_update: config.batched_update,
            train: config.train,
            n_opts: 0,
            rng: SmallRng::seed_from_u64(config.seed),
        })
    }

    fn to_input(obs: &O) -> Result<V::Input> {
        Ok(obs.clone().try_into()?)
    }

    /// Epsilon-greedy action selection.
    ///
    /// Epsilon decays before the draw, so the first call already uses
    /// `eps_start * decay`. With epsilon at 0 the action is the argmax of the policy
    /// network, the lowest index on ties.
    pub fn act(&mut self, obs: &O) -> Result<DiscreteAct> {
        self.epsilon = self.explorer.next_eps(self.epsilon);
        if self.rng.gen::<f64>() < self.epsilon {
            Ok(self.random_act())
        } else {
            self.greedy_act(obs)
        }
    }

    fn random_act(&mut self) -> DiscreteAct {
        DiscreteAct::new(self.rng.gen_range(0..self.qnet.n_actions()))
    }

    fn greedy_act(&self, obs: &O) -> Result<DiscreteAct> {
        let values = self.qnet.predict(&Self::to_input(obs)?)?;
        Ok(DiscreteAct::new(argmax(&values)?))
    }

    /// Current value of epsilon.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Restores epsilon to its initial value.
    pub fn reset_epsilon(&mut self) {
        self.epsilon = self.explorer.eps_start;
    }

    /// The number of replays that performed gradient steps.
    pub fn n_opts(&self) -> usize {
        self.n_opts
    }

    /// The policy network.
    pub fn qnet(&self) -> &V {
        &self.qnet
    }

    /// The target network.
    pub fn qnet_tgt(&self) -> &V {
        &self.qnet_tgt
    }

    /// The replay memory.
    pub fn memory(&self) -> &ReplayMemory<Transition<O>> {
        &self.memory
    }

    /// Bellman target of a transition.
    ///
    /// The base vector is the prediction of the target network for `obs`, so only
    /// the entry of the taken action differs from it.
    fn target_vector(&self, tr: &Transition<O>) -> Result<(V::Input, Vec<f32>)> {
        let x = Self::to_input(&tr.obs)?;
        let mut target = self.qnet_tgt.predict(&x)?;
        let a = tr.act.index();
        if a >= target.len() {
            return Err(PixelDqnError::InvalidInput(format!(
                "Action {} out of {} actions",
                a,
                target.len()
            ))
            .into());
        }

        let value = if tr.is_done {
            tr.reward
        } else {
            let next = self.qnet_tgt.predict(&Self::to_input(&tr.next_obs)?)?;
            tr.reward + self.discount_factor * max_value(&next)?
        };
        target[a] = value;
        check_finite(&target, "Bellman target")?;

        Ok((x, target))
    }

    fn read_meta(path: &Path) -> Result<DqnMeta> {
        let file = File::open(path).map_err(|e| PixelDqnError::storage(path, e))?;
        let meta: DqnMeta = serde_yaml::from_reader(BufReader::new(file))
            .map_err(|e| PixelDqnError::storage(path, e))?;
        Ok(meta)
    }

    fn write_meta(&self, path: &Path) -> Result<()> {
        let meta = DqnMeta {
            version: FORMAT_VERSION,
            n_actions: self.qnet.n_actions(),
            epsilon: self.epsilon,
        };
        let tmp = tmp_path(path);
        let mut file = File::create(&tmp).map_err(|e| PixelDqnError::storage(&tmp, e))?;
        file.write_all(serde_yaml::to_string(&meta)?.as_bytes())
            .map_err(|e| PixelDqnError::storage(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| PixelDqnError::storage(path, e))?;
        Ok(())
    }
}

impl<O, Q> Dqn<O, DqnModel<Q>>
where
    O: Clone + TryInto<Tensor>,
    <O as TryInto<Tensor>>::Error: std::error::Error + Send + Sync + 'static,
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    /// Constructs DQN agent with two independently initialized [`DqnModel`]s on
    /// the device of `config`.
    pub fn build_with_model(
        config: DqnConfig,
        model_config: DqnModelConfig<Q::Config>,
    ) -> Result<Self> {
        let device: candle_core::Device = config.device.try_into()?;
        let qnet = DqnModel::build(model_config.clone(), device.clone())?;
        let qnet_tgt = DqnModel::build(model_config, device)?;
        Self::build(config, qnet, qnet_tgt)
    }
}

impl<O, V> Policy<O> for Dqn<O, V>
where
    O: Clone + TryInto<V::Input>,
    <O as TryInto<V::Input>>::Error: std::error::Error + Send + Sync + 'static,
    V: ValueApproximator,
{
    /// In training mode, [`Dqn::act`]. In evaluation mode, epsilon is left
    /// untouched and a random action is taken with probability 0.01.
    fn sample(&mut self, obs: &O) -> Result<DiscreteAct> {
        if self.train {
            self.act(obs)
        } else if self.rng.gen::<f64>() < EVAL_RANDOM_RATE {
            Ok(self.random_act())
        } else {
            self.greedy_act(obs)
        }
    }
}

impl<O, V> Agent<O> for Dqn<O, V>
where
    O: Clone + TryInto<V::Input>,
    <O as TryInto<V::Input>>::Error: std::error::Error + Send + Sync + 'static,
    V: ValueApproximator,
{
    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    fn remember(&mut self, category: MemoryCategory, transition: Transition<O>) {
        self.memory.add(category, transition);
    }

    fn replay(&mut self) -> Result<Option<Record>> {
        let pool_size = self.memory.len();
        let batch = match self.memory.sample(self.batch_size) {
            Some(batch) => batch,
            None => {
                debug!(
                    "Skip replay: {} transitions in memory, batch size {}",
                    pool_size, self.batch_size
                );
                return Ok(None);
            }
        };

        let mut xs = Vec::with_capacity(batch.len());
        let mut targets = Vec::with_capacity(batch.len());
        for tr in batch.iter() {
            let (x, target) = self.target_vector(tr)?;
            xs.push(x);
            targets.push(target);
        }

        let loss = if self.batched_update {
            self.qnet.train_batch(&xs, &targets)?
        } else {
            let mut loss = 0f32;
            for (x, target) in xs.iter().zip(targets.iter()) {
                loss += self.qnet.train_step(x, target)?;
            }
            loss / xs.len() as f32
        };
        check_finite(&[loss], "loss")?;
        self.n_opts += 1;

        Ok(Some(Record::from_slice(&[
            ("loss", Scalar(loss)),
            ("epsilon", Scalar(self.epsilon as f32)),
            ("n_opts", Scalar(self.n_opts as f32)),
            ("pool_size", Scalar(pool_size as f32)),
        ])))
    }

    fn target_train(&mut self) -> Result<()> {
        let params = self.qnet.get_parameters()?;
        self.qnet_tgt.soft_update(&params, self.tau)?;
        trace!("Soft update of the target network, tau = {}", self.tau);
        Ok(())
    }

    /// Writes `qnet.safetensors`, `qnet_tgt.safetensors` and `meta.yaml` in `path`.
    fn save_params(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(|e| PixelDqnError::storage(path, e))?;
        self.qnet.save(&path.join(QNET_FILE))?;
        self.qnet_tgt.save(&path.join(QNET_TGT_FILE))?;
        self.write_meta(&path.join(META_FILE))?;
        info!("Save DQN agent to {:?}", path);
        Ok(())
    }

    /// Reads a directory written by [`Agent::save_params`].
    ///
    /// On failure, the networks and epsilon keep their values.
    fn load_params(&mut self, path: &Path) -> Result<()> {
        let meta_path = path.join(META_FILE);
        let meta = Self::read_meta(&meta_path)?;
        if meta.version != FORMAT_VERSION {
            return Err(PixelDqnError::storage(
                &meta_path,
                anyhow::anyhow!("Unknown format version {}", meta.version),
            )
            .into());
        }
        if meta.n_actions != self.qnet.n_actions() {
            return Err(PixelDqnError::storage(
                &meta_path,
                anyhow::anyhow!(
                    "Saved model has {} actions, expected {}",
                    meta.n_actions,
                    self.qnet.n_actions()
                ),
            )
            .into());
        }

        let backup = self.qnet.get_parameters()?;
        self.qnet.load(&path.join(QNET_FILE))?;
        if let Err(e) = self.qnet_tgt.load(&path.join(QNET_TGT_FILE)) {
            self.qnet.set_parameters(&backup)?;
            return Err(e);
        }
        self.epsilon = meta.epsilon;
        info!("Load DQN agent from {:?}", path);
        Ok(())
    }
}
