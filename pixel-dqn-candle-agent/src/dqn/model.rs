use crate::{
    model::SubModel1,
    opt::{Optimizer, OptimizerConfig},
    util::{check_finite, track, tmp_path, CriticLoss, NamedTensors, OutDim},
};
use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use log::info;
use pixel_dqn_core::{error::PixelDqnError, ValueApproximator};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufReader, Write},
    path::Path,
};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`DqnModel`].
pub struct DqnModelConfig<Q>
where
    Q: OutDim,
{
    pub(super) q_config: Option<Q>,
    pub(super) opt_config: OptimizerConfig,
    #[serde(default)]
    pub(super) critic_loss: CriticLoss,
}

impl<Q> Default for DqnModelConfig<Q>
where
    Q: OutDim,
{
    fn default() -> Self {
        Self {
            q_config: None,
            opt_config: OptimizerConfig::default(),
            critic_loss: CriticLoss::default(),
        }
    }
}

impl<Q> DqnModelConfig<Q>
where
    Q: DeserializeOwned + Serialize + OutDim,
{
    /// Sets configurations for action-value function.
    pub fn q_config(mut self, v: Q) -> Self {
        self.q_config = Some(v);
        self
    }

    /// Sets output dimension of the model.
    pub fn out_dim(mut self, v: usize) -> Self {
        match &mut self.q_config {
            None => {}
            Some(q_config) => q_config.set_out_dim(v),
        };
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Sets the loss between predictions and targets.
    pub fn critic_loss(mut self, v: CriticLoss) -> Self {
        self.critic_loss = v;
        self
    }

    /// Constructs [`DqnModelConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`DqnModelConfig`] to as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Action-value function with its own variables and optimizer.
///
/// The input is a single state with a leading batch dimension of 1, e.g., a
/// `(1, 1, H, W)` tensor converted from a downsampled frame.
pub struct DqnModel<Q>
where
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim,
{
    device: Device,
    varmap: VarMap,

    // Dimension of the output vector (equal to the number of actions).
    n_actions: usize,

    // Action-value function
    q: Q,

    // Optimizer
    opt: Optimizer,
    critic_loss: CriticLoss,
}

impl<Q> DqnModel<Q>
where
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    /// Constructs [`DqnModel`] with freshly initialized variables.
    pub fn build(config: DqnModelConfig<Q::Config>, device: Device) -> Result<Self> {
        let q_config = config.q_config.context("q_config is not set.")?;
        let n_actions = q_config.get_out_dim();
        if n_actions == 0 {
            return Err(PixelDqnError::Config("The number of actions must be positive".into()).into());
        }
        let varmap = VarMap::new();
        let q = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
            Q::build(vb, q_config)?
        };
        let opt = config.opt_config.build(varmap.all_vars())?;

        Ok(Self {
            device,
            varmap,
            n_actions,
            q,
            opt,
            critic_loss: config.critic_loss,
        })
    }

    /// Outputs the action-value given observation(s).
    pub fn forward(&self, obs: &Tensor) -> Result<Tensor> {
        self.q.forward(obs)
    }

    /// The variables of the model.
    pub fn get_varmap(&self) -> &VarMap {
        &self.varmap
    }

    fn check_target(&self, target: &[f32]) -> Result<()> {
        if target.len() != self.n_actions {
            return Err(PixelDqnError::InvalidInput(format!(
                "Target has {} values, expected {}",
                target.len(),
                self.n_actions
            ))
            .into());
        }
        Ok(())
    }

    /// A gradient step towards `tgt`. The step is skipped if the loss is not finite.
    fn step(&mut self, x: &Tensor, tgt: &Tensor) -> Result<f32> {
        let pred = self.q.forward(x)?;
        let loss = self.critic_loss.compute(&pred, tgt)?;
        let v = loss.to_scalar::<f32>()?;
        check_finite(&[v], "loss")?;
        self.opt.backward_step(&loss)?;
        Ok(v)
    }
}

impl<Q> ValueApproximator for DqnModel<Q>
where
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    type Input = Tensor;
    type Params = NamedTensors;

    fn n_actions(&self) -> usize {
        self.n_actions
    }

    fn predict(&self, x: &Tensor) -> Result<Vec<f32>> {
        let values = self.q.forward(x)?.flatten_all()?.to_vec1::<f32>()?;
        if values.len() != self.n_actions {
            return Err(PixelDqnError::InvalidInput(format!(
                "Expected a single state, got {} action values",
                values.len()
            ))
            .into());
        }
        Ok(values)
    }

    fn train_step(&mut self, x: &Tensor, target: &[f32]) -> Result<f32> {
        self.check_target(target)?;
        let tgt = Tensor::from_slice(target, (1, self.n_actions), &self.device)?;
        self.step(x, &tgt)
    }

    /// One gradient step on the mean loss of the batch.
    fn train_batch(&mut self, xs: &[Tensor], targets: &[Vec<f32>]) -> Result<f32> {
        if xs.is_empty() {
            return Ok(0.0);
        }
        if xs.len() != targets.len() {
            return Err(PixelDqnError::InvalidInput(format!(
                "{} inputs and {} targets",
                xs.len(),
                targets.len()
            ))
            .into());
        }
        for t in targets.iter() {
            self.check_target(t)?;
        }
        let x = Tensor::cat(xs, 0)?;
        let tgt = Tensor::from_vec(targets.concat(), (xs.len(), self.n_actions), &self.device)?;
        self.step(&x, &tgt)
    }

    fn soft_update(&mut self, src: &NamedTensors, tau: f64) -> Result<()> {
        track(&self.varmap, src, tau)
    }

    fn get_parameters(&self) -> Result<NamedTensors> {
        NamedTensors::copy_from(&self.varmap)
    }

    fn set_parameters(&mut self, params: &NamedTensors) -> Result<()> {
        params.copy_to(&self.varmap)
    }

    /// Writes the variables in safetensors format.
    ///
    /// The file is written next to `path` and renamed into place.
    fn save(&self, path: &Path) -> Result<()> {
        let tmp = tmp_path(path);
        let tensors = self.get_parameters()?.to_device(&Device::Cpu)?;
        candle_core::safetensors::save(&tensors, &tmp)
            .map_err(|e| PixelDqnError::storage(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| PixelDqnError::storage(path, e))?;
        info!("Save dqnmodel to {:?}", path);
        Ok(())
    }

    /// Reads variables written by [`DqnModel::save`].
    ///
    /// Every tensor is checked against the variables of the model before any of them
    /// is overwritten.
    fn load(&mut self, path: &Path) -> Result<()> {
        let tensors = candle_core::safetensors::load(path, &self.device)
            .map_err(|e| PixelDqnError::storage(path, e))?;
        NamedTensors::from_map(tensors)
            .copy_to(&self.varmap)
            .map_err(|e| PixelDqnError::storage(path, e))?;
        info!("Load dqnmodel from {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        cnn::{Cnn, CnnConfig},
        mlp::{Mlp, MlpConfig},
    };
    use tempdir::TempDir;

    fn model() -> Result<DqnModel<Mlp>> {
        let config = DqnModelConfig::default()
            .q_config(MlpConfig::new(4, vec![8], 2, false))
            .opt_config(OptimizerConfig::Adam { lr: 0.01 });
        DqnModel::build(config, Device::Cpu)
    }

    fn input(v: [f32; 4]) -> Result<Tensor> {
        Ok(Tensor::from_slice(&v, (1, 1, 2, 2), &Device::Cpu)?)
    }

    #[test]
    fn test_predict_is_pure() -> Result<()> {
        let model = model()?;
        let x = input([1.0, 0.0, 0.5, 0.2])?;
        let y1 = model.predict(&x)?;
        let y2 = model.predict(&x)?;
        assert_eq!(y1.len(), 2);
        assert_eq!(y1, y2);
        Ok(())
    }

    #[test]
    fn test_train_step_reduces_loss() -> Result<()> {
        let mut model = model()?;
        let x = input([1.0, 0.0, 0.5, 0.2])?;
        let target = [3.0, -1.0];

        let first = model.train_step(&x, &target)?;
        let mut last = first;
        for _ in 0..50 {
            last = model.train_step(&x, &target)?;
        }
        assert!(last < first);
        assert!(model.train_step(&x, &[1.0]).is_err());
        Ok(())
    }

    #[test]
    fn test_train_batch() -> Result<()> {
        let mut model = model()?;
        let xs = vec![input([1.0, 0.0, 0.0, 0.0])?, input([0.0, 1.0, 0.0, 0.0])?];
        let targets = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let loss = model.train_batch(&xs, &targets)?;
        assert!(loss.is_finite());
        assert!(model.train_batch(&xs, &targets[..1]).is_err());
        Ok(())
    }

    fn cnn_model() -> Result<DqnModel<Cnn>> {
        let config = DqnModelConfig::default().q_config(CnnConfig::default());
        DqnModel::build(config, Device::Cpu)
    }

    fn frame_state(v: f32) -> Result<Tensor> {
        Ok((Tensor::ones((1, 1, 60, 80), DType::F32, &Device::Cpu)? * v as f64)?)
    }

    #[test]
    fn test_cnn_train_step() -> Result<()> {
        let mut model = cnn_model()?;
        let x = frame_state(128.0)?;
        let before = model.predict(&x)?;

        let loss = model.train_step(&x, &[1.0, 0.0, 0.0])?;
        assert!(loss.is_finite());
        assert_ne!(model.predict(&x)?, before);
        Ok(())
    }

    #[test]
    fn test_cnn_train_batch() -> Result<()> {
        let mut model = cnn_model()?;
        let xs = vec![frame_state(0.0)?, frame_state(64.0)?, frame_state(255.0)?];
        let targets = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]];
        let loss = model.train_batch(&xs, &targets)?;
        assert!(loss.is_finite());
        Ok(())
    }

    #[test]
    fn test_soft_update() -> Result<()> {
        let policy = model()?;
        let mut target = model()?;
        let x = input([0.3, 0.1, 0.7, 0.9])?;
        let before = target.predict(&x)?;

        target.soft_update(&policy.get_parameters()?, 0.0)?;
        assert_eq!(target.predict(&x)?, before);

        target.soft_update(&policy.get_parameters()?, 1.0)?;
        assert_eq!(target.predict(&x)?, policy.predict(&x)?);
        Ok(())
    }

    #[test]
    fn test_save_load() -> Result<()> {
        let dir = TempDir::new("dqn_model")?;
        let path = dir.path().join("qnet.safetensors");
        let x = input([0.3, 0.1, 0.7, 0.9])?;

        let saved = model()?;
        saved.save(&path)?;
        assert!(!tmp_path(&path).exists());

        let mut loaded = model()?;
        loaded.load(&path)?;
        assert_eq!(loaded.predict(&x)?, saved.predict(&x)?);
        Ok(())
    }

    #[test]
    fn test_failed_load_keeps_parameters() -> Result<()> {
        let dir = TempDir::new("dqn_model")?;
        let path = dir.path().join("qnet.safetensors");
        let other = DqnModel::<Mlp>::build(
            DqnModelConfig::default().q_config(MlpConfig::new(4, vec![16], 2, false)),
            Device::Cpu,
        )?;
        other.save(&path)?;

        let mut model = model()?;
        let x = input([0.3, 0.1, 0.7, 0.9])?;
        let before = model.predict(&x)?;

        let err = model.load(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PixelDqnError>(),
            Some(PixelDqnError::Storage { .. })
        ));
        assert_eq!(model.predict(&x)?, before);

        let err = model.load(&dir.path().join("missing.safetensors")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PixelDqnError>(),
            Some(PixelDqnError::Storage { .. })
        ));
        Ok(())
    }
}
