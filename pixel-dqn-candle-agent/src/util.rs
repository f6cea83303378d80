//! Utilities.
use anyhow::{anyhow, Result};
use candle_core::{Tensor, Var};
use candle_nn::VarMap;
use log::trace;
use ordered_float::OrderedFloat;
use pixel_dqn_core::error::PixelDqnError;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::MutexGuard,
};
mod named_tensors;
pub use named_tensors::NamedTensors;

/// Critic loss type.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy, Default)]
pub enum CriticLoss {
    /// Mean squared error.
    Mse,

    /// Smooth L1 loss, i.e., the Huber loss with threshold 1.
    #[default]
    SmoothL1,
}

impl CriticLoss {
    /// Mean of the elementwise loss between `x` and `y`.
    pub fn compute(&self, x: &Tensor, y: &Tensor) -> Result<Tensor, candle_core::Error> {
        match self {
            Self::Mse => candle_nn::loss::mse(x, y),
            Self::SmoothL1 => smooth_l1_loss(x, y),
        }
    }
}

/// Interface for handling output dimensions.
pub trait OutDim {
    /// Returns the output dimension.
    fn get_out_dim(&self) -> usize;

    /// Sets the  output dimension.
    fn set_out_dim(&mut self, v: usize);
}

/// Locks the variables of a [`VarMap`].
pub(crate) fn lock_vars(varmap: &VarMap) -> Result<MutexGuard<'_, HashMap<String, Var>>> {
    varmap
        .data()
        .lock()
        .map_err(|_| anyhow!("The variables of the model are poisoned"))
}

/// Path of the temporary file written before renaming it to `path`.
pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(".tmp");
    PathBuf::from(s)
}

/// Apply soft update on variables.
///
/// Variables are identified by their names.
///
/// dest = tau * src + (1.0 - tau) * dest
///
/// All updated tensors are computed before any variable is written, so `dest` is left
/// untouched if `src` does not match it.
pub fn track(dest: &VarMap, src: &NamedTensors, tau: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&tau) {
        return Err(PixelDqnError::InvalidInput(format!("tau must be in [0, 1], got {}", tau)).into());
    }
    let dest = lock_vars(dest)?;
    src.check_compatible(&dest)?;

    let mut updated = Vec::with_capacity(dest.len());
    for (name, v_dest) in dest.iter() {
        let t_dest = v_dest.as_tensor();
        let t_src = src.get(name)?.to_device(t_dest.device())?;
        let t = ((tau * &t_src)? + ((1.0 - tau) * t_dest)?)?;
        updated.push((v_dest, t));
    }
    for (v_dest, t) in updated {
        v_dest.set(&t)?;
    }
    trace!("Soft update of {} variables with tau = {}", dest.len(), tau);

    Ok(())
}

/// Huber loss with threshold 1, averaged over all elements.
///
/// See <https://pytorch.org/docs/stable/generated/torch.nn.SmoothL1Loss.html>.
pub fn smooth_l1_loss(x: &Tensor, y: &Tensor) -> Result<Tensor, candle_core::Error> {
    let d = (x - y)?.abs()?;
    let quad = d.minimum(1f32)?;
    ((quad.sqr()? * 0.5)? + (&d - &quad)?)?.mean_all()
}

/// Index of the largest value, the lowest index on ties.
pub fn argmax(values: &[f32]) -> Result<usize> {
    check_finite(values, "action values")?;
    if values.is_empty() {
        return Err(PixelDqnError::InvalidInput("no action values".into()).into());
    }
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    Ok(best)
}

/// The largest value.
pub fn max_value(values: &[f32]) -> Result<f32> {
    check_finite(values, "action values")?;
    values
        .iter()
        .copied()
        .map(OrderedFloat)
        .max()
        .map(|v| v.into_inner())
        .ok_or_else(|| PixelDqnError::InvalidInput("no action values".into()).into())
}

/// Fails with [`PixelDqnError::Numerical`] if `values` holds NaN or an infinity.
pub fn check_finite(values: &[f32], what: &str) -> Result<(), PixelDqnError> {
    match values.iter().position(|v| !v.is_finite()) {
        None => Ok(()),
        Some(i) => Err(PixelDqnError::Numerical(format!(
            "{} at index {} is {}",
            what, i, values[i]
        ))),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::Init;

    fn varmap_with(name: &str, values: &[f32]) -> Result<VarMap> {
        let vm = VarMap::new();
        let init = Init::Randn {
            mean: 0.0,
            stdev: 1.0,
        };
        vm.get((values.len(),), name, init, DType::F32, &Device::Cpu)?;
        let t = Tensor::from_slice(values, (values.len(),), &Device::Cpu)?;
        lock_vars(&vm)?.get(name).unwrap().set(&t)?;
        Ok(vm)
    }

    fn values_of(vm: &VarMap, name: &str) -> Result<Vec<f32>> {
        Ok(lock_vars(vm)?.get(name).unwrap().as_tensor().to_vec1()?)
    }

    #[test]
    fn test_track() -> Result<()> {
        let vm_src = varmap_with("var1", &[1.0, 2.0, 3.0])?;
        let vm_dest = varmap_with("var1", &[4.0, 5.0, 6.0])?;
        let src = NamedTensors::copy_from(&vm_src)?;

        track(&vm_dest, &src, 0.5)?;
        assert_eq!(values_of(&vm_dest, "var1")?, vec![2.5, 3.5, 4.5]);
        Ok(())
    }

    #[test]
    fn test_track_extremes() -> Result<()> {
        let vm_src = varmap_with("var1", &[1.0, 2.0, 3.0])?;
        let vm_dest = varmap_with("var1", &[4.0, 5.0, 6.0])?;
        let src = NamedTensors::copy_from(&vm_src)?;

        track(&vm_dest, &src, 0.0)?;
        assert_eq!(values_of(&vm_dest, "var1")?, vec![4.0, 5.0, 6.0]);

        track(&vm_dest, &src, 1.0)?;
        assert_eq!(values_of(&vm_dest, "var1")?, vec![1.0, 2.0, 3.0]);

        assert!(track(&vm_dest, &src, 1.5).is_err());
        Ok(())
    }

    #[test]
    fn test_track_rejects_mismatch() -> Result<()> {
        let vm_src = varmap_with("var2", &[1.0, 2.0, 3.0])?;
        let vm_dest = varmap_with("var1", &[4.0, 5.0, 6.0])?;
        let src = NamedTensors::copy_from(&vm_src)?;

        assert!(track(&vm_dest, &src, 0.5).is_err());
        assert_eq!(values_of(&vm_dest, "var1")?, vec![4.0, 5.0, 6.0]);
        Ok(())
    }

    #[test]
    fn test_smooth_l1_loss() -> Result<()> {
        let x = Tensor::from_slice(&[0.0f32, 0.0, 0.0, 0.0], (1, 4), &Device::Cpu)?;
        let y = Tensor::from_slice(&[0.5f32, -0.5, 3.0, -2.0], (1, 4), &Device::Cpu)?;
        let loss = smooth_l1_loss(&x, &y)?.to_scalar::<f32>()?;
        // 0.125 + 0.125 + 2.5 + 1.5
        assert!((loss - 4.25 / 4.0).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_argmax_ties() -> Result<()> {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, 2.0])?, 1);
        assert_eq!(argmax(&[0.0, 0.0])?, 0);
        assert_eq!(max_value(&[-1.0, -3.0])?, -1.0);
        assert!(argmax(&[]).is_err());
        assert!(argmax(&[0.0, f32::NAN]).is_err());
        Ok(())
    }
}
