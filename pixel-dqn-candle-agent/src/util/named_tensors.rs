use super::lock_vars;
use anyhow::Result;
use candle_core::{Device, Tensor, Var};
use candle_nn::VarMap;
use pixel_dqn_core::error::PixelDqnError;
use std::collections::HashMap;

/// A snapshot of the variables of a model, keyed by their names.
///
/// The tensors are deep copies, so later updates of the source [`VarMap`] do not
/// affect the snapshot.
#[derive(Clone, Debug)]
pub struct NamedTensors {
    named_tensors: HashMap<String, Tensor>,
}

impl NamedTensors {
    /// Copies the variables of a [`VarMap`].
    pub fn copy_from(vs: &VarMap) -> Result<Self> {
        let vars = lock_vars(vs)?;
        let named_tensors = vars
            .iter()
            .map(|(k, v)| Ok((k.clone(), v.as_tensor().copy()?)))
            .collect::<Result<HashMap<_, _>>>()?;
        Ok(Self { named_tensors })
    }

    /// Wraps tensors, e.g., read from a safetensors file.
    pub fn from_map(named_tensors: HashMap<String, Tensor>) -> Self {
        Self { named_tensors }
    }

    /// Copies the snapshot into a [`VarMap`].
    ///
    /// Fails without writing anything if the names or shapes do not match.
    pub fn copy_to(&self, vs: &VarMap) -> Result<()> {
        let vars = lock_vars(vs)?;
        self.check_compatible(&vars)?;

        let mut copied = Vec::with_capacity(vars.len());
        for (name, var) in vars.iter() {
            let t = self.get(name)?.to_device(var.device())?;
            copied.push((var, t));
        }
        for (var, t) in copied {
            var.set(&t)?;
        }
        Ok(())
    }

    /// Returns the tensor of a variable.
    pub fn get(&self, name: &str) -> Result<&Tensor> {
        self.named_tensors.get(name).ok_or_else(|| {
            PixelDqnError::InvalidInput(format!("No tensor named {}", name)).into()
        })
    }

    /// The number of tensors.
    pub fn len(&self) -> usize {
        self.named_tensors.len()
    }

    /// Returns `true` if the snapshot holds no tensor.
    pub fn is_empty(&self) -> bool {
        self.named_tensors.is_empty()
    }

    /// The tensors moved to the given device.
    pub fn to_device(&self, device: &Device) -> Result<HashMap<String, Tensor>> {
        self.named_tensors
            .iter()
            .map(|(k, v)| Ok((k.clone(), v.to_device(device)?)))
            .collect()
    }

    /// Checks that the snapshot has exactly the names and shapes of `vars`.
    pub(crate) fn check_compatible(&self, vars: &HashMap<String, Var>) -> Result<()> {
        if vars.len() != self.named_tensors.len() {
            return Err(PixelDqnError::InvalidInput(format!(
                "Expected {} tensors, got {}",
                vars.len(),
                self.named_tensors.len()
            ))
            .into());
        }
        for (name, var) in vars.iter() {
            let t = self.get(name)?;
            if t.shape() != var.shape() {
                return Err(PixelDqnError::InvalidInput(format!(
                    "Shape of {} is {:?}, expected {:?}",
                    name,
                    t.shape(),
                    var.shape()
                ))
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::DType;
    use candle_nn::Init;

    fn varmap(name: &str, values: &[f32]) -> Result<VarMap> {
        let vm = VarMap::new();
        vm.get((values.len(),), name, Init::Const(0.0), DType::F32, &Device::Cpu)?;
        let t = Tensor::from_slice(values, (values.len(),), &Device::Cpu)?;
        lock_vars(&vm)?.get(name).unwrap().set(&t)?;
        Ok(vm)
    }

    fn values_of(vm: &VarMap, name: &str) -> Result<Vec<f32>> {
        Ok(lock_vars(vm)?.get(name).unwrap().as_tensor().to_vec1()?)
    }

    #[test]
    fn test_snapshot_is_independent() -> Result<()> {
        let vm = varmap("w", &[1.0, 2.0])?;
        let snapshot = NamedTensors::copy_from(&vm)?;

        let t = Tensor::from_slice(&[5.0f32, 6.0], (2,), &Device::Cpu)?;
        lock_vars(&vm)?.get("w").unwrap().set(&t)?;

        assert_eq!(snapshot.get("w")?.to_vec1::<f32>()?, vec![1.0, 2.0]);
        assert_eq!(snapshot.len(), 1);
        Ok(())
    }

    #[test]
    fn test_copy_to() -> Result<()> {
        let src = varmap("w", &[1.0, 2.0])?;
        let dest = varmap("w", &[3.0, 4.0])?;
        NamedTensors::copy_from(&src)?.copy_to(&dest)?;
        assert_eq!(values_of(&dest, "w")?, vec![1.0, 2.0]);
        Ok(())
    }

    #[test]
    fn test_copy_to_rejects_shape_mismatch() -> Result<()> {
        let src = varmap("w", &[1.0, 2.0, 3.0])?;
        let dest = varmap("w", &[3.0, 4.0])?;
        assert!(NamedTensors::copy_from(&src)?.copy_to(&dest).is_err());
        assert_eq!(values_of(&dest, "w")?, vec![3.0, 4.0]);
        Ok(())
    }
}
