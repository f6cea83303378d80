use ndarray::{Array2, ArrayView2};

/// A downsampled single-channel intensity map of shape `(H, W)`.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    data: Array2<f32>,
}

impl State {
    /// Wraps an intensity map.
    pub fn from_array(data: Array2<f32>) -> Self {
        Self { data }
    }

    /// `[H, W]`.
    pub fn shape(&self) -> [usize; 2] {
        let (h, w) = self.data.dim();
        [h, w]
    }

    /// View of the intensity map.
    pub fn as_array(&self) -> ArrayView2<f32> {
        self.data.view()
    }

    /// Consumes the state, returning the intensity map.
    pub fn into_array(self) -> Array2<f32> {
        self.data
    }
}

impl From<Array2<f32>> for State {
    fn from(data: Array2<f32>) -> Self {
        Self { data }
    }
}

#[cfg(feature = "candle")]
impl TryFrom<State> for candle_core::Tensor {
    type Error = candle_core::Error;

    /// Converts to a tensor of shape `(1, 1, H, W)` on the CPU.
    fn try_from(state: State) -> Result<Self, Self::Error> {
        let [h, w] = state.shape();
        let data = state.data.as_standard_layout().iter().copied().collect::<Vec<_>>();
        candle_core::Tensor::from_vec(data, &[1, 1, h, w], &candle_core::Device::Cpu)
    }
}

#[cfg(all(test, feature = "candle"))]
mod test {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_into_tensor() -> anyhow::Result<()> {
        let state = State::from_array(array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let t: candle_core::Tensor = state.try_into()?;
        assert_eq!(t.dims(), &[1, 1, 2, 3]);
        assert_eq!(t.flatten_all()?.to_vec1::<f32>()?, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        Ok(())
    }
}
