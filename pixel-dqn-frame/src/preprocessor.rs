//! Frame preprocessor.
use crate::{downsample, grayscale, Frame, State};
use anyhow::Result;
use log::trace;
use pixel_dqn_core::{error::PixelDqnError, ObsFilter};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`FramePreprocessor`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct FramePreprocessorConfig {
    /// Side of the square blocks averaged into one state pixel.
    pub factor: usize,
}

impl Default for FramePreprocessorConfig {
    fn default() -> Self {
        Self { factor: 10 }
    }
}

impl FramePreprocessorConfig {
    /// Sets the downsampling factor.
    pub fn factor(mut self, v: usize) -> Self {
        self.factor = v;
        self
    }

    /// Constructs [`FramePreprocessorConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`FramePreprocessorConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Converts raw frames into [`State`]s: [`grayscale`] then [`downsample`].
#[derive(Debug, Clone)]
pub struct FramePreprocessor {
    factor: usize,
}

impl FramePreprocessor {
    /// Constructs a preprocessor.
    pub fn build(config: &FramePreprocessorConfig) -> Result<Self> {
        if config.factor == 0 {
            return Err(PixelDqnError::Config("factor must be positive".into()).into());
        }
        Ok(Self {
            factor: config.factor,
        })
    }

    /// The downsampling factor.
    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Shape of the states produced from `height × width` frames.
    pub fn state_shape(&self, height: usize, width: usize) -> Result<[usize; 2]> {
        if height % self.factor != 0 || width % self.factor != 0 {
            return Err(PixelDqnError::InvalidInput(format!(
                "a {}x{} frame is not divisible by the factor {}",
                height, width, self.factor
            ))
            .into());
        }
        Ok([height / self.factor, width / self.factor])
    }

    /// Converts a frame to a state.
    pub fn process(&self, frame: &Frame) -> Result<State> {
        let gray = grayscale(frame);
        let state = State::from_array(downsample(&gray, self.factor)?);
        trace!(
            "Processed {}x{} frame into {:?} state",
            frame.height(),
            frame.width(),
            state.shape()
        );
        Ok(state)
    }
}

impl ObsFilter<Frame> for FramePreprocessor {
    type Output = State;

    fn filt(&mut self, obs: Frame) -> Result<State> {
        self.process(&obs)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_process_uniform_frame() -> Result<()> {
        let frame = Frame::new(600, 800, vec![200; 600 * 800 * 3])?;
        let mut preprocessor = FramePreprocessor::build(&FramePreprocessorConfig::default())?;
        let state = preprocessor.filt(frame)?;

        assert_eq!(state.shape(), [60, 80]);
        assert_eq!(preprocessor.state_shape(600, 800)?, [60, 80]);
        assert!(state.as_array().iter().all(|&v| v == 200.0));
        Ok(())
    }

    #[test]
    fn test_process_rejects_indivisible() -> Result<()> {
        let frame = Frame::new(15, 20, vec![0; 15 * 20 * 3])?;
        let preprocessor = FramePreprocessor::build(&FramePreprocessorConfig::default())?;
        assert!(preprocessor.process(&frame).is_err());
        assert!(preprocessor.state_shape(15, 20).is_err());
        Ok(())
    }

    #[test]
    fn test_zero_factor() {
        let config = FramePreprocessorConfig::default().factor(0);
        assert!(FramePreprocessor::build(&config).is_err());
    }

    #[test]
    fn test_serde_config() -> Result<()> {
        let config = FramePreprocessorConfig::default().factor(4);
        let dir = TempDir::new("frame_preprocessor")?;
        let path = dir.path().join("frame_preprocessor.yaml");
        config.save(&path)?;
        assert_eq!(FramePreprocessorConfig::load(&path)?, config);
        Ok(())
    }
}
