//! Grayscale conversion and block-mean downsampling.
use crate::Frame;
use anyhow::Result;
use ndarray::{s, Array2, Axis};
use pixel_dqn_core::error::PixelDqnError;

/// Integer luma weights of the R, G and B channels, in thousandths.
pub const LUMA_WEIGHTS: [u32; 3] = [299, 587, 114];

/// Converts a frame to a single-channel intensity map.
///
/// Each output pixel is `(299 R + 587 G + 114 B) / 1000`, truncated to an integer,
/// so the result lies between the smallest and the largest channel of the pixel.
pub fn grayscale(frame: &Frame) -> Array2<u8> {
    frame.as_array().map_axis(Axis(2), |px| {
        let v: u32 = px
            .iter()
            .zip(LUMA_WEIGHTS.iter())
            .map(|(&c, &w)| c as u32 * w)
            .sum();
        (v / 1000) as u8
    })
}

/// Replaces each non-overlapping `factor × factor` block with its mean.
///
/// Both sides of `map` must be divisible by `factor`; the output has shape
/// `(H / factor, W / factor)`.
pub fn downsample<A>(map: &Array2<A>, factor: usize) -> Result<Array2<f32>>
where
    A: Copy + Into<f32>,
{
    if factor == 0 {
        return Err(PixelDqnError::InvalidInput("downsampling factor must be positive".into()).into());
    }
    let (h, w) = map.dim();
    if h % factor != 0 || w % factor != 0 {
        return Err(PixelDqnError::InvalidInput(format!(
            "a {}x{} map is not divisible by the factor {}",
            h, w, factor
        ))
        .into());
    }

    let area = (factor * factor) as f32;
    Ok(Array2::from_shape_fn((h / factor, w / factor), |(i, j)| {
        let block = map.slice(s![i * factor..(i + 1) * factor, j * factor..(j + 1) * factor]);
        block.iter().map(|&v| Into::<f32>::into(v)).sum::<f32>() / area
    }))
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_luma_weights() {
        assert_eq!(LUMA_WEIGHTS.iter().sum::<u32>(), 1000);
        assert!(LUMA_WEIGHTS[1] > LUMA_WEIGHTS[0] && LUMA_WEIGHTS[0] > LUMA_WEIGHTS[2]);
    }

    #[test]
    fn test_grayscale_range() -> Result<()> {
        let data: Vec<u8> = (0..4 * 5 * 3).map(|i| (i * 37 % 256) as u8).collect();
        let frame = Frame::new(4, 5, data)?;
        let gray = grayscale(&frame);
        assert_eq!(gray.dim(), (4, 5));

        for ((i, j), &g) in gray.indexed_iter() {
            let px = frame.as_array().slice(s![i, j, ..]).to_vec();
            let lo = *px.iter().min().unwrap();
            let hi = *px.iter().max().unwrap();
            assert!(lo <= g && g <= hi, "{} not in [{}, {}]", g, lo, hi);
        }
        Ok(())
    }

    #[test]
    fn test_grayscale_values() -> Result<()> {
        let frame = Frame::new(1, 3, vec![255, 255, 255, 255, 0, 0, 10, 20, 30])?;
        let gray = grayscale(&frame);
        // 299 * 255 / 1000 = 76.245, 2990 + 11740 + 3420 = 18150
        assert_eq!(gray, array![[255, 76, 18]]);
        Ok(())
    }

    #[test]
    fn test_downsample_block_means() -> Result<()> {
        let map: Array2<u8> = Array2::from_shape_vec((4, 4), (0..16).collect())?;
        let out = downsample(&map, 2)?;
        assert_eq!(out, array![[2.5, 4.5], [10.5, 12.5]]);
        Ok(())
    }

    #[test]
    fn test_downsample_shape() -> Result<()> {
        let map = Array2::<u8>::zeros((600, 800));
        let out = downsample(&map, 10)?;
        assert_eq!(out.dim(), (60, 80));

        let out = downsample(&map, 1)?;
        assert_eq!(out.dim(), (600, 800));
        Ok(())
    }

    #[test]
    fn test_downsample_rejects_indivisible() {
        let map = Array2::<u8>::zeros((605, 800));
        let err = downsample(&map, 10).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PixelDqnError>(),
            Some(PixelDqnError::InvalidInput(_))
        ));
        assert!(downsample(&map, 0).is_err());
    }
}
