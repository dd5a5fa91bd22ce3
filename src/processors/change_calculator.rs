use crate::error::Result;
use crate::models::RasterGrid;
use std::fmt;

/// What the `change` property of the written features means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Mean of tmin/tmax for the period
    Average,
    /// Period mean minus baseline mean
    Change,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Average => write!(f, "average temperature"),
            ValueKind::Change => write!(f, "temperature change"),
        }
    }
}

/// Subtract the baseline when there is one, otherwise pass the grid through.
/// NaN in either input stays NaN; grids of different shape are rejected.
pub fn apply_baseline(
    derived: RasterGrid,
    baseline: Option<&RasterGrid>,
) -> Result<(RasterGrid, ValueKind)> {
    match baseline {
        Some(baseline) => {
            let change = derived.zip_with(baseline, |current, base| current - base)?;
            Ok((change, ValueKind::Change))
        }
        None => Ok((derived, ValueKind::Average)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessingError;
    use crate::models::{GeoTransform, SpatialRef};
    use approx::assert_relative_eq;

    fn grid(data: Vec<f32>, rows: usize, cols: usize) -> RasterGrid {
        RasterGrid::new(data, rows, cols, GeoTransform::default(), SpatialRef::wgs84()).unwrap()
    }

    #[test]
    fn test_without_baseline_passes_through() {
        let derived = grid(vec![15.0, f32::NAN, 12.5, 3.0], 2, 2);
        let (output, kind) = apply_baseline(derived.clone(), None).unwrap();

        assert_eq!(kind, ValueKind::Average);
        assert_eq!(output.shape(), derived.shape());
        assert_eq!(output.data()[0], 15.0);
        assert!(output.data()[1].is_nan());
    }

    #[test]
    fn test_uniform_change() {
        let baseline = grid(vec![10.0; 9], 3, 3);
        let current = grid(vec![15.0; 9], 3, 3);

        let (output, kind) = apply_baseline(current, Some(&baseline)).unwrap();

        assert_eq!(kind, ValueKind::Change);
        for &value in output.data() {
            assert_relative_eq!(value, 5.0);
        }
    }

    #[test]
    fn test_nan_propagates_from_either_side() {
        let baseline = grid(vec![1.0, f32::NAN, 2.0], 1, 3);
        let current = grid(vec![f32::NAN, 4.0, 5.5], 1, 3);

        let (output, _) = apply_baseline(current, Some(&baseline)).unwrap();

        assert!(output.data()[0].is_nan());
        assert!(output.data()[1].is_nan());
        assert_relative_eq!(output.data()[2], 3.5);
    }

    #[test]
    fn test_shape_mismatch_fails_fast() {
        let baseline = grid(vec![1.0; 4], 2, 2);
        let current = grid(vec![1.0; 6], 2, 3);

        let result = apply_baseline(current, Some(&baseline));
        assert!(matches!(result, Err(ProcessingError::DimensionMismatch { .. })));
    }
}
