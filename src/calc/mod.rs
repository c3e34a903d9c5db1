use nalgebra::{DMatrix, DVector};
use serde::{Serialize, Deserialize};
use crate::error::{Error, Result};

/// Functions applicable to individual matrix entries.
pub trait Variate {

    fn center(&self, mean : &Self) -> Self;

    fn standardize(&self, mean : &Self, stddev : &Self) -> Self;

}

impl Variate for f64 {

    fn center(&self, mean : &Self) -> Self {
        *self - *mean
    }

    fn standardize(&self, mean : &Self, stddev : &Self) -> Self {
        (*self - *mean) / *stddev
    }

}

/// Single-pass and two-pass univariate statistical calculations.
pub mod running {

    pub fn mean(d : impl Iterator<Item=f64>, count : usize) -> f64 {
        d.sum::<f64>() / count as f64
    }

    /// Two-pass mean and variance. The iterator is cloned so that the squared deviations
    /// are taken around the final mean, which avoids the cancellation of the sum-of-squares form.
    pub fn mean_variance(d : impl Iterator<Item=f64> + Clone, count : usize, unbiased : bool) -> (f64, f64) {
        let n = count as f64;
        let m = mean(d.clone(), count);
        let ss = d.map(|x| (x - m).powi(2) ).sum::<f64>();
        (m, ss / if unbiased { n - 1. } else { n })
    }

    pub fn mean_variance_from_slice(d : &[f64], unbiased : bool) -> (f64, f64) {
        mean_variance(d.iter().cloned(), d.len(), unbiased)
    }

}

/// Mean of each column of a tall (observations are rows) matrix.
pub fn column_means(m : &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(
        m.ncols(),
        m.column_iter().map(|c| running::mean(c.iter().cloned(), m.nrows()) )
    )
}

/// Unbiased standard deviation of each column of a tall matrix.
pub fn column_sd(m : &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(
        m.ncols(),
        m.column_iter().map(|c| running::mean_variance_from_slice(c.as_slice(), true).1.sqrt() )
    )
}

/// Sum of the unbiased column variances (the trace of the sample covariance matrix).
pub fn total_variance(m : &DMatrix<f64>) -> f64 {
    m.column_iter()
        .map(|c| running::mean_variance_from_slice(c.as_slice(), true).1 )
        .sum()
}

/// Column-wise centered (and optionally scaled) copy of a sample matrix, together with
/// the per-feature center and scale used to build it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Standardized {
    data : DMatrix<f64>,
    center : DVector<f64>,
    scale : Option<DVector<f64>>
}

impl Standardized {

    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    pub fn center(&self) -> &DVector<f64> {
        &self.center
    }

    /// Per-feature standard deviations, if scaling was requested.
    pub fn scale(&self) -> Option<&DVector<f64>> {
        self.scale.as_ref()
    }

    pub fn into_data(self) -> DMatrix<f64> {
        self.data
    }

    /// Applies the stored center and scale to a new matrix with the same features.
    pub fn apply(&self, other : &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if other.ncols() != self.center.nrows() {
            return Err(Error::invalid(format!(
                "Expected {} features, found {}", self.center.nrows(), other.ncols()
            )));
        }
        Ok(rescale(other, &self.center, self.scale.as_ref()))
    }

}

/// Subtracts center from each row of m and, if informed, divides each column by its scale.
pub(crate) fn rescale(m : &DMatrix<f64>, center : &DVector<f64>, scale : Option<&DVector<f64>>) -> DMatrix<f64> {
    DMatrix::from_fn(m.nrows(), m.ncols(), |i, j| {
        match scale {
            Some(sd) => m[(i, j)].standardize(&center[j], &sd[j]),
            None => m[(i, j)].center(&center[j])
        }
    })
}

fn is_constant(m : &DMatrix<f64>, col : usize) -> bool {
    let c = m.column(col);
    c.iter().all(|v| *v == c[0])
}

/// Centers each column of the tall matrix m to zero mean and, if scale is true, divides it by its
/// unbiased standard deviation. Constant columns cannot be scaled and are reported
/// as Error::DegenerateFeature, instead of propagating NaNs.
pub fn standardize(m : &DMatrix<f64>, scale : bool) -> Result<Standardized> {
    if m.nrows() < 2 {
        return Err(Error::invalid(format!("Standardization requires at least 2 samples (found {})", m.nrows())));
    }
    if m.ncols() == 0 {
        return Err(Error::invalid("Standardization requires at least one feature"));
    }
    let center = column_means(m);
    let scale = if scale {
        let sd = column_sd(m);
        if let Some(column) = (0..m.ncols()).find(|j| sd[*j] == 0.0 || is_constant(m, *j) ) {
            return Err(Error::DegenerateFeature { column });
        }
        Some(sd)
    } else {
        None
    };
    let data = rescale(m, &center, scale.as_ref());
    Ok(Standardized { data, center, scale })
}

#[cfg(test)]
mod tests {

    use super::*;

    const EPS : f64 = 1E-9;

    fn sample() -> DMatrix<f64> {
        DMatrix::from_row_slice(5, 3, &[
            1.0, 10.0, -3.0,
            2.0, 20.0, 0.5,
            3.0, 15.0, 7.0,
            4.0, 12.0, 1.0,
            5.0, 18.0, 2.5
        ])
    }

    #[test]
    fn scaled_columns_have_zero_mean_unit_sd() {
        let st = standardize(&sample(), true).unwrap();
        let means = column_means(st.data());
        let sds = column_sd(st.data());
        for j in 0..3 {
            assert!(means[j].abs() < EPS);
            assert!((sds[j] - 1.0).abs() < 1E-6);
        }
        assert!((st.center()[0] - 3.0).abs() < EPS);
        assert!((st.scale().unwrap()[0] - 2.5f64.sqrt()).abs() < EPS);
    }

    #[test]
    fn centering_only_preserves_spread() {
        let m = sample();
        let st = standardize(&m, false).unwrap();
        assert!(st.scale().is_none());
        let (sd_in, sd_out) = (column_sd(&m), column_sd(st.data()));
        for j in 0..3 {
            assert!(column_means(st.data())[j].abs() < EPS);
            assert!((sd_in[j] - sd_out[j]).abs() < EPS);
        }
    }

    #[test]
    fn constant_column_is_degenerate() {
        let mut m = sample();
        m.column_mut(1).fill(0.1);
        match standardize(&m, true) {
            Err(Error::DegenerateFeature { column }) => assert_eq!(column, 1),
            other => panic!("Unexpected result: {:?}", other)
        }
        assert!(standardize(&m, false).is_ok());
    }

    #[test]
    fn too_few_samples() {
        let m = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        assert!(matches!(standardize(&m, false), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn apply_reuses_center_and_scale() {
        let m = sample();
        let st = standardize(&m, true).unwrap();
        let again = st.apply(&m).unwrap();
        assert!((again - st.data()).abs().max() < EPS);
        assert!(st.apply(&DMatrix::zeros(2, 2)).is_err());
    }

    #[test]
    fn total_variance_is_sum_of_column_variances() {
        let st = standardize(&sample(), true).unwrap();
        assert!((total_variance(st.data()) - 3.0).abs() < 1E-9);
    }

    #[test]
    fn known_column_statistics() {
        let m = sample();
        let sd = column_sd(&m);
        assert!((sd[0] - 2.5f64.sqrt()).abs() < EPS);
        assert!((sd[1] - 17f64.sqrt()).abs() < EPS);
        let (mean, var) = running::mean_variance_from_slice(m.column(0).as_slice(), false);
        assert!((mean - 3.0).abs() < EPS);
        assert!((var - 2.0).abs() < EPS);
        assert!((total_variance(&m) - (2.5 + 17.0 + sd[2].powi(2))).abs() < EPS);
    }

}
