use nalgebra::{DMatrix, DVector, SVD};
use serde::{Serialize, Deserialize};
use std::cmp::Ordering;
use std::fmt;
use log::debug;
use crate::calc;
use crate::fit::Estimator;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PCASettings {

    /// Whether features are scaled to unit variance after centering.
    pub scale : bool
}

impl Default for PCASettings {

    fn default() -> Self {
        Self { scale : true }
    }

}

/// Principal Component Analysis: basis reduction based on the decomposition of the
/// centered (and optionally scaled) sample matrix. Those transformations project samples
/// to the orthogonal axes that preserve global variance, ordered by the variance they preserve.
///
/// For n samples and p features, k = min(n-1, p) components are kept. Components are computed
/// from the SVD of the standardized matrix: the loadings are its right singular vectors and
/// the variance of component i is s_i^2 / (n-1).
///
/// The sign of each component is arbitrary. Here each loading column is flipped so
/// that its entry of largest magnitude is positive, which makes results reproducible within
/// this crate, but other implementations may return any component (with its scores) negated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PCA {
    loadings : DMatrix<f64>,
    scores : DMatrix<f64>,
    center : DVector<f64>,
    scale : Option<DVector<f64>>,
    variance : DVector<f64>
}

impl PCA {

    /// Features x components matrix with orthonormal columns (the rotation).
    pub fn loadings(&self) -> &DMatrix<f64> {
        &self.loadings
    }

    /// Samples x components matrix of the standardized samples expressed at the component axes.
    pub fn scores(&self) -> &DMatrix<f64> {
        &self.scores
    }

    pub fn center(&self) -> &DVector<f64> {
        &self.center
    }

    pub fn scale(&self) -> Option<&DVector<f64>> {
        self.scale.as_ref()
    }

    pub fn n_components(&self) -> usize {
        self.variance.nrows()
    }

    /// Variance of each component, in descending order.
    pub fn explained_variance(&self) -> &DVector<f64> {
        &self.variance
    }

    /// Standard deviation of each component.
    pub fn sdev(&self) -> DVector<f64> {
        self.variance.map(|v| v.sqrt() )
    }

    /// Proportion of variance explained by each component.
    pub fn pve(&self) -> DVector<f64> {
        let total = self.variance.sum();
        if total > 0.0 {
            &self.variance / total
        } else {
            DVector::zeros(self.variance.nrows())
        }
    }

    pub fn cumulative_pve(&self) -> DVector<f64> {
        let mut acc = 0.0;
        self.pve().map(|p| {
            acc += p;
            acc
        })
    }

    /// Expresses new samples (with the same features as the fitted ones) at the component axes,
    /// using the center and scale estimated from the fitted sample.
    pub fn project(&self, sample : &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if sample.ncols() != self.center.nrows() {
            return Err(Error::invalid(format!("Expected {} features, found {}", self.center.nrows(), sample.ncols())));
        }
        let standardized = calc::rescale(sample, &self.center, self.scale.as_ref());
        Ok(standardized * &self.loadings)
    }

}

/// Flips v so that its entry of largest magnitude is positive.
fn orient(v : &mut DVector<f64>) {
    let ix = v.iamax();
    if v[ix] < 0.0 {
        v.neg_mut();
    }
}

impl Estimator for PCA {

    type Settings = PCASettings;

    type Error = Error;

    fn estimate(sample : &DMatrix<f64>, settings : PCASettings) -> Result<Self> {
        let n = sample.nrows();
        if n < 2 {
            return Err(Error::invalid(format!("PCA requires at least 2 samples (found {})", n)));
        }
        let standardized = calc::standardize(sample, settings.scale)?;
        let p = standardized.data().ncols();
        let k = (n - 1).min(p);

        // Left singular vectors are requested too: without them the singular values of
        // tall matrices come out wrong.
        let svd = SVD::try_new(standardized.data().clone(), true, true, f64::EPSILON, 0)
            .ok_or_else(|| Error::Decomposition(format!("SVD of {}x{} matrix did not converge", n, p)))?;
        let v_t = svd.v_t
            .ok_or_else(|| Error::Decomposition(String::from("Right singular vectors unavailable")))?;
        let sv = svd.singular_values;

        let mut order : Vec<usize> = (0..sv.nrows()).collect();
        order.sort_by(|a, b| sv[*b].partial_cmp(&sv[*a]).unwrap_or(Ordering::Equal) );

        let mut loadings = DMatrix::<f64>::zeros(p, k);
        for (c, ix) in order.iter().take(k).enumerate() {
            let mut axis : DVector<f64> = v_t.row(*ix).transpose();
            orient(&mut axis);
            loadings.set_column(c, &axis);
        }
        let variance = DVector::from_iterator(
            k,
            order.iter().take(k).map(|ix| sv[*ix].powi(2) / (n - 1) as f64 )
        );
        let scores = standardized.data() * &loadings;

        let (center, scale) = (standardized.center().clone(), standardized.scale().cloned());
        let pca = PCA { loadings, scores, center, scale, variance };
        debug!("PCA over {}x{} matrix: {} components, first PVE = {:.4}", n, p, k, pca.pve()[0]);
        Ok(pca)
    }

}

impl fmt::Display for PCA {

    fn fmt(&self, f : &mut fmt::Formatter) -> fmt::Result {
        let (sdev, pve, cum) = (self.sdev(), self.pve(), self.cumulative_pve());
        writeln!(f, "{:<8}{:>14}{:>14}{:>14}", "", "Std. dev.", "PVE", "Cumulative")?;
        for i in 0..self.n_components() {
            writeln!(f, "{:<8}{:>14.4}{:>14.4}{:>14.4}", format!("PC{}", i + 1), sdev[i], pve[i], cum[i])?;
        }
        Ok(())
    }

}

#[cfg(test)]
mod tests {

    use super::*;
    use rand::prelude::*;
    use rand::rngs::StdRng;

    const EPS : f64 = 1E-8;

    fn random_matrix(n : usize, p : usize, seed : u64) -> DMatrix<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        DMatrix::from_fn(n, p, |_, j| rng.gen::<f64>() * (j + 1) as f64 )
    }

    #[test]
    fn variance_sums_to_total_and_descends() {
        for &(n, p) in [(20, 5), (6, 30)].iter() {
            let m = random_matrix(n, p, 7);
            for &scale in [true, false].iter() {
                let pca = PCA::estimate(&m, PCASettings { scale }).unwrap();
                assert_eq!(pca.n_components(), (n - 1).min(p));
                let standardized = calc::standardize(&m, scale).unwrap();
                let total = calc::total_variance(standardized.data());
                assert!((pca.explained_variance().sum() - total).abs() < EPS * total.max(1.0));
                let var = pca.explained_variance();
                assert!(var.as_slice().windows(2).all(|w| w[0] >= w[1] - EPS ));
                assert!((pca.pve().sum() - 1.0).abs() < EPS);
                assert!((pca.cumulative_pve()[pca.n_components() - 1] - 1.0).abs() < EPS);
            }
        }
    }

    #[test]
    fn scores_are_projected_standardized_data() {
        let m = random_matrix(12, 4, 11);
        let pca = PCA::estimate(&m, PCASettings { scale : true }).unwrap();
        let standardized = calc::standardize(&m, true).unwrap();
        let expected = standardized.data() * pca.loadings();
        assert!((expected - pca.scores()).abs().max() < EPS);
        let projected = pca.project(&m).unwrap();
        assert!((projected - pca.scores()).abs().max() < EPS);
        assert!(pca.project(&DMatrix::zeros(2, 3)).is_err());
    }

    #[test]
    fn loadings_are_orthonormal() {
        let m = random_matrix(8, 15, 3);
        let pca = PCA::estimate(&m, PCASettings { scale : false }).unwrap();
        let gram = pca.loadings().transpose() * pca.loadings();
        let id = DMatrix::<f64>::identity(gram.nrows(), gram.ncols());
        assert!((gram - id).abs().max() < 1E-6);
    }

    #[test]
    fn collinear_points_have_one_component() {
        let m = DMatrix::from_fn(10, 2, |i, j| (i as f64) * (j + 1) as f64 );
        let pca = PCA::estimate(&m, PCASettings { scale : false }).unwrap();
        assert!((pca.pve()[0] - 1.0).abs() < EPS);
        let first = pca.loadings().column(0);
        assert!((first[0].abs() - 1. / 5f64.sqrt()).abs() < EPS);
        assert!((first[1].abs() - 2. / 5f64.sqrt()).abs() < EPS);
    }

    #[test]
    fn tall_matrix_known_components() {
        // Already centered; var(x) = 2/3 and var(y) = 8/3.
        let m = DMatrix::from_row_slice(4, 2, &[1., 0., -1., 0., 0., 2., 0., -2.]);
        let pca = PCA::estimate(&m, PCASettings { scale : false }).unwrap();
        assert_eq!(pca.n_components(), 2);
        assert!((pca.explained_variance()[0] - 8. / 3.).abs() < EPS);
        assert!((pca.explained_variance()[1] - 2. / 3.).abs() < EPS);
        assert!((pca.loadings()[(1, 0)] - 1.).abs() < EPS);
        assert!((pca.loadings()[(0, 1)] - 1.).abs() < EPS);
        assert!((pca.pve()[0] - 0.8).abs() < EPS);
    }

    #[test]
    fn tall_matrix_variance_matches_total() {
        let m = random_matrix(40, 6, 13);
        for &scale in [true, false].iter() {
            let pca = PCA::estimate(&m, PCASettings { scale }).unwrap();
            let total = calc::total_variance(calc::standardize(&m, scale).unwrap().data());
            assert_eq!(pca.n_components(), 6);
            assert!((pca.explained_variance().sum() - total).abs() < EPS * total.max(1.0));
            let gram = pca.loadings().transpose() * pca.loadings();
            assert!((gram - DMatrix::<f64>::identity(6, 6)).abs().max() < 1E-6);
        }
    }

    #[test]
    fn too_few_samples() {
        assert!(matches!(PCA::estimate(&DMatrix::zeros(1, 4), PCASettings::default()), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn constant_feature_under_scaling() {
        let mut m = random_matrix(6, 3, 5);
        m.column_mut(2).fill(4.0);
        assert!(matches!(PCA::estimate(&m, PCASettings { scale : true }), Err(Error::DegenerateFeature { column : 2 })));
        assert!(PCA::estimate(&m, PCASettings { scale : false }).is_ok());
    }

}
