use nalgebra::DMatrix;
use serde::{Serialize, Deserialize};
use crate::fit::cluster::{Distance, Euclidian};
use crate::error::{Error, Result};

/// Builds a generic distance matrix from a arbitrary metric defined for a given structure.
/// complete specifies whether the lower-triangular part of the matrix should be filled. If
/// false, the lower-triangular part will be set to zeros.
pub(crate) fn generic_distance_matrix<T, F>(obs : &[T], metric : F, complete : bool) -> DMatrix<f64>
where
    F : Fn(&T, &T)->f64
{
    let n = obs.len();
    let mut dist = DMatrix::zeros(n, n);

    // Store measure entry results in upper-triangular portion
    for i in 0..n {
        for j in (i + 1)..n {
            dist[(i, j)] = metric(&obs[i], &obs[j]);
        }
    }

    if complete {
        // Copy entries to lower-triangular portion
        for j in 0..n {
            for i in 0..j {
                dist[(j, i)] = dist[(i, j)]
            }
        }
    }
    dist
}

/// Square, symmetric and hollow matrix of non-negative dissimilarities between observations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceMatrix {
    dist : DMatrix<f64>
}

impl DistanceMatrix {

    /// Euclidian distance between the rows of a tall matrix. Differences are accumulated
    /// entry-wise, rather than derived from the Gram matrix, so identical rows are at exactly zero.
    pub fn euclidean(tall : &DMatrix<f64>) -> Result<Self> {
        if tall.nrows() < 2 {
            return Err(Error::invalid(format!("Distance matrix requires at least 2 samples (found {})", tall.nrows())));
        }
        let rows : Vec<Vec<f64>> = tall.row_iter()
            .map(|r| r.iter().cloned().collect() )
            .collect();
        let dist = generic_distance_matrix(&rows[..], |a, b| <[f64] as Distance<Euclidian>>::distance(&a[..], &b[..]), true);
        Ok(Self { dist })
    }

    /// Wraps a pre-computed dissimilarity matrix, verifying it is a valid one.
    pub fn from_matrix(dist : DMatrix<f64>) -> Result<Self> {
        let n = dist.nrows();
        if n != dist.ncols() {
            return Err(Error::invalid(format!("Distance matrix must be square (found {}x{})", n, dist.ncols())));
        }
        if n < 2 {
            return Err(Error::invalid("Distance matrix requires at least 2 samples"));
        }
        for i in 0..n {
            if dist[(i, i)] != 0.0 {
                return Err(Error::invalid(format!("Non-zero diagonal entry at {}", i)));
            }
            for j in (i + 1)..n {
                let d = dist[(i, j)];
                if !d.is_finite() || d < 0.0 {
                    return Err(Error::invalid(format!("Invalid distance {} at ({}, {})", d, i, j)));
                }
                if d != dist[(j, i)] {
                    return Err(Error::invalid(format!("Asymmetric entries at ({}, {})", i, j)));
                }
            }
        }
        Ok(Self { dist })
    }

    pub fn get(&self, i : usize, j : usize) -> f64 {
        self.dist[(i, j)]
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.dist.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.dist.nrows() == 0
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.dist
    }

}

#[cfg(test)]
mod tests {

    use super::*;
    use rand::prelude::*;
    use rand::rngs::StdRng;

    fn random_matrix(n : usize, m : usize, seed : u64) -> DMatrix<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        DMatrix::from_fn(n, m, |_, _| rng.gen::<f64>() * 10. - 5. )
    }

    #[test]
    fn symmetric_and_hollow() {
        let d = DistanceMatrix::euclidean(&random_matrix(12, 4, 1)).unwrap();
        for i in 0..d.len() {
            assert_eq!(d.get(i, i), 0.0);
            for j in 0..d.len() {
                assert_eq!(d.get(i, j), d.get(j, i));
                assert!(d.get(i, j) >= 0.0);
            }
        }
    }

    #[test]
    fn triangle_inequality() {
        let d = DistanceMatrix::euclidean(&random_matrix(15, 3, 2)).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let (i, j, k) = (rng.gen_range(0, 15), rng.gen_range(0, 15), rng.gen_range(0, 15));
            assert!(d.get(i, k) <= d.get(i, j) + d.get(j, k) + 1E-12);
        }
    }

    #[test]
    fn known_distances() {
        let m = DMatrix::from_row_slice(3, 2, &[0., 0., 3., 4., 0., 1.]);
        let d = DistanceMatrix::euclidean(&m).unwrap();
        assert!((d.get(0, 1) - 5.0).abs() < 1E-12);
        assert!((d.get(0, 2) - 1.0).abs() < 1E-12);
        assert!((d.get(1, 2) - 18f64.sqrt()).abs() < 1E-12);
    }

    #[test]
    fn rejects_single_sample() {
        assert!(DistanceMatrix::euclidean(&DMatrix::zeros(1, 3)).is_err());
    }

    #[test]
    fn precomputed_matrix_validation() {
        let ok = DMatrix::from_row_slice(2, 2, &[0., 1., 1., 0.]);
        assert!(DistanceMatrix::from_matrix(ok).is_ok());
        let asym = DMatrix::from_row_slice(2, 2, &[0., 1., 2., 0.]);
        assert!(DistanceMatrix::from_matrix(asym).is_err());
        let diag = DMatrix::from_row_slice(2, 2, &[1., 1., 1., 0.]);
        assert!(DistanceMatrix::from_matrix(diag).is_err());
    }

}
