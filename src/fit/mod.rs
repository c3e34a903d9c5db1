use nalgebra::DMatrix;

/// Clustering algorithms over tall sample matrices or their distance matrices.
pub mod cluster;

/// Trait shared by the algorithms that are fitted directly from a tall sample matrix
/// (observations are rows, features are columns). Estimators only borrow the sample:
/// each call returns a freshly allocated result or fails before producing any output.
pub trait Estimator
where
    Self : Sized
{

    type Settings;

    type Error;

    fn estimate(sample : &DMatrix<f64>, settings : Self::Settings) -> Result<Self, Self::Error>;

}
