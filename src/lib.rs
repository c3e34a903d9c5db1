/// Error type shared by all analysis operations.
pub mod error;

/// Column-wise statistics and standardization of sample matrices.
pub mod calc;

/// Estimators fitted from sample matrices: hierarchical and k-means clustering.
pub mod fit;

/// Dimensionality reduction (PCA) and comparison of clusterings against known labels.
pub mod feature;

/// Loading of sample matrices and their class labels from delimited text files.
pub mod table;

pub use error::{Error, Result};

pub use fit::Estimator;

pub use fit::cluster::Assignment;

pub use fit::cluster::distance::DistanceMatrix;

pub use fit::cluster::dendro::{Dendrogram, Linkage, Merge};

pub use fit::cluster::center::{KMeans, KMeansSettings, Init};

pub use feature::dim::{PCA, PCASettings};
