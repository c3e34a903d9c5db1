/// Utilities for dimensionality reduction of structured high-dimensional data.
pub mod dim;

/// Agreement between clusterings, or between a clustering and known class labels.
pub mod metric;
