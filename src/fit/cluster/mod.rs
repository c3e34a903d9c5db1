use serde::{Serialize, Deserialize};
use crate::error::{Error, Result};

/// Hierarchical clustering implementation
pub mod dendro;

/// Centroid-based (or prototype-based) clustering implementation
pub mod center;

/// Pairwise dissimilarities between observations
pub mod distance;

/// Types which can be thought of as living in a space and can have their distance compared.
/// The generic type parameter M designates a metric, usually a zero-sized type just used to
/// disambiguate between metrics implemented for the same type.
pub trait Distance<M>
where
    M : ?Sized
{

	fn distance(&self, other : &Self) -> f64;

}

pub trait Metric<T>
where
    T : Distance<Self> + ?Sized
{

    fn metric(a : &T, b : &T) -> f64;

}

pub struct Euclidian { }

impl<T> Metric<T> for Euclidian
where
    T : Distance<Self> + ?Sized
{

    fn metric(a : &T, b : &T) -> f64 {
        a.distance(b)
    }

}

impl Distance<Euclidian> for [f64] {

    fn distance(&self, other : &Self) -> f64 {
        assert!(self.len() == other.len());
        squared_euclidian(self, other).sqrt()
    }

}

pub(crate) fn squared_euclidian<'a>(
    a : impl IntoIterator<Item=&'a f64>,
    b : impl IntoIterator<Item=&'a f64>
) -> f64 {
    a.into_iter().zip(b.into_iter()).map(|(ai, bi)| (ai - bi).powi(2) ).sum::<f64>()
}

/// Cluster membership of each observation, in the order the observations were supplied.
/// Cluster ids are in 1..=k, every id in this range having at least one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    labels : Vec<usize>,
    n_clusters : usize
}

impl Assignment {

    /// Renumbers arbitrary labels to 1..=k by order of first appearance.
    pub fn from_labels(raw : &[usize]) -> Self {
        let mut seen : Vec<usize> = Vec::new();
        let labels = raw.iter().map(|r| {
            match seen.iter().position(|s| s == r ) {
                Some(pos) => pos + 1,
                None => {
                    seen.push(*r);
                    seen.len()
                }
            }
        }).collect();
        Self { labels, n_clusters : seen.len() }
    }

    /// Builds an assignment from ids that are already in 1..=k.
    pub(crate) fn from_ids(labels : Vec<usize>, n_clusters : usize) -> Result<Self> {
        let mut counts = vec![0usize; n_clusters];
        for l in labels.iter() {
            if *l < 1 || *l > n_clusters {
                return Err(Error::invalid(format!("Cluster id {} outside [1, {}]", l, n_clusters)));
            }
            counts[*l - 1] += 1;
        }
        if let Some(empty) = counts.iter().position(|c| *c == 0 ) {
            return Err(Error::invalid(format!("Cluster {} has no members", empty + 1)));
        }
        Ok(Self { labels, n_clusters })
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels[..]
    }

    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of members of each cluster, at position id-1.
    pub fn sizes(&self) -> Vec<usize> {
        let mut counts = vec![0; self.n_clusters];
        for l in self.labels.iter() {
            counts[*l - 1] += 1;
        }
        counts
    }

    /// Indices of the observations allocated to the cluster with the given id.
    pub fn members(&self, id : usize) -> Vec<usize> {
        self.labels.iter()
            .enumerate()
            .filter(|(_, l)| **l == id )
            .map(|(ix, _)| ix )
            .collect()
    }

}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn euclidian() {
        let a : [f64; 2] = [1., 1.];
        let b : [f64; 2] = [4., 5.];
        assert!((Euclidian::metric(&a[..], &b[..]) - 5.0).abs() < 1E-12);
        assert!(a[..].distance(&a[..]).abs() < 1E-12);
    }

    #[test]
    fn renumber_by_first_appearance() {
        let a = Assignment::from_labels(&[7, 7, 2, 9, 2]);
        assert_eq!(a.labels(), &[1, 1, 2, 3, 2]);
        assert_eq!(a.n_clusters(), 3);
        assert_eq!(a.sizes(), vec![2, 2, 1]);
        assert_eq!(a.members(2), vec![2, 4]);
    }

    #[test]
    fn ids_must_cover_range() {
        assert!(Assignment::from_ids(vec![1, 2, 2], 2).is_ok());
        assert!(Assignment::from_ids(vec![1, 1, 1], 2).is_err());
        assert!(Assignment::from_ids(vec![0, 1], 1).is_err());
    }

}
