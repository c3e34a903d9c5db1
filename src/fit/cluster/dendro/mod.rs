use nalgebra::DMatrix;
use serde::{Serialize, Deserialize};
use std::str::FromStr;
use std::fmt;
use log::{debug, trace};
use crate::fit::Estimator;
use crate::fit::cluster::Assignment;
use crate::fit::cluster::distance::DistanceMatrix;
use crate::error::{Error, Result};

/// For an agglomerative clustering algorithm, this enum identifies how the distance
/// between two clusters is derived from the distances between their members: In the single
/// linkage strategy (nearest neighbor), the distance between the closest pair of members is used;
/// in the complete linkage strategy (farthest neighbor) the distance between the farthest pair is used;
/// in the average linkage strategy, the mean over all pairs is used. Ward merges the pair
/// of clusters that least increases the within-cluster variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Linkage {
    Complete,
    Average,
    Single,
    Ward
}

impl Linkage {

    /// Lance-Williams update: distance between the cluster formed by merging a and b
    /// (with sizes na, nb and distance dab) and a third cluster k of size nk.
    fn update(&self, dak : f64, dbk : f64, dab : f64, na : usize, nb : usize, nk : usize) -> f64 {
        match self {
            Linkage::Complete => dak.max(dbk),
            Linkage::Single => dak.min(dbk),
            Linkage::Average => {
                (na as f64 * dak + nb as f64 * dbk) / (na + nb) as f64
            },
            Linkage::Ward => {
                let (na, nb, nk) = (na as f64, nb as f64, nk as f64);
                let sq = ((na + nk) * dak.powi(2) + (nb + nk) * dbk.powi(2) - nk * dab.powi(2)) / (na + nb + nk);
                sq.max(0.0).sqrt()
            }
        }
    }

}

impl fmt::Display for Linkage {

    fn fmt(&self, f : &mut fmt::Formatter) -> fmt::Result {
        match self {
            Linkage::Complete => write!(f, "complete"),
            Linkage::Average => write!(f, "average"),
            Linkage::Single => write!(f, "single"),
            Linkage::Ward => write!(f, "ward")
        }
    }

}

impl FromStr for Linkage {

    type Err = Error;

    fn from_str(s : &str) -> Result<Self> {
        match s {
            "complete" => Ok(Linkage::Complete),
            "average" => Ok(Linkage::Average),
            "single" => Ok(Linkage::Single),
            "ward" | "ward.D2" => Ok(Linkage::Ward),
            other => Err(Error::invalid(format!("Unknown linkage '{}'", other)))
        }
    }

}

/// A single agglomeration step. Leaves (observations) have cluster ids 0..n; the cluster
/// created by the merge at position m of the dendrogram has id n + m.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Merge {

    /// Smaller of the two merged cluster ids.
    pub left : usize,

    /// Larger of the two merged cluster ids.
    pub right : usize,

    /// Linkage distance at which the two clusters were merged.
    pub distance : f64,

    /// Number of observations in the merged cluster.
    pub size : usize
}

/// Represents the result of executing an agglomerative clustering algorithm: the full
/// sequence of n-1 merges, from the n singletons up to the root cluster holding all observations.
/// Flat clusterings are derived from it with Dendrogram::cut (fixed number of clusters)
/// or Dendrogram::cut_height (fixed merge height).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dendrogram {
    n_leaves : usize,
    linkage : Linkage,
    merges : Vec<Merge>
}

impl Dendrogram {

    /// Builds the dendrogram by repeatedly merging the two closest clusters. Each active cluster
    /// occupies the slot of its smallest member index, and the closest pair is searched in
    /// row-major slot order keeping the first minimum found. Ties are therefore resolved in favour
    /// of the pair with the lexicographically smallest (min member, min member) indices.
    pub fn build(dist : &DistanceMatrix, linkage : Linkage) -> Result<Self> {
        let n = dist.len();
        if n < 2 {
            return Err(Error::invalid(format!("Hierarchical clustering requires at least 2 samples (found {})", n)));
        }

        let mut work = dist.as_matrix().clone();
        let mut active = vec![true; n];
        let mut ids : Vec<usize> = (0..n).collect();
        let mut sizes = vec![1usize; n];
        let mut merges = Vec::with_capacity(n - 1);
        let mut nearest : Vec<Option<(usize, f64)>> = (0..n).map(|a| nearest_after(&work, &active, a) ).collect();

        for step in 0..(n - 1) {
            let (a, b, dab) = closest_pair(&nearest, &active)
                .ok_or_else(|| Error::invalid("No pair of active clusters left to merge"))?;

            for k in (0..n).filter(|k| active[*k] && *k != a && *k != b ) {
                let upd = linkage.update(work[(a, k)], work[(b, k)], dab, sizes[a], sizes[b], sizes[k]);
                work[(a, k)] = upd;
                work[(k, a)] = upd;
            }

            let merge = Merge {
                left : ids[a].min(ids[b]),
                right : ids[a].max(ids[b]),
                distance : dab,
                size : sizes[a] + sizes[b]
            };
            trace!("Merge {}: {} + {} at {} (size {})", step, merge.left, merge.right, merge.distance, merge.size);
            merges.push(merge);

            active[b] = false;
            ids[a] = n + step;
            sizes[a] += sizes[b];
            nearest[b] = None;
            nearest[a] = nearest_after(&work, &active, a);
            for k in (0..n).filter(|k| active[*k] && *k != a ) {
                match nearest[k] {
                    Some((nk, _)) if nk == a || nk == b => {
                        nearest[k] = nearest_after(&work, &active, k);
                    },
                    Some((nk, dk)) if k < a && (work[(k, a)] < dk || (work[(k, a)] == dk && a < nk)) => {
                        nearest[k] = Some((a, work[(k, a)]));
                    },
                    None if k < a => {
                        nearest[k] = Some((a, work[(k, a)]));
                    },
                    _ => { }
                }
            }
        }

        debug!("Built {} linkage dendrogram over {} observations (root height {})", linkage, n, merges[n-2].distance);
        Ok(Self { n_leaves : n, linkage, merges })
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges[..]
    }

    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    pub fn n_leaves(&self) -> usize {
        self.n_leaves
    }

    /// Merge distances, in merge order.
    pub fn heights(&self) -> Vec<f64> {
        self.merges.iter().map(|m| m.distance ).collect()
    }

    /// Whether merge distances never decrease from the leaves to the root.
    pub fn is_monotone(&self) -> bool {
        self.merges.windows(2).all(|w| w[0].distance <= w[1].distance )
    }

    /// Returns the assignment into k clusters by undoing the last k-1 merges. Cluster ids are
    /// numbered 1..=k by order of first appearance, scanning observations by their original index.
    pub fn cut(&self, k : usize) -> Result<Assignment> {
        if k < 1 || k > self.n_leaves {
            return Err(Error::invalid(format!("Cannot cut {} observations into {} clusters", self.n_leaves, k)));
        }
        let applied = self.merges.iter().enumerate().take(self.n_leaves - k);
        let assign = self.assignment_from(applied);
        debug_assert!(assign.n_clusters() == k);
        Ok(assign)
    }

    /// Returns the assignment obtained by applying all merges at a distance at or below h.
    pub fn cut_height(&self, h : f64) -> Assignment {
        self.assignment_from(self.merges.iter().enumerate().filter(|(_, m)| m.distance <= h ))
    }

    /// Applies the informed (position, merge) pairs to the singletons with a union-find
    /// over cluster ids, and labels each observation by the root of its tree.
    fn assignment_from<'a>(&self, applied : impl Iterator<Item=(usize, &'a Merge)>) -> Assignment {
        let n = self.n_leaves;
        let mut parent : Vec<usize> = (0..(2*n - 1)).collect();
        for (pos, merge) in applied {
            parent[merge.left] = n + pos;
            parent[merge.right] = n + pos;
        }
        let roots : Vec<usize> = (0..n).map(|leaf| {
            let mut node = leaf;
            while parent[node] != node {
                node = parent[node];
            }
            node
        }).collect();
        Assignment::from_labels(&roots[..])
    }

    /// Leaf ordering such that the branches of the dendrogram do not cross when drawn
    /// (depth-first from the root, left before right).
    pub fn order(&self) -> Vec<usize> {
        let n = self.n_leaves;
        let mut order = Vec::with_capacity(n);
        let mut stack = vec![2*n - 2];
        while let Some(node) = stack.pop() {
            if node < n {
                order.push(node);
            } else {
                let merge = &self.merges[node - n];
                stack.push(merge.right);
                stack.push(merge.left);
            }
        }
        order
    }

}

/// Closest active slot after a (and its distance to a), keeping the lowest slot among ties.
fn nearest_after(work : &DMatrix<f64>, active : &[bool], a : usize) -> Option<(usize, f64)> {
    let mut best : Option<(usize, f64)> = None;
    for b in ((a + 1)..active.len()).filter(|b| active[*b] ) {
        let d = work[(a, b)];
        if best.map(|(_, best_d)| d < best_d ).unwrap_or(true) {
            best = Some((b, d));
        }
    }
    best
}

/// Scans the nearest neighbour of each active slot in slot order, which finds the same pair as
/// a row-major scan of the upper triangle keeping the first minimum.
fn closest_pair(nearest : &[Option<(usize, f64)>], active : &[bool]) -> Option<(usize, usize, f64)> {
    let mut best : Option<(usize, usize, f64)> = None;
    for (a, nn) in nearest.iter().enumerate().filter(|(a, _)| active[*a] ) {
        if let Some((b, d)) = nn {
            if best.map(|(_, _, best_d)| *d < best_d ).unwrap_or(true) {
                best = Some((a, *b, *d));
            }
        }
    }
    best
}

/// Hierarchical clustering straight from a tall sample matrix, using Euclidian distances between rows.
impl Estimator for Dendrogram {

    type Settings = Linkage;

    type Error = Error;

    fn estimate(sample : &DMatrix<f64>, linkage : Linkage) -> Result<Self> {
        let dist = DistanceMatrix::euclidean(sample)?;
        Dendrogram::build(&dist, linkage)
    }

}
