use serde::{Serialize, Deserialize};
use std::collections::HashMap;
use std::hash::Hash;
use std::fmt;
use crate::fit::cluster::Assignment;
use crate::error::{Error, Result};

/// Cross-tabulation of known class labels (rows, in order of first appearance)
/// against cluster ids (columns, 1..=k).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContingencyTable {
    classes : Vec<String>,
    counts : Vec<Vec<usize>>
}

impl ContingencyTable {

    pub fn new(labels : &[String], assign : &Assignment) -> Result<Self> {
        if labels.len() != assign.len() {
            return Err(Error::invalid(format!("{} labels informed for {} observations", labels.len(), assign.len())));
        }
        let mut classes : Vec<String> = Vec::new();
        let mut counts : Vec<Vec<usize>> = Vec::new();
        for (label, id) in labels.iter().zip(assign.labels().iter()) {
            let row = match classes.iter().position(|c| c == label ) {
                Some(row) => row,
                None => {
                    classes.push(label.clone());
                    counts.push(vec![0; assign.n_clusters()]);
                    classes.len() - 1
                }
            };
            counts[row][*id - 1] += 1;
        }
        Ok(Self { classes, counts })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes[..]
    }

    /// Number of observations of the given class row allocated to the cluster with the given id.
    pub fn count(&self, row : usize, id : usize) -> usize {
        self.counts[row][id - 1]
    }

    pub fn n_clusters(&self) -> usize {
        self.counts.first().map(|r| r.len() ).unwrap_or(0)
    }

}

impl fmt::Display for ContingencyTable {

    fn fmt(&self, f : &mut fmt::Formatter) -> fmt::Result {
        let width = self.classes.iter().map(|c| c.len() ).max().unwrap_or(0).max(5) + 2;
        write!(f, "{:<w$}", "", w = width)?;
        for id in 1..=self.n_clusters() {
            write!(f, "{:>6}", id)?;
        }
        writeln!(f)?;
        for (class, row) in self.classes.iter().zip(self.counts.iter()) {
            write!(f, "{:<w$}", class, w = width)?;
            for c in row.iter() {
                write!(f, "{:>6}", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }

}

fn pairs(n : usize) -> f64 {
    (n as f64) * (n as f64 - 1.) / 2.
}

/// Pair counts of two labelings: (pairs together in both, pairs together in a, pairs together in b, all pairs).
fn pair_counts<A, B>(a : &[A], b : &[B]) -> Result<(f64, f64, f64, f64)>
where
    A : Eq + Hash,
    B : Eq + Hash
{
    if a.len() != b.len() {
        return Err(Error::invalid(format!("Labelings have different lengths ({} and {})", a.len(), b.len())));
    }
    if a.len() < 2 {
        return Err(Error::invalid("Comparing labelings requires at least 2 observations"));
    }
    let mut joint : HashMap<(&A, &B), usize> = HashMap::new();
    let mut margin_a : HashMap<&A, usize> = HashMap::new();
    let mut margin_b : HashMap<&B, usize> = HashMap::new();
    for (la, lb) in a.iter().zip(b.iter()) {
        *joint.entry((la, lb)).or_insert(0) += 1;
        *margin_a.entry(la).or_insert(0) += 1;
        *margin_b.entry(lb).or_insert(0) += 1;
    }
    let both = joint.values().map(|n| pairs(*n) ).sum::<f64>();
    let in_a = margin_a.values().map(|n| pairs(*n) ).sum::<f64>();
    let in_b = margin_b.values().map(|n| pairs(*n) ).sum::<f64>();
    Ok((both, in_a, in_b, pairs(a.len())))
}

/// Fraction of observation pairs on which two labelings agree (both together or both apart).
pub fn rand_index<A, B>(a : &[A], b : &[B]) -> Result<f64>
where
    A : Eq + Hash,
    B : Eq + Hash
{
    let (both, in_a, in_b, total) = pair_counts(a, b)?;
    Ok((total + 2. * both - in_a - in_b) / total)
}

/// Rand index corrected for the agreement expected between random labelings with the
/// same cluster sizes (1 for identical partitions, around 0 for independent ones).
pub fn adjusted_rand_index<A, B>(a : &[A], b : &[B]) -> Result<f64>
where
    A : Eq + Hash,
    B : Eq + Hash
{
    let (both, in_a, in_b, total) = pair_counts(a, b)?;
    let expected = in_a * in_b / total;
    let max = (in_a + in_b) / 2.;
    if max == expected {
        return Ok(1.0);
    }
    Ok((both - expected) / (max - expected))
}
