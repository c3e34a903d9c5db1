use nalgebra::{DMatrix, DVector};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand::distributions::WeightedIndex;
use rayon::prelude::*;
use serde::{Serialize, Deserialize};
use log::{debug, warn};
use std::fmt;
use crate::fit::Estimator;
use crate::fit::cluster::{Assignment, squared_euclidian};
use crate::error::{Error, Result};

/// Strategy used to choose the initial centroids of each restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Init {

    /// k distinct observations taken uniformly at random.
    Forgy,

    /// k-means++: after a uniformly chosen first centroid, each next centroid is drawn
    /// with probability proportional to its squared distance to the closest chosen centroid.
    PlusPlus,

    /// After a uniformly chosen first centroid, each next centroid is the observation with
    /// the highest average distance to all centroids chosen so far.
    Farthest
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeansSettings {
    pub n_cluster : usize,
    pub n_start : usize,
    pub max_iter : usize,
    pub seed : u64,
    pub init : Init
}

impl Default for KMeansSettings {

    fn default() -> Self {
        Self { n_cluster : 2, n_start : 1, max_iter : 100, seed : 0, init : Init::Forgy }
    }

}

/// Outcome of a single restart. Allocations here are 0-based centroid indices.
#[derive(Debug, Clone)]
struct Run {
    allocations : Vec<usize>,
    means : Vec<DVector<f64>>,
    inertia : f64,
    n_iter : usize,
    converged : bool
}

/// Lloyd's k-means, restarted n_start times from independently seeded initial centroids,
/// keeping the restart of lowest inertia (the earliest one in case of ties).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeans {
    assignment : Assignment,
    means : Vec<DVector<f64>>,
    within_ss : Vec<f64>,
    total_ss : f64,
    n_iter : usize,
    converged : bool,
    best_restart : usize,
    restart_inertia : Vec<f64>
}

impl KMeans {

    /// Mean of each cluster, at position id-1 for the cluster ids returned by Self::assignment
    pub fn centroids(&self) -> &[DVector<f64>] {
        &self.means[..]
    }

    /// Return cluster of each observation, in the order they were supplied
    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    /// Sum of squared distances of each observation to its centroid (total within-cluster sum of squares).
    pub fn inertia(&self) -> f64 {
        self.within_ss.iter().sum()
    }

    /// Within-cluster sum of squares, per cluster.
    pub fn within_ss(&self) -> &[f64] {
        &self.within_ss[..]
    }

    /// Sum of squared distances of each observation to the grand mean.
    pub fn total_ss(&self) -> f64 {
        self.total_ss
    }

    pub fn between_ss(&self) -> f64 {
        self.total_ss - self.inertia()
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.assignment.sizes()
    }

    /// Lloyd iterations performed by the selected restart.
    pub fn iterations(&self) -> usize {
        self.n_iter
    }

    /// Whether the selected restart stopped because allocations stabilized (rather than
    /// by reaching max_iter).
    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn best_restart(&self) -> usize {
        self.best_restart
    }

    /// Final inertia of every restart, in restart order.
    pub fn restart_inertia(&self) -> &[f64] {
        &self.restart_inertia[..]
    }

    /// Lowest inertia found up to each restart.
    pub fn best_so_far(&self) -> Vec<f64> {
        self.restart_inertia.iter()
            .scan(f64::INFINITY, |best, i| {
                *best = best.min(*i);
                Some(*best)
            })
            .collect()
    }

}

impl fmt::Display for KMeans {

    fn fmt(&self, f : &mut fmt::Formatter) -> fmt::Result {
        let mut dst = String::new();
        for c in 0..self.means.len() {
            let obs_ix = self.assignment.members(c + 1);
            dst += &format!("Cluster {}: Size = {}; Within SS = {:.4}; Observations = {:?}\n", c + 1, obs_ix.len(), self.within_ss[c], obs_ix);
        }
        dst += &format!("Between SS / Total SS = {:.1}%\n", 100. * self.between_ss() / self.total_ss);
        write!(f, "{}", dst)
    }
}

fn closest(candidates : &[DVector<f64>], el : &DVector<f64>) -> usize {
    let mut min_dist = f64::INFINITY;
    let mut min_ix = 0;
    for (cand_ix, cand) in candidates.iter().enumerate() {
        let dist_to_cand = squared_euclidian(el.iter(), cand.iter());
        if dist_to_cand < min_dist {
            min_ix = cand_ix;
            min_dist = dist_to_cand;
        }
    }
    min_ix
}

fn update_means(
    means : &mut [DVector<f64>],
    sample : &[DVector<f64>],
    allocations : &[usize]
) {
    assert!(allocations.len() == sample.len());
    let obs_dim = sample[0].nrows();
    let mut counts = vec![0usize; means.len()];

    // Clear previous iteration info
    for m in means.iter_mut() {
        *m = DVector::zeros(obs_dim);
    }

    // Accumulate each observation into sum and count
    for (obs, alloc) in sample.iter().zip(allocations.iter()) {
        means[*alloc] += obs;
        counts[*alloc] += 1;
    }

    // Calculate averages from sum and accumulated count
    for (m, count) in means.iter_mut().zip(counts.iter()) {
        if *count > 0 {
            m.scale_mut(1. / (*count as f64));
        }
    }
}

/// Update allocation vector, returning how many observations were re-allocated.
/// Observations equidistant to several centroids go to the lowest centroid index.
fn update_allocations(
    allocations : &mut [usize],
    means : &[DVector<f64>],
    sample : &[DVector<f64>]
) -> usize {
    assert!(allocations.len() == sample.len());
    let mut n_reallocated = 0;
    for (alloc, obs) in allocations.iter_mut().zip(sample.iter()) {
        let best_alloc = closest(means, obs);
        if *alloc != best_alloc {
            *alloc = best_alloc;
            n_reallocated += 1;
        }
    }
    n_reallocated
}

/// Re-seeds every empty cluster (in ascending index order) with the observation farthest
/// from its own centroid, taken only from clusters with more than one member (the lowest
/// observation index in case of ties). Returns how many clusters were re-seeded.
fn reseed_empty(
    allocations : &mut [usize],
    means : &mut [DVector<f64>],
    sample : &[DVector<f64>]
) -> usize {
    let mut counts = vec![0usize; means.len()];
    for alloc in allocations.iter() {
        counts[*alloc] += 1;
    }
    let mut n_reseeded = 0;
    for c in 0..means.len() {
        if counts[c] > 0 {
            continue;
        }
        let mut farthest : Option<(usize, f64)> = None;
        for (ix, obs) in sample.iter().enumerate() {
            if counts[allocations[ix]] < 2 {
                continue;
            }
            let dist = squared_euclidian(obs.iter(), means[allocations[ix]].iter());
            if farthest.map(|(_, d)| dist > d ).unwrap_or(true) {
                farthest = Some((ix, dist));
            }
        }
        if let Some((ix, _)) = farthest {
            counts[allocations[ix]] -= 1;
            counts[c] += 1;
            allocations[ix] = c;
            means[c] = sample[ix].clone();
            n_reseeded += 1;
        }
    }
    n_reseeded
}

fn take_random_while_not_in<R : Rng>(rng : &mut R, chosen : &[usize], n : usize) -> usize {
    // If this condition is violated, we would loop forever.
    assert!(chosen.len() < n);
    loop {
        let rand_obs = rng.gen_range(0, n);
        if !chosen.iter().any(|p| *p == rand_obs) {
            return rand_obs;
        }
    }
}

fn initial_means<R : Rng>(rng : &mut R, sample : &[DVector<f64>], k : usize, init : Init) -> Vec<DVector<f64>> {
    let n = sample.len();
    let seeds : Vec<usize> = match init {
        Init::Forgy => {
            rand::seq::index::sample(&mut *rng, n, k).into_vec()
        },
        Init::PlusPlus => {
            let mut seeds = vec![rng.gen_range(0, n)];

            // Squared distance of each observation to its closest seed.
            let mut d2 : Vec<f64> = sample.iter()
                .map(|obs| squared_euclidian(obs.iter(), sample[seeds[0]].iter()) )
                .collect();
            while seeds.len() < k {
                let next = match WeightedIndex::new(&d2) {
                    Ok(w) => w.sample(&mut *rng),

                    // All remaining observations coincide with a seed.
                    Err(_) => take_random_while_not_in(rng, &seeds[..], n)
                };
                for (d, obs) in d2.iter_mut().zip(sample.iter()) {
                    *d = d.min(squared_euclidian(obs.iter(), sample[next].iter()));
                }
                seeds.push(next);
            }
            seeds
        },
        Init::Farthest => {
            // Take first seed as random. Then take next seed to be the observation that
            // is furthest from all the previously-encountered seeds (with the highest average
            // distance to all seeds), increasing the chance of taking seeds that are far apart.
            let mut seeds = vec![rng.gen_range(0, n)];
            while seeds.len() < k {
                let mut furthest_obs : Option<(usize, f64)> = None;
                for (ix, obs) in sample.iter().enumerate() {
                    if seeds.iter().any(|s| *s == ix ) {
                        continue;
                    }
                    let avg_dist = seeds.iter()
                        .map(|s| squared_euclidian(obs.iter(), sample[*s].iter()).sqrt() )
                        .sum::<f64>() / seeds.len() as f64;
                    if furthest_obs.map(|(_, d)| avg_dist > d ).unwrap_or(true) {
                        furthest_obs = Some((ix, avg_dist));
                    }
                }
                match furthest_obs {
                    Some((ix, _)) => seeds.push(ix),
                    None => break
                }
            }
            seeds
        }
    };
    seeds.iter().map(|s| sample[*s].clone() ).collect()
}

fn lloyd(sample : &[DVector<f64>], settings : &KMeansSettings, seed : u64) -> Run {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut means = initial_means(&mut rng, sample, settings.n_cluster, settings.init);

    // No observation starts allocated, so the first pass counts all of them as re-allocated.
    let mut allocations = vec![usize::MAX; sample.len()];
    let mut n_iter = 0;
    let mut converged = false;
    for _ in 0..settings.max_iter {
        n_iter += 1;
        let n_reallocated = update_allocations(&mut allocations[..], &means[..], sample);
        let n_reseeded = reseed_empty(&mut allocations[..], &mut means[..], sample);
        update_means(&mut means[..], sample, &allocations[..]);
        if n_reallocated == 0 && n_reseeded == 0 {
            converged = true;
            break;
        }
    }

    let inertia = sample.iter()
        .zip(allocations.iter())
        .map(|(obs, alloc)| squared_euclidian(obs.iter(), means[*alloc].iter()) )
        .sum();
    Run { allocations, means, inertia, n_iter, converged }
}

fn validate(sample : &DMatrix<f64>, settings : &KMeansSettings) -> Result<()> {
    let n = sample.nrows();
    if sample.ncols() == 0 {
        return Err(Error::invalid("K-means requires at least one feature"));
    }
    if settings.n_cluster < 1 || settings.n_cluster > n {
        return Err(Error::invalid(format!("Cannot partition {} observations into {} clusters", n, settings.n_cluster)));
    }
    if settings.n_start < 1 {
        return Err(Error::invalid("K-means requires at least one restart"));
    }
    if settings.max_iter < 1 {
        return Err(Error::invalid("K-means requires at least one iteration"));
    }
    Ok(())
}

impl Estimator for KMeans {

    type Settings = KMeansSettings;

    type Error = Error;

    fn estimate(
        sample : &DMatrix<f64>,
        settings : Self::Settings
    ) -> Result<Self> {
        validate(sample, &settings)?;

        let obs_dim = sample.ncols();
        let rows : Vec<DVector<f64>> = sample.row_iter()
            .map(|r| DVector::from_iterator(obs_dim, r.iter().cloned()) )
            .collect();

        // Seeds are drawn before any restart runs, so the result does not depend on scheduling.
        let mut master = StdRng::seed_from_u64(settings.seed);
        let seeds : Vec<u64> = (0..settings.n_start).map(|_| master.gen::<u64>() ).collect();

        let runs : Vec<Run> = seeds.par_iter()
            .map(|seed| lloyd(&rows[..], &settings, *seed) )
            .collect();

        let mut best_restart = 0;
        for (r, run) in runs.iter().enumerate() {
            debug!("K-means restart {}: inertia = {} after {} iterations (converged = {})", r, run.inertia, run.n_iter, run.converged);
            if run.inertia < runs[best_restart].inertia {
                best_restart = r;
            }
        }
        let restart_inertia : Vec<f64> = runs.iter().map(|r| r.inertia ).collect();
        let best = runs.into_iter().nth(best_restart)
            .ok_or_else(|| Error::invalid("K-means produced no restart"))?;
        if !best.converged {
            warn!("Best k-means restart ({}) did not converge in {} iterations", best_restart, settings.max_iter);
        }

        let mut within_ss = vec![0.0; settings.n_cluster];
        for (obs, alloc) in rows.iter().zip(best.allocations.iter()) {
            within_ss[*alloc] += squared_euclidian(obs.iter(), best.means[*alloc].iter());
        }
        let grand_mean = rows.iter().fold(DVector::<f64>::zeros(obs_dim), |acc, r| acc + r ) / rows.len() as f64;
        let total_ss = rows.iter().map(|r| squared_euclidian(r.iter(), grand_mean.iter()) ).sum();

        let ids = best.allocations.iter().map(|a| a + 1 ).collect();
        let assignment = Assignment::from_ids(ids, settings.n_cluster)?;
        Ok(Self {
            assignment,
            means : best.means,
            within_ss,
            total_ss,
            n_iter : best.n_iter,
            converged : best.converged,
            best_restart,
            restart_inertia
        })
    }

}
