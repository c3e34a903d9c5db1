use std::error::Error;
use nalgebra::DMatrix;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use unsup::{Estimator, PCA, PCASettings, Dendrogram, Linkage, KMeans, KMeansSettings};
use unsup::calc;
use unsup::feature::metric::{ContingencyTable, adjusted_rand_index};

/// Three Gaussian groups of 20 observations in 50 dimensions, with the
/// group name of each observation.
fn blobs(rng : &mut StdRng) -> Result<(DMatrix<f64>, Vec<String>), Box<dyn Error>> {
    let names = ["A", "B", "C"];
    let centers = Normal::new(0.0, 2.0).map_err(|e| format!("{:?}", e) )?;
    let noise = Normal::new(0.0, 1.0).map_err(|e| format!("{:?}", e) )?;
    let means : Vec<Vec<f64>> = names.iter()
        .map(|_| (0..50).map(|_| centers.sample(rng) ).collect() )
        .collect();
    let mut m = DMatrix::zeros(60, 50);
    let mut labels = Vec::new();
    for i in 0..60 {
        let g = i / 20;
        for j in 0..50 {
            m[(i, j)] = means[g][j] + noise.sample(rng);
        }
        labels.push(names[g].to_string());
    }
    Ok((m, labels))
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let mut rng = StdRng::seed_from_u64(2);
    let (m, labels) = blobs(&mut rng)?;

    let pca = PCA::estimate(&m, PCASettings::default())?;
    println!("{}", pca);

    let data = calc::standardize(&m, true)?.into_data();
    for linkage in [Linkage::Complete, Linkage::Average, Linkage::Single].iter() {
        let assign = Dendrogram::estimate(&data, *linkage)?.cut(3)?;
        println!("{} linkage (ARI = {:.3})", linkage, adjusted_rand_index(&labels[..], assign.labels())?);
        println!("{}", ContingencyTable::new(&labels[..], &assign)?);
    }

    let km = KMeans::estimate(&data, KMeansSettings { n_cluster : 3, n_start : 20, ..Default::default() })?;
    println!("{}", km);
    println!("k-means (ARI = {:.3})", adjusted_rand_index(&labels[..], km.assignment().labels())?);
    Ok(())
}
