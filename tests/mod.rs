use nalgebra::DMatrix;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use unsup::*;
use unsup::calc;
use unsup::feature::metric::{rand_index, adjusted_rand_index};

const N_BLOBS : usize = 4;

/// Samples 64 observations from four Gaussian blobs (16 observations each) in 6830 dimensions,
/// returning the matrix and the blob of each observation.
fn gaussian_blobs(seed : u64) -> (DMatrix<f64>, Vec<usize>) {
    let (n, p) = (64, 6830);
    let mut rng = StdRng::seed_from_u64(seed);
    let center_distr = Normal::new(0.0, 1.5).unwrap();
    let noise = Normal::new(0.0, 1.0).unwrap();
    let centers : Vec<Vec<f64>> = (0..N_BLOBS)
        .map(|_| (0..p).map(|_| center_distr.sample(&mut rng) ).collect() )
        .collect();
    let blobs : Vec<usize> = (0..n).map(|i| i % N_BLOBS ).collect();
    let mut m = DMatrix::zeros(n, p);
    for i in 0..n {
        for j in 0..p {
            m[(i, j)] = centers[blobs[i]][j] + noise.sample(&mut rng);
        }
    }
    (m, blobs)
}

fn small_matrix(seed : u64) -> DMatrix<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut m = DMatrix::from_fn(10, 3, |_, _| rng.gen::<f64>() * 4.0 );
    // Rows 2 and 7 are identical.
    let dup = m.row(2).into_owned();
    m.set_row(7, &dup);
    m
}

#[test]
fn blobs_recovered_by_hierarchical_and_kmeans() {
    let (m, blobs) = gaussian_blobs(64);
    let standardized = calc::standardize(&m, true).unwrap();

    let dendro = Dendrogram::estimate(standardized.data(), Linkage::Complete).unwrap();
    let hc = dendro.cut(N_BLOBS).unwrap();
    assert_eq!(hc.n_clusters(), N_BLOBS);
    assert!(rand_index(hc.labels(), &blobs[..]).unwrap() > 0.9);

    let settings = KMeansSettings { n_cluster : N_BLOBS, n_start : 20, max_iter : 100, seed : 1, init : Init::Forgy };
    let km = KMeans::estimate(standardized.data(), settings).unwrap();
    assert!(rand_index(km.assignment().labels(), &blobs[..]).unwrap() > 0.9);
    assert!(adjusted_rand_index(km.assignment().labels(), hc.labels()).unwrap() > 0.8);
}

#[test]
fn blobs_dominate_leading_components() {
    let (m, blobs) = gaussian_blobs(7);
    let pca = PCA::estimate(&m, PCASettings { scale : true }).unwrap();
    assert_eq!(pca.n_components(), 63);
    // Between-blob structure lives in the first N_BLOBS - 1 components.
    let pve = pca.pve();
    assert!(pve[0] > pve[N_BLOBS]);
    let leading = pca.scores().columns(0, N_BLOBS - 1).into_owned();
    let hc = Dendrogram::estimate(&leading, Linkage::Complete).unwrap().cut(N_BLOBS).unwrap();
    assert!(rand_index(hc.labels(), &blobs[..]).unwrap() > 0.9);
}

#[test]
fn duplicate_rows_share_cluster() {
    let m = small_matrix(3);
    for linkage in [Linkage::Complete, Linkage::Average, Linkage::Single, Linkage::Ward].iter() {
        let dendro = Dendrogram::estimate(&m, *linkage).unwrap();
        assert_eq!(dendro.merges()[0].distance, 0.0);
        for k in 1..10 {
            let a = dendro.cut(k).unwrap();
            assert_eq!(a.labels()[2], a.labels()[7]);
        }
    }
    for seed in 0..25 {
        for init in [Init::Forgy, Init::PlusPlus, Init::Farthest].iter() {
            let settings = KMeansSettings { n_cluster : 3, n_start : 2, max_iter : 100, seed, init : *init };
            let km = KMeans::estimate(&m, settings).unwrap();
            assert_eq!(km.assignment().labels()[2], km.assignment().labels()[7]);
            assert_eq!(km.assignment().n_clusters(), 3);
        }
    }
}

#[test]
fn cut_covers_every_sample() {
    let m = small_matrix(9);
    let dist = DistanceMatrix::euclidean(&m).unwrap();
    for linkage in [Linkage::Complete, Linkage::Average, Linkage::Single].iter() {
        let dendro = Dendrogram::build(&dist, *linkage).unwrap();
        assert!(dendro.is_monotone());
        assert_eq!(dendro.merges().len(), 9);
        assert_eq!(dendro.merges()[8].size, 10);
        for k in 1..=10 {
            let a = dendro.cut(k).unwrap();
            assert_eq!(a.len(), 10);
            assert_eq!(a.sizes().len(), k);
            assert!(a.labels().iter().all(|l| *l >= 1 && *l <= k ));
        }
        let singletons = dendro.cut(10).unwrap();
        assert_eq!(singletons.sizes(), vec![1; 10]);
        let whole = dendro.cut(1).unwrap();
        assert_eq!(whole.sizes(), vec![10]);
    }
}

#[test]
fn standardized_pipeline_properties() {
    let mut rng = StdRng::seed_from_u64(21);
    let m = DMatrix::from_fn(30, 8, |_, j| rng.gen::<f64>() * (j as f64 + 1.) + j as f64 );
    let standardized = calc::standardize(&m, true).unwrap();
    let means = calc::column_means(standardized.data());
    let sds = calc::column_sd(standardized.data());
    assert!(means.iter().all(|v| v.abs() < 1E-9 ));
    assert!(sds.iter().all(|v| (v - 1.).abs() < 1E-6 ));

    let pca = PCA::estimate(&m, PCASettings::default()).unwrap();
    assert!((pca.explained_variance().sum() - 8.0).abs() < 1E-8);
    let expected = standardized.data() * pca.loadings();
    assert!((expected - pca.scores()).abs().max() < 1E-8);
}

#[test]
fn results_serialize_to_json() {
    let m = small_matrix(5);
    let dendro = Dendrogram::estimate(&m, Linkage::Average).unwrap();
    let json = serde_json::to_string(&dendro).unwrap();
    assert!(json.contains("merges"));
    let back : Dendrogram = serde_json::from_str(&json).unwrap();
    assert_eq!(back.merges(), dendro.merges());
}
