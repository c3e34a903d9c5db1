use structopt::StructOpt;
use anyhow::{Context, bail};
use serde::Serialize;
use nalgebra::DMatrix;
use log::info;
use std::fs::File;
use std::path::{Path, PathBuf};
use unsup::{Estimator, PCA, PCASettings, Dendrogram, Linkage, KMeans, KMeansSettings, Assignment};
use unsup::calc;
use unsup::feature::metric::{ContingencyTable, adjusted_rand_index};
use unsup::table::{Dataset, LoadSettings, LabelColumn};

#[derive(StructOpt, Debug)]
pub struct Input {

    /// Delimited table with one observation per row
    data : PathBuf,

    /// File with one class label per line, aligned with the table rows
    #[structopt(short, long)]
    labels : Option<PathBuf>,

    /// Name (or position) of the table column holding class labels
    #[structopt(long)]
    label_column : Option<String>,

    /// Read the first line of the table as data
    #[structopt(long)]
    no_header : bool,

    /// Center features without scaling them to unit variance
    #[structopt(long)]
    no_scale : bool,

    /// Write the result as JSON to this path
    #[structopt(short, long)]
    output : Option<PathBuf>
}

/// Unsupervised exploration of sample-by-feature matrices
#[derive(StructOpt, Debug)]
#[structopt(name = "unsup")]
pub enum Unsup {

    /// Principal component analysis: prints the variance explained by each component
    Pca {
        #[structopt(flatten)]
        input : Input
    },

    /// Agglomerative hierarchical clustering, cut at a fixed number of clusters
    Hclust {
        #[structopt(flatten)]
        input : Input,

        /// complete, average, single or ward
        #[structopt(long, default_value = "complete")]
        linkage : Linkage,

        #[structopt(short)]
        k : usize,

        /// Cluster the scores of the first principal components instead of the features
        #[structopt(long)]
        pca : Option<usize>
    },

    /// K-means clustering with multiple restarts
    Kmeans {
        #[structopt(flatten)]
        input : Input,

        #[structopt(short)]
        k : Option<usize>,

        #[structopt(long, default_value = "20")]
        nstart : usize,

        #[structopt(long, default_value = "0")]
        seed : u64,

        #[structopt(long, default_value = "100")]
        max_iter : usize,

        /// JSON file with the k-means settings (flags above are ignored, except for -k)
        #[structopt(long)]
        config : Option<PathBuf>
    }
}

fn open_dataset(input : &Input) -> anyhow::Result<Dataset> {
    let label_column = input.label_column.as_ref().map(|c| {
        match c.parse::<usize>() {
            Ok(ix) => LabelColumn::Index(ix),
            Err(_) => LabelColumn::Name(c.clone())
        }
    });
    let header = if input.no_header { Some(false) } else { None };
    let settings = LoadSettings { header, label_column, ..Default::default() };
    let mut ds = Dataset::from_csv(&input.data, &settings)
        .with_context(|| format!("Error opening table {}", input.data.display()))?;
    if let Some(path) = &input.labels {
        let f = File::open(path).with_context(|| format!("Error opening labels {}", path.display()))?;
        ds = ds.load_labels(f)?;
    }
    Ok(ds)
}

fn print_or_save(result : &impl Serialize, opt_path : &Option<PathBuf>) -> anyhow::Result<()> {
    if let Some(path) = opt_path {
        let f = File::create(path).with_context(|| format!("Error creating {}", path.display()))?;
        serde_json::to_writer_pretty(f, result)?;
        info!("Result written to {}", path.display());
    }
    Ok(())
}

fn report(ds : &Dataset, assign : &Assignment) -> anyhow::Result<()> {
    println!("Cluster sizes: {:?}", assign.sizes());
    if let Some(labels) = ds.labels() {
        let table = ContingencyTable::new(labels, assign)?;
        println!("{}", table);
        println!("Adjusted Rand index against labels: {:.4}", adjusted_rand_index(labels, assign.labels())?);
    }
    Ok(())
}

fn load_kmeans_settings(path : &Path) -> anyhow::Result<KMeansSettings> {
    let f = File::open(path).with_context(|| format!("Error opening config {}", path.display()))?;
    let settings = serde_json::from_reader(f).with_context(|| format!("Invalid k-means settings at {}", path.display()))?;
    Ok(settings)
}

#[derive(Serialize)]
struct HClustOutput<'a> {
    dendrogram : &'a Dendrogram,
    assignment : &'a Assignment
}

fn run(cmd : Unsup) -> anyhow::Result<()> {
    match cmd {
        Unsup::Pca { input } => {
            let ds = open_dataset(&input)?;
            let pca = PCA::estimate(ds.matrix(), PCASettings { scale : !input.no_scale })?;
            print!("{}", pca);
            print_or_save(&pca, &input.output)
        },
        Unsup::Hclust { input, linkage, k, pca } => {
            let ds = open_dataset(&input)?;
            let data : DMatrix<f64> = match pca {
                Some(m) => {
                    let pca = PCA::estimate(ds.matrix(), PCASettings { scale : !input.no_scale })?;
                    if m < 1 || m > pca.n_components() {
                        bail!("Requested {} components, but only {} are available", m, pca.n_components());
                    }
                    pca.scores().columns(0, m).into_owned()
                },
                None => calc::standardize(ds.matrix(), !input.no_scale)?.into_data()
            };
            let dendro = Dendrogram::estimate(&data, linkage)?;
            let assign = dendro.cut(k)?;
            info!("Dendrogram root height: {}", dendro.heights().last().cloned().unwrap_or(0.0));
            report(&ds, &assign)?;
            print_or_save(&HClustOutput { dendrogram : &dendro, assignment : &assign }, &input.output)
        },
        Unsup::Kmeans { input, k, nstart, seed, max_iter, config } => {
            let ds = open_dataset(&input)?;
            let mut settings = match &config {
                Some(path) => load_kmeans_settings(path)?,
                None => KMeansSettings { n_start : nstart, seed, max_iter, ..Default::default() }
            };
            match (k, &config) {
                (Some(k), _) => settings.n_cluster = k,
                (None, None) => bail!("The number of clusters (-k) is required without --config"),
                (None, Some(_)) => { }
            }
            let data = calc::standardize(ds.matrix(), !input.no_scale)?.into_data();
            let km = KMeans::estimate(&data, settings)?;
            print!("{}", km);
            println!("Total within-cluster SS: {:.4} (best of {} restarts)", km.inertia(), km.restart_inertia().len());
            report(&ds, km.assignment())?;
            print_or_save(&km, &input.output)
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run(Unsup::from_args()) {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}
