use nalgebra::DMatrix;
use serde::{Serialize, Deserialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use log::info;
use crate::error::{Error, Result};

/// Parsing of numeric CSV tables with an optional textual label column.
pub mod csv;

/// Column holding the class label of each observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LabelColumn {
    Name(String),
    Index(usize)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadSettings {

    /// Whether the first line holds column names. If None, the first line is taken
    /// as data when all of its entries are numeric.
    pub header : Option<bool>,

    pub label_column : Option<LabelColumn>,

    pub delimiter : u8
}

impl Default for LoadSettings {

    fn default() -> Self {
        Self { header : None, label_column : None, delimiter : b',' }
    }

}

/// A sample matrix (observations are rows) with the name of each feature and,
/// optionally, the known class label of each observation.
#[derive(Debug, Clone)]
pub struct Dataset {
    matrix : DMatrix<f64>,
    features : Vec<String>,
    labels : Option<Vec<String>>
}

impl Dataset {

    pub fn new(matrix : DMatrix<f64>, labels : Option<Vec<String>>) -> Result<Self> {
        if let Some(labels) = &labels {
            if labels.len() != matrix.nrows() {
                return Err(Error::invalid(format!("{} labels informed for {} observations", labels.len(), matrix.nrows())));
            }
        }
        let features = (0..matrix.ncols()).map(|i| format!("(Column {})", i) ).collect();
        Ok(Self { matrix, features, labels })
    }

    /// Reads a table in which every cell outside the label column is a number.
    pub fn from_reader(src : impl Read, settings : &LoadSettings) -> Result<Self> {
        let parsed = csv::parse(src, settings)?;
        if parsed.n_rows == 0 {
            return Err(Error::invalid("Table has no records"));
        }
        let n_cols = parsed.values.len() / parsed.n_rows;
        let matrix = DMatrix::from_row_slice(parsed.n_rows, n_cols, &parsed.values[..]);
        Ok(Self { matrix, features : parsed.features, labels : parsed.labels })
    }

    pub fn from_csv(path : impl AsRef<Path>, settings : &LoadSettings) -> Result<Self> {
        let f = File::open(path.as_ref())?;
        let ds = Self::from_reader(f, settings)?;
        info!("Loaded {} observations x {} features from {}", ds.n_samples(), ds.n_features(), path.as_ref().display());
        Ok(ds)
    }

    /// Loads a headerless numeric table and a separate file with one label per line.
    pub fn load(matrix_path : impl AsRef<Path>, labels_path : impl AsRef<Path>) -> Result<Self> {
        let settings = LoadSettings { header : Some(false), ..Default::default() };
        let ds = Self::from_csv(matrix_path, &settings)?;
        let labels = csv::parse_labels(File::open(labels_path)?)?;
        ds.with_labels(labels)
    }

    /// Replaces the labels of this dataset by labels read from the informed source.
    pub fn load_labels(self, src : impl Read) -> Result<Self> {
        let labels = csv::parse_labels(src)?;
        self.with_labels(labels)
    }

    pub fn with_labels(self, labels : Vec<String>) -> Result<Self> {
        let features = self.features;
        let mut ds = Self::new(self.matrix, Some(labels))?;
        ds.features = features;
        Ok(ds)
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_ref().map(|l| &l[..] )
    }

    pub fn features(&self) -> &[String] {
        &self.features[..]
    }

    pub fn n_samples(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.matrix.ncols()
    }

}
