use ::csv;
use std::io::Read;
use crate::error::{Error, Result};
use super::{LoadSettings, LabelColumn};

/// CSV files might have unnamed columns. If every header entry parses as a number,
/// the "header" is actually the first data line: attribute names "(Column {i})" to
/// the columns and return them with the first line. If the first line has valid names,
/// return None.
pub fn try_convert_header_to_data(header : &[String]) -> Option<(Vec<String>, Vec<String>)> {
    let mut new_header = Vec::new();
    let mut first_line = Vec::new();
    for (i, e) in header.iter().enumerate() {
        if e.trim().parse::<f64>().is_ok() {
            new_header.push(format!("(Column {})", i));
            first_line.push(e.clone());
        }
    }
    if !header.is_empty() && new_header.len() == header.len() {
        Some((new_header, first_line))
    } else {
        None
    }
}

/// Raw content of a CSV table: feature names, the textual label column (if any) and the
/// numeric cells, stored row-major.
pub(crate) struct Parsed {
    pub features : Vec<String>,
    pub labels : Option<Vec<String>>,
    pub values : Vec<f64>,
    pub n_rows : usize
}

fn label_position(
    settings : &LoadSettings,
    names : &[String]
) -> Result<Option<usize>> {
    match &settings.label_column {
        None => Ok(None),
        Some(LabelColumn::Index(ix)) => {
            if *ix < names.len() {
                Ok(Some(*ix))
            } else {
                Err(Error::invalid(format!("Label column {} outside the {} available columns", ix, names.len())))
            }
        },
        Some(LabelColumn::Name(name)) => {
            names.iter()
                .position(|n| n == name )
                .map(Some)
                .ok_or_else(|| Error::invalid(format!("No column named '{}'", name)))
        }
    }
}

fn push_record(
    parsed : &mut Parsed,
    record : impl Iterator<Item=String>,
    label_pos : Option<usize>,
    row : usize
) -> Result<()> {
    for (column, entry) in record.enumerate() {
        if Some(column) == label_pos {
            if let Some(labels) = parsed.labels.as_mut() {
                labels.push(entry);
            }
            continue;
        }
        let value = entry.trim().parse::<f64>()
            .map_err(|_| Error::Parse { row, column, value : entry.clone() })?;
        parsed.values.push(value);
    }
    parsed.n_rows += 1;
    Ok(())
}

pub(crate) fn parse(src : impl Read, settings : &LoadSettings) -> Result<Parsed> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(settings.header != Some(false))
        .delimiter(settings.delimiter)
        .from_reader(src);

    let mut parsed = Parsed { features : Vec::new(), labels : None, values : Vec::new(), n_rows : 0 };
    let mut first_line = None;
    let names : Vec<String> = if settings.header == Some(false) {
        Vec::new()
    } else {
        let header : Vec<String> = reader.headers()?.iter().map(|h| h.to_string() ).collect();
        match (settings.header, try_convert_header_to_data(&header[..])) {
            (None, Some((names, line))) => {
                first_line = Some(line);
                names
            },
            _ => header
        }
    };

    let label_pos = if settings.header == Some(false) {
        // Without names, the label column can only be chosen by position.
        match &settings.label_column {
            Some(LabelColumn::Name(name)) => {
                return Err(Error::invalid(format!("Column '{}' cannot be located in a file without header", name)));
            },
            Some(LabelColumn::Index(ix)) => Some(*ix),
            None => None
        }
    } else {
        label_position(settings, &names[..])?
    };
    if label_pos.is_some() {
        parsed.labels = Some(Vec::new());
    }

    let mut row = 0;
    if let Some(line) = first_line {
        push_record(&mut parsed, line.into_iter(), label_pos, row)?;
        row += 1;
    }
    for record in reader.records() {
        let record = record?;
        push_record(&mut parsed, record.iter().map(|e| e.to_string() ), label_pos, row)?;
        row += 1;
    }
    if let Some(labels) = &parsed.labels {
        if labels.len() != parsed.n_rows {
            return Err(Error::invalid(format!("Label column found at {} of {} records", labels.len(), parsed.n_rows)));
        }
    }

    let n_cols = if parsed.n_rows > 0 { parsed.values.len() / parsed.n_rows } else { 0 };
    parsed.features = if names.is_empty() {
        (0..n_cols).map(|i| format!("(Column {})", i) ).collect()
    } else {
        names.into_iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != label_pos )
            .map(|(_, n)| n )
            .collect()
    };
    Ok(parsed)
}

/// Reads one label per non-empty line.
pub(crate) fn parse_labels(mut src : impl Read) -> Result<Vec<String>> {
    let mut content = String::new();
    src.read_to_string(&mut content)?;
    Ok(content.lines()
        .map(|l| l.trim().trim_matches('"').to_string() )
        .filter(|l| !l.is_empty() )
        .collect())
}
