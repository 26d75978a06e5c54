use csv::WriterBuilder;
use log::info;
use serde::Serialize;
use std::fs::File;
use std::path::Path;

use super::error::Error;
use netpath_common::types::{RankedPath, SignificantPath};
use netpath_core::mixture::{Hme3mFit, MixtureFit};
use netpath_core::ranker::CategoryRanking;
use netpath_core::sampler::NullScoreTable;

/// Separator for list-valued cells.
pub const LIST_SEPARATOR: &str = ";";

#[derive(Debug, Serialize)]
struct RankedRow<'a> {
    category: &'a str,
    rank: usize,
    genes: String,
    compounds: String,
    weights: String,
    distance: f64,
}

#[derive(Debug, Serialize)]
struct NullRow {
    length: usize,
    rank: usize,
    score: f64,
}

#[derive(Debug, Serialize)]
struct ScopeRow<'a> {
    target: &'a str,
    genes: String,
    compounds: String,
    weights: String,
    distance: f64,
    p_value: f64,
}

#[derive(Debug, Serialize)]
struct ClassificationRow {
    row: usize,
    component: usize,
    prediction: f64,
    class: u8,
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

fn writer(path: &Path) -> Result<csv::Writer<File>, Error> {
    let file = File::create(path)?;
    Ok(WriterBuilder::new().has_headers(true).from_writer(file))
}

fn ranked_row<'a>(category: &'a str, rank: usize, path: &RankedPath) -> RankedRow<'a> {
    RankedRow {
        category,
        rank,
        genes: join(&path.genes),
        compounds: join(&path.compounds),
        weights: join(&path.weights),
        distance: path.distance,
    }
}

/// Writes every category's ranked paths, best first, one row per path.
pub fn write_ranking(path: &Path, ranking: &CategoryRanking) -> Result<usize, Error> {
    let mut wtr = writer(path)?;
    let mut written = 0;
    for (category, paths) in &ranking.by_label {
        for (rank, ranked) in paths.iter().enumerate() {
            wtr.serialize(ranked_row(category, rank, ranked))?;
            written += 1;
        }
    }
    wtr.flush()?;
    info!("Wrote {} ranked path(s) to {}", written, path.display());
    Ok(written)
}

pub fn write_null_table(path: &Path, table: &NullScoreTable) -> Result<(), Error> {
    let mut wtr = writer(path)?;
    for (length, row) in table.rows() {
        for (rank, &score) in row.iter().enumerate() {
            wtr.serialize(NullRow { length, rank, score })?;
        }
    }
    wtr.flush()?;
    info!(
        "Wrote null table ({} lengths x {} samples) to {}",
        table.max_length(),
        table.samples(),
        path.display()
    );
    Ok(())
}

pub fn write_scope(path: &Path, paths: &[SignificantPath]) -> Result<(), Error> {
    let mut wtr = writer(path)?;
    for p in paths {
        wtr.serialize(ScopeRow {
            target: &p.target,
            genes: join(&p.genes),
            compounds: join(&p.compounds),
            weights: join(&p.weights),
            distance: p.distance,
            p_value: p.p_value,
        })?;
    }
    wtr.flush()?;
    info!("Wrote {} significant path(s) to {}", paths.len(), path.display());
    Ok(())
}

/// Writes `row,component,tied,h_0..h_{M-1}` for every path.
pub fn write_mixture(path: &Path, fit: &MixtureFit) -> Result<(), Error> {
    let mut wtr = writer(path)?;
    let components = fit.responsibilities.ncols();

    let mut header = vec!["row".to_string(), "component".to_string(), "tied".to_string()];
    header.extend((0..components).map(|k| format!("h_{}", k)));
    wtr.write_record(&header)?;

    for (i, h) in fit.responsibilities.rows().into_iter().enumerate() {
        let mut record = vec![
            i.to_string(),
            fit.labels[i].to_string(),
            fit.tied_rows.contains(&i).to_string(),
        ];
        record.extend(h.iter().map(f64::to_string));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    info!(
        "Wrote {} path assignment(s) over {} component(s) to {}",
        fit.labels.len(),
        components,
        path.display()
    );
    Ok(())
}

pub fn write_classification(path: &Path, fit: &Hme3mFit, threshold: f64) -> Result<(), Error> {
    let mut wtr = writer(path)?;
    let classes = fit.predicted_classes(threshold);
    for (i, (&prediction, class)) in fit.predictions.iter().zip(classes).enumerate() {
        wtr.serialize(ClassificationRow {
            row: i,
            component: fit.mixture.labels[i],
            prediction,
            class,
        })?;
    }
    wtr.flush()?;
    info!("Wrote {} prediction(s) to {}", fit.predictions.len(), path.display());
    Ok(())
}
