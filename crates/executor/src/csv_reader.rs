use csv::ReaderBuilder;
use log::{debug, info};
use ndarray::{Array1, Array2};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use super::error::Error;
use super::types::PathMatrix;
use netpath_common::error::Error as NetpathError;
use netpath_common::types::Edge;
use netpath_core::graph::Graph;
use netpath_core::sampler::NullScoreTable;

/// Category given to edges of a file without a `category` column.
pub const DEFAULT_CATEGORY: &str = "all";

const LABEL_COLUMN: &str = "label";

#[derive(Debug, Deserialize)]
struct VertexRecord {
    name: String,
}

// Helper struct for CSV parsing
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EdgeRecord {
    pub from: usize,
    pub to: usize,
    pub label: String,
    pub weight: f64,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NullRecord {
    length: usize,
    score: f64,
}

fn reader(path: &Path) -> Result<csv::Reader<File>, Error> {
    let file = File::open(path).map_err(|e| {
        log::error!("Failed to read file {}: {:?}", path.display(), e);
        Error::Io(e)
    })?;
    Ok(ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_reader(file))
}

fn malformed(message: String) -> Error {
    Error::Core(NetpathError::MalformedInput(message))
}

pub fn read_vertices(path: &Path) -> Result<Vec<String>, Error> {
    let mut rdr = reader(path)?;
    let mut names = Vec::new();
    for result in rdr.deserialize() {
        let record: VertexRecord = result?;
        names.push(record.name);
    }
    Ok(names)
}

pub fn read_edges(path: &Path) -> Result<Vec<EdgeRecord>, Error> {
    let mut rdr = reader(path)?;
    let mut edges = Vec::new();
    for result in rdr.deserialize() {
        let record: EdgeRecord = result?;
        edges.push(record);
    }
    Ok(edges)
}

/// Builds one graph per edge category over the shared vertex list, in category
/// order. Edges without a category fall under [`DEFAULT_CATEGORY`].
pub fn read_graphs(vertices: &Path, edges: &Path) -> Result<Vec<(String, Graph)>, Error> {
    let names = read_vertices(vertices)?;
    let records = read_edges(edges)?;

    let mut by_category: BTreeMap<String, (Vec<Edge>, Vec<f64>)> = BTreeMap::new();
    for record in records {
        let category = record
            .category
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        let (list, weights) = by_category.entry(category).or_default();
        list.push((record.from, record.to, record.label));
        weights.push(record.weight);
    }
    if by_category.is_empty() {
        return Err(Error::Core(NetpathError::EmptyEdgeList));
    }

    let graphs = by_category
        .into_iter()
        .map(|(category, (list, weights))| {
            let graph = Graph::from_parts(&names, &list, &weights)?;
            debug!(
                "Category '{}': {} vertices, {} edges",
                category,
                graph.num_vertices(),
                graph.num_edges()
            );
            Ok((category, graph))
        })
        .collect::<Result<Vec<_>, Error>>()?;
    info!("Loaded {} graph(s) from {}", graphs.len(), edges.display());
    Ok(graphs)
}

/// Reads the single graph of an edge file, ignoring categories.
pub fn read_graph(vertices: &Path, edges: &Path) -> Result<Graph, Error> {
    let names = read_vertices(vertices)?;
    let records = read_edges(edges)?;
    let weights: Vec<f64> = records.iter().map(|r| r.weight).collect();
    let list: Vec<Edge> = records
        .into_iter()
        .map(|r| (r.from, r.to, r.label))
        .collect();
    Ok(Graph::from_parts(&names, &list, &weights)?)
}

/// Reads a binary path matrix. Every column except `label` is a feature.
pub fn read_matrix(path: &Path) -> Result<PathMatrix, Error> {
    let mut rdr = reader(path)?;
    let headers = rdr.headers()?.clone();
    let label_column = headers.iter().position(|h| h == LABEL_COLUMN);
    let features: Vec<String> = headers
        .iter()
        .filter(|&h| h != LABEL_COLUMN)
        .map(str::to_string)
        .collect();

    let mut values = Vec::new();
    let mut labels = Vec::new();
    let mut rows = 0;
    for result in rdr.records() {
        let record = result?;
        for (j, field) in record.iter().enumerate() {
            let value: f64 = field.parse().map_err(|_| {
                malformed(format!(
                    "row {} column '{}': '{}' is not a number",
                    rows + 1,
                    headers.get(j).unwrap_or("?"),
                    field
                ))
            })?;
            if Some(j) == label_column {
                labels.push(value);
            } else {
                values.push(value);
            }
        }
        rows += 1;
    }

    let x = Array2::from_shape_vec((rows, features.len()), values)
        .map_err(|e| malformed(format!("path matrix shape: {}", e)))?;
    Ok(PathMatrix {
        features,
        x,
        labels: label_column.map(|_| Array1::from_vec(labels)),
    })
}

/// Reads a null table written as `length,rank,score` records.
pub fn read_null_table(path: &Path) -> Result<NullScoreTable, Error> {
    let mut rdr = reader(path)?;
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for result in rdr.deserialize() {
        let record: NullRecord = result?;
        if record.length == 0 {
            return Err(malformed("null table lengths start at 1".to_string()));
        }
        if rows.len() < record.length {
            rows.resize_with(record.length, Vec::new);
        }
        rows[record.length - 1].push(record.score);
    }
    Ok(NullScoreTable::from_rows(rows)?)
}
