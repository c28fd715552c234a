//! k-nearest-neighbor index (Euclidean distance)
//!
//! The scaled training matrix is the persisted form of the index. Row `i` of
//! the matrix is row `i` of the indexed tracks table; the index never reorders
//! rows. On fit (and on load) the matrix is also placed in a kiddo k-d tree
//! sized to the feature count, which answers queries in squared Euclidean
//! distance.
//!
//! kiddo's mutable tree cannot split a bucket whose points all share one value
//! on the split axis. Matrices where too many rows share a value on some axis
//! (popularity ties are common) are therefore searched by an exact linear scan
//! instead. Both paths return the same rows and distances.

use kiddo::float::kdtree::KdTree;
use kiddo::SquaredEuclidean;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::{Error, Result};

/// Default neighbor cap used when none is configured
pub const DEFAULT_NEIGHBOR_CAP: usize = 10;

/// Points per k-d tree leaf
const TREE_BUCKET: usize = 256;

/// Most rows allowed to share one value on any axis before falling back to
/// the linear scan
const MAX_SHARED_AXIS_VALUES: usize = TREE_BUCKET / 2;

type Tree<const K: usize> = KdTree<f64, u64, K, TREE_BUCKET, u32>;

/// One query hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Row in the training matrix (and the indexed tracks table)
    pub row: usize,
    /// Euclidean distance in scaled feature space
    pub distance: f64,
}

/// k-d tree over one of the supported feature counts
#[derive(Clone)]
enum FeatureTree {
    D1(Tree<1>),
    D2(Tree<2>),
    D3(Tree<3>),
    D4(Tree<4>),
    D5(Tree<5>),
}

impl FeatureTree {
    /// `None` when the dimension count is unsupported or the matrix has too
    /// many shared axis values
    fn build(matrix: &[Vec<f64>], dims: usize) -> Option<Self> {
        let shared = max_shared_axis_values(matrix, dims);
        if shared > MAX_SHARED_AXIS_VALUES {
            debug!(shared, rows = matrix.len(), "Axis ties too dense for k-d tree, using linear scan");
            return None;
        }
        match dims {
            1 => Some(FeatureTree::D1(fill_tree(matrix))),
            2 => Some(FeatureTree::D2(fill_tree(matrix))),
            3 => Some(FeatureTree::D3(fill_tree(matrix))),
            4 => Some(FeatureTree::D4(fill_tree(matrix))),
            5 => Some(FeatureTree::D5(fill_tree(matrix))),
            _ => None,
        }
    }

    fn nearest(&self, point: &[f64], k: usize) -> Vec<Neighbor> {
        match self {
            FeatureTree::D1(tree) => nearest_in(tree, point, k),
            FeatureTree::D2(tree) => nearest_in(tree, point, k),
            FeatureTree::D3(tree) => nearest_in(tree, point, k),
            FeatureTree::D4(tree) => nearest_in(tree, point, k),
            FeatureTree::D5(tree) => nearest_in(tree, point, k),
        }
    }
}

impl fmt::Debug for FeatureTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims = match self {
            FeatureTree::D1(_) => 1,
            FeatureTree::D2(_) => 2,
            FeatureTree::D3(_) => 3,
            FeatureTree::D4(_) => 4,
            FeatureTree::D5(_) => 5,
        };
        f.debug_struct("FeatureTree").field("dims", &dims).finish()
    }
}

fn fill_tree<const K: usize>(matrix: &[Vec<f64>]) -> Tree<K> {
    let mut tree: Tree<K> = KdTree::new();
    for (row, values) in matrix.iter().enumerate() {
        if let Ok(point) = <[f64; K]>::try_from(values.as_slice()) {
            tree.add(&point, row as u64);
        }
    }
    tree
}

fn nearest_in<const K: usize>(tree: &Tree<K>, point: &[f64], k: usize) -> Vec<Neighbor> {
    let Ok(query) = <[f64; K]>::try_from(point) else {
        return Vec::new();
    };
    tree.nearest_n::<SquaredEuclidean>(&query, k)
        .into_iter()
        .map(|n| Neighbor {
            row: n.item as usize,
            distance: n.distance.sqrt(),
        })
        .collect()
}

/// Largest number of rows sharing one value on any single axis
fn max_shared_axis_values(matrix: &[Vec<f64>], dims: usize) -> usize {
    (0..dims)
        .map(|axis| {
            let mut column: Vec<f64> = matrix.iter().map(|row| row[axis]).collect();
            column.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
            let (mut longest, mut run) = (0usize, 0usize);
            for (i, value) in column.iter().enumerate() {
                run = if i > 0 && column[i - 1] == *value { run + 1 } else { 1 };
                longest = longest.max(run);
            }
            longest
        })
        .max()
        .unwrap_or(0)
}

/// On-disk form of [`NeighborIndex`]
#[derive(Serialize, Deserialize)]
struct StoredIndex {
    build_id: Uuid,
    n_neighbors: usize,
    matrix: Vec<Vec<f64>>,
}

/// Fitted neighbor index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "StoredIndex", into = "StoredIndex")]
pub struct NeighborIndex {
    /// Index build this structure belongs to (shared with the scaler)
    pub build_id: Uuid,
    /// Upper bound on neighbors returned by one query
    pub n_neighbors: usize,
    /// Scaled training vectors, one per indexed track
    matrix: Vec<Vec<f64>>,
    tree: Option<Arc<FeatureTree>>,
}

impl TryFrom<StoredIndex> for NeighborIndex {
    type Error = Error;

    fn try_from(stored: StoredIndex) -> Result<Self> {
        NeighborIndex::fit(stored.build_id, stored.n_neighbors, stored.matrix)
    }
}

impl From<NeighborIndex> for StoredIndex {
    fn from(index: NeighborIndex) -> Self {
        StoredIndex {
            build_id: index.build_id,
            n_neighbors: index.n_neighbors,
            matrix: index.matrix,
        }
    }
}

impl PartialEq for NeighborIndex {
    fn eq(&self, other: &Self) -> bool {
        self.build_id == other.build_id && self.n_neighbors == other.n_neighbors && self.matrix == other.matrix
    }
}

impl NeighborIndex {
    /// Fit the index over already-scaled vectors
    pub fn fit(build_id: Uuid, n_neighbors: usize, matrix: Vec<Vec<f64>>) -> Result<Self> {
        if n_neighbors == 0 {
            return Err(Error::InvalidInput("neighbor cap must be at least 1".to_string()));
        }
        let dims = match matrix.first() {
            Some(first) => first.len(),
            None => return Err(Error::EmptyTrainingSet("no rows to index".to_string())),
        };
        if matrix.iter().any(|row| row.len() != dims) {
            return Err(Error::InvalidInput("training rows differ in length".to_string()));
        }
        if let Some(bad) = matrix.iter().position(|row| row.iter().any(|x| !x.is_finite())) {
            return Err(Error::InvalidInput(format!("training row {} holds a non-finite value", bad)));
        }

        let tree = FeatureTree::build(&matrix, dims).map(Arc::new);
        Ok(Self {
            build_id,
            n_neighbors,
            matrix,
            tree,
        })
    }

    pub fn len(&self) -> usize {
        self.matrix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.matrix.first().map_or(0, Vec::len)
    }

    /// True when queries go through the k-d tree rather than the linear scan
    pub fn is_tree_backed(&self) -> bool {
        self.tree.is_some()
    }

    /// Scaled training vector for one row
    pub fn vector(&self, row: usize) -> Option<&[f64]> {
        self.matrix.get(row).map(Vec::as_slice)
    }

    /// Nearest rows to `point`, nearest first
    ///
    /// At most `min(k, n_neighbors, len)` hits. Equal distances are ordered
    /// by row.
    pub fn query(&self, point: &[f64], k: usize) -> Result<Vec<Neighbor>> {
        if point.len() != self.dims() {
            return Err(Error::InvalidInput(format!(
                "query has {} dimensions, index has {}",
                point.len(),
                self.dims()
            )));
        }
        if point.iter().any(|x| !x.is_finite()) {
            return Err(Error::InvalidInput("query holds a non-finite value".to_string()));
        }

        let k = k.min(self.n_neighbors).min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut hits = match &self.tree {
            Some(tree) => tree.nearest(point, k),
            None => self.scan(point),
        };
        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then(a.row.cmp(&b.row))
        });
        hits.truncate(k);
        Ok(hits)
    }

    fn scan(&self, point: &[f64]) -> Vec<Neighbor> {
        self.matrix
            .iter()
            .enumerate()
            .map(|(row, v)| Neighbor {
                row,
                distance: euclidean(point, v),
            })
            .collect()
    }
}

/// Euclidean distance between two vectors of equal length
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
