//! Defines the spatial field that the pair kernels traverse.
//!
//! A [`KField`] is a binary tree of cells, built over the points of a
//! [`ScalarPoints`] collection. Each cell summarizes the points it contains
//! (count, total weight, weighted sum of values, weighted centroid, and
//! size), which lets the kernels treat a pair of distant cells as a single
//! aggregated pair.
//!
//! The cells are stored in a flat arena and refer to their children by
//! index. The nodes at depth `max_top` (or leaves that are shallower than
//! that) are the "top-level" cells: they are the units of work that get
//! distributed among threads.

use crate::metric::euclidean_dist_sq;
use crate::points::ScalarPoints;

/// How a cell gets divided between its 2 children. In every case, we split
/// along the dimension with the largest extent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SplitMethod {
    /// split at the midpoint of the cell's bounding box
    Middle,
    /// split at the median position, producing children with equal counts
    Median,
    /// split at the mean position
    #[default]
    Mean,
}

#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// number of points in the cell
    pub(crate) n: f64,
    /// sum of the weights
    pub(crate) w: f64,
    /// weighted sum of the values
    pub(crate) wk: f64,
    /// weighted centroid
    pub(crate) pos: [f64; 3],
    /// maximum distance between the centroid and any member
    pub(crate) size: f64,
    pub(crate) children: Option<[usize; 2]>,
}

#[derive(Clone, Copy)]
struct Entry {
    pos: [f64; 3],
    w: f64,
    k: f64,
}

struct BuildParams {
    min_size: f64,
    split_method: SplitMethod,
    max_top: usize,
}

#[derive(Clone, Debug)]
pub struct KField {
    cells: Vec<Cell>,
    top: Vec<usize>,
    n_points: usize,
}

impl KField {
    /// Build the tree.
    ///
    /// `min_sep` is the (physical) minimum separation of the correlation and
    /// `b` is the tree-approximation tolerance. Cells no larger than
    /// `min_sep*b/(2+3b)` are never split, so `b = 0` produces a tree whose
    /// leaves are individual points (or coincident points).
    ///
    /// Points with zero weight never contribute to a correlation and are
    /// skipped.
    pub fn new(
        points: &ScalarPoints,
        min_sep: f64,
        b: f64,
        split_method: SplitMethod,
        max_top: usize,
    ) -> Self {
        let mut entries: Vec<Entry> = (0..points.n_points())
            .filter(|&i| points.get_weight(i) != 0.0)
            .map(|i| Entry {
                pos: points.get_position(i),
                w: points.get_weight(i),
                k: points.get_value(i),
            })
            .collect();

        let params = BuildParams {
            min_size: min_sep * b / (2.0 + 3.0 * b),
            split_method,
            max_top,
        };

        let mut field = KField {
            cells: Vec::with_capacity(2 * entries.len()),
            top: Vec::new(),
            n_points: entries.len(),
        };
        if !entries.is_empty() {
            field.build_cell(&mut entries, 0, &params);
        }
        field
    }

    /// the number of points in the field (excluding points with 0 weight)
    pub fn n_points(&self) -> usize {
        self.n_points
    }

    pub fn n_top_level(&self) -> usize {
        self.top.len()
    }

    /// the total weight of all points in the field
    pub fn total_weight(&self) -> f64 {
        self.top.iter().map(|&i| self.cells[i].w).sum()
    }

    pub(crate) fn cell(&self, index: usize) -> &Cell {
        &self.cells[index]
    }

    pub(crate) fn top(&self) -> &[usize] {
        &self.top
    }

    /// recursively builds a cell (and all of its descendants) from `entries`
    /// and returns its index
    fn build_cell(&mut self, entries: &mut [Entry], depth: usize, params: &BuildParams) -> usize {
        let (w, wk, pos) = summarize(entries);
        let size = entries
            .iter()
            .map(|e| euclidean_dist_sq(&e.pos, &pos))
            .fold(0.0, f64::max)
            .sqrt();

        let index = self.cells.len();
        self.cells.push(Cell {
            n: entries.len() as f64,
            w,
            wk,
            pos,
            size,
            children: None,
        });

        let is_leaf = entries.len() == 1 || size <= params.min_size;
        if depth == params.max_top || (is_leaf && depth < params.max_top) {
            self.top.push(index);
        }

        if !is_leaf {
            let mid = split_entries(entries, params.split_method);
            let (left_entries, right_entries) = entries.split_at_mut(mid);
            let left = self.build_cell(left_entries, depth + 1, params);
            let right = self.build_cell(right_entries, depth + 1, params);
            self.cells[index].children = Some([left, right]);
        }
        index
    }
}

/// computes the total weight, weighted sum of values, and the weighted
/// centroid of a non-empty collection of entries
fn summarize(entries: &[Entry]) -> (f64, f64, [f64; 3]) {
    let mut w = 0.0;
    let mut wk = 0.0;
    let mut wpos = [0.0; 3];
    for e in entries {
        w += e.w;
        wk += e.w * e.k;
        for k in 0..3 {
            wpos[k] += e.w * e.pos[k];
        }
    }

    let pos = if w != 0.0 {
        [wpos[0] / w, wpos[1] / w, wpos[2] / w]
    } else {
        // only happens with negative weights. Fall back to the plain mean
        let n = entries.len() as f64;
        let mut pos = [0.0; 3];
        for e in entries {
            for k in 0..3 {
                pos[k] += e.pos[k] / n;
            }
        }
        pos
    };
    (w, wk, pos)
}

/// reorders entries so that entries `[0, mid)` go to the left child and
/// entries `[mid, len)` go to the right child. Returns `mid`.
///
/// The caller must ensure that the entries don't all share a single position.
fn split_entries(entries: &mut [Entry], split_method: SplitMethod) -> usize {
    let mut lo = [f64::INFINITY; 3];
    let mut hi = [f64::NEG_INFINITY; 3];
    for e in entries.iter() {
        for k in 0..3 {
            lo[k] = lo[k].min(e.pos[k]);
            hi[k] = hi[k].max(e.pos[k]);
        }
    }
    let dim = (0..3)
        .max_by(|&a, &b| (hi[a] - lo[a]).total_cmp(&(hi[b] - lo[b])))
        .unwrap_or(0);

    let mid = match split_method {
        SplitMethod::Middle => partition(entries, dim, 0.5 * (lo[dim] + hi[dim])),
        SplitMethod::Mean => {
            let mean = entries.iter().map(|e| e.pos[dim]).sum::<f64>() / entries.len() as f64;
            partition(entries, dim, mean)
        }
        SplitMethod::Median => 0,
    };

    // a median split can't produce an empty child. It's also our fallback
    // when round-off produces a one-sided partition
    if mid == 0 || mid == entries.len() {
        let mid = entries.len() / 2;
        entries.select_nth_unstable_by(mid, |a, b| a.pos[dim].total_cmp(&b.pos[dim]));
        mid
    } else {
        mid
    }
}

/// moves every entry with `pos[dim] < split` to the front and returns the
/// number of such entries
fn partition(entries: &mut [Entry], dim: usize, split: f64) -> usize {
    let mut n_left = 0;
    for i in 0..entries.len() {
        if entries[i].pos[dim] < split {
            entries.swap(i, n_left);
            n_left += 1;
        }
    }
    n_left
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::ArrayView2;

    fn check_children(field: &KField, index: usize) -> f64 {
        let cell = field.cell(index);
        match cell.children {
            None => cell.n,
            Some([left, right]) => {
                let (l, r) = (field.cell(left), field.cell(right));
                assert!((l.w + r.w - cell.w).abs() < 1e-12);
                assert!((l.wk + r.wk - cell.wk).abs() < 1e-12);
                check_children(field, left) + check_children(field, right)
            }
        }
    }

    #[test]
    fn tree_conserves_points() {
        // a 4x4 grid of points
        let xs: Vec<f64> = (0..16).map(|i| (i % 4) as f64).collect();
        let ys: Vec<f64> = (0..16).map(|i| (i / 4) as f64).collect();
        let positions: Vec<f64> = xs.iter().chain(ys.iter()).cloned().collect();
        let values: Vec<f64> = (0..16).map(|i| i as f64).collect();
        let mut weights = vec![1.0; 16];
        weights[3] = 0.0;

        let points = ScalarPoints::new(
            ArrayView2::from_shape((2, 16), &positions).unwrap(),
            &values,
            Some(&weights),
        )
        .unwrap();

        for split_method in [SplitMethod::Middle, SplitMethod::Median, SplitMethod::Mean] {
            let field = KField::new(&points, 0.5, 0.0, split_method, 2);
            assert_eq!(field.n_points(), 15);
            assert_eq!(field.n_top_level(), 4);
            assert_eq!(field.total_weight(), 15.0);

            let n_total: f64 = field.top().iter().map(|&i| check_children(&field, i)).sum();
            assert_eq!(n_total, 15.0);
        }
    }

    #[test]
    fn coincident_points_form_a_leaf() {
        let positions = [1.0, 1.0, 1.0, 2.0, 2.0, 2.0];
        let values = [1.0, 2.0, 3.0];
        let points = ScalarPoints::new(
            ArrayView2::from_shape((2, 3), &positions).unwrap(),
            &values,
            None,
        )
        .unwrap();

        let field = KField::new(&points, 1.0, 0.0, SplitMethod::Mean, 10);
        assert_eq!(field.n_top_level(), 1);
        let root = field.cell(field.top()[0]);
        assert!(root.children.is_none());
        assert_eq!(root.n, 3.0);
        assert_eq!(root.wk, 6.0);
        assert_eq!(root.size, 0.0);
    }

    #[test]
    fn empty_field() {
        let positions: [f64; 0] = [];
        let points = ScalarPoints::new(
            ArrayView2::from_shape((3, 0), &positions).unwrap(),
            &[],
            None,
        )
        .unwrap();
        let field = KField::new(&points, 1.0, 0.1, SplitMethod::Median, 10);
        assert_eq!(field.n_points(), 0);
        assert_eq!(field.n_top_level(), 0);
        assert_eq!(field.total_weight(), 0.0);
    }
}
