// Lattice table detection over ruling lines
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::extraction::word_index::reading_order;
use crate::extraction::{PositionedWord, TableRows};
use crate::types::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Axis-aligned ruling segment in top-left page coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub orientation: Orientation,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Edge {
    pub fn horizontal(x0: f64, x1: f64, y: f64) -> Self {
        Self {
            orientation: Orientation::Horizontal,
            x0: x0.min(x1),
            x1: x0.max(x1),
            top: y,
            bottom: y,
        }
    }

    pub fn vertical(x: f64, top: f64, bottom: f64) -> Self {
        Self {
            orientation: Orientation::Vertical,
            x0: x,
            x1: x,
            top: top.min(bottom),
            bottom: top.max(bottom),
        }
    }

    /// Edge for a straight segment, if it runs along an axis
    pub fn from_segment(a: (f64, f64), b: (f64, f64)) -> Option<Self> {
        const AXIS_EPSILON: f64 = 0.01;
        if (a.1 - b.1).abs() < AXIS_EPSILON && (a.0 - b.0).abs() >= AXIS_EPSILON {
            Some(Self::horizontal(a.0, b.0, a.1))
        } else if (a.0 - b.0).abs() < AXIS_EPSILON && (a.1 - b.1).abs() >= AXIS_EPSILON {
            Some(Self::vertical(a.0, a.1, b.1))
        } else {
            None
        }
    }

    pub fn length(&self) -> f64 {
        match self.orientation {
            Orientation::Horizontal => self.x1 - self.x0,
            Orientation::Vertical => self.bottom - self.top,
        }
    }

    /// Coordinate across the edge: top for horizontal, x for vertical
    fn position(&self) -> f64 {
        match self.orientation {
            Orientation::Horizontal => self.top,
            Orientation::Vertical => self.x0,
        }
    }

    fn start(&self) -> f64 {
        match self.orientation {
            Orientation::Horizontal => self.x0,
            Orientation::Vertical => self.top,
        }
    }

    fn end(&self) -> f64 {
        match self.orientation {
            Orientation::Horizontal => self.x1,
            Orientation::Vertical => self.bottom,
        }
    }

    fn set_position(&mut self, value: f64) {
        match self.orientation {
            Orientation::Horizontal => {
                self.top = value;
                self.bottom = value;
            }
            Orientation::Vertical => {
                self.x0 = value;
                self.x1 = value;
            }
        }
    }

    fn set_end(&mut self, value: f64) {
        match self.orientation {
            Orientation::Horizontal => self.x1 = value,
            Orientation::Vertical => self.bottom = value,
        }
    }
}

fn by_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

type PointKey = (u64, u64);

fn key(x: f64, y: f64) -> PointKey {
    (x.to_bits(), y.to_bits())
}

#[derive(Debug, Default)]
struct Intersection {
    h: HashSet<usize>,
    v: HashSet<usize>,
}

/// A detected table: its cells and their bounding box
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub cells: Vec<Rect>,
    pub bbox: Rect,
}

impl Table {
    fn new(cells: Vec<Rect>) -> Self {
        let bbox = cells.iter().fold(
            Rect::new(f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |acc, c| Rect::new(acc.x0.min(c.x0), acc.top.min(c.top), acc.x1.max(c.x1), acc.bottom.max(c.bottom)),
        );
        Self { cells, bbox }
    }

    /// Cells arranged by row top and column x0; gaps are `None`
    pub fn rows(&self) -> Vec<Vec<Option<Rect>>> {
        let mut xs: Vec<f64> = self.cells.iter().map(|c| c.x0).collect();
        xs.sort_by(|a, b| by_f64(*a, *b));
        xs.dedup();

        let mut sorted = self.cells.clone();
        sorted.sort_by(|a, b| by_f64(a.top, b.top).then_with(|| by_f64(a.x0, b.x0)));

        let mut rows: Vec<Vec<Option<Rect>>> = Vec::new();
        let mut row_top = f64::NAN;
        for cell in sorted {
            if cell.top != row_top {
                rows.push(vec![None; xs.len()]);
                row_top = cell.top;
            }
            if let (Some(row), Some(col)) = (rows.last_mut(), xs.iter().position(|x| *x == cell.x0)) {
                row[col] = Some(cell);
            }
        }
        rows
    }

    /// Cell texts from the words whose centre lies inside each cell
    pub fn extract(&self, words: &[PositionedWord]) -> TableRows {
        self.rows()
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| {
                        cell.map(|rect| {
                            let mut inside: Vec<&PositionedWord> = words
                                .iter()
                                .filter(|w| rect.contains_point((w.x0 + w.x1) / 2.0, (w.top + w.bottom) / 2.0))
                                .collect();
                            inside.sort_by(|a, b| reading_order(a, b));
                            inside.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ")
                        })
                    })
                    .collect()
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TableFinder {
    pub snap_tolerance: f64,
    pub join_tolerance: f64,
    pub edge_min_length: f64,
    pub intersection_tolerance: f64,
}

impl Default for TableFinder {
    fn default() -> Self {
        Self {
            snap_tolerance: 3.0,
            join_tolerance: 3.0,
            edge_min_length: 3.0,
            intersection_tolerance: 3.0,
        }
    }
}

impl TableFinder {
    /// Tables as rows of cell text, ordered by (top, x0)
    pub fn extract_tables(&self, edges: &[Edge], words: &[PositionedWord]) -> Vec<TableRows> {
        self.find_tables(edges).iter().map(|t| t.extract(words)).collect()
    }

    pub fn find_tables(&self, edges: &[Edge]) -> Vec<Table> {
        let edges = self.merge_edges(edges);
        let intersections = self.intersections(&edges);
        let cells = cells_from_intersections(&intersections);
        let mut tables = group_cells(cells);
        tables.sort_by(|a, b| by_f64(a.bbox.top, b.bbox.top).then_with(|| by_f64(a.bbox.x0, b.bbox.x0)));
        tables
    }

    /// Snap near-collinear edges together, join overlapping ones, drop short ones
    pub fn merge_edges(&self, edges: &[Edge]) -> Vec<Edge> {
        let mut merged = Vec::new();
        for orientation in [Orientation::Horizontal, Orientation::Vertical] {
            let group: Vec<Edge> = edges.iter().filter(|e| e.orientation == orientation).copied().collect();
            let snapped = snap(group, self.snap_tolerance);
            merged.extend(join(snapped, self.join_tolerance));
        }
        merged.retain(|e| e.length() >= self.edge_min_length);
        merged
    }

    fn intersections(&self, edges: &[Edge]) -> HashMap<PointKey, (f64, f64, Intersection)> {
        let tol = self.intersection_tolerance;
        let mut points: HashMap<PointKey, (f64, f64, Intersection)> = HashMap::new();
        for (vi, v) in edges.iter().enumerate().filter(|(_, e)| e.orientation == Orientation::Vertical) {
            for (hi, h) in edges.iter().enumerate().filter(|(_, e)| e.orientation == Orientation::Horizontal) {
                if v.top <= h.top + tol && v.bottom >= h.top - tol && v.x0 >= h.x0 - tol && v.x0 <= h.x1 + tol {
                    let entry = points
                        .entry(key(v.x0, h.top))
                        .or_insert_with(|| (v.x0, h.top, Intersection::default()));
                    entry.2.v.insert(vi);
                    entry.2.h.insert(hi);
                }
            }
        }
        points
    }
}

fn snap(mut edges: Vec<Edge>, tolerance: f64) -> Vec<Edge> {
    edges.sort_by(|a, b| by_f64(a.position(), b.position()));
    let mut clusters: Vec<Vec<Edge>> = Vec::new();
    let mut last = f64::NEG_INFINITY;
    for edge in edges {
        if clusters.is_empty() || edge.position() > last + tolerance {
            clusters.push(Vec::new());
        }
        last = edge.position();
        if let Some(cluster) = clusters.last_mut() {
            cluster.push(edge);
        }
    }

    clusters
        .into_iter()
        .flat_map(|mut cluster| {
            let mean = cluster.iter().map(|e| e.position()).sum::<f64>() / cluster.len() as f64;
            for edge in &mut cluster {
                edge.set_position(mean);
            }
            cluster
        })
        .collect()
}

fn join(mut edges: Vec<Edge>, tolerance: f64) -> Vec<Edge> {
    edges.sort_by(|a, b| by_f64(a.position(), b.position()).then_with(|| by_f64(a.start(), b.start())));
    let mut joined: Vec<Edge> = Vec::new();
    for edge in edges {
        match joined.last_mut() {
            Some(last) if last.position() == edge.position() && edge.start() <= last.end() + tolerance => {
                if edge.end() > last.end() {
                    last.set_end(edge.end());
                }
            }
            _ => joined.push(edge),
        }
    }
    joined
}

fn cells_from_intersections(points: &HashMap<PointKey, (f64, f64, Intersection)>) -> Vec<Rect> {
    let mut sorted: Vec<&(f64, f64, Intersection)> = points.values().collect();
    sorted.sort_by(|a, b| by_f64(a.0, b.0).then_with(|| by_f64(a.1, b.1)));

    let connects = |p: &(f64, f64, Intersection), q: &(f64, f64, Intersection)| {
        (p.0 == q.0 && !p.2.v.is_disjoint(&q.2.v)) || (p.1 == q.1 && !p.2.h.is_disjoint(&q.2.h))
    };

    let mut cells = Vec::new();
    for (i, pt) in sorted.iter().enumerate() {
        let rest = &sorted[i + 1..];
        let below: Vec<_> = rest.iter().filter(|p| p.0 == pt.0).collect();
        let right: Vec<_> = rest.iter().filter(|p| p.1 == pt.1).collect();

        'search: for below_pt in &below {
            if !connects(pt, below_pt) {
                continue;
            }
            for right_pt in &right {
                if !connects(pt, right_pt) {
                    continue;
                }
                if let Some(corner) = points.get(&key(right_pt.0, below_pt.1)) {
                    if connects(corner, right_pt) && connects(corner, below_pt) {
                        cells.push(Rect::new(pt.0, pt.1, corner.0, corner.1));
                        break 'search;
                    }
                }
            }
        }
    }
    cells
}

/// Union cells that share a corner; single-cell groups are not tables
fn group_cells(cells: Vec<Rect>) -> Vec<Table> {
    let mut parent: Vec<usize> = (0..cells.len()).collect();
    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    let mut owner: HashMap<PointKey, usize> = HashMap::new();
    for (i, cell) in cells.iter().enumerate() {
        let corners = [
            key(cell.x0, cell.top),
            key(cell.x1, cell.top),
            key(cell.x0, cell.bottom),
            key(cell.x1, cell.bottom),
        ];
        for corner in corners {
            match owner.get(&corner) {
                Some(&other) => {
                    let (a, b) = (find(&mut parent, i), find(&mut parent, other));
                    if a != b {
                        parent[a] = b;
                    }
                }
                None => {
                    owner.insert(corner, i);
                }
            }
        }
    }

    let mut groups: HashMap<usize, Vec<Rect>> = HashMap::new();
    for (i, cell) in cells.iter().enumerate() {
        let root = find(&mut parent, i);
        groups.entry(root).or_default().push(*cell);
    }
    groups
        .into_values()
        .filter(|cells| cells.len() > 1)
        .map(Table::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Ruled grid with the given column and row boundaries
    fn grid(xs: &[f64], ys: &[f64]) -> Vec<Edge> {
        let (left, right) = (xs[0], xs[xs.len() - 1]);
        let (top, bottom) = (ys[0], ys[ys.len() - 1]);
        let mut edges: Vec<Edge> = ys.iter().map(|y| Edge::horizontal(left, right, *y)).collect();
        edges.extend(xs.iter().map(|x| Edge::vertical(*x, top, bottom)));
        edges
    }

    fn word(text: &str, x0: f64, top: f64) -> PositionedWord {
        PositionedWord::new(text, x0, top, x0 + 20.0, top + 8.0)
    }

    #[test]
    fn test_grid_becomes_one_table() {
        let tables = TableFinder::default().find_tables(&grid(&[50.0, 150.0, 250.0], &[100.0, 120.0, 140.0]));
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].cells.len(), 4);
        assert_eq!(tables[0].bbox, Rect::new(50.0, 100.0, 250.0, 140.0));
        assert_eq!(tables[0].rows().len(), 2);
    }

    #[test]
    fn test_cell_text_from_word_centres() {
        let words = vec![
            word("NAMA", 60.0, 105.0),
            word("UMUR", 160.0, 105.0),
            word("ALI", 60.0, 125.0),
            word("BIN", 85.0, 125.0),
            word("7", 160.0, 125.0),
            word("OUTSIDE", 300.0, 125.0),
        ];
        let tables = TableFinder::default().extract_tables(&grid(&[50.0, 150.0, 250.0], &[100.0, 120.0, 140.0]), &words);
        assert_eq!(
            tables,
            vec![vec![
                vec![Some("NAMA".to_string()), Some("UMUR".to_string())],
                vec![Some("ALI BIN".to_string()), Some("7".to_string())],
            ]]
        );
    }

    #[test]
    fn test_double_lines_snap_together() {
        // Thin filled rules draw each line twice, half a point apart
        let mut edges = grid(&[50.0, 150.0, 250.0], &[100.0, 120.0, 140.0]);
        edges.extend(grid(&[50.5, 150.5, 250.5], &[100.5, 120.5, 140.5]));
        let tables = TableFinder::default().find_tables(&edges);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].cells.len(), 4);
    }

    #[test]
    fn test_separate_grids_are_ordered_top_down() {
        let mut edges = grid(&[50.0, 150.0, 250.0], &[400.0, 420.0]);
        edges.extend(grid(&[50.0, 150.0], &[100.0, 120.0, 140.0]));
        let tables = TableFinder::default().find_tables(&edges);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].bbox.top, 100.0);
        assert_eq!(tables[1].bbox.top, 400.0);
    }

    #[test]
    fn test_lone_box_and_short_edges_are_not_tables() {
        let mut edges = grid(&[50.0, 150.0], &[100.0, 120.0]);
        edges.push(Edge::horizontal(300.0, 302.0, 300.0));
        assert!(TableFinder::default().find_tables(&edges).is_empty());
        assert_eq!(TableFinder::default().merge_edges(&edges).len(), 4);
    }

    #[test]
    fn test_split_segments_are_joined() {
        let edges = vec![Edge::horizontal(0.0, 50.0, 10.0), Edge::horizontal(52.0, 100.0, 10.0)];
        let merged = TableFinder::default().merge_edges(&edges);
        assert_eq!(merged, vec![Edge::horizontal(0.0, 100.0, 10.0)]);
    }

    #[test]
    fn test_edge_from_segment() {
        assert_eq!(Edge::from_segment((10.0, 5.0), (0.0, 5.0)), Some(Edge::horizontal(0.0, 10.0, 5.0)));
        assert_eq!(Edge::from_segment((3.0, 9.0), (3.0, 1.0)), Some(Edge::vertical(3.0, 1.0, 9.0)));
        assert_eq!(Edge::from_segment((0.0, 0.0), (5.0, 5.0)), None);
    }
}
