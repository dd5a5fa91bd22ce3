use crate::models::{Feature, GeoTransform, RasterGrid};
use geo_types::{LineString, Polygon};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Which neighbours join cells of equal value into one region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// Edge neighbours only
    #[default]
    Four,
    /// Edge and corner neighbours
    Eight,
}

/// One traced region: its shared cell value and its outline in world coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub value: f32,
    pub cell_count: usize,
    pub polygon: Polygon<f64>,
}

/// Cell corner as (col, row)
type Vertex = (usize, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Edge {
    start: Vertex,
    end: Vertex,
}

impl Edge {
    fn direction(&self) -> (i64, i64) {
        (
            self.end.0 as i64 - self.start.0 as i64,
            self.end.1 as i64 - self.start.1 as i64,
        )
    }
}

struct RegionSeed {
    value: f32,
    cell_count: usize,
}

/// Traces contiguous runs of equal-valued valid cells into polygons.
///
/// Only finite cells take part. Boundary edges are walked with the
/// region on the right-hand side in (col, row) space; output rings are then
/// re-wound in world space so exteriors are counter-clockwise and holes clockwise.
pub struct Polygonizer {
    connectivity: Connectivity,
}

impl Polygonizer {
    pub fn new() -> Self {
        Self {
            connectivity: Connectivity::Four,
        }
    }

    pub fn with_connectivity(connectivity: Connectivity) -> Self {
        Self { connectivity }
    }

    /// Regions in row-major order of their first cell
    pub fn polygonize(&self, grid: &RasterGrid) -> Vec<Region> {
        let (labels, seeds) = self.label_regions(grid);
        let edges = collect_boundary_edges(grid, &labels, seeds.len());

        let mut regions = Vec::with_capacity(seeds.len());
        for (seed, region_edges) in seeds.iter().zip(edges.iter()) {
            let rings = self.trace_rings(region_edges);
            for polygon in assemble_polygons(rings, grid.transform()) {
                regions.push(Region {
                    value: seed.value,
                    cell_count: seed.cell_count,
                    polygon,
                });
            }
        }

        debug!(
            "Traced {} regions from {} valid cells",
            regions.len(),
            grid.valid_count()
        );

        regions
    }

    /// Regions as features carrying the cell value as their `change`
    pub fn to_features(&self, grid: &RasterGrid) -> Vec<Feature> {
        self.polygonize(grid)
            .into_iter()
            .map(|region| Feature::new(region.polygon, f64::from(region.value)))
            .collect()
    }

    /// Label map (0 = invalid, n = region n-1) plus per-region value and size
    fn label_regions(&self, grid: &RasterGrid) -> (Vec<u32>, Vec<RegionSeed>) {
        let (rows, cols) = grid.shape();
        let data = grid.data();
        let mut labels = vec![0u32; rows * cols];
        let mut seeds = Vec::new();
        let mut queue = VecDeque::new();

        for start in 0..rows * cols {
            if labels[start] != 0 || !data[start].is_finite() {
                continue;
            }

            let value = data[start];
            let label = seeds.len() as u32 + 1;
            let mut cell_count = 0;

            labels[start] = label;
            queue.push_back(start);

            while let Some(index) = queue.pop_front() {
                cell_count += 1;
                let (row, col) = (index / cols, index % cols);

                for (dr, dc) in self.neighbour_offsets() {
                    let r = row as isize + dr;
                    let c = col as isize + dc;
                    if r < 0 || c < 0 || r >= rows as isize || c >= cols as isize {
                        continue;
                    }

                    let neighbour = r as usize * cols + c as usize;
                    if labels[neighbour] == 0 && data[neighbour] == value {
                        labels[neighbour] = label;
                        queue.push_back(neighbour);
                    }
                }
            }

            seeds.push(RegionSeed { value, cell_count });
        }

        (labels, seeds)
    }

    fn neighbour_offsets(&self) -> &'static [(isize, isize)] {
        const FOUR: [(isize, isize); 4] = [(-1, 0), (0, 1), (1, 0), (0, -1)];
        const EIGHT: [(isize, isize); 8] = [
            (-1, 0),
            (-1, 1),
            (0, 1),
            (1, 1),
            (1, 0),
            (1, -1),
            (0, -1),
            (-1, -1),
        ];

        match self.connectivity {
            Connectivity::Four => &FOUR,
            Connectivity::Eight => &EIGHT,
        }
    }

    /// Link directed boundary edges into closed rings (vertex lists without the closing repeat)
    fn trace_rings(&self, edges: &[Edge]) -> Vec<Vec<Vertex>> {
        let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::new();
        for (i, edge) in edges.iter().enumerate() {
            outgoing.entry(edge.start).or_default().push(i);
        }

        let mut used = vec![false; edges.len()];
        let mut rings = Vec::new();

        for first in 0..edges.len() {
            if used[first] {
                continue;
            }

            let mut ring = Vec::new();
            let mut current = first;

            loop {
                used[current] = true;
                ring.push(edges[current].start);

                let incoming = edges[current];
                let next = outgoing.get(&incoming.end).and_then(|candidates| {
                    candidates
                        .iter()
                        .copied()
                        .filter(|&i| !used[i] || i == first)
                        .min_by_key(|&i| self.turn_rank(incoming, edges[i]))
                });

                match next {
                    Some(i) if i == first => break,
                    Some(i) => current = i,
                    None => break,
                }
            }

            rings.push(simplify_ring(&ring));
        }

        rings
    }

    /// Preference at a vertex shared by diagonal cells of the same region:
    /// four-connectivity keeps the cells apart (turn into the region),
    /// eight-connectivity joins them (turn away from it).
    fn turn_rank(&self, incoming: Edge, candidate: Edge) -> u8 {
        let (dx, dy) = incoming.direction();
        let next = candidate.direction();

        let right = (-dy, dx);
        let left = (dy, -dx);

        let (first_choice, last_choice) = match self.connectivity {
            Connectivity::Four => (right, left),
            Connectivity::Eight => (left, right),
        };

        if next == first_choice {
            0
        } else if next == (dx, dy) {
            1
        } else if next == last_choice {
            2
        } else {
            3
        }
    }
}

impl Default for Polygonizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Per region, every cell side that does not face a cell of the same region
fn collect_boundary_edges(grid: &RasterGrid, labels: &[u32], region_count: usize) -> Vec<Vec<Edge>> {
    let (rows, cols) = grid.shape();
    let mut edges: Vec<Vec<Edge>> = vec![Vec::new(); region_count];

    let label_at = |row: isize, col: isize| -> u32 {
        if row < 0 || col < 0 || row >= rows as isize || col >= cols as isize {
            0
        } else {
            labels[row as usize * cols + col as usize]
        }
    };

    for row in 0..rows {
        for col in 0..cols {
            let label = labels[row * cols + col];
            if label == 0 {
                continue;
            }

            let region = &mut edges[label as usize - 1];
            let (r, c) = (row as isize, col as isize);

            if label_at(r - 1, c) != label {
                region.push(Edge {
                    start: (col, row),
                    end: (col + 1, row),
                });
            }
            if label_at(r, c + 1) != label {
                region.push(Edge {
                    start: (col + 1, row),
                    end: (col + 1, row + 1),
                });
            }
            if label_at(r + 1, c) != label {
                region.push(Edge {
                    start: (col + 1, row + 1),
                    end: (col, row + 1),
                });
            }
            if label_at(r, c - 1) != label {
                region.push(Edge {
                    start: (col, row + 1),
                    end: (col, row),
                });
            }
        }
    }

    edges
}

/// Drop vertices where the boundary continues straight on
fn simplify_ring(ring: &[Vertex]) -> Vec<Vertex> {
    let n = ring.len();
    if n < 4 {
        return ring.to_vec();
    }

    let step = |a: Vertex, b: Vertex| -> (i64, i64) {
        (
            (b.0 as i64 - a.0 as i64).signum(),
            (b.1 as i64 - a.1 as i64).signum(),
        )
    };

    (0..n)
        .filter(|&i| {
            let prev = ring[(i + n - 1) % n];
            let next = ring[(i + 1) % n];
            step(prev, ring[i]) != step(ring[i], next)
        })
        .map(|i| ring[i])
        .collect()
}

/// Twice the shoelace area in (col, row) space; positive for region outlines
fn doubled_signed_area(ring: &[Vertex]) -> i64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (x0, y0) = ring[i];
            let (x1, y1) = ring[(i + 1) % n];
            x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64
        })
        .sum()
}

/// Map a pixel-space ring to world coordinates, wound counter-clockwise for
/// exteriors and clockwise for holes, keeping the first vertex in place
fn to_world(ring: &[Vertex], transform: &GeoTransform, counter_clockwise: bool) -> LineString<f64> {
    let mut points: Vec<(f64, f64)> = ring
        .iter()
        .map(|&(col, row)| transform.corner_to_geo(col, row))
        .collect();

    if (ring_area(&points) > 0.0) != counter_clockwise {
        points.reverse();
        points.rotate_right(1);
    }

    points.into()
}

/// Shoelace area of an open ring, positive when counter-clockwise
fn ring_area(points: &[(f64, f64)]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (x0, y0) = points[i];
            let (x1, y1) = points[(i + 1) % n];
            x0 * y1 - x1 * y0
        })
        .sum::<f64>()
        / 2.0
}

/// Outline rings become exteriors, reversed rings holes of the largest outline
fn assemble_polygons(rings: Vec<Vec<Vertex>>, transform: &GeoTransform) -> Vec<Polygon<f64>> {
    let (mut outlines, holes): (Vec<_>, Vec<_>) = rings
        .into_iter()
        .filter(|ring| ring.len() >= 3)
        .partition(|ring| doubled_signed_area(ring) > 0);

    if outlines.is_empty() {
        return Vec::new();
    }

    outlines.sort_by_key(|ring| std::cmp::Reverse(doubled_signed_area(ring)));

    let interiors: Vec<LineString<f64>> = holes
        .iter()
        .map(|ring| to_world(ring, transform, false))
        .collect();

    let mut polygons = Vec::with_capacity(outlines.len());
    let mut outlines = outlines.into_iter();
    if let Some(exterior) = outlines.next() {
        polygons.push(Polygon::new(to_world(&exterior, transform, true), interiors));
    }
    polygons.extend(outlines.map(|ring| Polygon::new(to_world(&ring, transform, true), Vec::new())));

    polygons
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SpatialRef;
    use geo_types::Coord;

    fn grid(data: Vec<f32>, rows: usize, cols: usize) -> RasterGrid {
        RasterGrid::new(
            data,
            rows,
            cols,
            GeoTransform::new(0.0, rows as f64, 1.0, -1.0),
            SpatialRef::wgs84(),
        )
        .unwrap()
    }

    fn coords(ring: &LineString<f64>) -> Vec<(f64, f64)> {
        ring.coords().map(|c: &Coord<f64>| (c.x, c.y)).collect()
    }

    /// Shoelace area of a closed world-space ring, positive when counter-clockwise
    fn world_area(ring: &LineString<f64>) -> f64 {
        ring.lines()
            .map(|line| line.start.x * line.end.y - line.end.x * line.start.y)
            .sum::<f64>()
            / 2.0
    }

    #[test]
    fn test_single_cell() {
        let regions = Polygonizer::new().polygonize(&grid(vec![7.0], 1, 1));

        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].value, 7.0);
        assert_eq!(
            coords(regions[0].polygon.exterior()),
            vec![(0.0, 1.0), (0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
        );
        assert!(world_area(regions[0].polygon.exterior()) > 0.0);
    }

    #[test]
    fn test_uniform_grid_is_one_rectangle() {
        let regions = Polygonizer::new().polygonize(&grid(vec![15.0; 12], 3, 4));

        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].cell_count, 12);
        assert_eq!(regions[0].polygon.exterior().0.len(), 5);
        assert!((world_area(regions[0].polygon.exterior()) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_corner_nodata_gives_l_shape() {
        let mut data = vec![15.0; 16];
        data[0] = f32::NAN;
        let regions = Polygonizer::new().polygonize(&grid(data, 4, 4));

        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].cell_count, 15);
        assert!(regions[0].polygon.interiors().is_empty());
        // six corners plus the closing repeat
        assert_eq!(regions[0].polygon.exterior().0.len(), 7);
        assert!((world_area(regions[0].polygon.exterior()) - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_interior_nodata_becomes_hole() {
        let mut data = vec![2.5; 9];
        data[4] = f32::NAN;
        let regions = Polygonizer::new().polygonize(&grid(data, 3, 3));

        assert_eq!(regions.len(), 1);
        let polygon = &regions[0].polygon;
        assert_eq!(polygon.interiors().len(), 1);
        assert!(world_area(polygon.exterior()) > 0.0);
        assert!(world_area(&polygon.interiors()[0]) < 0.0);
        assert!((world_area(&polygon.interiors()[0]) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_distinct_values_split_regions_in_scan_order() {
        let data = vec![
            1.0, 1.0, 2.0, //
            1.0, 3.0, 2.0, //
            f32::NAN, 3.0, 3.0,
        ];
        let regions = Polygonizer::new().polygonize(&grid(data, 3, 3));

        let values: Vec<f32> = regions.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);

        let counts: Vec<usize> = regions.iter().map(|r| r.cell_count).collect();
        assert_eq!(counts, vec![3, 2, 3]);
    }

    #[test]
    fn test_diagonal_cells_respect_connectivity() {
        let data = vec![
            4.0,
            f32::NAN, //
            f32::NAN,
            4.0,
        ];

        let four = Polygonizer::new().polygonize(&grid(data.clone(), 2, 2));
        assert_eq!(four.len(), 2);
        assert!(four.iter().all(|r| r.polygon.exterior().0.len() == 5));

        let eight = Polygonizer::with_connectivity(Connectivity::Eight).polygonize(&grid(data, 2, 2));
        assert_eq!(eight.len(), 1);
        assert_eq!(eight[0].cell_count, 2);
        assert!((world_area(eight[0].polygon.exterior()) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_pinched_region_keeps_single_exterior() {
        // ring of 1s around a hole that touches the outside at one corner
        let n = f32::NAN;
        let data = vec![
            1.0, 1.0, 1.0, 1.0, //
            1.0, 1.0, n, 1.0, //
            1.0, n, 1.0, 1.0, //
            1.0, 1.0, 1.0, 1.0,
        ];
        let regions = Polygonizer::new().polygonize(&grid(data, 4, 4));

        assert_eq!(regions.len(), 1);
        let polygon = &regions[0].polygon;
        let hole_area: f64 = polygon.interiors().iter().map(world_area).sum();
        assert!((world_area(polygon.exterior()) + hole_area - 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_infinite_cells_are_not_traced() {
        let data = vec![f32::NEG_INFINITY, 2.0, 2.0, f32::INFINITY];
        let regions = Polygonizer::new().polygonize(&grid(data, 2, 2));

        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].value, 2.0);
        assert_eq!(regions[0].cell_count, 2);
    }

    #[test]
    fn test_all_nodata_yields_nothing() {
        let regions = Polygonizer::new().polygonize(&grid(vec![f32::NAN; 6], 2, 3));
        assert!(regions.is_empty());
    }

    #[test]
    fn test_coordinates_follow_transform() {
        let grid = RasterGrid::new(
            vec![1.0; 2],
            1,
            2,
            GeoTransform::new(-180.0, 90.0, 0.5, -0.25),
            SpatialRef::wgs84(),
        )
        .unwrap();

        let features = Polygonizer::new().to_features(&grid);
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].change, 1.0);
        assert_eq!(
            coords(features[0].geometry.exterior()),
            vec![
                (-180.0, 90.0),
                (-180.0, 89.75),
                (-179.0, 89.75),
                (-179.0, 90.0),
                (-180.0, 90.0)
            ]
        );
    }

    #[test]
    fn test_simplify_ring_drops_collinear_vertices() {
        let ring = vec![(0, 0), (1, 0), (2, 0), (2, 1), (1, 1), (0, 1)];
        assert_eq!(simplify_ring(&ring), vec![(0, 0), (2, 0), (2, 1), (0, 1)]);
    }
}
