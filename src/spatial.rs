use std::collections::HashMap;

use glam::{IVec3, Vec3};

use crate::config::BEHIND_DISTANCE_PENALTY;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    /// Agent index inside its system.
    pub index: usize,
    /// Distance to the query origin, including any bias penalty.
    pub distance: f32,
}

/// Neighbourhood queries over one system's frozen agent positions.
///
/// A `bias` direction makes points behind the query origin look farther
/// away: their squared distance is multiplied by `BEHIND_DISTANCE_PENALTY`.
/// Results are sorted by that distance, ties by index.
pub trait SpatialIndex: Sync {
    fn k_nearest(&self, origin: Vec3, k: usize, bias: Option<Vec3>) -> Vec<Neighbor>;
    fn range_search(&self, origin: Vec3, radius: f32, bias: Option<Vec3>) -> Vec<Neighbor>;
}

fn biased_distance_sq(origin: Vec3, point: Vec3, bias: Option<Vec3>) -> f32 {
    let d = point - origin;
    let dist_sq = d.length_squared();
    match bias {
        Some(dir) if d.dot(dir) < 0.0 => dist_sq * BEHIND_DISTANCE_PENALTY,
        _ => dist_sq,
    }
}

fn sort_neighbors(found: &mut [(f32, usize)]) {
    found.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
}

fn into_neighbors(found: impl IntoIterator<Item = (f32, usize)>) -> Vec<Neighbor> {
    found
        .into_iter()
        .map(|(dist_sq, index)| Neighbor {
            index,
            distance: dist_sq.sqrt(),
        })
        .collect()
}

/// Hashed uniform 3D grid, rebuilt from scratch every step.
#[derive(Clone, Debug)]
pub struct SpatialHash {
    cell_size: f32,
    inv_cell_size: f32,
    cells: HashMap<IVec3, Vec<u32>>,
    /// (agent index, position) for every inserted point.
    points: Vec<(usize, Vec3)>,
}

impl SpatialHash {
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size > 0.0 { cell_size } else { 1.0 };
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::new(),
            points: Vec::new(),
        }
    }

    fn cell_of(&self, p: Vec3) -> IVec3 {
        (p * self.inv_cell_size).floor().as_ivec3()
    }

    /// Clear all cells and re-insert the given points. Callers pass only
    /// the agents that may be found (alive ones).
    pub fn rebuild(&mut self, points: impl IntoIterator<Item = (usize, Vec3)>) {
        self.cells.clear();
        self.points.clear();
        for (index, position) in points {
            let slot = self.points.len() as u32;
            self.points.push((index, position));
            let cell = self.cell_of(position);
            self.cells.entry(cell).or_default().push(slot);
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn scan_all(&self, origin: Vec3, bias: Option<Vec3>) -> Vec<(f32, usize)> {
        self.points
            .iter()
            .map(|&(index, p)| (biased_distance_sq(origin, p, bias), index))
            .collect()
    }

    fn visit_shell(&self, center: IVec3, ring: i32, mut visit: impl FnMut(u32)) {
        for dz in -ring..=ring {
            for dy in -ring..=ring {
                for dx in -ring..=ring {
                    if dx.abs().max(dy.abs()).max(dz.abs()) != ring {
                        continue;
                    }
                    if let Some(slots) = self.cells.get(&(center + IVec3::new(dx, dy, dz))) {
                        for &slot in slots {
                            visit(slot);
                        }
                    }
                }
            }
        }
    }
}

impl SpatialIndex for SpatialHash {
    fn k_nearest(&self, origin: Vec3, k: usize, bias: Option<Vec3>) -> Vec<Neighbor> {
        if k == 0 || self.points.is_empty() {
            return Vec::new();
        }
        let center = self.cell_of(origin);
        let mut found: Vec<(f32, usize)> = Vec::new();
        let mut ring = 0i32;
        loop {
            let side = (2 * ring + 1) as usize;
            // Sparse grids: a full scan is cheaper than walking empty shells.
            if side * side * side > self.cells.len() * 8 + 27 {
                found = self.scan_all(origin, bias);
                break;
            }
            self.visit_shell(center, ring, |slot| {
                let (index, p) = self.points[slot as usize];
                found.push((biased_distance_sq(origin, p, bias), index));
            });
            if found.len() == self.points.len() {
                break;
            }
            if found.len() >= k {
                sort_neighbors(&mut found);
                // Anything outside the visited shells is at least this far away.
                let reach = ring as f32 * self.cell_size;
                if found[k - 1].0 <= reach * reach {
                    break;
                }
            }
            ring += 1;
        }
        sort_neighbors(&mut found);
        found.truncate(k);
        into_neighbors(found)
    }

    fn range_search(&self, origin: Vec3, radius: f32, bias: Option<Vec3>) -> Vec<Neighbor> {
        if radius < 0.0 || self.points.is_empty() {
            return Vec::new();
        }
        let radius_sq = radius * radius;
        let span = (radius * self.inv_cell_size).ceil() + 1.0;
        let side = 2.0 * span + 1.0;
        let mut found: Vec<(f32, usize)> = if side * side * side > (self.cells.len() * 8 + 27) as f32 {
            self.scan_all(origin, bias)
        } else {
            let center = self.cell_of(origin);
            let span = span as i32;
            let mut found = Vec::new();
            for dz in -span..=span {
                for dy in -span..=span {
                    for dx in -span..=span {
                        if let Some(slots) = self.cells.get(&(center + IVec3::new(dx, dy, dz))) {
                            for &slot in slots {
                                let (index, p) = self.points[slot as usize];
                                found.push((biased_distance_sq(origin, p, bias), index));
                            }
                        }
                    }
                }
            }
            found
        };
        found.retain(|(dist_sq, _)| *dist_sq <= radius_sq);
        sort_neighbors(&mut found);
        into_neighbors(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn scattered(count: usize, seed: u64) -> Vec<(usize, Vec3)> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..count)
            .map(|i| {
                let p = Vec3::new(
                    rng.gen_range(-30.0..30.0),
                    rng.gen_range(-30.0..30.0),
                    rng.gen_range(-5.0..5.0),
                );
                (i, p)
            })
            .collect()
    }

    fn brute_force(points: &[(usize, Vec3)], origin: Vec3, bias: Option<Vec3>) -> Vec<usize> {
        let mut all: Vec<(f32, usize)> = points
            .iter()
            .map(|&(i, p)| (biased_distance_sq(origin, p, bias), i))
            .collect();
        sort_neighbors(&mut all);
        all.into_iter().map(|(_, i)| i).collect()
    }

    #[test]
    fn k_nearest_matches_brute_force() {
        let points = scattered(300, 4);
        let mut hash = SpatialHash::new(4.0);
        hash.rebuild(points.iter().copied());
        for (origin, bias) in [
            (Vec3::ZERO, None),
            (Vec3::new(12.0, -7.0, 1.0), Some(Vec3::X)),
            (Vec3::new(80.0, 80.0, 0.0), Some(-Vec3::Y)),
        ] {
            let got: Vec<usize> = hash.k_nearest(origin, 10, bias).iter().map(|n| n.index).collect();
            let expected: Vec<usize> = brute_force(&points, origin, bias).into_iter().take(10).collect();
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn range_search_matches_brute_force() {
        let points = scattered(200, 9);
        let mut hash = SpatialHash::new(3.0);
        hash.rebuild(points.iter().copied());
        let origin = Vec3::new(-3.0, 4.0, 0.0);
        let bias = Some(Vec3::new(0.0, 1.0, 0.0));
        let got = hash.range_search(origin, 9.0, bias);
        let expected: Vec<usize> = brute_force(&points, origin, bias)
            .into_iter()
            .filter(|&i| biased_distance_sq(origin, points[i].1, bias) <= 81.0)
            .collect();
        assert!(!got.is_empty());
        assert_eq!(got.iter().map(|n| n.index).collect::<Vec<_>>(), expected);
        assert!(got.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn points_behind_the_bias_look_farther() {
        let mut hash = SpatialHash::new(4.0);
        hash.rebuild([(0, Vec3::new(-1.0, 0.0, 0.0)), (1, Vec3::new(2.0, 0.0, 0.0))]);
        let plain = hash.k_nearest(Vec3::ZERO, 1, None);
        assert_eq!(plain[0].index, 0);
        let biased = hash.k_nearest(Vec3::ZERO, 2, Some(Vec3::X));
        assert_eq!(biased[0].index, 1);
        assert!((biased[1].distance - BEHIND_DISTANCE_PENALTY.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn empty_index_returns_nothing() {
        let hash = SpatialHash::new(4.0);
        assert!(hash.k_nearest(Vec3::ZERO, 3, None).is_empty());
        assert!(hash.range_search(Vec3::ZERO, 10.0, None).is_empty());
    }
}
