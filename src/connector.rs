use crate::particle::Particle;
use crate::settings::LinkStrategy;
use std::collections::HashMap;

/// A line between two particles closer than the link distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// Index of the first particle (always less than `b`)
    pub a: usize,
    pub b: usize,
    pub distance: f32,
    /// 1 at zero distance, approaching 0 at the link distance
    pub opacity: f32,
}

impl Edge {
    fn between(a: usize, b: usize, distance: f32, max_distance: f32) -> Self {
        Self {
            a,
            b,
            distance,
            opacity: 1.0 - distance / max_distance,
        }
    }

    pub fn width(&self) -> f32 {
        self.opacity * 1.5
    }

    /// Alpha of both gradient stops
    pub fn stop_alpha(&self) -> f32 {
        self.opacity * 0.5
    }
}

/// Uniform bucket index over particle positions
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<usize>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    fn cell_of(&self, x: f32, y: f32) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    pub fn insert(&mut self, index: usize, x: f32, y: f32) {
        let cell = self.cell_of(x, y);
        self.cells.entry(cell).or_default().push(index);
    }

    /// Indices in the 3x3 block of cells around (x, y)
    pub fn neighbours(&self, x: f32, y: f32) -> impl Iterator<Item = usize> + '_ {
        let (cx, cy) = self.cell_of(x, y);
        (-1..=1)
            .flat_map(move |dx| (-1..=1).map(move |dy| (cx + dx, cy + dy)))
            .filter_map(move |cell| self.cells.get(&cell))
            .flat_map(|indices| indices.iter().copied())
    }
}

/// Every unordered pair closer than `max_distance`, sorted by (a, b)
pub fn connect(particles: &[Particle], max_distance: f32, strategy: LinkStrategy) -> Vec<Edge> {
    if max_distance.is_nan() || max_distance <= 0.0 || particles.len() < 2 {
        return Vec::new();
    }
    match strategy {
        LinkStrategy::Exhaustive => connect_exhaustive(particles, max_distance),
        LinkStrategy::Grid => connect_grid(particles, max_distance),
    }
}

fn connect_exhaustive(particles: &[Particle], max_distance: f32) -> Vec<Edge> {
    let mut edges = Vec::new();
    for (a, pa) in particles.iter().enumerate() {
        for (b, pb) in particles.iter().enumerate().skip(a + 1) {
            let distance = pa.distance_to(pb.x, pb.y);
            if distance < max_distance {
                edges.push(Edge::between(a, b, distance, max_distance));
            }
        }
    }
    edges
}

fn connect_grid(particles: &[Particle], max_distance: f32) -> Vec<Edge> {
    let mut grid = SpatialGrid::new(max_distance);
    for (i, p) in particles.iter().enumerate() {
        grid.insert(i, p.x, p.y);
    }

    let mut edges = Vec::new();
    for (a, pa) in particles.iter().enumerate() {
        for b in grid.neighbours(pa.x, pa.y) {
            if b <= a {
                continue;
            }
            let pb = &particles[b];
            let distance = pa.distance_to(pb.x, pb.y);
            if distance < max_distance {
                edges.push(Edge::between(a, b, distance, max_distance));
            }
        }
    }
    edges.sort_by_key(|e| (e.a, e.b));
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::DARK_PALETTE;
    use crate::particle::Viewport;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn at(points: &[(f32, f32)]) -> Vec<Particle> {
        let mut rng = StdRng::seed_from_u64(3);
        let vp = Viewport::new(1000.0, 1000.0);
        points
            .iter()
            .map(|&p| Particle::spawn(&mut rng, &vp, &DARK_PALETTE, Some(p), false))
            .collect()
    }

    #[test]
    fn test_no_edge_at_or_beyond_max_distance() {
        let particles = at(&[(0.0, 0.0), (100.0, 0.0), (250.0, 0.0)]);
        for strategy in [LinkStrategy::Exhaustive, LinkStrategy::Grid] {
            let edges = connect(&particles, 100.0, strategy);
            assert!(edges.is_empty(), "{:?} linked {:?}", strategy, edges);
        }
    }

    #[test]
    fn test_one_edge_per_unordered_pair() {
        let particles = at(&[(10.0, 10.0), (20.0, 10.0), (10.0, 30.0)]);
        for strategy in [LinkStrategy::Exhaustive, LinkStrategy::Grid] {
            let edges = connect(&particles, 50.0, strategy);
            assert_eq!(edges.len(), 3);
            let pairs: HashSet<(usize, usize)> = edges.iter().map(|e| (e.a, e.b)).collect();
            assert_eq!(pairs.len(), 3);
            assert!(edges.iter().all(|e| e.a < e.b));
        }
    }

    #[test]
    fn test_opacity_and_width() {
        let particles = at(&[(0.0, 0.0), (30.0, 40.0)]);
        let edges = connect(&particles, 100.0, LinkStrategy::Exhaustive);
        assert_eq!(edges.len(), 1);
        let e = edges[0];
        assert!((e.distance - 50.0).abs() < 1e-4);
        assert!((e.opacity - 0.5).abs() < 1e-6);
        assert!((e.width() - 0.75).abs() < 1e-6);
        assert!((e.stop_alpha() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_grid_matches_exhaustive() {
        let mut rng = StdRng::seed_from_u64(2024);
        let vp = Viewport::new(1200.0, 800.0);
        let particles: Vec<Particle> = (0..300)
            .map(|_| Particle::spawn(&mut rng, &vp, &DARK_PALETTE, None, false))
            .collect();
        for max_distance in [15.0, 80.0, 150.0] {
            let exhaustive = connect(&particles, max_distance, LinkStrategy::Exhaustive);
            let grid = connect(&particles, max_distance, LinkStrategy::Grid);
            assert_eq!(exhaustive, grid);
        }
    }

    #[test]
    fn test_degenerate_inputs() {
        let particles = at(&[(5.0, 5.0), (6.0, 5.0)]);
        assert!(connect(&particles, 0.0, LinkStrategy::Grid).is_empty());
        assert!(connect(&particles[..1], 50.0, LinkStrategy::Grid).is_empty());
    }
}
