//! Random search point generation.
//!
//! When a guard loses the player it sweeps the area around the last known
//! location, walking to points drawn uniformly from an annulus. Points are
//! sampled on the horizontal plane of the origin and, when a navigation
//! query is available, projected onto walkable ground.

use std::f32::consts::TAU;

use nightwatch_common::Vec3;
use tracing::debug;

/// Navigation collaborator used to snap points onto walkable ground.
pub trait NavigationQuery {
    /// Projects a point onto the navigable surface, or `None` if there is
    /// no walkable ground near it.
    fn project_to_navigable(&self, point: Vec3) -> Option<Vec3>;
}

/// Navigation query for levels without a navmesh: every point is walkable.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGround;

impl NavigationQuery for OpenGround {
    fn project_to_navigable(&self, point: Vec3) -> Option<Vec3> {
        Some(point)
    }
}

/// Draws search points for a guard.
#[derive(Debug, Clone)]
pub struct SearchPointGenerator {
    rng: fastrand::Rng,
}

impl Default for SearchPointGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchPointGenerator {
    /// Creates a generator with a random seed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }

    /// Creates a deterministic generator.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Returns a point uniformly distributed over the annulus
    /// `[radius_min, radius_max]` around `origin`, at the origin's height.
    ///
    /// A reversed band is swapped and negative radii are clamped to zero.
    pub fn generate_point(&mut self, origin: Vec3, radius_min: f32, radius_max: f32) -> Vec3 {
        let (min, max) = normalize_band(radius_min, radius_max);

        let angle = self.rng.f32() * TAU;
        let u = self.rng.f32();
        // Inverse CDF of the annulus area keeps the density uniform.
        let radius = (u * (max * max - min * min) + min * min).sqrt().clamp(min, max);

        Vec3::new(
            origin.x + angle.cos() * radius,
            origin.y + angle.sin() * radius,
            origin.z,
        )
    }

    /// Like [`generate_point`](Self::generate_point), but snaps the point
    /// onto walkable ground. Unprojectable draws are retried up to
    /// `retry_cap` times before falling back to `origin`.
    pub fn generate_navigable<N: NavigationQuery + ?Sized>(
        &mut self,
        origin: Vec3,
        radius_min: f32,
        radius_max: f32,
        retry_cap: u32,
        navigation: &N,
    ) -> Vec3 {
        for attempt in 0..=retry_cap {
            let candidate = self.generate_point(origin, radius_min, radius_max);
            if let Some(point) = navigation.project_to_navigable(candidate) {
                return point;
            }
            debug!("Search point {:?} not navigable (attempt {})", candidate, attempt + 1);
        }

        debug!("No navigable search point around {:?}, using origin", origin);
        origin
    }
}

/// Orders and clamps a radius band.
fn normalize_band(radius_min: f32, radius_max: f32) -> (f32, f32) {
    let (min, max) = if radius_min <= radius_max {
        (radius_min, radius_max)
    } else {
        (radius_max, radius_min)
    };
    (min.max(0.0), max.max(0.0))
}

/// Horizontal distance between two points, ignoring height.
#[must_use]
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    a.truncate().distance(b.truncate())
}
