// Cylindrical volumes for gamma transport.
//
// The detector (cryostat) and the fiducial region are both finite
// z-axis cylinders centered on the origin. Transport needs exactly two
// queries: point containment, and the nearest forward intersection of a
// ray with the closed boundary (lateral surface or either end cap).

/// Numerical floor below which a direction component is treated as
/// parallel to a surface
const PARALLEL_TOLERANCE: f64 = 1e-12;
/// Minimum forward distance for an intersection to count; avoids
/// re-detecting the surface a point sits on
const FORWARD_TOLERANCE: f64 = 1e-10;

/// Finite cylinder of radius `radius` and half-height `half_height`,
/// axis along z, centered at the origin. All lengths in cm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cylinder {
    radius: f64,
    half_height: f64,
}

impl Cylinder {
    /// Build a cylinder from its radius and full height, the convention
    /// of the run configuration (a 65 x 150 cm cryostat spans |z| <= 75).
    pub fn from_radius_and_height(radius: f64, height: f64) -> Self {
        Cylinder {
            radius,
            half_height: 0.5 * height,
        }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn half_height(&self) -> f64 {
        self.half_height
    }

    /// Radius of the sphere centered at the origin that encloses the
    /// cylinder; used for direction biasing toward this volume.
    pub fn bounding_sphere_radius(&self) -> f64 {
        (self.radius * self.radius + self.half_height * self.half_height).sqrt()
    }

    /// Point-inside test, inclusive on the boundary
    pub fn contains(&self, point: [f64; 3]) -> bool {
        let r2 = point[0] * point[0] + point[1] * point[1];
        r2 <= self.radius * self.radius && point[2].abs() <= self.half_height
    }

    /// Nearest strictly-forward intersection distance of the ray
    /// `point + t * direction` with the closed cylinder boundary
    /// (lateral surface or end caps), or None if the ray never hits it.
    /// For a point inside the cylinder this is the exit distance.
    pub fn distance_to_boundary(&self, point: [f64; 3], direction: [f64; 3]) -> Option<f64> {
        let mut nearest = f64::INFINITY;

        // Lateral surface: quadratic in the transverse plane
        let a = direction[0] * direction[0] + direction[1] * direction[1];
        if a > PARALLEL_TOLERANCE {
            let b = 2.0 * (point[0] * direction[0] + point[1] * direction[1]);
            let c = point[0] * point[0] + point[1] * point[1] - self.radius * self.radius;
            let disc = b * b - 4.0 * a * c;
            if disc >= 0.0 {
                let sqrt_disc = disc.sqrt();
                for t in [(-b - sqrt_disc) / (2.0 * a), (-b + sqrt_disc) / (2.0 * a)] {
                    if t > FORWARD_TOLERANCE && t < nearest {
                        let z = point[2] + t * direction[2];
                        if z.abs() <= self.half_height {
                            nearest = t;
                        }
                    }
                }
            }
        }

        // End caps: planes z = +-half_height, hit only within the radius
        if direction[2].abs() > PARALLEL_TOLERANCE {
            for cap_z in [self.half_height, -self.half_height] {
                let t = (cap_z - point[2]) / direction[2];
                if t > FORWARD_TOLERANCE && t < nearest {
                    let x = point[0] + t * direction[0];
                    let y = point[1] + t * direction[1];
                    if x * x + y * y <= self.radius * self.radius {
                        nearest = t;
                    }
                }
            }
        }

        if nearest.is_finite() {
            Some(nearest)
        } else {
            None
        }
    }
}
