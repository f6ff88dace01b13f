// Event source: where photons are born and with what direction.

use crate::geometry::Cylinder;
use crate::particle::Photon;
use crate::vrt::{sample_birth_direction, TransportMode};
use rand::Rng;
use std::f64::consts::PI;

/// Monoenergetic gamma source distributed uniformly over the detector
/// volume
#[derive(Debug, Clone, Copy)]
pub struct GammaSource {
    pub energy_kev: f64,
}

impl GammaSource {
    /// Draw a fresh photon for one event. In a biased run the birth
    /// direction is forced toward the fiducial volume and the photon
    /// starts with the compensating weight.
    pub fn sample_photon<R: Rng + ?Sized>(
        &self,
        detector: &Cylinder,
        fiducial: &Cylinder,
        mode: TransportMode,
        rng: &mut R,
    ) -> Photon {
        let position = sample_position_in_cylinder(detector, rng);
        let birth = sample_birth_direction(fiducial, position, mode, rng);
        let mut photon = Photon::new(position, birth.direction, self.energy_kev);
        photon.weight *= birth.weight_factor;
        photon
    }
}

/// Uniform point inside a cylinder: radius via the square-root trick,
/// azimuth and height uniform
fn sample_position_in_cylinder<R: Rng + ?Sized>(cylinder: &Cylinder, rng: &mut R) -> [f64; 3] {
    let r = cylinder.radius() * rng.gen::<f64>().sqrt();
    let phi = 2.0 * PI * rng.gen::<f64>();
    let z = cylinder.half_height() * (2.0 * rng.gen::<f64>() - 1.0);
    [r * phi.cos(), r * phi.sin(), z]
}
