// Variance reduction: forced scattering toward the fiducial volume.
//
// Direction draws are biased toward the cone that subtends the fiducial
// volume's bounding sphere, and the statistical weight is multiplied by
// the ratio of the true directional density to the biased one, keeping
// E[weight * observable] equal to the analog expectation. The biased
// density is a mixture of a uniform-in-cone component and the true
// density itself, so it is strictly positive over the whole sphere and
// the weights stay bounded.

use crate::compton::{angular_integral, differential, sample_cos_theta, SamplingError};
use crate::cross_section::CrossSectionTable;
use crate::geometry::Cylinder;
use nalgebra::Vector3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Probability mass of the cone component in the biased direction
/// mixture. The remainder follows the true density, which bounds every
/// weight factor by 1/(1 - FORCED_FRACTION).
pub const FORCED_FRACTION: f64 = 0.75;

/// When during the walk the direction bias is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasPolicy {
    /// Bias only the direction the photon is born with
    AtBirth,
    /// Additionally re-aim the photon after every Compton scatter that
    /// happens outside the fiducial volume's bounding sphere
    EveryScatter,
}

/// Transport mode, fixed once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum TransportMode {
    /// Unbiased analog transport; every weight stays exactly 1
    Analog,
    /// Forced scattering toward the fiducial volume
    ForcedFiducialScatter { bias_policy: BiasPolicy },
}

impl TransportMode {
    pub fn is_biased(&self) -> bool {
        matches!(self, TransportMode::ForcedFiducialScatter { .. })
    }
}

/// A sampled direction together with the importance-sampling weight
/// factor compensating for the biased draw
#[derive(Debug, Clone, Copy)]
pub struct BiasedDirection {
    pub direction: [f64; 3],
    pub weight_factor: f64,
}

/// Outcome of a forced post-scatter redirection
#[derive(Debug, Clone, Copy)]
pub struct ForcedScatter {
    pub direction: [f64; 3],
    pub cos_theta: f64,
    pub weight_factor: f64,
}

/// Uniform direction on the unit sphere
pub fn isotropic_direction<R: Rng + ?Sized>(rng: &mut R) -> [f64; 3] {
    let mu = 2.0 * rng.gen::<f64>() - 1.0;
    let phi = 2.0 * PI * rng.gen::<f64>();
    let sin_theta = (1.0 - mu * mu).sqrt();
    [sin_theta * phi.cos(), sin_theta * phi.sin(), mu]
}

/// Rotate a unit reference direction to a new direction with cosine `mu`
/// relative to it, at azimuth `phi` around it
pub fn rotate_direction(reference: &[f64; 3], mu: f64, phi: f64) -> [f64; 3] {
    let u = Vector3::from_row_slice(reference);
    let sin_theta = (1.0 - mu * mu).max(0.0).sqrt();

    // Build an orthonormal frame around the reference direction
    let perp = if u.x.abs() < 0.99 {
        Vector3::new(1.0, 0.0, 0.0).cross(&u).normalize()
    } else {
        Vector3::new(0.0, 1.0, 0.0).cross(&u).normalize()
    };
    let ortho = u.cross(&perp);

    let v = mu * u + sin_theta * phi.cos() * perp + sin_theta * phi.sin() * ortho;
    [v.x, v.y, v.z]
}

/// Cosine of the half-angle of the cone from `position` that subtends
/// the bounding sphere of `target`, or None if the position is inside
/// the bounding sphere (every direction can reach the target).
fn cone_cos_alpha(target: &Cylinder, position: [f64; 3]) -> Option<f64> {
    let d2 = position[0] * position[0] + position[1] * position[1] + position[2] * position[2];
    let rb = target.bounding_sphere_radius();
    if d2 <= rb * rb {
        return None;
    }
    Some((1.0 - rb * rb / d2).sqrt())
}

/// Unit vector from `position` toward the origin (the target center)
fn axis_toward_origin(position: [f64; 3]) -> [f64; 3] {
    let d = (position[0] * position[0] + position[1] * position[1] + position[2] * position[2])
        .sqrt();
    [-position[0] / d, -position[1] / d, -position[2] / d]
}

/// Sample the direction a photon is born with.
///
/// Analog mode draws isotropically with weight 1. In forced mode the
/// draw is a mixture of uniform-in-cone (toward the fiducial bounding
/// sphere) and isotropic; the weight factor is the isotropic density
/// over the mixture density at the sampled direction.
pub fn sample_birth_direction<R: Rng + ?Sized>(
    fiducial: &Cylinder,
    position: [f64; 3],
    mode: TransportMode,
    rng: &mut R,
) -> BiasedDirection {
    if !mode.is_biased() {
        return BiasedDirection {
            direction: isotropic_direction(rng),
            weight_factor: 1.0,
        };
    }
    let cos_alpha = match cone_cos_alpha(fiducial, position) {
        Some(c) => c,
        None => {
            // Inside the bounding sphere the cone is undefined; fall back
            // to the analog draw
            return BiasedDirection {
                direction: isotropic_direction(rng),
                weight_factor: 1.0,
            };
        }
    };
    let axis = axis_toward_origin(position);

    let direction = if rng.gen::<f64>() < FORCED_FRACTION {
        // Uniform over the cone solid angle
        let mu = cos_alpha + (1.0 - cos_alpha) * rng.gen::<f64>();
        let phi = 2.0 * PI * rng.gen::<f64>();
        rotate_direction(&axis, mu, phi)
    } else {
        isotropic_direction(rng)
    };

    // Mixture density at the realized direction, relative to isotropic
    let mu_axis =
        direction[0] * axis[0] + direction[1] * axis[1] + direction[2] * axis[2];
    let weight_factor = if mu_axis >= cos_alpha {
        1.0 / (2.0 * FORCED_FRACTION / (1.0 - cos_alpha) + (1.0 - FORCED_FRACTION))
    } else {
        1.0 / (1.0 - FORCED_FRACTION)
    };

    BiasedDirection {
        direction,
        weight_factor,
    }
}

/// Forced redirection after a Compton scatter outside the fiducial
/// bounding sphere (EveryScatter policy).
///
/// The outgoing direction is drawn from a mixture of uniform-in-cone and
/// the physical (Klein-Nishina corrected) angular density around the
/// incoming direction; the realized scattering cosine follows from the
/// sampled direction and the weight factor restores the physical
/// expectation.
pub fn sample_forced_scatter_direction<R: Rng + ?Sized>(
    table: &CrossSectionTable,
    energy_kev: f64,
    fiducial: &Cylinder,
    position: [f64; 3],
    incoming: &[f64; 3],
    rng: &mut R,
) -> Result<Option<ForcedScatter>, SamplingError> {
    let cos_alpha = match cone_cos_alpha(fiducial, position) {
        Some(c) => c,
        // Inside the bounding sphere the analog scatter applies
        None => return Ok(None),
    };
    let axis = axis_toward_origin(position);

    let direction = if rng.gen::<f64>() < FORCED_FRACTION {
        let mu = cos_alpha + (1.0 - cos_alpha) * rng.gen::<f64>();
        let phi = 2.0 * PI * rng.gen::<f64>();
        rotate_direction(&axis, mu, phi)
    } else {
        let cos_theta = sample_cos_theta(table, energy_kev, -1.0, rng)?;
        let phi = 2.0 * PI * rng.gen::<f64>();
        rotate_direction(incoming, cos_theta, phi)
    };

    let cos_theta = direction[0] * incoming[0]
        + direction[1] * incoming[1]
        + direction[2] * incoming[2];
    let cos_theta = cos_theta.clamp(-1.0, 1.0);

    // True directional density of the physical scatter
    let norm = angular_integral(table, energy_kev, -1.0, 1.0);
    if norm <= 0.0 {
        return Err(SamplingError::VanishingCrossSection { energy_kev });
    }
    let q_dir = differential(table, energy_kev, cos_theta) / (2.0 * PI * norm);

    // Mixture density at the realized direction
    let mu_axis =
        direction[0] * axis[0] + direction[1] * axis[1] + direction[2] * axis[2];
    let cone_density = if mu_axis >= cos_alpha {
        FORCED_FRACTION / (2.0 * PI * (1.0 - cos_alpha))
    } else {
        0.0
    };
    let biased_density = cone_density + (1.0 - FORCED_FRACTION) * q_dir;

    Ok(Some(ForcedScatter {
        direction,
        cos_theta,
        weight_factor: q_dir / biased_density,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cross_section::CrossSectionTable;
    use crate::fast_rng::FastRng;
    use approx::assert_relative_eq;

    fn flat_s_table() -> CrossSectionTable {
        CrossSectionTable::from_parts(
            vec![0.001, 10.0],
            vec![0.1, 0.1],
            vec![0.01, 0.01],
            vec![0.05, 0.05],
            vec![0.0, 0.0],
            vec![0.0, 1e6],
            vec![54.0, 54.0],
        )
        .unwrap()
    }

    fn norm(v: &[f64; 3]) -> f64 {
        (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
    }

    #[test]
    fn test_isotropic_direction_is_unit() {
        let mut rng = FastRng::new(1);
        for _ in 0..100 {
            let d = isotropic_direction(&mut rng);
            assert_relative_eq!(norm(&d), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rotate_direction_preserves_norm_and_cosine() {
        let reference = [0.0, 0.0, 1.0];
        let v = rotate_direction(&reference, 0.3, 1.2);
        assert_relative_eq!(norm(&v), 1.0, epsilon = 1e-12);
        assert_relative_eq!(v[2], 0.3, epsilon = 1e-12);

        let tilted = [0.6, 0.0, 0.8];
        let v = rotate_direction(&tilted, -0.4, 2.5);
        assert_relative_eq!(norm(&v), 1.0, epsilon = 1e-12);
        let dot = v[0] * tilted[0] + v[1] * tilted[1] + v[2] * tilted[2];
        assert_relative_eq!(dot, -0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_analog_birth_direction_has_unit_weight() {
        let fiducial = Cylinder::from_radius_and_height(57.0, 134.0);
        let mut rng = FastRng::new(2);
        for _ in 0..50 {
            let b = sample_birth_direction(
                &fiducial,
                [60.0, 0.0, 0.0],
                TransportMode::Analog,
                &mut rng,
            );
            assert_eq!(b.weight_factor, 1.0);
            assert_relative_eq!(norm(&b.direction), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_forced_birth_weights_are_bounded() {
        let fiducial = Cylinder::from_radius_and_height(1.0, 2.0);
        let mode = TransportMode::ForcedFiducialScatter {
            bias_policy: BiasPolicy::AtBirth,
        };
        let mut rng = FastRng::new(3);
        let bound = 1.0 / (1.0 - FORCED_FRACTION);
        for _ in 0..2000 {
            let b = sample_birth_direction(&fiducial, [10.0, 0.0, 0.0], mode, &mut rng);
            assert!(b.weight_factor > 0.0);
            assert!(b.weight_factor <= bound + 1e-12);
        }
    }

    #[test]
    fn test_forced_birth_weight_mean_is_unbiased() {
        // E[w] over the biased draw equals the isotropic total, 1
        let fiducial = Cylinder::from_radius_and_height(1.0, 2.0);
        let mode = TransportMode::ForcedFiducialScatter {
            bias_policy: BiasPolicy::AtBirth,
        };
        let mut rng = FastRng::new(4);
        let n = 200_000;
        let mean: f64 = (0..n)
            .map(|_| {
                sample_birth_direction(&fiducial, [6.0, 0.0, 0.0], mode, &mut rng).weight_factor
            })
            .sum::<f64>()
            / n as f64;
        assert!((mean - 1.0).abs() < 0.03, "E[w] = {}", mean);
    }

    #[test]
    fn test_forced_birth_inside_bounding_sphere_is_analog() {
        let fiducial = Cylinder::from_radius_and_height(57.0, 134.0);
        let mode = TransportMode::ForcedFiducialScatter {
            bias_policy: BiasPolicy::AtBirth,
        };
        let mut rng = FastRng::new(5);
        let b = sample_birth_direction(&fiducial, [0.0, 0.0, 0.0], mode, &mut rng);
        assert_eq!(b.weight_factor, 1.0);
    }

    #[test]
    fn test_forced_birth_favors_the_cone() {
        let fiducial = Cylinder::from_radius_and_height(1.0, 2.0);
        let mode = TransportMode::ForcedFiducialScatter {
            bias_policy: BiasPolicy::AtBirth,
        };
        let position = [10.0, 0.0, 0.0];
        let mut rng = FastRng::new(6);
        let axis = [-1.0, 0.0, 0.0];
        let mut in_cone = 0usize;
        let n = 5000;
        for _ in 0..n {
            let b = sample_birth_direction(&fiducial, position, mode, &mut rng);
            let mu = b.direction[0] * axis[0] + b.direction[1] * axis[1] + b.direction[2] * axis[2];
            // the cone toward a sphere of radius ~1.4 at distance 10 is narrow
            if mu > 0.98 {
                in_cone += 1;
            }
        }
        // isotropically this region holds ~1% of directions
        assert!(
            in_cone as f64 / n as f64 > 0.5,
            "only {}/{} draws aimed at the fiducial",
            in_cone,
            n
        );
    }

    #[test]
    fn test_forced_scatter_weight_mean_is_unbiased() {
        // E[w] over the biased post-scatter draw equals 1
        let table = flat_s_table();
        let fiducial = Cylinder::from_radius_and_height(1.0, 2.0);
        let incoming = [0.0, 0.0, 1.0];
        let mut rng = FastRng::new(7);
        let n = 50_000;
        let mut sum = 0.0;
        for _ in 0..n {
            let f = sample_forced_scatter_direction(
                &table,
                800.0,
                &fiducial,
                [5.0, 0.0, 0.0],
                &incoming,
                &mut rng,
            )
            .unwrap()
            .expect("outside bounding sphere");
            assert!(f.weight_factor >= 0.0);
            assert!(f.weight_factor <= 1.0 / (1.0 - FORCED_FRACTION) + 1e-12);
            sum += f.weight_factor;
        }
        let mean = sum / n as f64;
        assert!((mean - 1.0).abs() < 0.04, "E[w] = {}", mean);
    }

    #[test]
    fn test_forced_scatter_inside_bounding_sphere_defers_to_analog() {
        let table = flat_s_table();
        let fiducial = Cylinder::from_radius_and_height(57.0, 134.0);
        let mut rng = FastRng::new(8);
        let result = sample_forced_scatter_direction(
            &table,
            800.0,
            &fiducial,
            [10.0, 0.0, 0.0],
            &[0.0, 0.0, 1.0],
            &mut rng,
        )
        .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_transport_mode_serde_roundtrip() {
        let mode = TransportMode::ForcedFiducialScatter {
            bias_policy: BiasPolicy::EveryScatter,
        };
        let json = serde_json::to_string(&mode).unwrap();
        let back: TransportMode = serde_json::from_str(&json).unwrap();
        assert_eq!(mode, back);
    }
}
