// Compton scattering: Klein-Nishina differential cross section corrected
// by the atomic incoherent scattering function, and rejection sampling of
// the scattering cosine.

use crate::cross_section::CrossSectionTable;
use crate::data::{ELECTRON_REST_ENERGY_KEV, HUBBELL_X_SCALE, RE_SQUARED_BARN};
use crate::utilities::integrate_trapezoid;
use rand::Rng;
use thiserror::Error;

/// Hard cap on the rejection loop; exhausting it means the differential
/// cross section has a pathological shape for the requested window.
pub const MAX_REJECTION_ITERATIONS: usize = 10_000;

/// Grid resolution for integrating the angular density
const ANGULAR_GRID_POINTS: usize = 512;
/// Grid resolution for bounding the density ahead of rejection sampling
const REJECTION_SCAN_POINTS: usize = 128;
/// Headroom on the grid-scanned maximum of the differential cross
/// section, covering the excursion between grid points
const REJECTION_BOUND_MARGIN: f64 = 1.05;

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error(
        "Compton angle rejection sampling did not converge after {iterations} \
         iterations at {energy_kev} keV"
    )]
    RejectionExhausted { iterations: usize, energy_kev: f64 },
    #[error("empty Compton angular window at {energy_kev} keV (cos_min = {cos_min})")]
    EmptyAngularWindow { energy_kev: f64, cos_min: f64 },
    #[error("all interaction coefficients vanish at {energy_kev} keV")]
    VanishingCrossSection { energy_kev: f64 },
}

/// Momentum-transfer variable of the Hubbell form-factor tables,
/// x = 2k sin(theta/2) scaled to 1/Angstrom, with k = E/m_e.
pub fn momentum_transfer(k: f64, cos_theta: f64) -> f64 {
    2.0 * k * ((1.0 - cos_theta) / 2.0).sqrt() * HUBBELL_X_SCALE
}

/// Ratio E'/E of the photon energy after a Compton scatter through
/// cos(theta), 1/(1 + k(1 - cos theta)).
pub fn energy_ratio(energy_kev: f64, cos_theta: f64) -> f64 {
    let k = energy_kev / ELECTRON_REST_ENERGY_KEV;
    1.0 / (1.0 + k * (1.0 - cos_theta))
}

/// Klein-Nishina differential cross section per atom, corrected by the
/// incoherent scattering function S(x). In barn per unit solid angle up
/// to the azimuthal factor, which cancels in all the ratios used here.
pub fn differential(table: &CrossSectionTable, energy_kev: f64, cos_theta: f64) -> f64 {
    let k = energy_kev / ELECTRON_REST_ENERGY_KEV;
    let ff = 1.0 + k * (1.0 - cos_theta);
    let kn = RE_SQUARED_BARN
        * (1.0 + cos_theta * cos_theta + k * k * (1.0 - cos_theta) * (1.0 - cos_theta) / ff)
        / (ff * ff)
        / 2.0;
    kn * table.form_factor(momentum_transfer(k, cos_theta))
}

/// Integral of the corrected differential cross section over
/// cos(theta) in [lo, hi]
pub fn angular_integral(table: &CrossSectionTable, energy_kev: f64, lo: f64, hi: f64) -> f64 {
    integrate_trapezoid(
        |c| differential(table, energy_kev, c),
        lo,
        hi,
        ANGULAR_GRID_POINTS,
    )
}

/// Lower bound on cos(theta) such that the energy transferred to the
/// medium, E - E', stays within `budget_kev`. Returns -1 when the full
/// angular range is admissible.
pub fn max_cos_window(energy_kev: f64, budget_kev: f64) -> f64 {
    if budget_kev >= energy_kev {
        return -1.0;
    }
    if budget_kev <= 0.0 {
        return 1.0;
    }
    let cos_min = 1.0
        - ELECTRON_REST_ENERGY_KEV * budget_kev / (energy_kev * (energy_kev - budget_kev));
    cos_min.max(-1.0)
}

/// Fraction of the angular cross section contained in
/// cos(theta) in [cos_min, 1]; the importance-sampling weight factor
/// for a window-restricted Compton draw.
pub fn window_fraction(table: &CrossSectionTable, energy_kev: f64, cos_min: f64) -> f64 {
    if cos_min <= -1.0 {
        return 1.0;
    }
    let full = angular_integral(table, energy_kev, -1.0, 1.0);
    if full <= 0.0 {
        return 0.0;
    }
    angular_integral(table, energy_kev, cos_min, 1.0) / full
}

/// Sample a scattering cosine from the corrected Klein-Nishina density
/// restricted to [cos_min, 1], by rejection against the grid-scanned
/// maximum. cos_min = -1 recovers the unrestricted physical draw.
pub fn sample_cos_theta<R: Rng + ?Sized>(
    table: &CrossSectionTable,
    energy_kev: f64,
    cos_min: f64,
    rng: &mut R,
) -> Result<f64, SamplingError> {
    let span = 1.0 - cos_min;
    if span <= 0.0 {
        return Err(SamplingError::EmptyAngularWindow {
            energy_kev,
            cos_min,
        });
    }

    // Bound the density over the window
    let mut f_max = 0.0f64;
    for i in 0..=REJECTION_SCAN_POINTS {
        let c = cos_min + span * i as f64 / REJECTION_SCAN_POINTS as f64;
        f_max = f_max.max(differential(table, energy_kev, c));
    }
    if f_max <= 0.0 {
        return Err(SamplingError::EmptyAngularWindow {
            energy_kev,
            cos_min,
        });
    }
    f_max *= REJECTION_BOUND_MARGIN;

    for _ in 0..MAX_REJECTION_ITERATIONS {
        let candidate = cos_min + span * rng.gen::<f64>();
        let threshold = f_max * rng.gen::<f64>();
        if threshold <= differential(table, energy_kev, candidate) {
            return Ok(candidate);
        }
    }
    Err(SamplingError::RejectionExhausted {
        iterations: MAX_REJECTION_ITERATIONS,
        energy_kev,
    })
}
