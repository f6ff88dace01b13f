// The per-photon random walk: free-path sampling, boundary crossing,
// interaction dispatch, variance-reduction weighting, termination.

use crate::compton::{max_cos_window, SamplingError};
use crate::cross_section::{CrossSectionTable, DataFormatError};
use crate::geometry::Cylinder;
use crate::interaction::{sample_compton, Channel, ChannelCoefficients};
use crate::particle::{Photon, TerminalState};
use crate::vrt::{rotate_direction, sample_forced_scatter_direction, BiasPolicy, TransportMode};
use rand::Rng;
use std::f64::consts::PI;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// Tabulated data failed mid-walk (a photon degraded below the
    /// energy grid); fatal for the whole run
    #[error(transparent)]
    Data(#[from] DataFormatError),
    /// A sampler failed to converge; fatal for this event only
    #[error(transparent)]
    Sampling(#[from] SamplingError),
}

/// Read-only state shared by every event of a run. Safe for concurrent
/// reads: nothing here mutates after construction.
#[derive(Debug, Clone)]
pub struct TransportContext<'a> {
    pub detector: Cylinder,
    pub fiducial: Cylinder,
    pub table: &'a CrossSectionTable,
    pub mode: TransportMode,
    pub source_energy_kev: f64,
    /// Maximum fiducial energy deposit of interest, in keV
    pub edep_max_kev: f64,
    /// Compton scatter count at which the walk is cut off
    pub max_scatters: u32,
}

impl<'a> TransportContext<'a> {
    /// The energy-cut branch is armed when variance reduction is on and
    /// the deposit window is narrower than the source energy
    fn energy_cut_active(&self) -> bool {
        self.mode.is_biased() && self.edep_max_kev < self.source_energy_kev
    }
}

/// Walk one photon to a terminal state.
///
/// Returns the terminal state, which is also recorded on the photon.
/// Free-path draws and direction-bias draws always consume independent
/// random numbers.
pub fn propagate<R: Rng + ?Sized>(
    photon: &mut Photon,
    ctx: &TransportContext<'_>,
    rng: &mut R,
) -> Result<TerminalState, TransportError> {
    let energy_cut = ctx.energy_cut_active();
    let mut fiducial_deposit = 0.0f64;

    let terminal = loop {
        // 1. Free path from the total attenuation coefficient
        let attenuation = ctx.table.attenuation_length(photon.energy_kev)?;
        let path = -(1.0 - rng.gen::<f64>()).ln() * attenuation;

        // 2. Escape test against the cryostat boundary. A path exactly
        // on the boundary still interacts (inclusive), so tangent rays
        // cannot loop forever.
        let boundary = match ctx
            .detector
            .distance_to_boundary(photon.position, photon.direction)
        {
            Some(d) => d,
            None => break TerminalState::Escaped,
        };
        if path > boundary {
            break TerminalState::Escaped;
        }

        // 3. Interact at the sampled point
        photon.move_by(path);
        let in_fiducial = ctx.fiducial.contains(photon.position);
        let budget = ctx.edep_max_kev - fiducial_deposit;

        let coefficients = ChannelCoefficients::at(ctx.table, photon.energy_kev)?;
        match coefficients.sample(photon.energy_kev, rng)? {
            Channel::Photoelectric | Channel::Pair
                if energy_cut && in_fiducial && photon.energy_kev > budget =>
            {
                // The full remaining energy cannot fit in the deposit
                // window; the event contributes nothing below the cut
                break TerminalState::DepositCutExceeded;
            }
            Channel::Photoelectric => {
                photon.record_interaction(photon.energy_kev);
                if in_fiducial {
                    fiducial_deposit += photon.energy_kev;
                }
                photon.energy_kev = 0.0;
                break TerminalState::Absorbed;
            }
            Channel::Pair => {
                photon.record_interaction(photon.energy_kev);
                if in_fiducial {
                    fiducial_deposit += photon.energy_kev;
                }
                photon.energy_kev = 0.0;
                break TerminalState::PairProduced;
            }
            Channel::Compton => {
                // Forced re-aim toward the fiducial volume, when the
                // policy asks for it and the photon is far enough out
                // for the cone to be defined
                let forced = match ctx.mode {
                    TransportMode::ForcedFiducialScatter {
                        bias_policy: BiasPolicy::EveryScatter,
                    } => sample_forced_scatter_direction(
                        ctx.table,
                        photon.energy_kev,
                        &ctx.fiducial,
                        photon.position,
                        &photon.direction,
                        rng,
                    )?,
                    _ => None,
                };

                let (cos_theta, direction, weight_factor) = match forced {
                    Some(f) => (f.cos_theta, f.direction, f.weight_factor),
                    None => {
                        // Analog draw, restricted to the remaining
                        // deposit budget inside the fiducial volume when
                        // the energy cut is armed
                        let cos_min = if energy_cut && in_fiducial {
                            max_cos_window(photon.energy_kev, budget)
                        } else {
                            -1.0
                        };
                        let draw = sample_compton(ctx.table, photon.energy_kev, cos_min, rng)?;
                        let phi = 2.0 * PI * rng.gen::<f64>();
                        let direction = rotate_direction(&photon.direction, draw.cos_theta, phi);
                        (draw.cos_theta, direction, draw.weight_factor)
                    }
                };

                let energy_out = photon.energy_kev
                    * crate::compton::energy_ratio(photon.energy_kev, cos_theta);
                let deposit = photon.energy_kev - energy_out;

                photon.record_interaction(deposit);
                if in_fiducial {
                    fiducial_deposit += deposit;
                }
                photon.weight *= weight_factor;
                photon.energy_kev = energy_out;
                photon.direction = direction;
                photon.n_compton += 1;

                if photon.n_compton >= ctx.max_scatters {
                    break TerminalState::MaxScatterReached;
                }
            }
        }
    };

    photon.terminal = Some(terminal);
    Ok(terminal)
}

/// Energy deposited strictly inside the fiducial volume, summed over a
/// photon's interaction history
pub fn fiducial_deposit(photon: &Photon, fiducial: &Cylinder) -> f64 {
    photon
        .interactions
        .iter()
        .filter(|rec| fiducial.contains(rec.position))
        .map(|rec| rec.deposit_kev)
        .sum()
}
