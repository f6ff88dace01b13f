// Interaction sampling: which physical process occurs at a collision
// point, and the outcome of a Compton scatter.
//
// Channel selection always follows the physical branching ratios; the
// variance-reduction machinery biases positions and directions, never
// the choice of process.

use crate::compton::{energy_ratio, sample_cos_theta, window_fraction, SamplingError};
use crate::cross_section::{CrossSectionTable, DataFormatError, Process};
use rand::Rng;

/// Physical interaction channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Photoelectric,
    Compton,
    Pair,
}

/// Mass-attenuation coefficients of the three competing channels at one
/// energy. Their sum is the total coefficient driving the free-path
/// sampling.
#[derive(Debug, Clone, Copy)]
pub struct ChannelCoefficients {
    pub photoelectric: f64,
    pub compton: f64,
    pub pair: f64,
}

impl ChannelCoefficients {
    pub fn at(table: &CrossSectionTable, energy_kev: f64) -> Result<Self, DataFormatError> {
        Ok(Self {
            photoelectric: table.lookup(Process::Photoelectric, energy_kev)?,
            compton: table.lookup(Process::Compton, energy_kev)?,
            pair: table.lookup(Process::Pair, energy_kev)?,
        })
    }

    /// Partition a single uniform draw by the relative coefficient
    /// magnitudes
    pub fn sample<R: Rng + ?Sized>(
        &self,
        energy_kev: f64,
        rng: &mut R,
    ) -> Result<Channel, SamplingError> {
        let sum = self.photoelectric + self.compton + self.pair;
        if sum <= 0.0 {
            return Err(SamplingError::VanishingCrossSection { energy_kev });
        }
        let r = rng.gen::<f64>() * sum;
        if r < self.photoelectric {
            Ok(Channel::Photoelectric)
        } else if r < self.photoelectric + self.compton {
            Ok(Channel::Compton)
        } else {
            Ok(Channel::Pair)
        }
    }
}

/// Result of a Compton angle draw: the scattering cosine, the surviving
/// photon energy, and the importance-sampling weight factor (unity for
/// an unrestricted draw)
#[derive(Debug, Clone, Copy)]
pub struct ComptonDraw {
    pub cos_theta: f64,
    pub energy_out_kev: f64,
    pub weight_factor: f64,
}

/// Sample a Compton scatter at the given energy. `cos_min` restricts the
/// scattering cosine to [cos_min, 1]; pass -1 for the analog
/// (unrestricted) draw. A restricted draw carries the fraction of the
/// angular cross section inside the window as its weight factor.
pub fn sample_compton<R: Rng + ?Sized>(
    table: &CrossSectionTable,
    energy_kev: f64,
    cos_min: f64,
    rng: &mut R,
) -> Result<ComptonDraw, SamplingError> {
    let weight_factor = if cos_min > -1.0 {
        window_fraction(table, energy_kev, cos_min)
    } else {
        1.0
    };
    let cos_theta = sample_cos_theta(table, energy_kev, cos_min, rng)?;
    let energy_out_kev = energy_kev * energy_ratio(energy_kev, cos_theta);
    Ok(ComptonDraw {
        cos_theta,
        energy_out_kev,
        weight_factor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fast_rng::FastRng;

    fn test_table() -> CrossSectionTable {
        CrossSectionTable::from_parts(
            vec![0.001, 0.5, 1.022, 10.0],
            vec![0.35, 0.105, 0.0655, 0.05],
            vec![0.30, 0.06, 0.02, 0.005],
            vec![0.05, 0.045, 0.045, 0.015],
            vec![0.0, 0.0, 0.0005, 0.03],
            vec![0.0, 1.0, 100.0, 1e6],
            vec![0.0, 10.0, 50.0, 54.0],
        )
        .unwrap()
    }

    #[test]
    fn test_channel_frequencies_follow_coefficients() {
        let table = test_table();
        let coeffs = ChannelCoefficients::at(&table, 500.0).unwrap();
        let mut rng = FastRng::new(5);
        let n = 50_000;
        let mut counts = [0usize; 3];
        for _ in 0..n {
            match coeffs.sample(500.0, &mut rng).unwrap() {
                Channel::Photoelectric => counts[0] += 1,
                Channel::Compton => counts[1] += 1,
                Channel::Pair => counts[2] += 1,
            }
        }
        let sum = coeffs.photoelectric + coeffs.compton + coeffs.pair;
        let expected_pe = coeffs.photoelectric / sum;
        let expected_compton = coeffs.compton / sum;
        let observed_pe = counts[0] as f64 / n as f64;
        let observed_compton = counts[1] as f64 / n as f64;
        assert!((observed_pe - expected_pe).abs() < 0.01);
        assert!((observed_compton - expected_compton).abs() < 0.01);
        assert_eq!(counts[2], 0, "pair channel open below threshold");
    }

    #[test]
    fn test_pair_channel_opens_above_threshold() {
        let table = test_table();
        let coeffs = ChannelCoefficients::at(&table, 8000.0).unwrap();
        let mut rng = FastRng::new(13);
        let n = 20_000;
        let pair_count = (0..n)
            .filter(|_| matches!(coeffs.sample(8000.0, &mut rng), Ok(Channel::Pair)))
            .count();
        assert!(pair_count > 0, "pair production never selected at 8 MeV");
    }

    #[test]
    fn test_vanishing_coefficients_are_an_error() {
        let coeffs = ChannelCoefficients {
            photoelectric: 0.0,
            compton: 0.0,
            pair: 0.0,
        };
        let mut rng = FastRng::new(1);
        assert!(matches!(
            coeffs.sample(100.0, &mut rng),
            Err(SamplingError::VanishingCrossSection { .. })
        ));
    }

    #[test]
    fn test_compton_draw_conserves_energy_bounds() {
        let table = test_table();
        let mut rng = FastRng::new(17);
        for _ in 0..200 {
            let draw = sample_compton(&table, 1000.0, -1.0, &mut rng).unwrap();
            assert_eq!(draw.weight_factor, 1.0);
            assert!((-1.0..=1.0).contains(&draw.cos_theta));
            assert!(draw.energy_out_kev > 0.0 && draw.energy_out_kev <= 1000.0);
        }
    }

    #[test]
    fn test_windowed_compton_carries_fraction_weight() {
        let table = test_table();
        let mut rng = FastRng::new(29);
        for _ in 0..200 {
            let draw = sample_compton(&table, 1000.0, 0.5, &mut rng).unwrap();
            assert!(draw.cos_theta >= 0.5);
            assert!(draw.weight_factor > 0.0 && draw.weight_factor < 1.0);
            // a restricted window keeps the deposit below the matching
            // budget
            assert!(1000.0 - draw.energy_out_kev <= 1000.0 * (1.0 - energy_ratio(1000.0, 0.5)) + 1e-9);
        }
    }
}
