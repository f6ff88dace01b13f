// Run configuration. Every parameter is required; there are no implicit
// defaults for physical dimensions.

use crate::cross_section::CrossSectionTable;
use crate::geometry::Cylinder;
use crate::vrt::TransportMode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },
    #[error("{name} must be at least 1")]
    ZeroCount { name: &'static str },
    #[error(
        "fiducial cylinder ({fiducial_radius} x {fiducial_height} cm) must lie strictly \
         inside the detector ({detector_radius} x {detector_height} cm)"
    )]
    FiducialNotContained {
        fiducial_radius: f64,
        fiducial_height: f64,
        detector_radius: f64,
        detector_height: f64,
    },
    #[error(
        "source energy {energy_kev} keV outside the tabulated range \
         [{min_kev}, {max_kev}] keV"
    )]
    EnergyOutsideTable {
        energy_kev: f64,
        min_kev: f64,
        max_kev: f64,
    },
    #[error(
        "edep_max {edep_max_kev} keV below the source energy {energy_kev} keV requires a \
         variance-reduction mode (the energy cut is a biasing branch)"
    )]
    EnergyCutWithoutBias {
        edep_max_kev: f64,
        energy_kev: f64,
    },
}

/// Read-only configuration of one simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Source gamma energy in keV
    pub energy_kev: f64,
    /// Maximum fiducial energy deposit of interest in keV
    pub edep_max_kev: f64,
    /// Transport mode, fixed for the whole run
    #[serde(flatten)]
    pub mode: TransportMode,
    /// Compton scatter count at which a walk is cut off
    pub max_scatters: u32,
    /// Number of interaction slots written per output row
    pub writeout: usize,
    /// Master seed; every event derives its own stream from it
    pub seed: u64,
    pub detector_radius_cm: f64,
    pub detector_height_cm: f64,
    pub fiducial_radius_cm: f64,
    pub fiducial_height_cm: f64,
    pub nevents: u64,
}

impl Settings {
    pub fn detector(&self) -> Cylinder {
        Cylinder::from_radius_and_height(self.detector_radius_cm, self.detector_height_cm)
    }

    pub fn fiducial(&self) -> Cylinder {
        Cylinder::from_radius_and_height(self.fiducial_radius_cm, self.fiducial_height_cm)
    }

    /// Validate the configuration against the loaded cross-section
    /// table. Called once before any event executes.
    pub fn validate(&self, table: &CrossSectionTable) -> Result<(), ConfigurationError> {
        for (name, value) in [
            ("energy_kev", self.energy_kev),
            ("edep_max_kev", self.edep_max_kev),
            ("detector_radius_cm", self.detector_radius_cm),
            ("detector_height_cm", self.detector_height_cm),
            ("fiducial_radius_cm", self.fiducial_radius_cm),
            ("fiducial_height_cm", self.fiducial_height_cm),
        ] {
            if !(value > 0.0) {
                return Err(ConfigurationError::NonPositive { name, value });
            }
        }
        if self.nevents == 0 {
            return Err(ConfigurationError::ZeroCount { name: "nevents" });
        }
        if self.max_scatters == 0 {
            return Err(ConfigurationError::ZeroCount { name: "max_scatters" });
        }
        if self.writeout == 0 {
            return Err(ConfigurationError::ZeroCount { name: "writeout" });
        }
        if self.fiducial_radius_cm >= self.detector_radius_cm
            || self.fiducial_height_cm >= self.detector_height_cm
        {
            return Err(ConfigurationError::FiducialNotContained {
                fiducial_radius: self.fiducial_radius_cm,
                fiducial_height: self.fiducial_height_cm,
                detector_radius: self.detector_radius_cm,
                detector_height: self.detector_height_cm,
            });
        }
        if self.energy_kev < table.energy_min_kev() || self.energy_kev > table.energy_max_kev() {
            return Err(ConfigurationError::EnergyOutsideTable {
                energy_kev: self.energy_kev,
                min_kev: table.energy_min_kev(),
                max_kev: table.energy_max_kev(),
            });
        }
        if self.edep_max_kev < self.energy_kev && !self.mode.is_biased() {
            return Err(ConfigurationError::EnergyCutWithoutBias {
                edep_max_kev: self.edep_max_kev,
                energy_kev: self.energy_kev,
            });
        }
        Ok(())
    }
}
