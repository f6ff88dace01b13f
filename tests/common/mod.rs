#![allow(dead_code)]

// Shared fixtures for the scenario tests: a xenon-like cross-section
// table spanning 1 keV to 10 MeV and the standard cryostat/fiducial
// configuration.

use gamma_fastmc::{BiasPolicy, CrossSectionTable, Settings, TransportMode};
use once_cell::sync::Lazy;

static XENON_TABLE: Lazy<CrossSectionTable> = Lazy::new(|| {
    // Coefficients in cm2/g on the scale of the NIST xenon values; the
    // total column is the exact partial sum so the branching checks are
    // self-consistent
    let energy_mev = vec![0.001, 0.01, 0.05, 0.1, 0.3, 0.5, 1.0, 1.022, 2.0, 5.0, 10.0];
    let photoelectric = vec![
        8000.0, 130.0, 8.0, 1.55, 0.07, 0.025, 0.007, 0.0067, 0.002, 0.0006, 0.0003,
    ];
    let compton = vec![
        0.3, 0.5, 0.25, 0.13, 0.095, 0.08, 0.059, 0.058, 0.04, 0.023, 0.014,
    ];
    let pair = vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.004, 0.015, 0.024];
    let total: Vec<f64> = photoelectric
        .iter()
        .zip(compton.iter())
        .zip(pair.iter())
        .map(|((p, c), pp)| p + c + pp)
        .collect();
    // Qualitative Hubbell incoherent scattering function for Z = 54
    let x_grid = vec![
        0.0, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 1000.0, 1e9,
    ];
    let s_incoherent = vec![
        0.0, 1.2, 8.0, 14.0, 22.0, 33.0, 40.0, 46.0, 51.0, 53.0, 54.0, 54.0,
    ];
    CrossSectionTable::from_parts(
        energy_mev,
        total,
        photoelectric,
        compton,
        pair,
        x_grid,
        s_incoherent,
    )
    .expect("fixture table is valid")
});

pub fn xenon_table() -> &'static CrossSectionTable {
    &XENON_TABLE
}

/// The standard run configuration: 1 MeV source in a 65 x 150 cm
/// cryostat with a 57 x 134 cm fiducial volume
pub fn base_settings(nevents: u64, mode: TransportMode) -> Settings {
    Settings {
        energy_kev: 1000.0,
        edep_max_kev: 2700.0,
        mode,
        max_scatters: 50,
        writeout: 4,
        seed: 0,
        detector_radius_cm: 65.0,
        detector_height_cm: 150.0,
        fiducial_radius_cm: 57.0,
        fiducial_height_cm: 134.0,
        nevents,
    }
}

pub fn analog_mode() -> TransportMode {
    TransportMode::Analog
}

pub fn forced_at_birth() -> TransportMode {
    TransportMode::ForcedFiducialScatter {
        bias_policy: BiasPolicy::AtBirth,
    }
}

pub fn forced_every_scatter() -> TransportMode {
    TransportMode::ForcedFiducialScatter {
        bias_policy: BiasPolicy::EveryScatter,
    }
}
