// Tabulated photon interaction data for liquid xenon.
//
// Two text tables feed the transport: a NIST-style mass-attenuation table
// (energy grid in MeV, coefficients in cm2/g) and a Hubbell-style atomic
// form-factor table (momentum transfer x, incoherent scattering function
// S(x)). Both are parsed once at startup; the table is immutable afterwards.

use crate::data::LXE_DENSITY_G_CM3;
use crate::utilities::interpolate_linear;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Header lines to skip in the NIST attenuation table
const NIST_HEADER_LINES: usize = 6;
/// Width of the shell-label prefix on each NIST data row
const NIST_LABEL_WIDTH: usize = 7;
/// Header lines to skip in the Hubbell form-factor table
const FORMFACTOR_HEADER_LINES: usize = 2;

/// Photon interaction process resolved by the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Process {
    /// Total attenuation without coherent scattering
    Total,
    Photoelectric,
    /// Incoherent (Compton) scattering
    Compton,
    /// Pair production, nuclear plus electron field
    Pair,
}

#[derive(Debug, Error)]
pub enum DataFormatError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("{path}:{line}: cannot parse '{token}' as a number")]
    Malformed {
        path: String,
        line: usize,
        token: String,
    },
    #[error("{path}:{line}: expected {expected} columns, found {found}")]
    ColumnCount {
        path: String,
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("inconsistent cross-section data: {0}")]
    Inconsistent(String),
    #[error("energy {energy_kev} keV outside tabulated range [{min_kev}, {max_kev}] keV")]
    EnergyOutOfRange {
        energy_kev: f64,
        min_kev: f64,
        max_kev: f64,
    },
}

/// Mass-attenuation coefficients and incoherent scattering function for
/// the detector medium. Immutable after construction; lookups are linear
/// interpolations in energy (internally MeV) or momentum transfer.
#[derive(Debug, Clone)]
pub struct CrossSectionTable {
    /// Energy grid in MeV, strictly increasing
    energy_mev: Vec<f64>,
    /// Total attenuation without coherent scattering, cm2/g
    total: Vec<f64>,
    /// Photoelectric absorption, cm2/g
    photoelectric: Vec<f64>,
    /// Incoherent (Compton) scattering, cm2/g
    compton: Vec<f64>,
    /// Pair production (nuclear + electron field), cm2/g
    pair: Vec<f64>,
    /// Momentum-transfer grid of the form-factor table
    x_grid: Vec<f64>,
    /// Incoherent scattering function S(x) on x_grid
    s_incoherent: Vec<f64>,
    /// Medium density in g/cm3
    density: f64,
}

impl CrossSectionTable {
    /// Build a table from raw grids, validating the invariants the
    /// transport relies on.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        energy_mev: Vec<f64>,
        total: Vec<f64>,
        photoelectric: Vec<f64>,
        compton: Vec<f64>,
        pair: Vec<f64>,
        x_grid: Vec<f64>,
        s_incoherent: Vec<f64>,
    ) -> Result<Self, DataFormatError> {
        if energy_mev.len() < 2 {
            return Err(DataFormatError::Inconsistent(format!(
                "energy grid needs at least 2 points, got {}",
                energy_mev.len()
            )));
        }
        for (name, coeffs) in [
            ("total", &total),
            ("photoelectric", &photoelectric),
            ("compton", &compton),
            ("pair", &pair),
        ] {
            if coeffs.len() != energy_mev.len() {
                return Err(DataFormatError::Inconsistent(format!(
                    "{} column has {} entries but energy grid has {}",
                    name,
                    coeffs.len(),
                    energy_mev.len()
                )));
            }
            if coeffs.iter().any(|c| !c.is_finite() || *c < 0.0) {
                return Err(DataFormatError::Inconsistent(format!(
                    "{} column contains a negative or non-finite coefficient",
                    name
                )));
            }
        }
        if !energy_mev.windows(2).all(|w| w[0] < w[1]) {
            return Err(DataFormatError::Inconsistent(
                "energy grid is not strictly increasing".to_string(),
            ));
        }
        if x_grid.len() < 2 || x_grid.len() != s_incoherent.len() {
            return Err(DataFormatError::Inconsistent(format!(
                "form-factor grids have mismatched lengths {} and {}",
                x_grid.len(),
                s_incoherent.len()
            )));
        }
        if !x_grid.windows(2).all(|w| w[0] < w[1]) {
            return Err(DataFormatError::Inconsistent(
                "momentum-transfer grid is not strictly increasing".to_string(),
            ));
        }
        Ok(Self {
            energy_mev,
            total,
            photoelectric,
            compton,
            pair,
            x_grid,
            s_incoherent,
            density: LXE_DENSITY_G_CM3,
        })
    }

    /// Load the table from a NIST attenuation file and a Hubbell
    /// form-factor file.
    pub fn from_files<P: AsRef<Path>, Q: AsRef<Path>>(
        nist_path: P,
        formfactor_path: Q,
    ) -> Result<Self, DataFormatError> {
        let nist_path = nist_path.as_ref();
        let formfactor_path = formfactor_path.as_ref();
        let nist = File::open(nist_path).map_err(|source| DataFormatError::Io {
            path: nist_path.display().to_string(),
            source,
        })?;
        let ff = File::open(formfactor_path).map_err(|source| DataFormatError::Io {
            path: formfactor_path.display().to_string(),
            source,
        })?;
        Self::from_readers(
            BufReader::new(nist),
            &nist_path.display().to_string(),
            BufReader::new(ff),
            &formfactor_path.display().to_string(),
        )
    }

    /// Parse the two tables from arbitrary readers. Split out from
    /// [`Self::from_files`] so tests can feed in-memory fixtures.
    pub fn from_readers<R: BufRead, S: BufRead>(
        nist: R,
        nist_name: &str,
        formfactor: S,
        formfactor_name: &str,
    ) -> Result<Self, DataFormatError> {
        let nist_rows = parse_nist_rows(nist, nist_name)?;
        let ff_rows = parse_formfactor_rows(formfactor, formfactor_name)?;

        let mut energy_mev = Vec::with_capacity(nist_rows.len());
        let mut total = Vec::with_capacity(nist_rows.len());
        let mut photoelectric = Vec::with_capacity(nist_rows.len());
        let mut compton = Vec::with_capacity(nist_rows.len());
        let mut pair = Vec::with_capacity(nist_rows.len());
        for row in &nist_rows {
            energy_mev.push(row[0]);
            compton.push(row[2]);
            photoelectric.push(row[3]);
            // pair production in the nuclear and electron fields combined
            pair.push(row[4] + row[5]);
            total.push(row[7]);
        }

        let mut x_grid = Vec::with_capacity(ff_rows.len());
        let mut s_incoherent = Vec::with_capacity(ff_rows.len());
        for row in &ff_rows {
            x_grid.push(row[0]);
            // row[1] is the coherent form factor F(x), unused in transport
            s_incoherent.push(row[2]);
        }

        Self::from_parts(
            energy_mev,
            total,
            photoelectric,
            compton,
            pair,
            x_grid,
            s_incoherent,
        )
    }

    /// Mass-attenuation coefficient in cm2/g for a process at the given
    /// energy in keV. Energies outside the tabulated range are an error:
    /// the physics below and above the table is undefined, never
    /// extrapolated.
    pub fn lookup(&self, process: Process, energy_kev: f64) -> Result<f64, DataFormatError> {
        let e_mev = energy_kev / 1e3;
        let first = self.energy_mev[0];
        let last = self.energy_mev[self.energy_mev.len() - 1];
        if !(first..=last).contains(&e_mev) {
            return Err(DataFormatError::EnergyOutOfRange {
                energy_kev,
                min_kev: first * 1e3,
                max_kev: last * 1e3,
            });
        }
        let column = match process {
            Process::Total => &self.total,
            Process::Photoelectric => &self.photoelectric,
            Process::Compton => &self.compton,
            Process::Pair => &self.pair,
        };
        Ok(interpolate_linear(&self.energy_mev, column, e_mev))
    }

    /// Incoherent scattering function S(x), interpolated over the
    /// momentum-transfer grid. Clamped at both ends: S saturates at the
    /// atomic number for large x and vanishes toward x = 0.
    pub fn form_factor(&self, x: f64) -> f64 {
        interpolate_linear(&self.x_grid, &self.s_incoherent, x)
    }

    /// Attenuation length 1/(rho * mu_total) in cm. A vanishing total
    /// coefficient yields an infinite attenuation length (the photon
    /// streams freely).
    pub fn attenuation_length(&self, energy_kev: f64) -> Result<f64, DataFormatError> {
        let mu = self.lookup(Process::Total, energy_kev)?;
        Ok(1.0 / (self.density * mu))
    }

    /// Lowest tabulated energy in keV
    pub fn energy_min_kev(&self) -> f64 {
        self.energy_mev[0] * 1e3
    }

    /// Highest tabulated energy in keV
    pub fn energy_max_kev(&self) -> f64 {
        self.energy_mev[self.energy_mev.len() - 1] * 1e3
    }
}

/// Read the NIST attenuation table: skip the header block, skip blank
/// lines, cut the shell-label prefix off each data row, then parse 8
/// whitespace-separated columns.
fn parse_nist_rows<R: BufRead>(reader: R, name: &str) -> Result<Vec<[f64; 8]>, DataFormatError> {
    let mut rows = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| DataFormatError::Io {
            path: name.to_string(),
            source,
        })?;
        if i < NIST_HEADER_LINES {
            continue;
        }
        if line.trim().len() < 5 {
            continue;
        }
        let data = if line.len() > NIST_LABEL_WIDTH {
            &line[NIST_LABEL_WIDTH..]
        } else {
            line.as_str()
        };
        rows.push(parse_columns::<8>(data, name, i + 1)?);
    }
    if rows.is_empty() {
        return Err(DataFormatError::Inconsistent(format!(
            "{} contains no data rows",
            name
        )));
    }
    Ok(rows)
}

/// Read the Hubbell form-factor table: two header lines, then rows of
/// x, F(x), S(x).
fn parse_formfactor_rows<R: BufRead>(
    reader: R,
    name: &str,
) -> Result<Vec<[f64; 3]>, DataFormatError> {
    let mut rows = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| DataFormatError::Io {
            path: name.to_string(),
            source,
        })?;
        if i < FORMFACTOR_HEADER_LINES {
            continue;
        }
        if line.trim().len() < 5 {
            continue;
        }
        rows.push(parse_columns::<3>(&line, name, i + 1)?);
    }
    if rows.is_empty() {
        return Err(DataFormatError::Inconsistent(format!(
            "{} contains no data rows",
            name
        )));
    }
    Ok(rows)
}

fn parse_columns<const N: usize>(
    data: &str,
    name: &str,
    line_no: usize,
) -> Result<[f64; N], DataFormatError> {
    let fields: Vec<&str> = data.split_whitespace().collect();
    if fields.len() != N {
        return Err(DataFormatError::ColumnCount {
            path: name.to_string(),
            line: line_no,
            expected: N,
            found: fields.len(),
        });
    }
    let mut row = [0.0; N];
    for (slot, field) in row.iter_mut().zip(fields.iter()) {
        *slot = field.parse().map_err(|_| DataFormatError::Malformed {
            path: name.to_string(),
            line: line_no,
            token: field.to_string(),
        })?;
    }
    Ok(row)
}
