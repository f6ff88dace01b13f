// Parsing the on-disk table formats: NIST-style attenuation file and
// Hubbell-style form-factor file.

use approx::assert_relative_eq;
use gamma_fastmc::{CrossSectionTable, DataFormatError, Process, LXE_DENSITY_G_CM3};
use std::path::Path;

fn data_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name)
}

fn load_fixture() -> CrossSectionTable {
    CrossSectionTable::from_files(data_path("gamma_sigma.txt"), data_path("formfactors.txt"))
        .unwrap()
}

#[test]
fn fixture_tables_parse() {
    let table = load_fixture();
    assert_relative_eq!(table.energy_min_kev(), 1.0);
    assert_relative_eq!(table.energy_max_kev(), 10_000.0);
}

#[test]
fn parsed_coefficients_match_the_file() {
    let table = load_fixture();
    assert_relative_eq!(table.lookup(Process::Total, 1000.0).unwrap(), 6.6e-2);
    assert_relative_eq!(table.lookup(Process::Photoelectric, 100.0).unwrap(), 1.55);
    assert_relative_eq!(table.lookup(Process::Compton, 500.0).unwrap(), 8.0e-2);
    // pair production is the nuclear + electron field sum
    assert_relative_eq!(table.lookup(Process::Pair, 10_000.0).unwrap(), 2.4e-2);
}

#[test]
fn parsed_total_is_the_partial_sum() {
    let table = load_fixture();
    for energy in [1.0, 37.0, 100.0, 662.0, 1000.0, 2000.0, 8000.0] {
        let total = table.lookup(Process::Total, energy).unwrap();
        let sum = table.lookup(Process::Photoelectric, energy).unwrap()
            + table.lookup(Process::Compton, energy).unwrap()
            + table.lookup(Process::Pair, energy).unwrap();
        assert_relative_eq!(total, sum, max_relative = 1e-6);
    }
}

#[test]
fn attenuation_length_follows_from_density() {
    let table = load_fixture();
    let att = table.attenuation_length(1000.0).unwrap();
    assert_relative_eq!(att, 1.0 / (LXE_DENSITY_G_CM3 * 6.6e-2), max_relative = 1e-9);
}

#[test]
fn form_factor_saturates_at_z() {
    let table = load_fixture();
    assert_relative_eq!(table.form_factor(0.0), 0.0);
    assert_relative_eq!(table.form_factor(1.0), 14.0);
    assert_relative_eq!(table.form_factor(2.0e8), 54.0, max_relative = 1e-6);
}

#[test]
fn missing_file_is_an_io_error() {
    let result =
        CrossSectionTable::from_files(data_path("no_such_table.txt"), data_path("formfactors.txt"));
    assert!(matches!(result, Err(DataFormatError::Io { .. })));
}
