// Reference (unbiased) simulation: 1 MeV gammas in the standard
// cryostat, rows appended to mcdata_analog.csv.
//
// Usage: cargo run --example analog_run [nist_table] [formfactor_table]

use gamma_fastmc::{CrossSectionTable, CsvEventSink, Model, RunLog, Settings, TransportMode};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let nist = args
        .next()
        .unwrap_or_else(|| "tests/data/gamma_sigma.txt".to_string());
    let formfactors = args
        .next()
        .unwrap_or_else(|| "tests/data/formfactors.txt".to_string());
    let table = CrossSectionTable::from_files(&nist, &formfactors)?;

    let settings = Settings {
        energy_kev: 1000.0,
        edep_max_kev: 2700.0,
        mode: TransportMode::Analog,
        max_scatters: 50,
        writeout: 4,
        seed: 0,
        detector_radius_cm: 65.0,
        detector_height_cm: 150.0,
        fiducial_radius_cm: 57.0,
        fiducial_height_cm: 134.0,
        nevents: 100_000,
    };

    let model = Model::new(settings, &table);
    let mut sink = CsvEventSink::append_to_path("mcdata_analog.csv")?;
    let mut log = RunLog::append_to_path("sim_log.jsonl")?;
    let summary = model.run(&mut sink, &mut log)?;

    println!(
        "emitted {} events ({} failed, {} above the deposit window)",
        summary.emitted, summary.failed, summary.cut_exceeded
    );
    Ok(())
}
