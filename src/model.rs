// Event driver: loops over independent photons, streams finished events
// to the row sink, and books the run in the append-only log.

use crate::cross_section::{CrossSectionTable, DataFormatError};
use crate::fast_rng::FastRng;
use crate::output::{EventSink, OutputError, RunLog, RunLogEntry};
use crate::particle::{InteractionRecord, TerminalState};
use crate::settings::{ConfigurationError, Settings};
use crate::source::GammaSource;
use crate::transport::{fiducial_deposit, propagate, TransportContext, TransportError};
use rayon::prelude::*;
use std::io::Write;
use thiserror::Error;
use tracing::{info, warn};

/// Rows buffered between flushes of the event sink
const ROWS_PER_FLUSH: u64 = 10;
/// Progress heartbeat interval
const PROGRESS_INTERVAL: u64 = 25_000;
/// Events simulated per parallel batch; bounds the number of finished
/// events held in memory before they are written out in order
const PARALLEL_BATCH: u64 = 4096;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigurationError),
    #[error(transparent)]
    Data(#[from] DataFormatError),
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Summary record of one event, extracted from the dead photon
#[derive(Debug, Clone)]
pub struct EventResult {
    pub event_id: u64,
    /// Number of Compton scatters
    pub n_scatters: u32,
    pub weight: f64,
    /// Total energy deposited strictly inside the fiducial volume, keV
    pub edep_kev: f64,
    pub start: [f64; 3],
    /// Every interaction point in order, including the terminal one
    pub interactions: Vec<InteractionRecord>,
    pub terminal: TerminalState,
}

/// Counts accumulated over one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Events written to the sink
    pub emitted: u64,
    /// Events abandoned on a sampling failure
    pub failed: u64,
    /// Events withheld because the fiducial deposit window was exceeded
    pub cut_exceeded: u64,
}

/// Simulate a single event: a pure function of the shared read-only
/// context and the event's private random stream, safe to invoke
/// concurrently across workers.
pub fn simulate_one_event<R: rand::Rng + ?Sized>(
    ctx: &TransportContext<'_>,
    source: &GammaSource,
    event_id: u64,
    rng: &mut R,
) -> Result<EventResult, TransportError> {
    let mut photon = source.sample_photon(&ctx.detector, &ctx.fiducial, ctx.mode, rng);
    let start = photon.position;
    let terminal = propagate(&mut photon, ctx, rng)?;
    Ok(EventResult {
        event_id,
        n_scatters: photon.n_compton,
        weight: photon.weight,
        edep_kev: fiducial_deposit(&photon, &ctx.fiducial),
        start,
        interactions: photon.interactions,
        terminal,
    })
}

/// One simulation run: geometry pair, cross-section table, and settings
pub struct Model<'a> {
    pub settings: Settings,
    pub table: &'a CrossSectionTable,
}

impl<'a> Model<'a> {
    pub fn new(settings: Settings, table: &'a CrossSectionTable) -> Self {
        Self { settings, table }
    }

    fn context(&self) -> TransportContext<'a> {
        TransportContext {
            detector: self.settings.detector(),
            fiducial: self.settings.fiducial(),
            table: self.table,
            mode: self.settings.mode,
            source_energy_kev: self.settings.energy_kev,
            edep_max_kev: self.settings.edep_max_kev,
            max_scatters: self.settings.max_scatters,
        }
    }

    /// Run sequentially, streaming rows to the sink as events finish.
    /// Interrupting between events never corrupts the sink: a row is
    /// appended only after its event fully terminates.
    pub fn run<S: EventSink, W: Write>(
        &self,
        sink: &mut S,
        run_log: &mut RunLog<W>,
    ) -> Result<RunSummary, RunError> {
        self.settings.validate(self.table)?;
        let ctx = self.context();
        let source = GammaSource {
            energy_kev: self.settings.energy_kev,
        };
        info!(
            nevents = self.settings.nevents,
            energy_kev = self.settings.energy_kev,
            mode = ?self.settings.mode,
            "starting run"
        );

        let mut summary = RunSummary::default();
        for event_id in 0..self.settings.nevents {
            if event_id > 0 && event_id % PROGRESS_INTERVAL == 0 {
                info!(event_id, "generated events");
            }
            let mut rng = FastRng::for_event(self.settings.seed, event_id);
            let outcome = simulate_one_event(&ctx, &source, event_id, &mut rng);
            self.consume(outcome, sink, &mut summary)?;
        }

        self.finish(sink, run_log, summary)
    }

    /// Run with events fanned out over the rayon pool. Each event owns a
    /// private stream derived from the master seed, so the output is
    /// identical to the sequential run regardless of scheduling. Rows
    /// are written in event order after each batch completes.
    pub fn run_parallel<S: EventSink, W: Write>(
        &self,
        sink: &mut S,
        run_log: &mut RunLog<W>,
    ) -> Result<RunSummary, RunError> {
        self.settings.validate(self.table)?;
        let ctx = self.context();
        let source = GammaSource {
            energy_kev: self.settings.energy_kev,
        };
        info!(
            nevents = self.settings.nevents,
            energy_kev = self.settings.energy_kev,
            mode = ?self.settings.mode,
            "starting parallel run"
        );

        let mut summary = RunSummary::default();
        let mut batch_start = 0u64;
        while batch_start < self.settings.nevents {
            let batch_end = (batch_start + PARALLEL_BATCH).min(self.settings.nevents);
            let outcomes: Vec<Result<EventResult, TransportError>> = (batch_start..batch_end)
                .into_par_iter()
                .map(|event_id| {
                    let mut rng = FastRng::for_event(self.settings.seed, event_id);
                    simulate_one_event(&ctx, &source, event_id, &mut rng)
                })
                .collect();
            for outcome in outcomes {
                self.consume(outcome, sink, &mut summary)?;
            }
            if batch_start / PROGRESS_INTERVAL != batch_end / PROGRESS_INTERVAL {
                info!(event_id = batch_end, "generated events");
            }
            batch_start = batch_end;
        }

        self.finish(sink, run_log, summary)
    }

    fn consume<S: EventSink>(
        &self,
        outcome: Result<EventResult, TransportError>,
        sink: &mut S,
        summary: &mut RunSummary,
    ) -> Result<(), RunError> {
        match outcome {
            Ok(event) if event.terminal == TerminalState::DepositCutExceeded => {
                // The event's total deposit lies above the window of
                // interest; it contributes nothing to the restricted
                // spectrum and is withheld from the sink
                summary.cut_exceeded += 1;
            }
            Ok(event) => {
                sink.write_event(&event, self.settings.writeout)?;
                summary.emitted += 1;
                if summary.emitted % ROWS_PER_FLUSH == 0 {
                    sink.flush()?;
                }
            }
            Err(TransportError::Sampling(err)) => {
                // Fatal for this event only; the run continues
                warn!(%err, "event abandoned on sampling failure");
                summary.failed += 1;
            }
            Err(TransportError::Data(err)) => return Err(RunError::Data(err)),
        }
        Ok(())
    }

    fn finish<S: EventSink, W: Write>(
        &self,
        sink: &mut S,
        run_log: &mut RunLog<W>,
        summary: RunSummary,
    ) -> Result<RunSummary, RunError> {
        sink.flush()?;
        run_log.append(&RunLogEntry::new(&self.settings, &summary))?;
        info!(
            emitted = summary.emitted,
            failed = summary.failed,
            cut_exceeded = summary.cut_exceeded,
            "run complete"
        );
        Ok(summary)
    }
}
