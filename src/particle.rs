// Photon transport state. One photon per event, owned exclusively by
// the transport loop that drives it.

use serde::Serialize;

/// How a photon's random walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    /// Photoelectric absorption
    Absorbed,
    /// Pair production, treated as terminal absorption
    PairProduced,
    /// Crossed the detector boundary before the next collision
    Escaped,
    /// Reached the configured Compton scatter cap
    MaxScatterReached,
    /// An absorption would have pushed the fiducial deposit past the
    /// configured maximum (energy-cut branch only)
    DepositCutExceeded,
}

/// One interaction point and the energy it left in the medium
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionRecord {
    pub position: [f64; 3],
    pub deposit_kev: f64,
}

/// Mutable photon state threaded through one transport invocation.
///
/// Invariants: `direction` is unit length, `weight` > 0, `energy_kev`
/// never increases across scatters.
#[derive(Debug, Clone)]
pub struct Photon {
    pub position: [f64; 3],
    pub direction: [f64; 3],
    pub energy_kev: f64,
    pub weight: f64,
    /// Number of Compton scatters so far
    pub n_compton: u32,
    /// Every interaction point, in order, including the terminal one
    pub interactions: Vec<InteractionRecord>,
    pub terminal: Option<TerminalState>,
}

impl Photon {
    pub fn new(position: [f64; 3], direction: [f64; 3], energy_kev: f64) -> Self {
        Self {
            position,
            direction,
            energy_kev,
            weight: 1.0,
            n_compton: 0,
            interactions: Vec::new(),
            terminal: None,
        }
    }

    /// Advance the photon along its direction of flight
    pub fn move_by(&mut self, distance: f64) {
        self.position[0] += distance * self.direction[0];
        self.position[1] += distance * self.direction[1];
        self.position[2] += distance * self.direction[2];
    }

    /// Append an interaction record at the current position
    pub fn record_interaction(&mut self, deposit_kev: f64) {
        self.interactions.push(InteractionRecord {
            position: self.position,
            deposit_kev,
        });
    }

    pub fn is_alive(&self) -> bool {
        self.terminal.is_none()
    }
}
