//! Time management for the simulation
//!
//! The simulation operates in discrete ticks (one tick per day by default).
//! Risk parameters are expressed per year, so this module converts between
//! years and ticks and tracks the run horizon.

use serde::{Deserialize, Serialize};

/// Simulation time: ticks elapsed since the start of the run.
pub type Tick = usize;

/// Tracks simulation time and the fixed run horizon
///
/// # Example
/// ```
/// use cohort_sim_core::SimClock;
///
/// let mut clock = SimClock::new(365, 10); // daily ticks, ten-year horizon
/// assert_eq!(clock.now(), 0);
/// assert_eq!(clock.horizon(), 3650);
///
/// clock.advance_to(730);
/// assert_eq!(clock.current_year(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimClock {
    /// Ticks elapsed since simulation start
    now: Tick,
    /// Number of ticks in one simulated year
    ticks_per_year: usize,
    /// Last tick (inclusive) at which events may fire
    horizon: Tick,
}

impl SimClock {
    /// Create a new clock
    ///
    /// # Arguments
    /// * `ticks_per_year` - Resolution of the simulation
    /// * `horizon_years` - Length of the run in years
    ///
    /// The horizon saturates at `Tick::MAX`.
    ///
    /// # Panics
    /// Panics if `ticks_per_year` is zero
    pub fn new(ticks_per_year: usize, horizon_years: usize) -> Self {
        assert!(ticks_per_year > 0, "ticks_per_year must be positive");
        Self {
            now: 0,
            ticks_per_year,
            horizon: ticks_per_year.saturating_mul(horizon_years),
        }
    }

    /// Move the clock forward to `tick`
    ///
    /// Time never runs backwards: an earlier tick leaves the clock untouched.
    ///
    /// # Example
    /// ```
    /// use cohort_sim_core::SimClock;
    ///
    /// let mut clock = SimClock::new(365, 1);
    /// clock.advance_to(10);
    /// clock.advance_to(5);
    /// assert_eq!(clock.now(), 10);
    /// ```
    pub fn advance_to(&mut self, tick: Tick) {
        if tick > self.now {
            self.now = tick;
        }
    }

    /// Current tick
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Current simulated year (0-indexed)
    pub fn current_year(&self) -> usize {
        self.now / self.ticks_per_year
    }

    /// Last tick at which events may fire
    pub fn horizon(&self) -> Tick {
        self.horizon
    }

    /// Check if `tick` lies past the horizon
    pub fn is_past_horizon(&self, tick: Tick) -> bool {
        tick > self.horizon
    }

    /// Get ticks per year
    pub fn ticks_per_year(&self) -> usize {
        self.ticks_per_year
    }

    /// Convert a duration in (fractional) years to whole ticks, rounding up
    ///
    /// Any positive duration maps to at least one tick so that an event
    /// drawn "now" never fires in the same instant as its cause.
    ///
    /// # Example
    /// ```
    /// use cohort_sim_core::SimClock;
    ///
    /// let clock = SimClock::new(365, 1);
    /// assert_eq!(clock.years_to_ticks(1.0), 365);
    /// assert_eq!(clock.years_to_ticks(0.0001), 1);
    /// ```
    pub fn years_to_ticks(&self, years: f64) -> Tick {
        years_to_ticks(years, self.ticks_per_year)
    }

    /// Convert ticks to years
    pub fn ticks_to_years(&self, ticks: Tick) -> f64 {
        ticks as f64 / self.ticks_per_year as f64
    }
}

/// Convert a duration in years to ticks, rounding up, saturating on overflow
pub fn years_to_ticks(years: f64, ticks_per_year: usize) -> Tick {
    if !years.is_finite() {
        return Tick::MAX;
    }
    if years <= 0.0 {
        return 0;
    }
    let ticks = (years * ticks_per_year as f64).ceil();
    if ticks >= Tick::MAX as f64 {
        Tick::MAX
    } else {
        (ticks as Tick).max(1)
    }
}
