/// Converts variable frame times into a whole number of fixed ticks.
///
/// The map advances in ticks of a fixed length (40 ms by default). Hosts call
/// [`FixedTimestep::accumulate`] with the elapsed wall time and run that many
/// ticks; leftover time carries over to the next frame.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    /// Tick length in seconds.
    dt: f64,
    /// Time not yet consumed by a tick.
    accumulator: f64,
    /// Upper bound on ticks per frame, so a stalled tab does not replay minutes of animation.
    max_steps: u32,
}

impl FixedTimestep {
    pub const DEFAULT_MAX_STEPS: u32 = 5;

    pub fn new(dt: f64) -> Self {
        Self {
            dt,
            accumulator: 0.0,
            max_steps: Self::DEFAULT_MAX_STEPS,
        }
    }

    pub fn from_millis(millis: f64) -> Self {
        Self::new(millis / 1000.0)
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Add frame time (seconds). Returns the number of ticks to run.
    pub fn accumulate(&mut self, frame_dt: f64) -> u32 {
        if !(frame_dt > 0.0) {
            return 0;
        }
        self.accumulator = (self.accumulator + frame_dt).min(self.dt * self.max_steps as f64);
        let steps = (self.accumulator / self.dt) as u32;
        self.accumulator -= steps as f64 * self.dt;
        steps
    }

    /// Fraction of the next tick already accumulated (0.0 to 1.0).
    pub fn alpha(&self) -> f64 {
        self.accumulator / self.dt
    }

    /// Tick length in seconds.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// How many ticks cover `seconds`, rounded up. Ratios within 1e-9 of a
    /// whole number count as that number.
    pub fn ticks_for(&self, seconds: f64) -> u32 {
        (seconds / self.dt - 1e-9).ceil().max(0.0) as u32
    }
}
