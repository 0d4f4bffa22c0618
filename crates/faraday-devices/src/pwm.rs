//! PWM (pulse-width modulation) value modulator.

use faraday_core::{EPSILON, ModFlags, Modulator, Targets, epsilon_floor};

/// Square-wave generator toggling controlled values between two levels.
///
/// The generator is discrete: it reports its next edge through
/// `next_change_time` so the simulation loop can land a step exactly on it,
/// and `apply` only switches state once the edge has been reached. Targets
/// registered with [`ModFlags::INVERTED`] receive the opposite level.
#[derive(Debug, Clone)]
pub struct Pwm {
    duty: f64,
    freq: f64,
    period: f64,
    phase: f64,
    phase_offset: f64,

    /// Output level for the low half of the cycle.
    pub l_value: f64,
    /// Output level for the high half of the cycle.
    pub h_value: f64,

    /// Cached next edge time and the state the signal assumes there.
    cached_nct: f64,
    next_state: bool,
}

impl Pwm {
    /// PWM toggling between `l_value` and `h_value` at `freq` hertz with
    /// the given duty cycle (0..=1) and phase in degrees.
    pub fn new(l_value: f64, h_value: f64, freq: f64, duty: f64, phase: f64) -> Self {
        Pwm {
            duty,
            freq,
            period: 1.0 / freq,
            phase,
            phase_offset: phase / freq / 360.0,
            l_value,
            h_value,
            cached_nct: 0.0,
            next_state: false,
        }
    }

    pub fn duty(&self) -> f64 {
        self.duty
    }

    pub fn freq(&self) -> f64 {
        self.freq
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Change the duty cycle; invalidates the cached edge time.
    pub fn set_duty(&mut self, duty: f64) {
        self.duty = duty;
        self.cached_nct = 0.0;
    }

    /// Change the frequency; invalidates the cached edge time.
    pub fn set_freq(&mut self, freq: f64) {
        self.freq = freq;
        self.period = 1.0 / freq;
        self.phase_offset = self.period * self.phase / 360.0;
        self.cached_nct = 0.0;
    }

    /// Change the period; invalidates the cached edge time.
    pub fn set_period(&mut self, period: f64) {
        self.period = period;
        self.freq = 1.0 / period;
        self.phase_offset = self.period * self.phase / 360.0;
        self.cached_nct = 0.0;
    }

    /// Change the phase in degrees; invalidates the cached edge time.
    pub fn set_phase(&mut self, phase: f64) {
        self.phase = phase;
        self.phase_offset = self.period * self.phase / 360.0;
        self.cached_nct = 0.0;
    }

    /// Time of the next full-period boundary after `t`.
    pub fn next_period(&self, t: f64) -> f64 {
        (epsilon_floor((t + self.phase_offset) / self.period) + 1) as f64 * self.period
            - self.phase_offset
    }

    fn drive(&self, state: bool, out: &mut Targets<'_>) {
        out.set_each(|flags| {
            if state ^ flags.contains(ModFlags::INVERTED) {
                self.h_value
            } else {
                self.l_value
            }
        });
    }
}

impl Modulator for Pwm {
    fn reset(&mut self, t: f64, mut out: Targets<'_>) {
        self.cached_nct = 0.0;
        self.next_change_time(t);
        // The current state is the opposite of the upcoming edge's state,
        // except at duty 0 or 1 where the signal is constant.
        let state = self.next_state ^ (self.duty > 0.0 && self.duty < 1.0);
        self.drive(state, &mut out);
    }

    fn apply(&mut self, t: f64, mut out: Targets<'_>) {
        if t > self.cached_nct + EPSILON {
            self.next_change_time(t);
        }
        if t + EPSILON < self.cached_nct {
            return;
        }
        let state = self.next_state;
        self.drive(state, &mut out);
    }

    fn continuous(&self) -> bool {
        false
    }

    fn next_change_time(&mut self, t: f64) -> f64 {
        if t + EPSILON < self.cached_nct {
            return self.cached_nct;
        }

        let ncycles = (t + self.phase_offset) / self.period;
        let int_ncycles = epsilon_floor(ncycles);
        let basetime = int_ncycles as f64 * self.period;

        // Falling edge while the current state should be high, but only if
        // the duty cycle isn't 1; rising edge otherwise, but only if the
        // duty cycle isn't 0.
        if ncycles - int_ncycles as f64 + EPSILON < self.duty {
            self.cached_nct = basetime + self.period * self.duty;
            self.next_state = self.duty >= 1.0;
        } else {
            self.cached_nct = basetime + self.period;
            self.next_state = self.duty > 0.0;
        }

        self.cached_nct -= self.phase_offset;
        self.cached_nct
    }
}
