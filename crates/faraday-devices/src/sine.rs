//! Sinusoidal value modulator.

use std::f64::consts::PI;

use faraday_core::{ModFlags, Modulator, Targets};

/// Drives controlled values with `amp * sin(2*pi*freq*t + phase) + dc_offset`.
///
/// The waveform is smooth, so it is safe to evaluate at arbitrary sub-step
/// times and reports no discontinuities.
#[derive(Debug, Clone)]
pub struct Sine {
    /// Frequency in hertz.
    pub freq: f64,
    /// Peak amplitude.
    pub amp: f64,
    /// Constant offset added to the waveform.
    pub dc_offset: f64,
    /// Phase in degrees.
    pub phase: f64,
}

impl Sine {
    /// Sine wave with the given frequency and amplitude, zero offset and
    /// phase.
    pub fn new(freq: f64, amp: f64) -> Self {
        Sine {
            freq,
            amp,
            dc_offset: 0.0,
            phase: 0.0,
        }
    }

    /// Waveform value at time `t`.
    pub fn value_at(&self, t: f64) -> f64 {
        self.amp * (2.0 * PI * self.freq * t + self.phase * PI / 180.0).sin() + self.dc_offset
    }
}

impl Modulator for Sine {
    fn apply(&mut self, t: f64, mut out: Targets<'_>) {
        let value = self.value_at(t);
        out.set_each(|flags| {
            if flags.contains(ModFlags::INVERTED) {
                -value
            } else {
                value
            }
        });
    }

    fn continuous(&self) -> bool {
        true
    }
}
