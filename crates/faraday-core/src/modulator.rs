//! Time-varying drivers of component values.
//!
//! A modulator owns no storage of its own; the circuit registers controlled
//! `(component, flags)` entries against it and hands the modulator a
//! [`Targets`] writer whenever it should drive them. Continuous modulators
//! (smooth waveforms) are additionally applied inside each Runge-Kutta
//! sub-evaluation; discrete ones only at event boundaries.

use crate::ids::ComponentId;

/// Per-target option bits set when binding a modulator to a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModFlags(u32);

impl ModFlags {
    /// No options.
    pub const NONE: ModFlags = ModFlags(0);
    /// Invert the polarity of the driven value.
    pub const INVERTED: ModFlags = ModFlags(1);

    /// Whether all bits of `other` are set in `self`.
    pub fn contains(self, other: ModFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for ModFlags {
    type Output = ModFlags;

    fn bitor(self, rhs: ModFlags) -> ModFlags {
        ModFlags(self.0 | rhs.0)
    }
}

/// Writer over the values a modulator controls.
pub struct Targets<'a> {
    entries: &'a [(ComponentId, ModFlags)],
    sink: &'a mut dyn FnMut(ComponentId, f64),
}

impl<'a> Targets<'a> {
    /// Wrap the controlled entries and a value sink.
    pub fn new(
        entries: &'a [(ComponentId, ModFlags)],
        sink: &'a mut dyn FnMut(ComponentId, f64),
    ) -> Self {
        Targets { entries, sink }
    }

    /// Drive every controlled value, deriving it from the target's flags.
    pub fn set_each(&mut self, f: impl Fn(ModFlags) -> f64) {
        for &(comp, flags) in self.entries {
            (self.sink)(comp, f(flags));
        }
    }

    /// Drive every controlled value to `value`, ignoring flags.
    pub fn set(&mut self, value: f64) {
        self.set_each(|_| value);
    }
}

/// A generator that automatically overwrites component values over time.
pub trait Modulator {
    /// Restore internal state to pre-simulation conditions. Runs at the
    /// start of every transient phase; may drive the targets immediately.
    fn reset(&mut self, _t: f64, _out: Targets<'_>) {}

    /// Overwrite every controlled value according to time `t`.
    fn apply(&mut self, t: f64, out: Targets<'_>);

    /// True when `apply` is safe to invoke at arbitrary sub-step times;
    /// false restricts it to event boundaries.
    fn continuous(&self) -> bool {
        true
    }

    /// Time of the next abrupt change, or `f64::MAX` for a source that is
    /// constant or smoothly varying.
    fn next_change_time(&mut self, _t: f64) -> f64 {
        f64::MAX
    }
}
