//! Adaptive embedded Runge-Kutta ODE driver.
//!
//! The driver deliberately exposes *single step applications* rather than a
//! closed integrate-to-time loop: the circuit engine interleaves event
//! handling (modulator edges, save points, end-of-run clipping) between
//! steps and needs to intercept every intermediate time, so it owns the
//! outer loop and asks the driver for one candidate step at a time.
//!
//! A step whose result is non-finite is reported as [`StepStatus::Failed`]
//! and the state is restored; the caller halves the step and retries.
//! Errors raised by the derivative callback itself propagate unchanged.

mod control;
mod rk;

pub use control::Adjustment;

use crate::error::Error;
use control::StandardControl;
use rk::RkStepper;

/// Derivative callback of an ODE system `dy/dt = f(t, y)`.
pub trait System {
    /// Error the callback can raise; driver-internal faults convert into it.
    type Error;

    /// Write `f(t, y)` into `dydt`.
    fn eval(&mut self, t: f64, y: &[f64], dydt: &mut [f64]) -> Result<(), Self::Error>;
}

/// Outcome of one step application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// The state was advanced by the driver's current step size.
    Success,
    /// The step produced a non-finite result and was rolled back; retry
    /// with a smaller step size.
    Failed,
}

/// Stepper algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepperKind {
    /// Runge-Kutta-Fehlberg 4(5).
    #[default]
    Rkf45,
    /// Cash-Karp 4(5).
    CashKarp,
}

/// Adaptive embedded-RK driver for a fixed-dimension system.
pub struct OdeDriver {
    stepper: RkStepper,
    control: StandardControl,
    /// Current step size. The circuit engine aliases this as the live `dt`
    /// read by companion-model expressions.
    pub h: f64,
    h_min: f64,
    h_max: f64,
    dim: usize,
    y0: Vec<f64>,
    yerr: Vec<f64>,
    dydt_in: Vec<f64>,
    dydt_out: Vec<f64>,
    count: u64,
    failed_steps: u64,
}

impl OdeDriver {
    /// Allocate a driver for a `dim`-dimensional system starting at step
    /// size `h_start` with the given error tolerances.
    pub fn new(
        kind: StepperKind,
        dim: usize,
        h_start: f64,
        eps_abs: f64,
        eps_rel: f64,
    ) -> Result<Self, Error> {
        if dim == 0 {
            return Err(Error::DriverAllocation(
                "system dimension must be positive".into(),
            ));
        }
        if !(h_start > 0.0) {
            return Err(Error::DriverAllocation(format!(
                "initial step size must be positive, got {h_start}"
            )));
        }
        if eps_abs < 0.0 || eps_rel < 0.0 {
            return Err(Error::DriverAllocation(
                "error tolerances must be non-negative".into(),
            ));
        }
        if eps_abs == 0.0 && eps_rel == 0.0 {
            return Err(Error::DriverAllocation(
                "at least one error tolerance must be positive".into(),
            ));
        }

        let tableau = match kind {
            StepperKind::Rkf45 => &rk::RKF45,
            StepperKind::CashKarp => &rk::CASH_KARP,
        };

        Ok(OdeDriver {
            stepper: RkStepper::new(tableau, dim),
            control: StandardControl { eps_abs, eps_rel },
            h: h_start,
            h_min: 0.0,
            h_max: f64::MAX,
            dim,
            y0: vec![0.0; dim],
            yerr: vec![0.0; dim],
            dydt_in: vec![0.0; dim],
            dydt_out: vec![0.0; dim],
            count: 0,
            failed_steps: 0,
        })
    }

    /// Lower bound applied when retuning the step size.
    pub fn set_hmin(&mut self, h_min: f64) {
        self.h_min = h_min;
    }

    /// Upper bound applied when retuning the step size.
    pub fn set_hmax(&mut self, h_max: f64) {
        self.h_max = h_max;
    }

    /// System dimension this driver was allocated for.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of successfully committed steps.
    pub fn step_count(&self) -> u64 {
        self.count
    }

    /// Number of rejected step attempts.
    pub fn failed_steps(&self) -> u64 {
        self.failed_steps
    }

    /// Apply one step of the current size `h` from time `t`, advancing `y`
    /// in place.
    ///
    /// The first-stage derivative is evaluated through the callback on the
    /// first ever step and reused from the previous step's end point
    /// afterwards. On success the callback is evaluated once more at
    /// `(t + h, y_new)`, which both seeds the next step and leaves any state
    /// the callback refreshes consistent with the committed point.
    pub fn step_apply<S>(
        &mut self,
        t: f64,
        y: &mut [f64],
        sys: &mut S,
    ) -> Result<StepStatus, S::Error>
    where
        S: System + ?Sized,
        S::Error: From<Error>,
    {
        if y.len() != self.dim {
            return Err(Error::StepperInternal(format!(
                "state length {} does not match driver dimension {}",
                y.len(),
                self.dim
            ))
            .into());
        }

        let h = self.h;
        self.y0.copy_from_slice(y);

        if self.count == 0 {
            sys.eval(t, y, &mut self.dydt_in)?;
        } else {
            self.dydt_in.copy_from_slice(&self.dydt_out);
        }

        let finite = self
            .stepper
            .apply(t, h, y, &mut self.yerr, &self.dydt_in, sys)?;

        if !finite {
            y.copy_from_slice(&self.y0);
            self.failed_steps += 1;
            log::warn!("rejected ODE step of {h:.3e} at t = {t:.6e}: non-finite result");
            return Ok(StepStatus::Failed);
        }

        sys.eval(t + h, y, &mut self.dydt_out)?;
        self.count += 1;
        Ok(StepStatus::Success)
    }

    /// Retune `h` from the error estimate of the last committed step,
    /// clamped into the driver's `[h_min, h_max]` band.
    pub fn hadjust(&self, y: &[f64], h: &mut f64) -> Adjustment {
        let adj = self
            .control
            .hadjust(self.stepper.order(), y, &self.yerr, h);
        *h = h.max(self.h_min).min(self.h_max);
        adj
    }
}
