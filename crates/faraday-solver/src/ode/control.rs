//! Step-size control for embedded Runge-Kutta pairs.

/// What the controller did to the step size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    /// Error too large; the step was shrunk.
    Decreased,
    /// Error in band; step size unchanged.
    NoChange,
    /// Error comfortably small; the step was grown.
    Increased,
}

/// Standard proportional controller over the scaled error ratio.
///
/// Each component is scaled by `D_i = eps_abs + eps_rel * |y_i|`; the
/// controller reacts to `r = max_i |err_i| / D_i` with the usual
/// `r^(-1/order)` shrink and `r^(-1/(order+1))` growth laws and a 0.9
/// safety factor. Growth is capped at 5x and shrinkage at 5x per step.
pub(crate) struct StandardControl {
    pub eps_abs: f64,
    pub eps_rel: f64,
}

const SAFETY: f64 = 0.9;

impl StandardControl {
    pub(crate) fn hadjust(&self, order: u32, y: &[f64], yerr: &[f64], h: &mut f64) -> Adjustment {
        let mut rmax = 0.0_f64;
        for i in 0..y.len() {
            let scale = self.eps_abs + self.eps_rel * y[i].abs();
            let r = if scale > 0.0 {
                yerr[i].abs() / scale
            } else {
                f64::INFINITY
            };
            rmax = rmax.max(r);
        }

        if rmax > 1.1 {
            let factor = (SAFETY * rmax.powf(-1.0 / order as f64)).max(0.2);
            *h *= factor;
            Adjustment::Decreased
        } else if rmax < 0.5 {
            let factor = (SAFETY * rmax.powf(-1.0 / (order as f64 + 1.0))).clamp(1.0, 5.0);
            *h *= factor;
            Adjustment::Increased
        } else {
            Adjustment::NoChange
        }
    }
}
