//! Component models and value modulators for the Faraday engine.
//!
//! A [`Device`] describes what a component *is*; the circuit stores it next
//! to the component's wiring and value and asks it for symbolic voltage and
//! current expressions per analysis mode. Energy-storing devices
//! additionally expose a `dydt` expression integrated by the ODE driver and
//! carry their initial-condition bookkeeping here.

pub mod device;
pub mod pwm;
pub mod sine;

pub use device::{Device, Pins, Reactive, StateQuantity};
pub use pwm::Pwm;
pub use sine::Sine;
