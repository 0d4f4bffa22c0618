//! End-to-end simulation scenarios with analytically known answers.

use faraday::{Circuit, Error, EvalError, ModFlags, Pwm, Sine, StepperKind, Tunables};

/// Tolerances for transient runs: tight integrator error, step capped so
/// the companion-model step-size artifact stays well below the assertion
/// tolerances.
fn transient_tunables(h_max: f64) -> Tunables {
    Tunables {
        h_min: 1e-15,
        h_max,
        e_abs: 1e-12,
        e_rel: 1e-6,
        stepper: StepperKind::Rkf45,
    }
}

#[test]
fn resistor_with_voltage_source() {
    // 5 V source across a 100 ohm resistor. The source is wired from
    // ground up and flipped so its + side lands on the free node.
    let mut c = Circuit::new();
    let gnd = c.gnd();
    let n = c.add_node();
    let r1 = c.add_resistor(100.0);
    let vs = c.add_voltage_source(5.0);

    c.chain(n).to(r1).unwrap().end_at(gnd).unwrap();
    c.chain(gnd).to(vs).unwrap().end_at(n).unwrap();
    c.flip(vs);

    c.sim_to_time(0.0).unwrap();

    assert!(
        (c.node_voltage(n) - 5.0).abs() < 1e-9,
        "V(n) = {} (expected 5.0)",
        c.node_voltage(n)
    );
    let i_r = c.current(r1).unwrap();
    assert!((i_r - 0.05).abs() < 1e-9, "I(R1) = {i_r} (expected 0.05)");

    // The source delivers 0.25 W: under the passive convention its branch
    // current and power read negative.
    let i_vs = c.current(vs).unwrap();
    assert!((i_vs + 0.05).abs() < 1e-9, "I(V1) = {i_vs} (expected -0.05)");
    let p_vs = c.power(vs).unwrap();
    assert!((p_vs + 0.25).abs() < 1e-9, "P(V1) = {p_vs} (expected -0.25)");
    let p_r = c.power(r1).unwrap();
    assert!((p_r - 0.25).abs() < 1e-9, "P(R1) = {p_r} (expected 0.25)");
}

#[test]
fn two_resistor_divider() {
    // 5 V into 100 + 300 ohms: V(M) = 3.75 V, 12.5 mA through both.
    let mut c = Circuit::new();
    let gnd = c.gnd();
    let a = c.add_node();
    let m = c.add_node();
    let vs = c.add_voltage_source(5.0);
    let r1 = c.add_resistor(100.0);
    let r2 = c.add_resistor(300.0);

    c.chain(a).to(vs).unwrap().end_at(gnd).unwrap();
    c.chain(a)
        .to(r1)
        .unwrap()
        .via(m)
        .unwrap()
        .to(r2)
        .unwrap()
        .end_at(gnd)
        .unwrap();

    c.sim_to_time(0.0).unwrap();

    let v_m = c.node_voltage(m);
    assert!((v_m - 3.75).abs() < 1e-9, "V(M) = {v_m} (expected 3.75)");
    let i1 = c.current(r1).unwrap();
    let i2 = c.current(r2).unwrap();
    assert!((i1 - 0.0125).abs() < 1e-9, "I(R1) = {i1} (expected 0.0125)");
    assert!((i2 - 0.0125).abs() < 1e-9, "I(R2) = {i2} (expected 0.0125)");
}

#[test]
fn kcl_holds_at_free_nodes() {
    // Star of three resistors: the branch currents at the junction sum to
    // zero within the solver tolerances.
    let mut c = Circuit::new();
    let gnd = c.gnd();
    let a = c.add_node();
    let b = c.add_node();
    let vs = c.add_voltage_source(5.0);
    let r1 = c.add_resistor(100.0);
    let r2 = c.add_resistor(220.0);
    let r3 = c.add_resistor(470.0);

    c.chain(a).to(vs).unwrap().end_at(gnd).unwrap();
    c.chain(a).to(r1).unwrap().end_at(b).unwrap();
    c.chain(b).to(r2).unwrap().end_at(gnd).unwrap();
    c.chain(b).to(r3).unwrap().end_at(gnd).unwrap();

    c.sim_to_time(0.0).unwrap();

    // r1 enters b; r2 and r3 leave it.
    let residual = c.current(r1).unwrap() - c.current(r2).unwrap() - c.current(r3).unwrap();
    assert!(residual.abs() < 1e-9, "KCL residual at b: {residual}");
}

#[test]
fn current_source_into_resistor() {
    let mut c = Circuit::new();
    let gnd = c.gnd();
    let n = c.add_node();
    let is = c.add_current_source(0.01);
    let r = c.add_resistor(1000.0);

    // Source pushes 10 mA into n, resistor returns it to ground.
    c.chain(gnd).to(is).unwrap().end_at(n).unwrap();
    c.chain(n).to(r).unwrap().end_at(gnd).unwrap();

    c.sim_to_time(0.0).unwrap();

    assert!(
        (c.node_voltage(n) - 10.0).abs() < 1e-9,
        "V(n) = {} (expected 10.0)",
        c.node_voltage(n)
    );
}

#[test]
fn fixed_nodes_resolve_to_their_own_voltage() {
    // A resistor strung between two fixed rails never touches KCL; its
    // voltage comes straight from the rails.
    let mut c = Circuit::new();
    let gnd = c.gnd();
    let rail = c.add_fixed_node(3.3);
    let r = c.add_resistor(330.0);
    c.chain(rail).to(r).unwrap().end_at(gnd).unwrap();

    c.sim_to_time(0.0).unwrap();

    assert_eq!(c.node_voltage(rail), 3.3);
    assert!((c.voltage(r).unwrap() - 3.3).abs() < 1e-12);
    assert!((c.current(r).unwrap() - 0.01).abs() < 1e-12);
}

#[test]
fn rc_charging() {
    // Step of 5 V through 1 kohm into 1 uF, initially discharged.
    // tau = 1 ms: V(C) at 1 ms is 5(1 - 1/e) ~ 3.1606 V.
    let mut c = Circuit::with_tunables(Tunables {
        h_min: 1e-15,
        h_max: 1e-6,
        e_abs: 1e-12,
        e_rel: 1e-3,
        stepper: StepperKind::Rkf45,
    });
    let gnd = c.gnd();
    let n1 = c.add_node();
    let n2 = c.add_node();
    let vs = c.add_voltage_source(5.0);
    let r = c.add_resistor(1000.0);
    let cap = c.add_capacitor_with_ic(1e-6, 0.0);

    c.chain(n1).to(vs).unwrap().end_at(gnd).unwrap();
    c.chain(n1)
        .to(r)
        .unwrap()
        .via(n2)
        .unwrap()
        .to(cap)
        .unwrap()
        .end_at(gnd)
        .unwrap();

    c.sim_to_time(1e-3).unwrap();

    let expected = 5.0 * (1.0 - (-1.0_f64).exp());
    let v = c.voltage(cap).unwrap();
    assert!(
        (v - expected).abs() / expected < 0.01,
        "V(C) at tau = {v} (expected {expected} within 1%)"
    );

    // Continue the same run out to 5 tau; nearly fully charged.
    c.sim_to_time(5e-3).unwrap();
    let v5 = c.voltage(cap).unwrap();
    let expected5 = 5.0 * (1.0 - (-5.0_f64).exp());
    assert!(
        (v5 - expected5).abs() / expected5 < 0.01,
        "V(C) at 5 tau = {v5} (expected {expected5} within 1%)"
    );
}

#[test]
fn rl_energization() {
    // 10 V step through 10 ohms into 10 mH: tau = 1 ms,
    // I(L) at 1 ms is (10/10)(1 - 1/e) ~ 0.6321 A.
    let mut c = Circuit::with_tunables(Tunables {
        h_min: 1e-15,
        h_max: 1e-6,
        e_abs: 1e-12,
        e_rel: 1e-3,
        stepper: StepperKind::Rkf45,
    });
    let gnd = c.gnd();
    let n1 = c.add_node();
    let n2 = c.add_node();
    let vs = c.add_voltage_source(10.0);
    let r = c.add_resistor(10.0);
    let l = c.add_inductor_with_ic(10e-3, 0.0);

    c.chain(n1).to(vs).unwrap().end_at(gnd).unwrap();
    c.chain(n1)
        .to(r)
        .unwrap()
        .via(n2)
        .unwrap()
        .to(l)
        .unwrap()
        .end_at(gnd)
        .unwrap();

    c.sim_to_time(1e-3).unwrap();

    let expected = 1.0 - (-1.0_f64).exp();
    let i = c.current(l).unwrap();
    assert!(
        (i - expected).abs() / expected < 0.01,
        "I(L) at tau = {i} (expected {expected} within 1%)"
    );
}

#[test]
fn lc_resonator() {
    // Lossless LC: L = 100 uH, C = 1 uF charged to 1 V, both initial
    // conditions pinned. f = 1/(2 pi sqrt(LC)) ~ 15.915 kHz.
    let inductance = 100e-6;
    let capacitance = 1e-6;
    let lc: f64 = inductance * capacitance;
    let expected_freq = 1.0 / (2.0 * std::f64::consts::PI * lc.sqrt());
    let period = 1.0 / expected_freq;

    let mut c = Circuit::with_tunables(transient_tunables(2.5e-9));
    let gnd = c.gnd();
    let n1 = c.add_node();
    let cap = c.add_capacitor_with_ic(capacitance, 1.0);
    let ind = c.add_inductor_with_ic(inductance, 0.0);
    c.chain(n1).to(cap).unwrap().end_at(gnd).unwrap();
    c.chain(n1).to(ind).unwrap().end_at(gnd).unwrap();

    c.save_all(period / 100.0);
    c.sim_to_time(5.0 * period).unwrap();

    let hist = c.v_hist(cap);
    let times = c.save_times();
    assert!(hist.len() > 400, "expected ~500 samples, got {}", hist.len());

    // Amplitude must survive five periods within 2%.
    let last_period = &hist[hist.len() - 100..];
    let peak = last_period.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    assert!(
        (peak - 1.0).abs() < 0.02,
        "peak |V(C)| after 5 periods = {peak} (expected 1.0 within 2%)"
    );

    // Measure the period from positive-to-negative zero crossings.
    let mut crossings = Vec::new();
    for i in 1..hist.len() {
        if hist[i - 1] > 0.0 && hist[i] <= 0.0 {
            let frac = hist[i - 1] / (hist[i - 1] - hist[i]);
            crossings.push(times[i - 1] + frac * (times[i] - times[i - 1]));
        }
    }
    assert!(
        crossings.len() >= 2,
        "not enough zero crossings: {}",
        crossings.len()
    );
    let measured = crossings[1] - crossings[0];
    let freq_error = ((1.0 / measured) - expected_freq).abs() / expected_freq;
    assert!(
        freq_error < 0.01,
        "oscillation at {:.1} Hz, expected {:.1} Hz (error {:.2}%)",
        1.0 / measured,
        expected_freq,
        freq_error * 100.0
    );
}

#[test]
fn sine_driven_rc_steady_state() {
    // 1 kHz sine through R = 1 kohm into C = 1 uF. At steady state the
    // capacitor sees amplitude 1/sqrt(1 + (2 pi f R C)^2) ~ 0.157 V.
    let freq = 1000.0;
    let period = 1.0 / freq;

    let mut c = Circuit::with_tunables(Tunables {
        h_min: 1e-15,
        h_max: 1e-6,
        e_abs: 1e-12,
        e_rel: 1e-4,
        stepper: StepperKind::Rkf45,
    });
    let gnd = c.gnd();
    let n1 = c.add_node();
    let n2 = c.add_node();
    let vs = c.add_voltage_source(0.0);
    let sine = c.add_modulator(Sine::new(freq, 1.0));
    c.modulate(vs, sine, ModFlags::NONE).unwrap();
    let r = c.add_resistor(1000.0);
    let cap = c.add_capacitor(1e-6);

    c.chain(n1).to(vs).unwrap().end_at(gnd).unwrap();
    c.chain(n1)
        .to(r)
        .unwrap()
        .via(n2)
        .unwrap()
        .to(cap)
        .unwrap()
        .end_at(gnd)
        .unwrap();

    c.set_component_auto_save(cap, true);
    c.set_save_period(period / 100.0);
    c.sim_to_time(12.0 * period).unwrap();

    let hist = c.v_hist(cap);
    assert!(hist.len() >= 1100, "expected ~1200 samples, got {}", hist.len());

    // Amplitude over the last full period.
    let last = &hist[hist.len() - 100..];
    let max = last.iter().fold(f64::MIN, |m, &v| m.max(v));
    let min = last.iter().fold(f64::MAX, |m, &v| m.min(v));
    let amplitude = (max - min) / 2.0;

    let omega_rc = 2.0 * std::f64::consts::PI * freq * 1e-3;
    let expected = 1.0 / (1.0 + omega_rc * omega_rc).sqrt();
    assert!(
        (amplitude - expected).abs() / expected < 0.03,
        "steady-state amplitude = {amplitude} (expected {expected} within 3%)"
    );
}

#[test]
fn pwm_events_snap_the_resistive_loop() {
    // Without state variables the loop jumps straight from event to
    // event; each snapshot records the value *before* the edge fires.
    let mut c = Circuit::new();
    let gnd = c.gnd();
    let n = c.add_node();
    let vs = c.add_voltage_source(0.0);
    let pwm = c.add_modulator(Pwm::new(0.0, 5.0, 1000.0, 0.5, 0.0));
    c.modulate(vs, pwm, ModFlags::NONE).unwrap();
    let r = c.add_resistor(100.0);

    c.chain(n).to(vs).unwrap().end_at(gnd).unwrap();
    c.chain(n).to(r).unwrap().end_at(gnd).unwrap();

    c.save_all(0.0);
    c.sim_to_time(2.6e-3).unwrap();

    let times = c.save_times();
    let expected_times = [0.0, 0.5e-3, 1.0e-3, 1.5e-3, 2.0e-3, 2.5e-3, 3.0e-3];
    assert_eq!(times.len(), expected_times.len(), "save times: {times:?}");
    for (t, e) in times.iter().zip(expected_times) {
        assert!((t - e).abs() < 1e-12, "save at {t}, expected {e}");
    }

    // Monotone non-decreasing save order.
    for pair in times.windows(2) {
        assert!(pair[0] <= pair[1]);
    }

    // The waveform starts low in DC (the generator has not been reset
    // yet), runs high from the transient reset, and toggles every 0.5 ms.
    let v = c.v_hist(vs);
    let expected_v = [0.0, 5.0, 0.0, 5.0, 0.0, 5.0, 0.0];
    for (got, want) in v.iter().zip(expected_v) {
        assert!((got - want).abs() < 1e-9, "v_hist = {v:?}");
    }

    // Histories line up with the save times for every saved entity.
    assert_eq!(c.v_hist(r).len(), times.len());
    assert_eq!(c.node_v_hist(n).len(), times.len());
}

#[test]
fn smooth_modulator_adds_no_extra_saves() {
    // A continuous source must not inject event times: snapshots follow
    // the save period only.
    let mut c = Circuit::with_tunables(transient_tunables(1e-6));
    let gnd = c.gnd();
    let n1 = c.add_node();
    let n2 = c.add_node();
    let vs = c.add_voltage_source(0.0);
    let sine = c.add_modulator(Sine::new(1000.0, 1.0));
    c.modulate(vs, sine, ModFlags::NONE).unwrap();
    let r = c.add_resistor(1000.0);
    let cap = c.add_capacitor(1e-6);
    c.chain(n1).to(vs).unwrap().end_at(gnd).unwrap();
    c.chain(n1)
        .to(r)
        .unwrap()
        .via(n2)
        .unwrap()
        .to(cap)
        .unwrap()
        .end_at(gnd)
        .unwrap();

    c.save_all(1e-4);
    c.sim_to_time(1e-3).unwrap();

    // One DC snapshot plus one per save period.
    let times = c.save_times();
    assert_eq!(times.len(), 11, "save times: {times:?}");
    for (i, t) in times.iter().enumerate().skip(1) {
        assert!(
            (t - i as f64 * 1e-4).abs() < 1e-9,
            "save {i} at {t}, expected {}",
            i as f64 * 1e-4
        );
    }
}

#[test]
fn single_step_runs_dc_then_one_step() {
    let mut c = Circuit::with_tunables(transient_tunables(1e-6));
    let gnd = c.gnd();
    let n1 = c.add_node();
    let vs = c.add_voltage_source(5.0);
    let r = c.add_resistor(1000.0);
    let cap = c.add_capacitor_with_ic(1e-6, 0.0);
    c.chain(n1).to(vs).unwrap().end_at(gnd).unwrap();
    let n2 = c.add_node();
    c.chain(n1)
        .to(r)
        .unwrap()
        .via(n2)
        .unwrap()
        .to(cap)
        .unwrap()
        .end_at(gnd)
        .unwrap();

    // First call: the DC prime only.
    c.sim_single_step(None).unwrap();
    assert_eq!(c.time(), 0.0);
    assert!((c.node_voltage(n1) - 5.0).abs() < 1e-9);

    // Second call: exactly one transient step.
    c.sim_single_step(None).unwrap();
    assert!(c.time() > 0.0);
    assert!(c.time() <= 1e-6 + 1e-15, "t = {} after one step", c.time());

    // Bounded single step.
    let before = c.time();
    c.sim_single_step(Some(1e-8)).unwrap();
    assert!(c.time() - before <= 1e-8 + 1e-15);
}

#[test]
fn reset_restores_the_initial_snapshot() {
    let mut c = Circuit::with_tunables(transient_tunables(1e-6));
    let gnd = c.gnd();
    let n1 = c.add_node();
    let n2 = c.add_node();
    let vs = c.add_voltage_source(5.0);
    let r = c.add_resistor(1000.0);
    let cap = c.add_capacitor_with_ic(1e-6, 0.0);
    c.chain(n1).to(vs).unwrap().end_at(gnd).unwrap();
    c.chain(n1)
        .to(r)
        .unwrap()
        .via(n2)
        .unwrap()
        .to(cap)
        .unwrap()
        .end_at(gnd)
        .unwrap();

    c.save_all(1e-4);
    c.sim_to_time(1e-3).unwrap();
    let first_v = c.v_hist(cap)[0];
    assert!(c.v_hist(cap).len() > 1);

    c.reset();
    assert_eq!(c.time(), 0.0);
    assert!(c.v_hist(cap).is_empty());
    assert!(c.i_hist(cap).is_empty());
    assert!(c.node_v_hist(n2).is_empty());
    assert!(c.save_times().is_empty());

    // Re-running the DC solve reproduces the original first snapshot.
    c.sim_to_time(0.0).unwrap();
    assert_eq!(c.save_times().len(), 1);
    assert!(
        (c.v_hist(cap)[0] - first_v).abs() < 1e-12,
        "first snapshot {} vs {}",
        c.v_hist(cap)[0],
        first_v
    );
}

#[test]
fn identical_topologies_solve_identically() {
    fn build() -> (Circuit, faraday::NodeId) {
        let mut c = Circuit::new();
        let gnd = c.gnd();
        let a = c.add_node();
        let m = c.add_node();
        let vs = c.add_voltage_source(5.0);
        let r1 = c.add_resistor(100.0);
        let r2 = c.add_resistor(300.0);
        c.chain(a).to(vs).unwrap().end_at(gnd).unwrap();
        c.chain(a)
            .to(r1)
            .unwrap()
            .via(m)
            .unwrap()
            .to(r2)
            .unwrap()
            .end_at(gnd)
            .unwrap();
        (c, m)
    }

    let (mut c1, m1) = build();
    let (mut c2, m2) = build();
    c1.sim_to_time(0.0).unwrap();
    c2.sim_to_time(0.0).unwrap();
    assert_eq!(c1.node_voltage(m1), c2.node_voltage(m2));
}

#[test]
fn flip_negates_observed_voltage_and_current() {
    let mut c = Circuit::new();
    let gnd = c.gnd();
    let n = c.add_node();
    let vs = c.add_voltage_source(5.0);
    let r = c.add_resistor(100.0);
    c.chain(n).to(vs).unwrap().end_at(gnd).unwrap();
    c.chain(n).to(r).unwrap().end_at(gnd).unwrap();

    c.sim_to_time(0.0).unwrap();
    let v = c.voltage(r).unwrap();
    let i = c.current(r).unwrap();

    c.flip(r);
    c.sim_to_time(0.0).unwrap();
    assert!((c.voltage(r).unwrap() + v).abs() < 1e-9);
    assert!((c.current(r).unwrap() + i).abs() < 1e-9);

    c.flip(r);
    c.sim_to_time(0.0).unwrap();
    assert!((c.voltage(r).unwrap() - v).abs() < 1e-9);
    assert!((c.current(r).unwrap() - i).abs() < 1e-9);
}

#[test]
fn unspecified_initial_condition_latches_from_dc() {
    // Divider holds the cap node at 3.75 V; the capacitor latches that as
    // its initial state, so the transient starts flat.
    let mut c = Circuit::with_tunables(transient_tunables(1e-6));
    let gnd = c.gnd();
    let a = c.add_node();
    let m = c.add_node();
    let vs = c.add_voltage_source(5.0);
    let r1 = c.add_resistor(100.0);
    let r2 = c.add_resistor(300.0);
    let cap = c.add_capacitor(1e-6);
    c.chain(a).to(vs).unwrap().end_at(gnd).unwrap();
    c.chain(a)
        .to(r1)
        .unwrap()
        .via(m)
        .unwrap()
        .to(r2)
        .unwrap()
        .end_at(gnd)
        .unwrap();
    c.chain(m).to(cap).unwrap().end_at(gnd).unwrap();

    c.sim_to_time(0.5e-3).unwrap();
    let v = c.voltage(cap).unwrap();
    assert!(
        (v - 3.75).abs() < 1e-3,
        "V(C) should stay at the DC point, got {v}"
    );
}

#[test]
fn division_by_zero_surfaces() {
    let mut c = Circuit::new();
    let gnd = c.gnd();
    let n = c.add_node();
    let vs = c.add_voltage_source(5.0);
    let r = c.add_resistor(0.0);
    c.chain(n).to(vs).unwrap().end_at(gnd).unwrap();
    c.chain(n).to(r).unwrap().end_at(gnd).unwrap();

    let err = c.sim_to_time(0.0).unwrap_err();
    assert!(matches!(err, Error::Eval(EvalError::DivisionByZero)));
}

#[test]
fn not_connected_surfaces() {
    let mut c = Circuit::new();
    let n = c.add_node();
    let r = c.add_resistor(100.0);
    c.wire_from(n, r).unwrap();

    let err = c.sim_to_time(0.0).unwrap_err();
    assert!(matches!(err, Error::NotConnected));
}
