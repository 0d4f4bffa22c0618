//! PWM-driven series RLC, dumped as CSV for plotting.

use faraday::{Circuit, ModFlags, Pwm};

fn main() -> faraday::Result<()> {
    let mut c = Circuit::new();

    let gnd = c.gnd();
    let volt = c.add_voltage_source(0.0);
    let pwm = c.add_modulator(Pwm::new(0.0, 1.0, 3e3, 0.25, 180.0));
    c.modulate(volt, pwm, ModFlags::INVERTED)?;

    let r1 = c.add_resistor(10.0);
    let c1 = c.add_capacitor(1e-6);
    let l1 = c.add_inductor(0.1e-3);

    c.chain(gnd)
        .to(volt)?
        .to(r1)?
        .to(c1)?
        .to(l1)?
        .end_at(gnd)?;
    c.flip(volt);

    c.set_component_auto_save(volt, true);
    c.set_component_auto_save(l1, true);

    c.sim_to_time(1e-3)?;

    println!("t,v_source,v_inductor");
    for (i, t) in c.save_times().iter().enumerate() {
        println!("{:e},{:e},{:e}", t, c.v_hist(volt)[i], c.v_hist(l1)[i]);
    }
    Ok(())
}
