use std::time::Instant;

use encrypted_control::prelude::*;
use tracing_subscriber::EnvFilter;

type AppResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

struct Scenario {
    x0: Vec<i64>,
    a: Matrix<i64>,
    b: Matrix<i64>,
    k: Matrix<i64>,
    rounds: u64,
}

impl Scenario {
    fn two_state() -> AppResult<Self> {
        Ok(Self {
            x0: vec![1, 1],
            a: Matrix::identity(2),
            b: Matrix::from_rows(vec![vec![2, -2], vec![-2, 2]])?,
            k: Matrix::from_rows(vec![vec![-1, 1], vec![1, 0]])?,
            rounds: 2,
        })
    }
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let which = std::env::args().nth(1).unwrap_or_else(|| "both".into());
    let scenario = Scenario::two_state()?;

    println!("A: {:?}", rows(&scenario.a));
    println!("B: {:?}", rows(&scenario.b));
    println!("K: {:?}", rows(&scenario.k));
    println!("x[0]: {:?}", scenario.x0);

    let reference = simulate_plaintext(&scenario.a, &scenario.b, &scenario.k, &scenario.x0, scenario.rounds)?;

    if which == "open" || which == "both" {
        let ctx = Context::from_params(presets::open_gain_bfv()?);
        run_mode(&scenario, &ctx, GainMode::Open, &reference)?;
    }
    if which == "sealed" || which == "both" {
        let ctx = Context::from_params(presets::sealed_gain_bfv()?);
        run_mode(&scenario, &ctx, GainMode::Sealed, &reference)?;
    }
    Ok(())
}

fn run_mode(scenario: &Scenario, ctx: &Context, mode: GainMode, reference: &[Vec<i64>]) -> AppResult<()> {
    println!();
    println!("== {mode:?} gain, {}", ctx.params());

    let start = Instant::now();
    let mut plant = Plant::new(scenario.x0.clone(), scenario.a.clone(), scenario.b.clone())?;
    let public = plant.bind_encryption(ctx, KeySource::SelfGenerated)?;

    let gain = match mode {
        GainMode::Open => Gain::Open(scenario.k.clone()),
        GainMode::Sealed => {
            let encoded = public.codec().encode_matrix(&scenario.k)?;
            Gain::Sealed(Encryptor::new(public.clone()).encrypt_matrix(&encoded)?)
        }
    };
    let mut controller = Controller::new(gain)?;
    controller.bind_encryption(public)?;
    let setup = start.elapsed();

    let mut control_loop = ControlLoop::new(plant, controller, LoopConfig::default().rounds(scenario.rounds))?;
    let start = Instant::now();
    let trajectory = control_loop.run()?;
    let elapsed = start.elapsed();

    println!("{:<6} {:>16} {:>16} {:>14}", "step", "u", "x", "budget_bits");
    for record in &trajectory.rounds {
        println!(
            "{:<6} {:>16} {:>16} {:>14}",
            record.step,
            format!("{:?}", record.control),
            format!("{:?}", record.state),
            record.noise_budget.map_or_else(|| "-".to_string(), |b| b.to_string()),
        );
    }
    let matches = trajectory.states() == reference;
    println!(
        "setup {:.1} ms, {} rounds {:.1} ms, matches plaintext reference: {matches}",
        setup.as_secs_f64() * 1e3,
        scenario.rounds,
        elapsed.as_secs_f64() * 1e3,
    );
    if !matches {
        return Err(format!("encrypted trajectory {:?} != reference {reference:?}", trajectory.states()).into());
    }
    Ok(())
}

fn rows(m: &Matrix<i64>) -> Vec<Vec<i64>> {
    m.iter_rows().map(<[i64]>::to_vec).collect()
}
