//! Drives the wrist of the sample manipulator to a target pose with damped
//! least-squares inverse kinematics.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use kidy_ik::kinematics::{ik_with, IkOutcome, IkSolveParam, IkStatus};
use kidy_ik::multi_body::sample::manipulator;
use nalgebra::Isometry3;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "inverse_kinematics")]
#[command(about = "Damped least-squares IK on the sample manipulator", long_about = None)]
struct Args {
    /// Joint to drive.
    #[arg(long, default_value_t = 6)]
    joint: usize,

    /// Target translation, the target rotation is the identity.
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], default_values_t = [1.0, 0.0, 1.0], allow_negative_numbers = true)]
    target: Vec<f64>,

    /// Convergence threshold on the error norm.
    #[arg(long)]
    eps: Option<f64>,

    /// Maximum number of iterations.
    #[arg(long)]
    max_iter: Option<usize>,

    /// Integration step.
    #[arg(long)]
    dt: Option<f64>,

    /// Damping added to the diagonal of J Jᵀ.
    #[arg(long)]
    damping: Option<f64>,
}

impl Args {
    fn param(&self) -> IkSolveParam {
        let mut param = IkSolveParam::default();
        if let Some(eps) = self.eps {
            param = param.with_eps(eps);
        }
        if let Some(max_iter) = self.max_iter {
            param = param.with_max_iter(max_iter);
        }
        if let Some(dt) = self.dt {
            param = param.with_dt(dt);
        }
        if let Some(damping) = self.damping {
            param = param.with_damping(damping);
        }
        param
    }
}

fn row<'a>(values: impl IntoIterator<Item = &'a f64>) -> String {
    values
        .into_iter()
        .map(|x| format!("{x:.6}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let model = manipulator().context("failed to build the sample manipulator")?;
    let target = Isometry3::translation(args.target[0], args.target[1], args.target[2]);

    let outcome = ik_with(&model, &target, args.joint, args.param(), |step| {
        // terminal steps are reported below
        if step.status == IkStatus::Running && step.iteration % 10 == 0 {
            println!("{}: error = {}", step.iteration, row(&step.err));
        }
    })
    .context("inverse kinematics failed")?;

    print!("{}", report(&outcome));
    Ok(ExitCode::from(exit_status(&outcome)))
}

/// Text printed after the solve: outcome, joint configuration and final error.
fn report(outcome: &IkOutcome) -> String {
    let headline = if outcome.is_converged() {
        "Convergence achieved!"
    } else {
        "\nWarning: the iterative algorithm has not reached convergence to the desired precision"
    };
    format!(
        "{headline}\n\nresult: {}\n\nfinal error: {}\n",
        row(outcome.q()),
        row(outcome.err())
    )
}

fn exit_status(outcome: &IkOutcome) -> u8 {
    if outcome.is_converged() {
        0
    } else {
        1
    }
}
