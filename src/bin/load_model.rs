//! Loads a URDF robot and prints its forward kinematics and dynamics terms at
//! a random state.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use kidy_ik::{crba, forward_kinematics, generalized_gravity, non_linear_effects, MultiBody};
use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "load_model")]
#[command(about = "Print kinematics and dynamics of a URDF model", long_about = None)]
struct Args {
    /// Path of the URDF file.
    #[arg(name = "URDF")]
    urdf: PathBuf,

    /// Seed of the random configuration and velocity.
    #[arg(long)]
    seed: Option<u64>,
}

fn row<'a>(values: impl IntoIterator<Item = &'a f64>, precision: usize) -> String {
    values
        .into_iter()
        .map(|x| format!("{x:.precision$}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let model = MultiBody::from_urdf(&args.urdf)
        .with_context(|| format!("failed to load {}", args.urdf.display()))?;
    println!("model name: {}", model.name);

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let q = model.random_configuration(&mut rng);
    println!("q: {}", row(&q, 6));
    let v = DVector::from_fn(model.nv(), |_, _| rng.gen_range(-1.0..=1.0));
    println!("v: {}", row(&v, 6));

    let placements = forward_kinematics(&model, &q)?;
    for (joint, placement) in model.joints().iter().zip(&placements) {
        println!("{:<24}: {}", joint.name, row(&placement.translation.vector, 2));
    }

    let mass = crba(&model, &q)?;
    println!("Joint Space Inertia Matrix (JSIM):");
    println!("{mass:.6}");

    let nle = non_linear_effects(&model, &q, &v)?;
    println!("Non-Linear Effects (Coriolis and Centrifugal Forces):");
    println!("{}", row(&nle, 6));

    let gravity = generalized_gravity(&model, &q)?;
    println!("Generalized Gravity:");
    println!("{}", row(&gravity, 6));
    Ok(())
}
