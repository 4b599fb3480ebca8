//! Built-in models.

use nalgebra::{Isometry3, Matrix3, Vector3};

use super::{JointIndex, JointLimits, JointType, MultiBody, UNIVERSE};
use crate::errors::ModelError;
use crate::spatial::Inertia;

/// A 6-DoF arm: three shoulder joints, an elbow and a two-joint wrist, with
/// 1 m between shoulder and elbow and between elbow and wrist.
///
/// At the neutral configuration joint 6 (`wrist2_joint`) sits at `(0, 0, 2)`.
pub fn manipulator() -> Result<MultiBody, ModelError> {
    let mut model = MultiBody::new("manipulator");
    add_manipulator(&mut model, UNIVERSE, Isometry3::identity(), "")?;
    Ok(model)
}

/// Appends the manipulator below `root` and returns the index of its last joint.
pub fn add_manipulator(
    model: &mut MultiBody,
    root: JointIndex,
    root_placement: Isometry3<f64>,
    prefix: &str,
) -> Result<JointIndex, ModelError> {
    let joint_body = Inertia::new(0.1, Vector3::zeros(), Matrix3::identity() * 0.01);
    let arm_body = Inertia::new(1.0, Vector3::new(0.0, 0.0, 0.5), Matrix3::identity() * 0.1);
    let arm = Isometry3::translation(0.0, 0.0, 1.0);
    let limits = JointLimits::new(-3.14, 3.14);

    let chain = [
        ("shoulder1", Vector3::z_axis(), root_placement, &joint_body),
        ("shoulder2", Vector3::y_axis(), Isometry3::identity(), &joint_body),
        ("shoulder3", Vector3::x_axis(), Isometry3::identity(), &arm_body),
        ("elbow", Vector3::y_axis(), arm, &arm_body),
        ("wrist1", Vector3::x_axis(), arm, &joint_body),
        ("wrist2", Vector3::y_axis(), Isometry3::identity(), &arm_body),
    ];

    let mut parent = root;
    for (name, axis, placement, body) in chain {
        parent = model.add_joint(
            parent,
            JointType::Revolute { axis },
            placement,
            format!("{prefix}{name}_joint"),
        )?;
        model.set_limits(parent, limits)?;
        model.append_body(parent, body, &Isometry3::identity())?;
    }
    Ok(parent)
}
