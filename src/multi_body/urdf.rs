use std::collections::HashMap;
use std::path::Path;

use nalgebra::{Isometry3, Matrix3, Translation3, Unit, UnitQuaternion, Vector3};
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Bfs;
use petgraph::Direction;
use tracing::{debug, info, warn};

use super::{JointIndex, JointLimits, JointType, MultiBody, UNIVERSE};
use crate::errors::ModelError;
use crate::spatial::Inertia;

impl MultiBody {
    pub fn from_urdf(path: impl AsRef<Path>) -> Result<MultiBody, ModelError> {
        let robot = urdf_rs::read_file(path)?;
        parse_robot(&robot)
    }

    pub fn from_urdf_str(xml: &str) -> Result<MultiBody, ModelError> {
        let robot = urdf_rs::read_from_string(xml)?;
        parse_robot(&robot)
    }
}

fn parse_robot(robot: &urdf_rs::Robot) -> Result<MultiBody, ModelError> {
    let link_index: HashMap<&str, usize> = robot
        .links
        .iter()
        .enumerate()
        .map(|(index, link)| (link.name.as_str(), index))
        .collect();

    // link index graph, edges carry the urdf joint index
    let mut graph = DiGraphMap::<usize, usize>::new();
    for index in 0..robot.links.len() {
        graph.add_node(index);
    }
    for (joint_index, joint) in robot.joints.iter().enumerate() {
        let (Some(&parent), Some(&child)) = (
            link_index.get(joint.parent.link.as_str()),
            link_index.get(joint.child.link.as_str()),
        ) else {
            warn!(joint = %joint.name, "joint references an unknown link, skipped");
            continue;
        };
        if graph
            .neighbors_directed(child, Direction::Incoming)
            .next()
            .is_some()
        {
            warn!(joint = %joint.name, link = %joint.child.link, "link already has a parent, joint skipped");
            continue;
        }
        graph.add_edge(parent, child, joint_index);
    }

    let roots: Vec<usize> = graph
        .nodes()
        .filter(|&n| graph.neighbors_directed(n, Direction::Incoming).next().is_none())
        .collect();
    let root = match roots.as_slice() {
        [] => return Err(ModelError::NoRootLink),
        [root] => *root,
        _ => {
            return Err(ModelError::MultipleRootLinks(
                roots.iter().map(|&i| robot.links[i].name.clone()).collect(),
            ))
        }
    };

    let mut multi_body = MultiBody::new(robot.name.clone());
    // link index -> (supporting joint, link frame in that joint frame)
    let mut link_frames: HashMap<usize, (JointIndex, Isometry3<f64>)> = HashMap::new();
    link_frames.insert(root, (UNIVERSE, Isometry3::identity()));

    let mut bfs = Bfs::new(&graph, root);
    while let Some(link) = bfs.next(&graph) {
        if link != root {
            let Some(parent_link) = graph.neighbors_directed(link, Direction::Incoming).next() else {
                continue;
            };
            let joint_index = graph[(parent_link, link)];
            let joint = &robot.joints[joint_index];
            let (parent_joint, parent_frame) = link_frames[&parent_link];
            let placement = parent_frame * pose_to_isometry(&joint.origin);

            let frame = match joint_type(joint)? {
                None => (parent_joint, placement),
                Some(kind) => {
                    let id = multi_body.add_joint(parent_joint, kind, placement, joint.name.clone())?;
                    multi_body.set_limits(id, JointLimits::new(joint.limit.lower, joint.limit.upper))?;
                    debug!(joint = %joint.name, id, parent = parent_joint, "added joint");
                    (id, Isometry3::identity())
                }
            };
            link_frames.insert(link, frame);
        }

        let (joint, frame) = link_frames[&link];
        if joint != UNIVERSE {
            multi_body.append_body(joint, &link_inertia(&robot.links[link]), &frame)?;
        }
    }

    info!(
        name = %multi_body.name,
        njoints = multi_body.njoints(),
        nq = multi_body.nq(),
        nv = multi_body.nv(),
        "built multi-body from urdf"
    );
    Ok(multi_body)
}

/// `None` for fixed joints, which are merged into their parent.
fn joint_type(joint: &urdf_rs::Joint) -> Result<Option<JointType>, ModelError> {
    let axis = || {
        let [x, y, z] = joint.axis.xyz.0;
        Unit::try_new(Vector3::new(x, y, z), 1e-12).ok_or_else(|| ModelError::ZeroAxis {
            name: joint.name.clone(),
        })
    };
    match joint.joint_type {
        urdf_rs::JointType::Fixed => Ok(None),
        urdf_rs::JointType::Revolute => Ok(Some(JointType::Revolute { axis: axis()? })),
        urdf_rs::JointType::Continuous => Ok(Some(JointType::RevoluteUnbounded { axis: axis()? })),
        urdf_rs::JointType::Prismatic => Ok(Some(JointType::Prismatic { axis: axis()? })),
        ref other => Err(ModelError::UnsupportedJoint {
            name: joint.name.clone(),
            kind: format!("{other:?}"),
        }),
    }
}

fn pose_to_isometry(origin: &urdf_rs::Pose) -> Isometry3<f64> {
    let [roll, pitch, yaw] = origin.rpy.0;
    let [x, y, z] = origin.xyz.0;
    Isometry3::from_parts(
        Translation3::new(x, y, z),
        UnitQuaternion::from_euler_angles(roll, pitch, yaw),
    )
}

/// Inertia of a link in the link frame.
fn link_inertia(link: &urdf_rs::Link) -> Inertia {
    let i = &link.inertial.inertia;
    let rotational = Matrix3::new(
        i.ixx, i.ixy, i.ixz, //
        i.ixy, i.iyy, i.iyz, //
        i.ixz, i.iyz, i.izz,
    );
    // urdf gives the tensor in the inertial frame, centred at the com
    let inertial = Inertia::new(link.inertial.mass.value, Vector3::zeros(), rotational);
    inertial.transformed(&pose_to_isometry(&link.inertial.origin))
}
