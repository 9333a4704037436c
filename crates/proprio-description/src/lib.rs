//! `proprio-description` – the static robot-description collaborator.
//!
//! A [`RobotDescription`] is loaded once at process start (from a TOML file
//! or from [`RobotDescription::default_humanoid`]) and read-only thereafter.
//! It supplies everything the state service needs to validate and interpret
//! telemetry:
//!
//! - the canonical **ordered** joint-name list;
//! - named joint groups (`"left_arm"`, `"right_arm"`, …) used by
//!   vector-form queries;
//! - canonical frame identifiers (world, pelvis, torso, end effectors);
//! - per-side [`GraspReference`] vectors, the comparison baselines for
//!   gripper-closed detection.
//!
//! # File format
//!
//! ```toml
//! name = "valor"
//! joints = ["back_bkz", "back_bky", "l_arm_shz"]
//!
//! [groups]
//! chest = ["back_bkz", "back_bky"]
//!
//! [frames]
//! world = "world"
//! pelvis = "pelvis"
//! torso = "torso"
//! left_end_effector = "l_palm"
//! right_end_effector = "r_palm"
//!
//! [grasp.left]
//! joints = ["l_arm_shz"]
//! closed = [1.3]
//! open = [0.1]
//! tolerance = 0.05
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use proprio_types::{RobotSide, StateError};

/// Canonical frame identifiers attached to the robot and the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameNames {
    #[serde(default = "default_world_frame")]
    pub world: String,
    #[serde(default = "default_pelvis_frame")]
    pub pelvis: String,
    #[serde(default = "default_torso_frame")]
    pub torso: String,
    pub left_end_effector: String,
    pub right_end_effector: String,
}

fn default_world_frame() -> String {
    "world".to_string()
}
fn default_pelvis_frame() -> String {
    "pelvis".to_string()
}
fn default_torso_frame() -> String {
    "torso".to_string()
}

/// Canonical joint-position vectors for a fully closed and fully open
/// gripper posture on one side, used as comparison baselines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraspReference {
    /// Grasp-relevant joints, in the order `closed`/`open` are indexed.
    pub joints: Vec<String>,
    /// Position of each joint when the gripper is fully closed.
    pub closed: Vec<f64>,
    /// Position of each joint when the gripper is fully open.
    pub open: Vec<f64>,
    /// Per-joint tolerance (radians) for "within reference" comparisons.
    #[serde(default = "default_grasp_tolerance")]
    pub tolerance: f64,
}

fn default_grasp_tolerance() -> f64 {
    0.05
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GraspTable {
    left: GraspReference,
    right: GraspReference,
}

/// Static description of one robot: joints, groups, frames, grasp baselines.
///
/// Construct once, share by reference. All accessors are infallible except
/// [`group`][Self::group], which reports unknown group names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotDescription {
    name: String,
    joints: Vec<String>,
    #[serde(default)]
    groups: HashMap<String, Vec<String>>,
    frames: FrameNames,
    grasp: GraspTable,
}

impl RobotDescription {
    /// Load and validate a description from a TOML file.
    ///
    /// # Errors
    ///
    /// [`StateError::Description`] when the file cannot be read, parsed, or
    /// fails validation.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StateError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StateError::Description(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&raw)
    }

    /// Parse and validate a description from a TOML string.
    pub fn from_toml(raw: &str) -> Result<Self, StateError> {
        let description: Self = toml::from_str(raw)
            .map_err(|e| StateError::Description(format!("failed to parse description: {e}")))?;
        description.validate()?;
        Ok(description)
    }

    /// Robot name, e.g. `"valor"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The canonical ordered joint-name list. Vector-form queries without an
    /// explicit name list align to this order.
    pub fn joint_names(&self) -> &[String] {
        &self.joints
    }

    /// Whether `name` is in the declared joint set.
    pub fn is_declared(&self, name: &str) -> bool {
        self.joints.iter().any(|j| j == name)
    }

    /// The ordered member list of a named joint group.
    ///
    /// # Errors
    ///
    /// [`StateError::UnknownGroup`] when no group with that name exists.
    pub fn group(&self, name: &str) -> Result<&[String], StateError> {
        self.groups
            .get(name)
            .map(|v| v.as_slice())
            .ok_or_else(|| StateError::UnknownGroup(name.to_string()))
    }

    /// Names of all declared joint groups, in unspecified order.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(|k| k.as_str())
    }

    /// Canonical frame identifiers.
    pub fn frames(&self) -> &FrameNames {
        &self.frames
    }

    /// The end-effector frame for one side.
    pub fn end_effector_frame(&self, side: RobotSide) -> &str {
        match side {
            RobotSide::Left => &self.frames.left_end_effector,
            RobotSide::Right => &self.frames.right_end_effector,
        }
    }

    /// The grasp baseline for one side.
    pub fn grasp(&self, side: RobotSide) -> &GraspReference {
        match side {
            RobotSide::Left => &self.grasp.left,
            RobotSide::Right => &self.grasp.right,
        }
    }

    /// Check internal consistency: unique joint names, groups and grasp
    /// joints inside the declared set, grasp vectors aligned to their joint
    /// lists, positive tolerance.
    pub fn validate(&self) -> Result<(), StateError> {
        if self.joints.is_empty() {
            return Err(StateError::Description("joint list is empty".to_string()));
        }
        let mut seen: HashSet<&str> = HashSet::with_capacity(self.joints.len());
        for joint in &self.joints {
            if !seen.insert(joint.as_str()) {
                return Err(StateError::Description(format!(
                    "duplicate joint '{joint}'"
                )));
            }
        }
        for (group, members) in &self.groups {
            for member in members {
                if !seen.contains(member.as_str()) {
                    return Err(StateError::Description(format!(
                        "group '{group}' references undeclared joint '{member}'"
                    )));
                }
            }
        }
        for (side, reference) in [
            (RobotSide::Left, &self.grasp.left),
            (RobotSide::Right, &self.grasp.right),
        ] {
            if reference.joints.len() != reference.closed.len()
                || reference.joints.len() != reference.open.len()
            {
                return Err(StateError::Description(format!(
                    "{side} grasp reference vectors do not align with its joint list"
                )));
            }
            if reference.tolerance <= 0.0 {
                return Err(StateError::Description(format!(
                    "{side} grasp tolerance must be positive"
                )));
            }
            for joint in &reference.joints {
                if !seen.contains(joint.as_str()) {
                    return Err(StateError::Description(format!(
                        "{side} grasp references undeclared joint '{joint}'"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Built-in description of a 22-joint humanoid upper body. Used by tests
    /// and demos; real deployments load their robot from TOML.
    pub fn default_humanoid() -> Self {
        let joints: Vec<String> = [
            "back_bkz",
            "back_bky",
            "back_bkx",
            "neck_ry",
            "l_arm_shz",
            "l_arm_shx",
            "l_arm_ely",
            "l_arm_elx",
            "l_arm_wry",
            "l_arm_wrx",
            "r_arm_shz",
            "r_arm_shx",
            "r_arm_ely",
            "r_arm_elx",
            "r_arm_wry",
            "r_arm_wrx",
            "l_finger_1",
            "l_finger_2",
            "l_thumb",
            "r_finger_1",
            "r_finger_2",
            "r_thumb",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let mut groups = HashMap::new();
        groups.insert(
            "chest".to_string(),
            vec!["back_bkz".into(), "back_bky".into(), "back_bkx".into()],
        );
        groups.insert("neck".to_string(), vec!["neck_ry".into()]);
        groups.insert(
            "left_arm".to_string(),
            vec![
                "l_arm_shz".into(),
                "l_arm_shx".into(),
                "l_arm_ely".into(),
                "l_arm_elx".into(),
                "l_arm_wry".into(),
                "l_arm_wrx".into(),
            ],
        );
        groups.insert(
            "right_arm".to_string(),
            vec![
                "r_arm_shz".into(),
                "r_arm_shx".into(),
                "r_arm_ely".into(),
                "r_arm_elx".into(),
                "r_arm_wry".into(),
                "r_arm_wrx".into(),
            ],
        );
        groups.insert(
            "left_gripper".to_string(),
            vec!["l_finger_1".into(), "l_finger_2".into(), "l_thumb".into()],
        );
        groups.insert(
            "right_gripper".to_string(),
            vec!["r_finger_1".into(), "r_finger_2".into(), "r_thumb".into()],
        );

        Self {
            name: "valor".to_string(),
            joints,
            groups,
            frames: FrameNames {
                world: default_world_frame(),
                pelvis: default_pelvis_frame(),
                torso: default_torso_frame(),
                left_end_effector: "l_palm".to_string(),
                right_end_effector: "r_palm".to_string(),
            },
            grasp: GraspTable {
                left: GraspReference {
                    joints: vec!["l_finger_1".into(), "l_finger_2".into(), "l_thumb".into()],
                    closed: vec![1.3, 1.3, 1.1],
                    open: vec![0.1, 0.1, 0.0],
                    tolerance: default_grasp_tolerance(),
                },
                right: GraspReference {
                    joints: vec!["r_finger_1".into(), "r_finger_2".into(), "r_thumb".into()],
                    closed: vec![1.3, 1.3, 1.1],
                    open: vec![0.1, 0.1, 0.0],
                    tolerance: default_grasp_tolerance(),
                },
            },
        }
    }
}
