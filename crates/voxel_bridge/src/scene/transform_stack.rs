//! Transform stack
//!
//! Tracks two independent transforms:
//! - the **node transform**, applied by the renderer to the whole build when
//!   no matrix is pushed;
//! - the **matrix transform**, used to resolve local box coordinates into
//!   world space while at least one matrix is pushed.
//!
//! Rotations are stored world-to-local, so resolving a local offset uses the
//! transpose of the parent rotation.

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

use super::entities::{Angles, Num};
use super::error::SceneError;
use super::quantize::NumberMode;
use crate::foundation::math::{self, Mat3, Vec3};

/// Orientation of a transform frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rotation {
    /// Pitch/yaw/roll in degrees, as given by the caller
    Euler(Angles),
    /// Fully composed rotation
    Matrix(Mat3),
}

impl Rotation {
    /// Rotation as a matrix
    pub fn to_matrix(&self) -> Mat3 {
        match self {
            Self::Euler(a) => math::rotation_matrix(a.pitch, a.yaw, a.roll),
            Self::Matrix(m) => *m,
        }
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::Euler(Angles::default())
    }
}

/// Position plus orientation
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransformFrame {
    /// Origin of the frame
    pub position: Vec3,
    /// Orientation of the frame
    pub rotation: Rotation,
}

impl TransformFrame {
    /// Frame at the origin with no rotation
    pub fn identity() -> Self {
        Self::default()
    }

    /// Frame from a position and Euler angles
    pub fn euler(position: Vec3, angles: Angles) -> Self {
        Self {
            position,
            rotation: Rotation::Euler(angles),
        }
    }

    /// Express a point given in this frame in the parent's coordinates
    pub fn local_to_world(&self, local: &Vec3) -> Vec3 {
        let inverse = math::transpose(&self.rotation.to_matrix());
        math::add(&self.position, &math::transform_point(local, &inverse))
    }

    /// Compose a child frame at `local` rotated by `angles` relative to this one
    pub fn child(&self, local: &Vec3, angles: Angles, mode: NumberMode) -> Self {
        let base = self.rotation.to_matrix();
        let position = mode.quantize_vec(&self.local_to_world(local));
        let turn = angles.negated();
        let relative = math::rotation_matrix(turn.pitch, turn.yaw, turn.roll);
        Self {
            position,
            rotation: Rotation::Matrix(math::multiply(&relative, &base)),
        }
    }
}

/// Euler frames go out as `[x, y, z, pitch, yaw, roll]`, composed frames as
/// `[x, y, z, m00 .. m22]` in row-major order.
impl Serialize for TransformFrame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let p = &self.position;
        match &self.rotation {
            Rotation::Euler(a) => {
                let mut seq = serializer.serialize_seq(Some(6))?;
                for v in [p.x, p.y, p.z, a.pitch, a.yaw, a.roll] {
                    seq.serialize_element(&Num(v))?;
                }
                seq.end()
            }
            Rotation::Matrix(m) => {
                let mut seq = serializer.serialize_seq(Some(12))?;
                for v in [p.x, p.y, p.z] {
                    seq.serialize_element(&Num(v))?;
                }
                for v in math::to_row_major(m) {
                    seq.serialize_element(&Num(v))?;
                }
                seq.end()
            }
        }
    }
}

/// Outcome of placing a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeUpdate {
    /// A matrix was pushed; the composed frame became the matrix transform
    Composed,
    /// No matrix pushed; the caller decides where the frame goes
    Unparented(TransformFrame),
}

/// LIFO stack of saved matrix transforms plus the node transform
#[derive(Debug, Clone, Default)]
pub struct TransformStack {
    saved: Vec<TransformFrame>,
    matrix: TransformFrame,
    node: TransformFrame,
}

impl TransformStack {
    /// Empty stack with identity transforms
    pub fn new() -> Self {
        Self::default()
    }

    /// Nesting depth
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// Whether a matrix is pushed
    pub fn is_transforming(&self) -> bool {
        !self.saved.is_empty()
    }

    /// Save the current matrix transform
    pub fn push(&mut self) {
        self.saved.push(self.matrix);
    }

    /// Restore the last saved matrix transform
    pub fn pop(&mut self) -> Result<(), SceneError> {
        let restored = self.saved.pop().ok_or(SceneError::StackUnderflow)?;
        self.matrix = restored;
        Ok(())
    }

    /// Current node transform
    pub fn node(&self) -> &TransformFrame {
        &self.node
    }

    /// Current matrix transform
    pub fn matrix(&self) -> &TransformFrame {
        &self.matrix
    }

    /// Replace the node transform
    pub fn set_node_transform(&mut self, frame: TransformFrame) {
        self.node = frame;
    }

    /// Place a node at `local` with `angles`.
    ///
    /// Inside a pushed matrix the placement is composed with the parent (the
    /// last saved matrix) and becomes the current matrix transform. Otherwise
    /// the quantized frame is handed back untouched.
    pub fn set_node(&mut self, local: &Vec3, angles: Angles, mode: NumberMode) -> NodeUpdate {
        match self.saved.last() {
            Some(parent) => {
                self.matrix = parent.child(local, angles, mode);
                NodeUpdate::Composed
            }
            None => NodeUpdate::Unparented(TransformFrame::euler(mode.quantize_vec(local), angles)),
        }
    }

    /// Resolve a local point through the matrix transform when one is pushed
    pub fn resolve(&self, local: &Vec3) -> Vec3 {
        if self.is_transforming() {
            self.matrix.local_to_world(local)
        } else {
            *local
        }
    }
}
