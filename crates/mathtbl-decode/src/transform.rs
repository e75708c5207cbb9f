//! Decomposition of stage transform matrices.

use glam::{EulerRot, Mat4, Quat, Vec3};

/// Translation, rotation and scale recovered from a matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Rebuild the affine matrix this transform describes.
    #[must_use]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Rotation as XYZ Euler angles in radians.
    #[must_use]
    pub fn euler_xyz(&self) -> Vec3 {
        let (x, y, z) = self.rotation.to_euler(EulerRot::XYZ);
        Vec3::new(x, y, z)
    }
}

/// A matrix as stored in the container, with its decomposition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformMatrix {
    pub matrix: Mat4,
    pub transform: Transform,
}

impl From<Mat4> for TransformMatrix {
    fn from(matrix: Mat4) -> Self {
        Self {
            matrix,
            transform: decompose(&matrix),
        }
    }
}

/// Split an affine matrix into translation, rotation and scale.
///
/// Singular matrices (a collapsed axis) have no meaningful rotation; they
/// decompose to the identity rotation with per-axis lengths as scale.
#[must_use]
pub fn decompose(matrix: &Mat4) -> Transform {
    let translation = matrix.w_axis.truncate();
    let determinant = matrix.determinant();

    if !determinant.is_finite() || determinant.abs() <= f32::EPSILON {
        return Transform {
            translation,
            rotation: Quat::IDENTITY,
            scale: Vec3::new(
                matrix.x_axis.truncate().length(),
                matrix.y_axis.truncate().length(),
                matrix.z_axis.truncate().length(),
            ),
        };
    }

    let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
    Transform {
        translation,
        rotation,
        scale,
    }
}
