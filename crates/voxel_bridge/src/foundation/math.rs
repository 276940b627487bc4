//! Math utilities and types
//!
//! Rotation math for the transform stack. Everything here is pure; angles
//! are in degrees because that is what the command surface speaks.

pub use nalgebra::{Matrix3, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f64>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f64>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f64 = std::f64::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f64 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f64) -> f64 {
        degrees * constants::DEG_TO_RAD
    }

    /// Sine and cosine of an angle in degrees.
    ///
    /// Quarter turns return exact values so that 90/180/270 degree rotations
    /// land boxes on integer cells without floating residue.
    pub fn sin_cos_deg(degrees: f64) -> (f64, f64) {
        let wrapped = degrees.rem_euclid(360.0);
        if wrapped == 0.0 {
            (0.0, 1.0)
        } else if wrapped == 90.0 {
            (1.0, 0.0)
        } else if wrapped == 180.0 {
            (0.0, -1.0)
        } else if wrapped == 270.0 {
            (-1.0, 0.0)
        } else {
            deg_to_rad(degrees).sin_cos()
        }
    }
}

/// Rotation about the lateral (X) axis
#[rustfmt::skip]
pub fn rotation_x(degrees: f64) -> Mat3 {
    let (s, c) = utils::sin_cos_deg(degrees);
    Mat3::new(
        1.0, 0.0, 0.0,
        0.0, c, -s,
        0.0, s, c,
    )
}

/// Rotation about the vertical (Y) axis
#[rustfmt::skip]
pub fn rotation_y(degrees: f64) -> Mat3 {
    let (s, c) = utils::sin_cos_deg(degrees);
    Mat3::new(
        c, 0.0, s,
        0.0, 1.0, 0.0,
        -s, 0.0, c,
    )
}

/// Rotation about the depth (Z) axis
#[rustfmt::skip]
pub fn rotation_z(degrees: f64) -> Mat3 {
    let (s, c) = utils::sin_cos_deg(degrees);
    Mat3::new(
        c, -s, 0.0,
        s, c, 0.0,
        0.0, 0.0, 1.0,
    )
}

/// Composite rotation for intrinsic pitch/yaw/roll in degrees.
///
/// Yaw is applied about the vertical axis first, then pitch about the
/// lateral axis, then roll about the depth axis: `Ry(yaw) * Rx(pitch) * Rz(roll)`.
/// The inverse is `Rz(-roll) * Rx(-pitch) * Ry(-yaw)`, i.e. the transpose.
pub fn rotation_matrix(pitch: f64, yaw: f64, roll: f64) -> Mat3 {
    rotation_y(yaw) * rotation_x(pitch) * rotation_z(roll)
}

/// Standard 3x3 matrix product `a * b`
pub fn multiply(a: &Mat3, b: &Mat3) -> Mat3 {
    a * b
}

/// Transpose of a rotation, which is also its inverse
pub fn transpose(a: &Mat3) -> Mat3 {
    a.transpose()
}

/// Apply `m` to `v`
pub fn transform_point(v: &Vec3, m: &Mat3) -> Vec3 {
    m * v
}

/// Vector addition
pub fn add(a: &Vec3, b: &Vec3) -> Vec3 {
    a + b
}

/// Row-major flattening used by the wire format
pub fn to_row_major(m: &Mat3) -> [f64; 9] {
    [
        m[(0, 0)], m[(0, 1)], m[(0, 2)],
        m[(1, 0)], m[(1, 1)], m[(1, 2)],
        m[(2, 0)], m[(2, 1)], m[(2, 2)],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f64 = 1e-6;
    const QUARTER_TURNS: [f64; 4] = [0.0, 90.0, 180.0, 270.0];

    #[test]
    fn test_single_axis_round_trip() {
        for angle in QUARTER_TURNS {
            for (p, y, r) in [(angle, 0.0, 0.0), (0.0, angle, 0.0), (0.0, 0.0, angle)] {
                let forward = rotation_matrix(p, y, r);
                let back = rotation_matrix(-p, -y, -r);
                assert_relative_eq!(multiply(&forward, &back), Mat3::identity(), epsilon = EPSILON);
                assert_relative_eq!(multiply(&back, &forward), Mat3::identity(), epsilon = EPSILON);
            }
        }
    }

    #[test]
    fn test_combined_round_trip() {
        for p in QUARTER_TURNS {
            for y in QUARTER_TURNS {
                for r in QUARTER_TURNS {
                    let forward = rotation_matrix(p, y, r);
                    let inverse = rotation_z(-r) * rotation_x(-p) * rotation_y(-y);
                    let product = multiply(&forward, &inverse);
                    assert_relative_eq!(product, Mat3::identity(), epsilon = EPSILON);
                    assert_relative_eq!(inverse, transpose(&forward), epsilon = EPSILON);
                }
            }
        }
    }

    #[test]
    fn test_arbitrary_angles_are_orthonormal() {
        let m = rotation_matrix(33.0, -71.5, 12.25);
        assert_relative_eq!(multiply(&m, &transpose(&m)), Mat3::identity(), epsilon = EPSILON);
        assert_relative_eq!(m.determinant(), 1.0, epsilon = EPSILON);
    }

    #[test]
    fn test_quarter_turns_are_exact() {
        let m = rotation_y(90.0);
        let p = transform_point(&Vec3::new(1.0, 0.0, 0.0), &m);
        assert_eq!(p, Vec3::new(0.0, 0.0, -1.0));

        let m = rotation_z(-270.0);
        let p = transform_point(&Vec3::new(1.0, 0.0, 0.0), &m);
        assert_eq!(p, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_add_and_flatten() {
        let v = add(&Vec3::new(1.0, 2.0, 3.0), &Vec3::new(-1.0, 0.5, 2.0));
        assert_relative_eq!(v, Vec3::new(0.0, 2.5, 5.0), epsilon = EPSILON);

        let flat = to_row_major(&rotation_x(90.0));
        assert_eq!(flat, [1.0, 0.0, 0.0, 0.0, 0.0, -1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_angle_conversion() {
        assert_relative_eq!(utils::deg_to_rad(180.0), constants::PI, epsilon = EPSILON);
    }
}
