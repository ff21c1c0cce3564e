//! Column-major matrix math for 2D-over-GPU drawing
//!
//! `Mat3` is the 2D homogeneous transform type carried on the transform
//! stack; `Mat4` covers projection work (orthographic canvas projection,
//! perspective). Both are plain value types: every operation returns a new
//! matrix, nothing is mutated in place.

/// A 3x3 matrix stored column-major (`m[col * 3 + row]`).
///
/// The upper-left 2x2 block plus the third column's x/y hold a 2D affine
/// transform; the bottom row is `(0, 0, 1)` for every builder in this
/// module.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat3(pub [f32; 9]);

impl Mat3 {
    pub const IDENTITY: Mat3 = Mat3([
        1.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, //
        0.0, 0.0, 1.0,
    ]);

    /// Translation by `(x, y)`.
    pub fn translation(x: f32, y: f32) -> Mat3 {
        Mat3([
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            x, y, 1.0,
        ])
    }

    /// Non-uniform scale about the origin.
    pub fn scaling(sx: f32, sy: f32) -> Mat3 {
        Mat3([
            sx, 0.0, 0.0, //
            0.0, sy, 0.0, //
            0.0, 0.0, 1.0,
        ])
    }

    /// Counter-clockwise rotation about the origin, `angle` in radians.
    pub fn rotation(angle: f32) -> Mat3 {
        let (sin, cos) = angle.sin_cos();
        Mat3([
            cos, sin, 0.0, //
            -sin, cos, 0.0, //
            0.0, 0.0, 1.0,
        ])
    }

    /// Build from the canvas `transform(a, b, c, d, e, f)` cell order:
    ///
    /// ```text
    /// | a c e |
    /// | b d f |
    /// | 0 0 1 |
    /// ```
    pub fn from_affine(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Mat3 {
        Mat3([
            a, b, 0.0, //
            c, d, 0.0, //
            e, f, 1.0,
        ])
    }

    /// Matrix product `self * rhs`.
    ///
    /// On column vectors the right-hand operand applies first:
    /// `a.multiply(&b).transform_point(p) == a.transform_point(b.transform_point(p))`.
    /// Transform chains therefore compose as `top = top.multiply(&local)`.
    pub fn multiply(&self, rhs: &Mat3) -> Mat3 {
        let a = &self.0;
        let b = &rhs.0;
        let mut out = [0.0f32; 9];
        for col in 0..3 {
            for row in 0..3 {
                out[col * 3 + row] = a[row] * b[col * 3]
                    + a[3 + row] * b[col * 3 + 1]
                    + a[6 + row] * b[col * 3 + 2];
            }
        }
        Mat3(out)
    }

    pub fn transpose(&self) -> Mat3 {
        let m = &self.0;
        Mat3([
            m[0], m[3], m[6], //
            m[1], m[4], m[7], //
            m[2], m[5], m[8],
        ])
    }

    pub fn determinant(&self) -> f32 {
        // Rows as written on paper: [a b c; d e f; g h i]
        let [a, d, g, b, e, h, c, f, i] = self.0;
        a * (e * i - f * h) - b * (d * i - f * g) + c * (d * h - e * g)
    }

    /// Inverse, or `None` when the determinant is zero.
    pub fn inverse(&self) -> Option<Mat3> {
        let [a, d, g, b, e, h, c, f, i] = self.0;
        let det = a * (e * i - f * h) - b * (d * i - f * g) + c * (d * h - e * g);
        if det == 0.0 {
            return None;
        }
        let inv_det = 1.0 / det;
        Some(Mat3([
            (e * i - f * h) * inv_det,
            (f * g - d * i) * inv_det,
            (d * h - e * g) * inv_det,
            (c * h - b * i) * inv_det,
            (a * i - c * g) * inv_det,
            (b * g - a * h) * inv_det,
            (b * f - c * e) * inv_det,
            (c * d - a * f) * inv_det,
            (a * e - b * d) * inv_det,
        ]))
    }

    /// Apply to a 2D point (with perspective divide for non-affine input).
    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        let m = &self.0;
        let tx = m[0] * x + m[3] * y + m[6];
        let ty = m[1] * x + m[4] * y + m[7];
        let w = m[2] * x + m[5] * y + m[8];
        if w != 0.0 && w != 1.0 {
            (tx / w, ty / w)
        } else {
            (tx, ty)
        }
    }
}

impl Default for Mat3 {
    fn default() -> Self {
        Mat3::IDENTITY
    }
}

/// A 4x4 matrix stored column-major (`m[col * 4 + row]`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat4(pub [f32; 16]);

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    pub fn translation(x: f32, y: f32, z: f32) -> Mat4 {
        let mut m = Mat4::IDENTITY;
        m.0[12] = x;
        m.0[13] = y;
        m.0[14] = z;
        m
    }

    pub fn scaling(x: f32, y: f32, z: f32) -> Mat4 {
        let mut m = Mat4::IDENTITY;
        m.0[0] = x;
        m.0[5] = y;
        m.0[10] = z;
        m
    }

    /// Axis-angle rotation (Rodrigues), `angle` in radians. The axis is
    /// normalized here; a zero axis yields the identity.
    pub fn rotation(angle: f32, axis: [f32; 3]) -> Mat4 {
        let len = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
        if len == 0.0 {
            return Mat4::IDENTITY;
        }
        let (x, y, z) = (axis[0] / len, axis[1] / len, axis[2] / len);
        let (sin, cos) = angle.sin_cos();
        let t = 1.0 - cos;
        Mat4([
            t * x * x + cos,
            t * x * y + sin * z,
            t * x * z - sin * y,
            0.0,
            t * x * y - sin * z,
            t * y * y + cos,
            t * y * z + sin * x,
            0.0,
            t * x * z + sin * y,
            t * y * z - sin * x,
            t * z * z + cos,
            0.0,
            0.0,
            0.0,
            0.0,
            1.0,
        ])
    }

    /// Canvas projection: pixel space (origin top-left, y down) to clip
    /// space, with Y flipped. Computed once per canvas from its pixel size.
    pub fn orthographic_2d(width: f32, height: f32) -> Mat4 {
        Mat4([
            2.0 / width,
            0.0,
            0.0,
            0.0,
            0.0,
            -2.0 / height,
            0.0,
            0.0,
            0.0,
            0.0,
            1.0,
            0.0,
            -1.0,
            1.0,
            0.0,
            1.0,
        ])
    }

    /// Right-handed perspective projection, `fov_y` in radians.
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let f = 1.0 / (fov_y / 2.0).tan();
        let nf = 1.0 / (near - far);
        Mat4([
            f / aspect,
            0.0,
            0.0,
            0.0,
            0.0,
            f,
            0.0,
            0.0,
            0.0,
            0.0,
            (far + near) * nf,
            -1.0,
            0.0,
            0.0,
            2.0 * far * near * nf,
            0.0,
        ])
    }

    /// Matrix product `self * rhs`; the right-hand operand applies first.
    pub fn multiply(&self, rhs: &Mat4) -> Mat4 {
        let a = &self.0;
        let b = &rhs.0;
        let mut out = [0.0f32; 16];
        for col in 0..4 {
            for row in 0..4 {
                out[col * 4 + row] = a[row] * b[col * 4]
                    + a[4 + row] * b[col * 4 + 1]
                    + a[8 + row] * b[col * 4 + 2]
                    + a[12 + row] * b[col * 4 + 3];
            }
        }
        Mat4(out)
    }

    pub fn transpose(&self) -> Mat4 {
        let m = &self.0;
        let mut out = [0.0f32; 16];
        for col in 0..4 {
            for row in 0..4 {
                out[col * 4 + row] = m[row * 4 + col];
            }
        }
        Mat4(out)
    }

    /// Inverse by cofactor expansion, or `None` when singular.
    pub fn inverse(&self) -> Option<Mat4> {
        let m = &self.0;
        let mut inv = [0.0f32; 16];

        inv[0] = m[5] * m[10] * m[15] - m[5] * m[11] * m[14] - m[9] * m[6] * m[15]
            + m[9] * m[7] * m[14]
            + m[13] * m[6] * m[11]
            - m[13] * m[7] * m[10];
        inv[4] = -m[4] * m[10] * m[15] + m[4] * m[11] * m[14] + m[8] * m[6] * m[15]
            - m[8] * m[7] * m[14]
            - m[12] * m[6] * m[11]
            + m[12] * m[7] * m[10];
        inv[8] = m[4] * m[9] * m[15] - m[4] * m[11] * m[13] - m[8] * m[5] * m[15]
            + m[8] * m[7] * m[13]
            + m[12] * m[5] * m[11]
            - m[12] * m[7] * m[9];
        inv[12] = -m[4] * m[9] * m[14] + m[4] * m[10] * m[13] + m[8] * m[5] * m[14]
            - m[8] * m[6] * m[13]
            - m[12] * m[5] * m[10]
            + m[12] * m[6] * m[9];
        inv[1] = -m[1] * m[10] * m[15] + m[1] * m[11] * m[14] + m[9] * m[2] * m[15]
            - m[9] * m[3] * m[14]
            - m[13] * m[2] * m[11]
            + m[13] * m[3] * m[10];
        inv[5] = m[0] * m[10] * m[15] - m[0] * m[11] * m[14] - m[8] * m[2] * m[15]
            + m[8] * m[3] * m[14]
            + m[12] * m[2] * m[11]
            - m[12] * m[3] * m[10];
        inv[9] = -m[0] * m[9] * m[15] + m[0] * m[11] * m[13] + m[8] * m[1] * m[15]
            - m[8] * m[3] * m[13]
            - m[12] * m[1] * m[11]
            + m[12] * m[3] * m[9];
        inv[13] = m[0] * m[9] * m[14] - m[0] * m[10] * m[13] - m[8] * m[1] * m[14]
            + m[8] * m[2] * m[13]
            + m[12] * m[1] * m[10]
            - m[12] * m[2] * m[9];
        inv[2] = m[1] * m[6] * m[15] - m[1] * m[7] * m[14] - m[5] * m[2] * m[15]
            + m[5] * m[3] * m[14]
            + m[13] * m[2] * m[7]
            - m[13] * m[3] * m[6];
        inv[6] = -m[0] * m[6] * m[15] + m[0] * m[7] * m[14] + m[4] * m[2] * m[15]
            - m[4] * m[3] * m[14]
            - m[12] * m[2] * m[7]
            + m[12] * m[3] * m[6];
        inv[10] = m[0] * m[5] * m[15] - m[0] * m[7] * m[13] - m[4] * m[1] * m[15]
            + m[4] * m[3] * m[13]
            + m[12] * m[1] * m[7]
            - m[12] * m[3] * m[5];
        inv[14] = -m[0] * m[5] * m[14] + m[0] * m[6] * m[13] + m[4] * m[1] * m[14]
            - m[4] * m[2] * m[13]
            - m[12] * m[1] * m[6]
            + m[12] * m[2] * m[5];
        inv[3] = -m[1] * m[6] * m[11] + m[1] * m[7] * m[10] + m[5] * m[2] * m[11]
            - m[5] * m[3] * m[10]
            - m[9] * m[2] * m[7]
            + m[9] * m[3] * m[6];
        inv[7] = m[0] * m[6] * m[11] - m[0] * m[7] * m[10] - m[4] * m[2] * m[11]
            + m[4] * m[3] * m[10]
            + m[8] * m[2] * m[7]
            - m[8] * m[3] * m[6];
        inv[11] = -m[0] * m[5] * m[11] + m[0] * m[7] * m[9] + m[4] * m[1] * m[11]
            - m[4] * m[3] * m[9]
            - m[8] * m[1] * m[7]
            + m[8] * m[3] * m[5];
        inv[15] = m[0] * m[5] * m[10] - m[0] * m[6] * m[9] - m[4] * m[1] * m[10]
            + m[4] * m[2] * m[9]
            + m[8] * m[1] * m[6]
            - m[8] * m[2] * m[5];

        let det = m[0] * inv[0] + m[1] * inv[4] + m[2] * inv[8] + m[3] * inv[12];
        if det == 0.0 {
            return None;
        }
        let inv_det = 1.0 / det;
        for v in inv.iter_mut() {
            *v *= inv_det;
        }
        Some(Mat4(inv))
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Mat4::IDENTITY
    }
}
