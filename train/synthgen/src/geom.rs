pub type Vec3 = [f64; 3];

pub fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub fn scale(a: Vec3, k: f64) -> Vec3 {
    [a[0] * k, a[1] * k, a[2] * k]
}

pub fn normalize(a: Vec3) -> Vec3 {
    let len = dot(a, a).sqrt();
    if len == 0.0 { a } else { scale(a, 1.0 / len) }
}

/// Rotation for XYZ euler angles: X is applied first, then Y, then Z.
#[derive(Clone, Copy, Debug)]
pub struct Rotation([[f64; 3]; 3]);

impl Rotation {
    pub fn from_euler_xyz([x, y, z]: Vec3) -> Self {
        let (sx, cx) = x.sin_cos();
        let (sy, cy) = y.sin_cos();
        let (sz, cz) = z.sin_cos();
        // Rz * Ry * Rx
        Self([
            [cy * cz, sx * sy * cz - cx * sz, cx * sy * cz + sx * sz],
            [cy * sz, sx * sy * sz + cx * cz, cx * sy * sz - sx * cz],
            [-sy, sx * cy, cx * cy],
        ])
    }

    pub fn apply(&self, v: Vec3) -> Vec3 {
        let m = &self.0;
        [dot(m[0], v), dot(m[1], v), dot(m[2], v)]
    }
}

/// Axis-aligned box centred on the origin, given by its half extents.
#[derive(Clone, Copy, Debug)]
pub struct BrickBox {
    pub half: Vec3,
}

/// One face: outward normal and its corners in winding order.
pub struct Face {
    pub normal: Vec3,
    pub corners: [Vec3; 4],
}

impl BrickBox {
    pub fn bounding_radius(&self) -> f64 {
        dot(self.half, self.half).sqrt()
    }

    pub fn faces(&self) -> [Face; 6] {
        let [hx, hy, hz] = self.half;
        let c = |x: f64, y: f64, z: f64| [x * hx, y * hy, z * hz];
        [
            Face {
                normal: [1.0, 0.0, 0.0],
                corners: [c(1., -1., -1.), c(1., 1., -1.), c(1., 1., 1.), c(1., -1., 1.)],
            },
            Face {
                normal: [-1.0, 0.0, 0.0],
                corners: [c(-1., -1., -1.), c(-1., -1., 1.), c(-1., 1., 1.), c(-1., 1., -1.)],
            },
            Face {
                normal: [0.0, 1.0, 0.0],
                corners: [c(-1., 1., -1.), c(-1., 1., 1.), c(1., 1., 1.), c(1., 1., -1.)],
            },
            Face {
                normal: [0.0, -1.0, 0.0],
                corners: [c(-1., -1., -1.), c(1., -1., -1.), c(1., -1., 1.), c(-1., -1., 1.)],
            },
            Face {
                normal: [0.0, 0.0, 1.0],
                corners: [c(-1., -1., 1.), c(1., -1., 1.), c(1., 1., 1.), c(-1., 1., 1.)],
            },
            Face {
                normal: [0.0, 0.0, -1.0],
                corners: [c(-1., -1., -1.), c(-1., 1., -1.), c(1., 1., -1.), c(1., -1., -1.)],
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn close(a: Vec3, b: Vec3) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn zero_euler_is_identity() {
        let r = Rotation::from_euler_xyz([0.0; 3]);
        assert!(close(r.apply([1.0, 2.0, 3.0]), [1.0, 2.0, 3.0]));
    }

    #[test]
    fn quarter_turn_about_z() {
        let r = Rotation::from_euler_xyz([0.0, 0.0, FRAC_PI_2]);
        assert!(close(r.apply([1.0, 0.0, 0.0]), [0.0, 1.0, 0.0]));
    }

    #[test]
    fn x_is_applied_before_z() {
        // X turns +Y into +Z, Z then leaves it in place
        let r = Rotation::from_euler_xyz([FRAC_PI_2, 0.0, FRAC_PI_2]);
        assert!(close(r.apply([0.0, 1.0, 0.0]), [0.0, 0.0, 1.0]));
    }

    #[test]
    fn face_normals_point_outwards() {
        let b = BrickBox {
            half: [2.0, 1.0, 0.6],
        };
        for face in b.faces() {
            let centre = face
                .corners
                .iter()
                .fold([0.0; 3], |acc, &p| add(acc, scale(p, 0.25)));
            assert!(dot(centre, face.normal) > 0.0);
        }
    }
}
