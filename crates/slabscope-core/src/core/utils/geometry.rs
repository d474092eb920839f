use nalgebra::{Point3, Vector3};

const DEGENERATE_NORM: f64 = 1e-10;

/// Unit bisector of the two bond vectors leaving `center` towards `a` and `b`.
///
/// Returns `None` when the two bonds point in exactly opposite directions or one
/// of them has zero length.
pub fn bisector(center: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> Option<Vector3<f64>> {
    bisector_of(&(a - center), &(b - center))
}

/// Unit bisector of two bond vectors that share their origin.
pub fn bisector_of(v1: &Vector3<f64>, v2: &Vector3<f64>) -> Option<Vector3<f64>> {
    let u1 = v1.try_normalize(DEGENERATE_NORM)?;
    let u2 = v2.try_normalize(DEGENERATE_NORM)?;
    (u1 + u2).try_normalize(DEGENERATE_NORM)
}

/// Unit normal of the plane spanned by two vectors, oriented as `v1 × v2`.
pub fn plane_normal(v1: &Vector3<f64>, v2: &Vector3<f64>) -> Option<Vector3<f64>> {
    v1.cross(v2).try_normalize(DEGENERATE_NORM)
}

/// Signed dihedral angle in radians, in `(-π, π]`, for four ordered points.
pub fn dihedral(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>, p3: &Point3<f64>) -> f64 {
    dihedral_from_vectors(&(p1 - p0), &(p2 - p1), &(p3 - p2))
}

/// Signed dihedral angle in radians from three consecutive bond vectors.
///
/// Uses `atan2(|b2| b1·(b2×b3), (b1×b2)·(b2×b3))`, which keeps the sign over the
/// full circle and stays accurate near 0 and ±π.
pub fn dihedral_from_vectors(b1: &Vector3<f64>, b2: &Vector3<f64>, b3: &Vector3<f64>) -> f64 {
    let n1 = b1.cross(b2);
    let n2 = b2.cross(b3);
    let y = b2.norm() * b1.dot(&n2);
    let x = n1.dot(&n2);
    y.atan2(x)
}

/// Cosine of the angle between two vectors, clamped to `[-1, 1]`.
///
/// A zero-length input yields 0.
pub fn cos_angle(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let denom = a.norm() * b.norm();
    if denom < DEGENERATE_NORM {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0)
}

/// Angle in degrees between a molecular vector and a reference axis.
pub fn tilt_degrees(v: &Vector3<f64>, axis: &Vector3<f64>) -> f64 {
    cos_angle(v, axis).acos().to_degrees()
}

/// Twist in degrees of `bond` about `bisector`, measured from the plane that
/// contains `axis` and `bisector`.
pub fn twist_degrees(axis: &Vector3<f64>, bisector: &Vector3<f64>, bond: &Vector3<f64>) -> f64 {
    dihedral_from_vectors(axis, bisector, bond).to_degrees()
}

/// Mass-weighted centre of a point set. Returns `None` for empty input or a
/// non-positive total mass.
pub fn center_of_mass(points: &[Point3<f64>], masses: &[f64]) -> Option<Point3<f64>> {
    if points.is_empty() || points.len() != masses.len() {
        return None;
    }
    let total: f64 = masses.iter().sum();
    if total <= 0.0 {
        return None;
    }
    let weighted = points
        .iter()
        .zip(masses)
        .fold(Vector3::zeros(), |acc, (p, &m)| acc + p.coords * m);
    Some(Point3::from(weighted / total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const EPS: f64 = 1e-9;

    #[test]
    fn bisector_of_orthogonal_bonds_is_diagonal() {
        let center = Point3::origin();
        let b = bisector(&center, &Point3::new(2.0, 0.0, 0.0), &Point3::new(0.0, 1.0, 0.0))
            .unwrap();
        let expected = Vector3::new(1.0, 1.0, 0.0).normalize();
        assert!((b - expected).norm() < EPS);
    }

    #[test]
    fn bisector_of_opposite_bonds_is_degenerate() {
        let center = Point3::origin();
        assert!(
            bisector(&center, &Point3::new(1.0, 0.0, 0.0), &Point3::new(-1.0, 0.0, 0.0))
                .is_none()
        );
    }

    #[test]
    fn cis_dihedral_is_zero() {
        let angle = dihedral(
            &Point3::new(0.0, 1.0, 0.0),
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(1.0, 1.0, 0.0),
        );
        assert!(angle.abs() < EPS);
    }

    #[test]
    fn anti_dihedral_is_pi() {
        let angle = dihedral(
            &Point3::new(0.0, 1.0, 0.0),
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(1.0, -1.0, 0.0),
        );
        assert!((angle.abs() - PI).abs() < EPS);
    }

    #[test]
    fn dihedral_sign_flips_with_mirror_image() {
        let p0 = Point3::new(0.0, 1.0, 0.0);
        let p1 = Point3::new(0.0, 0.0, 0.0);
        let p2 = Point3::new(1.0, 0.0, 0.0);
        let plus = dihedral(&p0, &p1, &p2, &Point3::new(1.0, 0.0, 1.0));
        let minus = dihedral(&p0, &p1, &p2, &Point3::new(1.0, 0.0, -1.0));
        assert!((plus - PI / 2.0).abs() < EPS);
        assert!((minus + PI / 2.0).abs() < EPS);
    }

    #[test]
    fn dihedral_sign_flips_when_order_is_reversed_for_chiral_case() {
        let p0 = Point3::new(0.0, 1.0, 0.0);
        let p1 = Point3::new(0.0, 0.0, 0.0);
        let p2 = Point3::new(1.0, 0.0, 0.0);
        let p3 = Point3::new(1.0, 0.0, 1.0);
        let forward = dihedral(&p0, &p1, &p2, &p3);
        let backward = dihedral(&p3, &p2, &p1, &p0);
        // Reversing the full chain keeps the dihedral; mirroring flips it.
        assert!((forward - backward).abs() < EPS);
        let mirrored = dihedral(
            &Point3::new(0.0, -1.0, 0.0),
            &p1,
            &p2,
            &Point3::new(1.0, 0.0, 1.0),
        );
        assert!((forward + mirrored).abs() < EPS);
    }

    #[test]
    fn tilt_of_axis_aligned_vector() {
        let z = Vector3::z();
        assert!(tilt_degrees(&Vector3::new(0.0, 0.0, 3.0), &z).abs() < EPS);
        assert!((tilt_degrees(&Vector3::new(1.0, 0.0, 0.0), &z) - 90.0).abs() < EPS);
        assert!((tilt_degrees(&Vector3::new(0.0, 0.0, -2.0), &z) - 180.0).abs() < EPS);
    }

    #[test]
    fn twist_measures_bond_rotation_about_bisector() {
        let axis = Vector3::z();
        let bisector = Vector3::x();
        let away_from_axis = twist_degrees(&axis, &bisector, &Vector3::new(1.0, 0.0, -1.0));
        let towards_axis = twist_degrees(&axis, &bisector, &Vector3::new(1.0, 0.0, 1.0));
        let perpendicular = twist_degrees(&axis, &bisector, &Vector3::new(1.0, 1.0, 0.0));
        assert!(away_from_axis.abs() < EPS);
        assert!((towards_axis.abs() - 180.0).abs() < EPS);
        assert!((perpendicular - 90.0).abs() < EPS);
    }

    #[test]
    fn cos_angle_handles_zero_vectors() {
        assert_eq!(cos_angle(&Vector3::zeros(), &Vector3::x()), 0.0);
        assert!((cos_angle(&Vector3::x(), &Vector3::new(5.0, 0.0, 0.0)) - 1.0).abs() < EPS);
    }

    #[test]
    fn center_of_mass_is_mass_weighted() {
        let points = [Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 0.0, 0.0)];
        let com = center_of_mass(&points, &[3.0, 1.0]).unwrap();
        assert!((com.x - 1.0).abs() < EPS);
        assert!(center_of_mass(&[], &[]).is_none());
        assert!(center_of_mass(&points, &[0.0, 0.0]).is_none());
    }
}
