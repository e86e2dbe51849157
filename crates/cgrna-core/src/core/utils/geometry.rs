use nalgebra::{Matrix3, Point3, Rotation3, SVD, Unit, Vector3};

const EPSILON: f64 = 1e-12;

pub fn rotation_to_align(from: &Vector3<f64>, to: &Vector3<f64>) -> Option<Rotation3<f64>> {
    Rotation3::rotation_between(from, to)
}

pub fn rotation_from_axis_angle(axis: &Vector3<f64>, angle_degrees: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Unit::new_normalize(*axis), angle_degrees.to_radians())
}

pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum: Vector3<f64> = points.iter().map(|p| p.coords).sum();
    Some(Point3::from(sum / points.len() as f64))
}

pub fn calculate_rmsd(coords1: &[Point3<f64>], coords2: &[Point3<f64>]) -> Option<f64> {
    if coords1.len() != coords2.len() || coords1.is_empty() {
        return None;
    }
    let n = coords1.len() as f64;
    let squared_dist_sum: f64 = coords1
        .iter()
        .zip(coords2.iter())
        .map(|(p1, p2)| (p1 - p2).norm_squared())
        .sum();
    Some((squared_dist_sum / n).sqrt())
}

/// Optimal rotation taking the centered `moving` set onto the centered
/// `target` set (Kabsch), with reflection correction.
pub fn kabsch_rotation(moving: &[Vector3<f64>], target: &[Vector3<f64>]) -> Option<Rotation3<f64>> {
    if moving.len() != target.len() || moving.is_empty() {
        return None;
    }
    let covariance: Matrix3<f64> = moving
        .iter()
        .zip(target)
        .map(|(p, q)| p * q.transpose())
        .sum();
    let svd = SVD::new(covariance, true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let d = if (v_t.transpose() * u.transpose()).determinant() < 0.0 {
        -1.0
    } else {
        1.0
    };
    let mut reflection = Matrix3::identity();
    reflection[(2, 2)] = d;
    Some(Rotation3::from_matrix_unchecked(
        v_t.transpose() * reflection * u.transpose(),
    ))
}

/// RMSD after optimal rigid superposition of `moving` onto `target`.
pub fn superposed_rmsd(moving: &[Point3<f64>], target: &[Point3<f64>]) -> Option<f64> {
    let c_moving = centroid(moving)?;
    let c_target = centroid(target)?;
    let centered_moving: Vec<Vector3<f64>> = moving.iter().map(|p| p - c_moving).collect();
    let centered_target: Vec<Vector3<f64>> = target.iter().map(|p| p - c_target).collect();
    let rotation = kabsch_rotation(&centered_moving, &centered_target)?;
    let n = moving.len() as f64;
    let sum: f64 = centered_moving
        .iter()
        .zip(&centered_target)
        .map(|(p, q)| (rotation * p - q).norm_squared())
        .sum();
    Some((sum / n).sqrt())
}

/// Spherical coordinates `(r, u, v)` with `u` the polar angle from +z and `v`
/// the azimuth in the xy-plane. The zero vector maps to `(0, 0, 0)`.
pub fn spherical_coordinates(vec: &Vector3<f64>) -> (f64, f64, f64) {
    let r = vec.norm();
    if r < EPSILON {
        return (0.0, 0.0, 0.0);
    }
    let u = (vec.z / r).clamp(-1.0, 1.0).acos();
    let v = vec.y.atan2(vec.x);
    (r, u, v)
}

/// Component of `vec` orthogonal to `axis`.
pub fn vector_rejection(vec: &Vector3<f64>, axis: &Vector3<f64>) -> Vector3<f64> {
    let norm_sq = axis.norm_squared();
    if norm_sq < EPSILON {
        return *vec;
    }
    vec - axis * (vec.dot(axis) / norm_sq)
}

/// Some unit vector perpendicular to `vec`.
pub fn any_perpendicular(vec: &Vector3<f64>) -> Vector3<f64> {
    let helper = if vec.x.abs() < 0.9 * vec.norm() {
        Vector3::x()
    } else {
        Vector3::y()
    };
    vector_rejection(&helper, vec).normalize()
}

/// Angle from `from` to `to` measured counter-clockwise about `axis`, after
/// projecting both onto the plane normal to `axis`. Range `(-pi, pi]`.
pub fn signed_angle_about(from: &Vector3<f64>, to: &Vector3<f64>, axis: &Vector3<f64>) -> f64 {
    let a = vector_rejection(from, axis);
    let b = vector_rejection(to, axis);
    let n = axis.normalize();
    a.cross(&b).dot(&n).atan2(a.dot(&b))
}

/// Orthonormal frame `(x, y, z)` with `x` along `primary` and `y` the part of
/// `secondary` perpendicular to it. A `secondary` parallel to `primary` is
/// replaced by an arbitrary perpendicular.
pub fn orthonormal_basis(
    primary: &Vector3<f64>,
    secondary: &Vector3<f64>,
) -> Option<(Vector3<f64>, Vector3<f64>, Vector3<f64>)> {
    let x = primary.try_normalize(EPSILON)?;
    let y = vector_rejection(secondary, &x)
        .try_normalize(1e-9)
        .unwrap_or_else(|| any_perpendicular(&x));
    Some((x, y, x.cross(&y)))
}

/// Expresses `vec` in the frame `(x, y, z)`.
pub fn change_basis(vec: &Vector3<f64>, basis: &(Vector3<f64>, Vector3<f64>, Vector3<f64>)) -> Vector3<f64> {
    Vector3::new(vec.dot(&basis.0), vec.dot(&basis.1), vec.dot(&basis.2))
}

/// Foot of the perpendicular from `point` onto the line through `origin`
/// along `direction`.
pub fn project_onto_line(
    point: &Point3<f64>,
    origin: &Point3<f64>,
    direction: &Vector3<f64>,
) -> Point3<f64> {
    let norm_sq = direction.norm_squared();
    if norm_sq < EPSILON {
        return *origin;
    }
    origin + direction * ((point - origin).dot(direction) / norm_sq)
}

/// Closest points between segments `p1-q1` and `p2-q2`.
pub fn closest_points_between_segments(
    p1: &Point3<f64>,
    q1: &Point3<f64>,
    p2: &Point3<f64>,
    q2: &Point3<f64>,
) -> (Point3<f64>, Point3<f64>) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.norm_squared();
    let e = d2.norm_squared();
    let f = d2.dot(&r);

    let (s, t) = if a <= EPSILON && e <= EPSILON {
        (0.0, 0.0)
    } else if a <= EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(&r);
        if e <= EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;
            let mut s = if denom > EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };
    (p1 + d1 * s, p2 + d2 * t)
}

pub fn segment_distance(
    p1: &Point3<f64>,
    q1: &Point3<f64>,
    p2: &Point3<f64>,
    q2: &Point3<f64>,
) -> f64 {
    let (a, b) = closest_points_between_segments(p1, q1, p2, q2);
    (a - b).norm()
}
