//! Rigid superposition via the Kabsch algorithm, plus unfitted RMSD.
//!
//! The fit returns an explicit [`Transform`] instead of mutating the
//! structure: callers apply it to exactly the coordinate sets that need it,
//! which keeps concurrent evaluations free of shared mutable state.

use crate::error::{DockQError, Result};
use nalgebra as na;

/// A rigid rotation plus translation.
#[derive(Debug, Clone)]
pub struct Transform {
    /// Rotation matrix.
    pub rotation: na::Matrix3<f64>,
    /// Translation applied after rotation.
    pub translation: na::Vector3<f64>,
}

impl Transform {
    /// Apply the transform to a single point.
    pub fn apply(&self, point: &na::Point3<f64>) -> na::Point3<f64> {
        na::Point3::from(self.rotation * point.coords + self.translation)
    }

    /// Apply the transform to a point set, yielding new coordinates.
    pub fn apply_all(&self, points: &[na::Point3<f64>]) -> Vec<na::Point3<f64>> {
        points.iter().map(|p| self.apply(p)).collect()
    }
}

/// Result of a least-squares rigid fit.
#[derive(Debug, Clone)]
pub struct Superposition {
    /// RMSD after optimal superposition.
    pub rmsd: f64,
    /// The transform mapping the mobile set onto the reference set.
    pub transform: Transform,
}

/// Least-squares rigid fit of `mobile` onto `reference`.
///
/// Point sets must be equal-length, positionally corresponding and
/// non-empty; anything else is a fatal precondition.
pub fn superpose(
    reference: &[na::Point3<f64>],
    mobile: &[na::Point3<f64>],
) -> Result<Superposition> {
    check_point_sets(reference, mobile)?;
    let n = reference.len();

    let com_ref = centroid(reference);
    let com_mob = centroid(mobile);

    // Cross-covariance of the centered sets, H = sum(p q^T)
    let mut h = na::Matrix3::zeros();
    for (q, p) in reference.iter().zip(mobile.iter()) {
        let q = q.coords - com_ref;
        let p = p.coords - com_mob;
        h += p * q.transpose();
    }

    let svd = h.svd(true, true);
    let u = svd.u.unwrap();
    let mut v = svd.v_t.unwrap().transpose();
    let ut = u.transpose();

    let mut rotation = v * ut;
    // A negative determinant means the fit found a reflection; flip the
    // axis of the smallest singular value to get a proper rotation.
    if rotation.determinant() < 0.0 {
        v.column_mut(2).neg_mut();
        rotation = v * ut;
    }

    let translation = com_ref - rotation * com_mob;
    let transform = Transform {
        rotation,
        translation,
    };

    let mut sum_sq = 0.0;
    for (q, p) in reference.iter().zip(mobile.iter()) {
        sum_sq += (transform.apply(p).coords - q.coords).norm_squared();
    }

    Ok(Superposition {
        rmsd: (sum_sq / n as f64).sqrt(),
        transform,
    })
}

/// Plain RMSD between two positionally-corresponding point sets, without
/// any fitting.
pub fn rmsd(a: &[na::Point3<f64>], b: &[na::Point3<f64>]) -> Result<f64> {
    check_point_sets(a, b)?;
    let sum_sq: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(p, q)| (p.coords - q.coords).norm_squared())
        .sum();
    Ok((sum_sq / a.len() as f64).sqrt())
}

fn check_point_sets(a: &[na::Point3<f64>], b: &[na::Point3<f64>]) -> Result<()> {
    if a.len() != b.len() {
        return Err(DockQError::StructuralPrecondition(format!(
            "point set sizes differ: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    if a.is_empty() {
        return Err(DockQError::StructuralPrecondition(
            "empty point set for RMSD".to_string(),
        ));
    }
    Ok(())
}

fn centroid(points: &[na::Point3<f64>]) -> na::Vector3<f64> {
    points.iter().map(|p| p.coords).sum::<na::Vector3<f64>>() / points.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> na::Point3<f64> {
        na::Point3::new(x, y, z)
    }

    #[test]
    fn identical_sets_fit_with_zero_rmsd() {
        let points = vec![p(0.0, 0.0, 0.0), p(1.5, 0.0, 0.0), p(0.0, 2.0, 0.0), p(0.0, 0.0, 3.0)];
        let sup = superpose(&points, &points).unwrap();
        assert!(sup.rmsd < 1e-9, "rmsd was {}", sup.rmsd);
    }

    #[test]
    fn translation_is_recovered() {
        let reference = vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(0.0, 0.0, 1.0)];
        let mobile: Vec<_> = reference
            .iter()
            .map(|q| p(q.x + 11.0, q.y - 3.0, q.z + 0.5))
            .collect();
        let sup = superpose(&reference, &mobile).unwrap();
        assert!(sup.rmsd < 1e-9, "rmsd was {}", sup.rmsd);
        // The transform maps the mobile points back onto the reference.
        for (q, m) in reference.iter().zip(mobile.iter()) {
            let back = sup.transform.apply(m);
            assert!((back.coords - q.coords).norm() < 1e-9);
        }
    }

    #[test]
    fn rotation_is_recovered() {
        // Quarter turn around the z axis.
        let reference = vec![p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(-1.0, 0.0, 0.0), p(0.0, 0.0, 1.0)];
        let mobile = vec![p(0.0, 1.0, 0.0), p(-1.0, 0.0, 0.0), p(0.0, -1.0, 0.0), p(0.0, 0.0, 1.0)];
        let sup = superpose(&reference, &mobile).unwrap();
        assert!(sup.rmsd < 1e-9, "rmsd was {}", sup.rmsd);
    }

    #[test]
    fn mismatched_lengths_are_fatal() {
        let a = vec![p(0.0, 0.0, 0.0); 3];
        let b = vec![p(0.0, 0.0, 0.0); 4];
        assert!(superpose(&a, &b).is_err());
        assert!(rmsd(&a, &b).is_err());
    }

    #[test]
    fn empty_sets_are_fatal() {
        let empty: Vec<na::Point3<f64>> = vec![];
        assert!(superpose(&empty, &empty).is_err());
        assert!(rmsd(&empty, &empty).is_err());
    }

    #[test]
    fn unfitted_rmsd_measures_displacement() {
        let a = vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0)];
        let b = vec![p(0.0, 0.0, 2.0), p(1.0, 0.0, 2.0)];
        let d = rmsd(&a, &b).unwrap();
        assert!((d - 2.0).abs() < 1e-12);
    }
}
