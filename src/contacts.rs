//! Inter-group residue contacts and interface extraction.
//!
//! Both metrics reduce an atom-level distance computation to residue level:
//! the distance between two residues is the minimum distance over all their
//! atom pairs. A residue pair is a contact iff that distance is strictly
//! below the threshold (5.0 Å standard, 4.0 Å peptide mode for Fnat;
//! 10.0 Å / 8.0 Å for the interface definition).

use crate::error::{DockQError, Result};
use crate::structure::{ChainGroup, Residue, Structure};
use nalgebra as na;
use tracing::debug;

/// Residue-level minimum-distance matrix between two chain groups.
///
/// With `all_atom` every atom of each residue participates in the
/// minimum; otherwise a single representative atom per residue is used
/// (CB if present, else CA).
pub fn residue_distance_matrix(
    structure: &Structure,
    group1: &ChainGroup,
    group2: &ChainGroup,
    all_atom: bool,
) -> Result<na::DMatrix<f64>> {
    let res1 = group_residues_checked(structure, group1)?;
    let res2 = group_residues_checked(structure, group2)?;

    if all_atom {
        let coords1 = residue_atom_coords(&res1)?;
        let coords2 = residue_atom_coords(&res2)?;
        Ok(na::DMatrix::from_fn(res1.len(), res2.len(), |i, j| {
            min_pair_distance(&coords1[i], &coords2[j])
        }))
    } else {
        let coords1 = representative_coords(&res1)?;
        let coords2 = representative_coords(&res2)?;
        Ok(na::DMatrix::from_fn(res1.len(), res2.len(), |i, j| {
            (coords1[i].coords - coords2[j].coords).norm()
        }))
    }
}

/// Contact counts shared between a model and its native reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactStats {
    /// Native contacts reproduced by the model.
    pub shared: usize,
    /// Model contacts absent from the native contact set.
    pub non_native: usize,
    /// Total native contacts.
    pub native_total: usize,
    /// Total model contacts.
    pub model_total: usize,
}

impl ContactStats {
    /// Fraction of native contacts reproduced by the model.
    ///
    /// A native structure without inter-group contacts has no defined
    /// Fnat; that is reported as an error, never coerced to 0 or 1.
    pub fn fnat(&self) -> Result<f64> {
        if self.native_total == 0 {
            return Err(DockQError::StructuralPrecondition(
                "native structure has no inter-group contacts, Fnat is undefined".to_string(),
            ));
        }
        Ok(self.shared as f64 / self.native_total as f64)
    }

    /// Fraction of model contacts absent from the native contact set.
    pub fn fnonnat(&self) -> Result<f64> {
        if self.model_total == 0 {
            return Err(DockQError::StructuralPrecondition(
                "model structure has no inter-group contacts, Fnonnat is undefined".to_string(),
            ));
        }
        Ok(self.non_native as f64 / self.model_total as f64)
    }
}

/// Compare model and native inter-group contacts at `threshold`.
///
/// Contact distances are always all-atom; the residue matrices of model
/// and native must have identical dimensions, i.e. the positionally
/// corresponding groups must hold the same residue counts.
pub fn contact_stats(
    model: &Structure,
    native: &Structure,
    model_group1: &ChainGroup,
    model_group2: &ChainGroup,
    native_group1: &ChainGroup,
    native_group2: &ChainGroup,
    threshold: f64,
) -> Result<ContactStats> {
    let model_dist = residue_distance_matrix(model, model_group1, model_group2, true)?;
    let native_dist = residue_distance_matrix(native, native_group1, native_group2, true)?;

    if model_dist.shape() != native_dist.shape() {
        return Err(DockQError::StructuralPrecondition(format!(
            "model and native groups disagree on residue counts: {:?} vs {:?}",
            model_dist.shape(),
            native_dist.shape()
        )));
    }

    let mut stats = ContactStats {
        shared: 0,
        non_native: 0,
        native_total: 0,
        model_total: 0,
    };
    for (m, n) in model_dist.iter().zip(native_dist.iter()) {
        let model_contact = *m < threshold;
        let native_contact = *n < threshold;
        if native_contact {
            stats.native_total += 1;
        }
        if model_contact {
            stats.model_total += 1;
            if native_contact {
                stats.shared += 1;
            } else {
                stats.non_native += 1;
            }
        }
    }
    debug!(
        "Contacts at {threshold} Å: {} native, {} model, {} shared, {} non-native",
        stats.native_total, stats.model_total, stats.shared, stats.non_native
    );
    Ok(stats)
}

/// Index-aligned interface residue lists.
///
/// Both lists have the same length and the i-th elements describe the
/// same positional interface contact; the order is part of the contract
/// and must not be re-sorted (the superposition engine consumes the atoms
/// positionally).
#[derive(Debug)]
pub struct InterfaceCorrespondence<'a> {
    /// Native interface residues.
    pub native: Vec<&'a Residue>,
    /// Model residues at the same positional indices.
    pub model: Vec<&'a Residue>,
}

/// Extract the native interface at `threshold` and the positionally
/// corresponding model residues.
///
/// The interface is defined on the native structure only; the model lists
/// are indexed by the same group positions, which requires the groups to
/// be residue-count aligned after renumbering.
pub fn interface_correspondence<'a>(
    model: &'a Structure,
    native: &'a Structure,
    model_group1: &ChainGroup,
    model_group2: &ChainGroup,
    native_group1: &ChainGroup,
    native_group2: &ChainGroup,
    threshold: f64,
    all_atom: bool,
) -> Result<InterfaceCorrespondence<'a>> {
    let native_dist = residue_distance_matrix(native, native_group1, native_group2, all_atom)?;

    let native_res1 = group_residues_checked(native, native_group1)?;
    let native_res2 = group_residues_checked(native, native_group2)?;
    let model_res1 = group_residues_checked(model, model_group1)?;
    let model_res2 = group_residues_checked(model, model_group2)?;

    if model_res1.len() != native_res1.len() || model_res2.len() != native_res2.len() {
        return Err(DockQError::StructuralPrecondition(format!(
            "model and native groups disagree on residue counts: {}/{} vs {}/{}",
            model_res1.len(),
            model_res2.len(),
            native_res1.len(),
            native_res2.len()
        )));
    }

    let mut interface = InterfaceCorrespondence {
        native: Vec::new(),
        model: Vec::new(),
    };
    // Row-major enumeration keeps the positional correspondence stable.
    for i in 0..native_dist.nrows() {
        for j in 0..native_dist.ncols() {
            if native_dist[(i, j)] < threshold {
                interface.native.push(native_res1[i]);
                interface.native.push(native_res2[j]);
                interface.model.push(model_res1[i]);
                interface.model.push(model_res2[j]);
            }
        }
    }
    debug!(
        "Interface at {threshold} Å: {} residue pairs",
        interface.native.len() / 2
    );
    Ok(interface)
}

fn group_residues_checked<'a>(
    structure: &'a Structure,
    group: &ChainGroup,
) -> Result<Vec<&'a Residue>> {
    let residues = group.residues(structure);
    if residues.is_empty() {
        return Err(DockQError::StructuralPrecondition(format!(
            "chain group {group} has no residues"
        )));
    }
    Ok(residues)
}

fn residue_atom_coords(residues: &[&Residue]) -> Result<Vec<Vec<na::Point3<f64>>>> {
    residues
        .iter()
        .map(|res| {
            if res.atoms.is_empty() {
                return Err(DockQError::StructuralPrecondition(format!(
                    "residue {} {} has no atoms",
                    res.name, res.number
                )));
            }
            Ok(res.atoms.iter().map(|a| a.coord).collect())
        })
        .collect()
}

fn representative_coords(residues: &[&Residue]) -> Result<Vec<na::Point3<f64>>> {
    residues
        .iter()
        .map(|res| {
            res.representative_atom().map(|a| a.coord).ok_or_else(|| {
                DockQError::StructuralPrecondition(format!(
                    "residue {} {} has neither CB nor CA",
                    res.name, res.number
                ))
            })
        })
        .collect()
}

fn min_pair_distance(a: &[na::Point3<f64>], b: &[na::Point3<f64>]) -> f64 {
    let mut min = f64::INFINITY;
    for p in a {
        for q in b {
            let d = (p.coords - q.coords).norm();
            if d < min {
                min = d;
            }
        }
    }
    min
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{Atom, Chain};

    fn residue(number: isize, atoms: Vec<Atom>) -> Residue {
        Residue {
            number,
            name: "ALA".to_string(),
            atoms,
        }
    }

    fn ca_residue(number: isize, x: f64, y: f64, z: f64) -> Residue {
        residue(number, vec![Atom::new("CA", x, y, z)])
    }

    fn two_chain_structure(a: Vec<Residue>, b: Vec<Residue>) -> Structure {
        Structure {
            chains: vec![
                Chain {
                    id: "A".to_string(),
                    residues: a,
                },
                Chain {
                    id: "B".to_string(),
                    residues: b,
                },
            ],
        }
    }

    fn groups() -> (ChainGroup, ChainGroup) {
        (ChainGroup::new(["A"]), ChainGroup::new(["B"]))
    }

    /// Residues spaced 20 Å apart along x; partner residues offset in y so
    /// only the diagonal pairs are within contact range.
    fn diagonal_contact_structure(n: usize, partner_y: f64) -> Structure {
        let a = (0..n)
            .map(|i| ca_residue(i as isize + 1, 20.0 * i as f64, 0.0, 0.0))
            .collect();
        let b = (0..n)
            .map(|i| ca_residue(i as isize + 1, 20.0 * i as f64, partner_y, 0.0))
            .collect();
        two_chain_structure(a, b)
    }

    #[test]
    fn distance_matrix_takes_minimum_over_atom_pairs() {
        let a = vec![residue(
            1,
            vec![Atom::new("CA", 0.0, 0.0, 0.0), Atom::new("CB", 0.0, 8.0, 0.0)],
        )];
        let b = vec![residue(1, vec![Atom::new("CA", 0.0, 10.0, 0.0)])];
        let structure = two_chain_structure(a, b);
        let (g1, g2) = groups();
        let dist = residue_distance_matrix(&structure, &g1, &g2, true).unwrap();
        assert!((dist[(0, 0)] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn representative_mode_uses_cb_over_ca() {
        let a = vec![residue(
            1,
            vec![Atom::new("CA", 0.0, 0.0, 0.0), Atom::new("CB", 0.0, 1.0, 0.0)],
        )];
        let b = vec![residue(1, vec![Atom::new("CA", 0.0, 10.0, 0.0)])];
        let structure = two_chain_structure(a, b);
        let (g1, g2) = groups();
        let dist = residue_distance_matrix(&structure, &g1, &g2, false).unwrap();
        // CB sits 9 Å from the partner CA; the CA-CA distance would be 10.
        assert!((dist[(0, 0)] - 9.0).abs() < 1e-12);
    }

    #[test]
    fn threshold_is_strict() {
        let structure = diagonal_contact_structure(1, 5.0);
        let (g1, g2) = groups();
        let stats = contact_stats(&structure, &structure, &g1, &g2, &g1, &g2, 5.0).unwrap();
        assert_eq!(stats.native_total, 0);
        assert!(stats.fnat().is_err());
    }

    #[test]
    fn reproduced_and_spurious_contacts_are_counted() {
        // Ten native contacts on the diagonal.
        let native = diagonal_contact_structure(10, 3.0);
        // Model reproduces eight of them, loses contacts 9 and 10, and
        // adds one spurious contact between A9 and B10.
        let mut model = diagonal_contact_structure(10, 3.0);
        model.chain_mut("B").unwrap().residues[8].atoms[0].coord =
            na::Point3::new(1000.0, 0.0, 0.0);
        model.chain_mut("B").unwrap().residues[9].atoms[0].coord =
            na::Point3::new(160.0, -3.0, 0.0);

        let (g1, g2) = groups();
        let stats = contact_stats(&model, &native, &g1, &g2, &g1, &g2, 5.0).unwrap();
        assert_eq!(stats.native_total, 10);
        assert_eq!(stats.model_total, 9);
        assert_eq!(stats.shared, 8);
        assert_eq!(stats.non_native, 1);
        assert!((stats.fnat().unwrap() - 0.8).abs() < 1e-12);
        assert!((stats.fnonnat().unwrap() - 1.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn group_order_swap_is_symmetric() {
        let native = diagonal_contact_structure(4, 3.0);
        let mut model = diagonal_contact_structure(4, 3.0);
        model.chain_mut("B").unwrap().residues[3].atoms[0].coord =
            na::Point3::new(1000.0, 0.0, 0.0);

        let (g1, g2) = groups();
        let forward = contact_stats(&model, &native, &g1, &g2, &g1, &g2, 5.0).unwrap();
        let swapped = contact_stats(&model, &native, &g2, &g1, &g2, &g1, 5.0).unwrap();
        assert_eq!(forward, swapped);
    }

    #[test]
    fn residue_count_mismatch_is_fatal() {
        let native = diagonal_contact_structure(4, 3.0);
        let mut model = diagonal_contact_structure(4, 3.0);
        model.chain_mut("B").unwrap().residues.pop();
        let (g1, g2) = groups();
        assert!(contact_stats(&model, &native, &g1, &g2, &g1, &g2, 5.0).is_err());
    }

    #[test]
    fn interface_lists_are_index_aligned() {
        let native = diagonal_contact_structure(3, 3.0);
        let model = diagonal_contact_structure(3, 3.0);
        let (g1, g2) = groups();
        let interface =
            interface_correspondence(&model, &native, &g1, &g2, &g1, &g2, 10.0, true).unwrap();
        assert_eq!(interface.native.len(), interface.model.len());
        // Diagonal pairs only, in row-major order.
        assert_eq!(interface.native.len(), 6);
        let numbers: Vec<isize> = interface.native.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 1, 2, 2, 3, 3]);
    }

    #[test]
    fn empty_group_is_fatal() {
        let structure = diagonal_contact_structure(2, 3.0);
        let g1 = ChainGroup::new(["A"]);
        let missing = ChainGroup::new(["Z"]);
        assert!(residue_distance_matrix(&structure, &g1, &missing, true).is_err());
    }
}
