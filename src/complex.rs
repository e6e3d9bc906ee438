//! The scoring pipeline for one model/native pair under a fixed chain
//! assignment.
//!
//! A [`DockingPair`] owns the chain-group assignment and the scoring
//! options; [`DockingPair::score`] runs the full chain: alignment-based
//! renumbering on a private copy of the model, contact comparison,
//! interface extraction, the two rigid fits, and the final DockQ score
//! with both CAPRI classifications.

use crate::align::align_model_to_native;
use crate::contacts::{contact_stats, interface_correspondence};
use crate::error::{DockQError, Result};
use crate::score::{capri_class, capri_class_from_dockq, dockq_score, ChainRole, ScoreResult};
use crate::structure::{ChainGroup, Residue, Structure};
use crate::superpose::{rmsd, superpose};
use nalgebra as na;
use std::collections::HashMap;
use tracing::debug;

/// Backbone atoms used for the rigid fits.
pub const BACKBONE_ATOMS: [&str; 4] = ["CA", "C", "N", "O"];

/// Atom set in CA-only mode.
pub const CA_ONLY_ATOMS: [&str; 1] = ["CA"];

/// Mode flags for a scoring run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreOptions {
    /// Superpose on CA atoms only instead of the full backbone.
    pub ca_only: bool,
    /// CAPRI peptide mode: tighter thresholds, CB-based interface,
    /// peptide classification table.
    pub capri_peptide: bool,
    /// Skip the alignment mapper; residue numbering must already be
    /// consistent between model and native.
    pub skip_alignment: bool,
}

impl ScoreOptions {
    /// Contact threshold for Fnat/Fnonnat.
    pub fn contact_threshold(&self) -> f64 {
        if self.capri_peptide {
            4.0
        } else {
            5.0
        }
    }

    /// Distance threshold defining the native interface.
    pub fn interface_threshold(&self) -> f64 {
        if self.capri_peptide {
            8.0
        } else {
            10.0
        }
    }

    /// Whether interface distances use all heavy atoms (standard) or one
    /// representative atom per residue (peptide mode).
    pub fn interface_all_atom(&self) -> bool {
        !self.capri_peptide
    }

    /// Atom names participating in the rigid fits.
    pub fn superposition_atoms(&self) -> &'static [&'static str] {
        if self.ca_only {
            &CA_ONLY_ATOMS
        } else {
            &BACKBONE_ATOMS
        }
    }
}

/// One model/native pair with a fixed chain-group assignment.
pub struct DockingPair<'a> {
    model: &'a Structure,
    native: &'a Structure,
    /// Model chains of the first docking partner, in correspondence order.
    pub model_group1: ChainGroup,
    /// Model chains of the second docking partner.
    pub model_group2: ChainGroup,
    /// Native chains corresponding to `model_group1`.
    pub native_group1: ChainGroup,
    /// Native chains corresponding to `model_group2`.
    pub native_group2: ChainGroup,
    /// Mode flags.
    pub options: ScoreOptions,
}

impl<'a> DockingPair<'a> {
    /// Assemble a scoring run; groups are validated when [`Self::score`]
    /// runs.
    pub fn new(
        model: &'a Structure,
        native: &'a Structure,
        model_groups: (ChainGroup, ChainGroup),
        native_groups: (ChainGroup, ChainGroup),
        options: ScoreOptions,
    ) -> Self {
        Self {
            model,
            native,
            model_group1: model_groups.0,
            model_group2: model_groups.1,
            native_group1: native_groups.0,
            native_group2: native_groups.1,
            options,
        }
    }

    /// Run the full scoring pipeline.
    ///
    /// The model structure is cloned internally: renumbering mutates the
    /// copy, never the caller's structure, so concurrent evaluations of
    /// different chain assignments stay isolated.
    pub fn score(&self) -> Result<ScoreResult> {
        self.validate_groups()?;
        debug!(
            "Scoring model groups {}/{} against native groups {}/{}",
            self.model_group1, self.model_group2, self.native_group1, self.native_group2
        );

        let mut model = self.model.clone();
        if !self.options.skip_alignment {
            let model_chains: Vec<String> = self
                .model_group1
                .chains
                .iter()
                .chain(self.model_group2.chains.iter())
                .cloned()
                .collect();
            let native_chains: Vec<String> = self
                .native_group1
                .chains
                .iter()
                .chain(self.native_group2.chains.iter())
                .cloned()
                .collect();
            align_model_to_native(&mut model, self.native, &model_chains, &native_chains)?;
        }

        let contacts = contact_stats(
            &model,
            self.native,
            &self.model_group1,
            &self.model_group2,
            &self.native_group1,
            &self.native_group2,
            self.options.contact_threshold(),
        )?;
        let fnat = contacts.fnat()?;
        let fnonnat = contacts.fnonnat()?;

        let interface = interface_correspondence(
            &model,
            self.native,
            &self.model_group1,
            &self.model_group2,
            &self.native_group1,
            &self.native_group2,
            self.options.interface_threshold(),
            self.options.interface_all_atom(),
        )?;

        let atom_names = self.options.superposition_atoms();
        let native_interface_atoms = selected_atom_coords(&interface.native, atom_names);
        let model_interface_atoms = selected_atom_coords(&interface.model, atom_names);
        if native_interface_atoms.len() != model_interface_atoms.len() {
            return Err(DockQError::StructuralPrecondition(format!(
                "different number of interface atoms in native and model: {} vs {}",
                native_interface_atoms.len(),
                model_interface_atoms.len()
            )));
        }
        let irms = superpose(&native_interface_atoms, &model_interface_atoms)?.rmsd;

        // Receptor is the larger model group; ties go to the group whose
        // chain ids sort first.
        let len1 = self.model_group1.residue_count(&model);
        let len2 = self.model_group2.residue_count(&model);
        let group1_is_receptor = match len1.cmp(&len2) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => self.model_group1.label() <= self.model_group2.label(),
        };
        let (receptor_model, receptor_native, ligand_model, ligand_native) = if group1_is_receptor {
            (
                &self.model_group1,
                &self.native_group1,
                &self.model_group2,
                &self.native_group2,
            )
        } else {
            (
                &self.model_group2,
                &self.native_group2,
                &self.model_group1,
                &self.native_group1,
            )
        };

        let (native_receptor_atoms, model_receptor_atoms) =
            paired_group_atoms(&model, self.native, receptor_model, receptor_native, atom_names)?;
        let receptor_fit = superpose(&native_receptor_atoms, &model_receptor_atoms)?;
        debug!(
            "Receptor {} fit over {} atoms, residual {:.3}",
            receptor_model,
            native_receptor_atoms.len(),
            receptor_fit.rmsd
        );

        let (native_ligand_atoms, model_ligand_atoms) =
            paired_group_atoms(&model, self.native, ligand_model, ligand_native, atom_names)?;
        let moved_ligand = receptor_fit.transform.apply_all(&model_ligand_atoms);
        let lrms = rmsd(&native_ligand_atoms, &moved_ligand)?;

        let dockq = dockq_score(fnat, irms, lrms);
        let (class1, class2) = if group1_is_receptor {
            (ChainRole::Receptor, ChainRole::Ligand)
        } else {
            (ChainRole::Ligand, ChainRole::Receptor)
        };

        Ok(ScoreResult {
            fnat,
            fnonnat,
            irms,
            lrms,
            dockq,
            contacts,
            group1: self.model_group1.label(),
            group2: self.model_group2.label(),
            len1,
            len2,
            class1,
            class2,
            capri: capri_class(fnat, irms, lrms, self.options.capri_peptide),
            capri_dockq: capri_class_from_dockq(dockq, self.options.capri_peptide),
        })
    }

    fn validate_groups(&self) -> Result<()> {
        for (group, structure, side) in [
            (&self.model_group1, self.model, "model"),
            (&self.model_group2, self.model, "model"),
            (&self.native_group1, self.native, "native"),
            (&self.native_group2, self.native, "native"),
        ] {
            if group.chains.is_empty() {
                return Err(DockQError::Configuration(format!(
                    "empty chain group on the {side} side"
                )));
            }
            for id in &group.chains {
                if structure.chain(id).is_none() {
                    return Err(DockQError::Configuration(format!(
                        "{side} structure has no chain {id}"
                    )));
                }
            }
        }
        for (a, b, side) in [
            (&self.model_group1, &self.model_group2, "model"),
            (&self.native_group1, &self.native_group2, "native"),
        ] {
            if a.chains.iter().any(|id| b.chains.contains(id)) {
                return Err(DockQError::Configuration(format!(
                    "overlapping {side} chain groups {a} and {b}"
                )));
            }
        }
        Ok(())
    }
}

/// Coordinates of the residues' atoms restricted to `names`, in residue
/// order then residue-internal atom order.
fn selected_atom_coords(residues: &[&Residue], names: &[&str]) -> Vec<na::Point3<f64>> {
    residues
        .iter()
        .flat_map(|res| {
            res.atoms
                .iter()
                .filter(|a| names.contains(&a.name.as_str()))
                .map(|a| a.coord)
        })
        .collect()
}

/// Positionally-corresponding native/model atom sets for one chain group,
/// pairing residues by native residue number.
///
/// The model was renumbered onto native numbering, so every model residue
/// must have a native counterpart; a missing counterpart or an overall
/// atom-count mismatch is fatal.
fn paired_group_atoms(
    model: &Structure,
    native: &Structure,
    model_group: &ChainGroup,
    native_group: &ChainGroup,
    names: &[&str],
) -> Result<(Vec<na::Point3<f64>>, Vec<na::Point3<f64>>)> {
    let mut native_atoms = Vec::new();
    let mut model_atoms = Vec::new();

    for (model_id, native_id) in model_group.chains.iter().zip(native_group.chains.iter()) {
        let model_chain = model.chain(model_id).ok_or_else(|| {
            DockQError::Configuration(format!("model structure has no chain {model_id}"))
        })?;
        let native_chain = native.chain(native_id).ok_or_else(|| {
            DockQError::Configuration(format!("native structure has no chain {native_id}"))
        })?;
        if model_chain.residues.is_empty() {
            return Err(DockQError::StructuralPrecondition(format!(
                "model chain {model_id} has zero length"
            )));
        }

        let by_number: HashMap<isize, &Residue> = native_chain
            .residues
            .iter()
            .map(|res| (res.number, res))
            .collect();
        for res in &model_chain.residues {
            let native_res = by_number.get(&res.number).ok_or_else(|| {
                DockQError::StructuralPrecondition(format!(
                    "model residue {} in chain {model_id} has no counterpart in native chain {native_id}",
                    res.number
                ))
            })?;
            model_atoms.extend(selected_atom_coords(&[res], names));
            native_atoms.extend(selected_atom_coords(&[*native_res], names));
        }
    }

    if native_atoms.len() != model_atoms.len() {
        return Err(DockQError::StructuralPrecondition(format!(
            "different number of atoms in native and model group {model_group}: {} vs {}",
            native_atoms.len(),
            model_atoms.len()
        )));
    }
    Ok((native_atoms, model_atoms))
}
