//! Mapping of model residues onto native numbering via local sequence
//! alignment.
//!
//! Model and native chains frequently disagree on residue numbering
//! (renumbered files, missing loops, expression tags). Each model chain is
//! locally aligned against its native counterpart and every model residue
//! is either relabeled with the native number it aligns to or dropped when
//! it has no native equivalent.

use crate::error::{DockQError, Result};
use crate::structure::{Chain, Structure};
use bio::alignment::pairwise::Aligner;
use bio::alignment::AlignmentOperation;
use tracing::debug;

/// Alignment parameters: match 5, mismatch 0, gap open −10, gap extend −1.
///
/// rust-bio charges `gap_open + gap_extend` for the first base of a gap,
/// so −9/−1 here reproduces a −10/−1 affine gap model.
const MATCH: i32 = 5;
const MISMATCH: i32 = 0;
const GAP_OPEN: i32 = -9;
const GAP_EXTEND: i32 = -1;

/// Per-position mapping of a model chain onto native residue numbers.
///
/// One entry per model residue; `None` marks a residue with no native
/// equivalent, which [`apply_mapping`] removes from the chain.
pub type AlignmentMapping = Vec<Option<isize>>;

/// Align a model chain sequence against its native counterpart and derive,
/// for every model position, the native residue number it aligns to.
///
/// Positions that align to a gap in the native sequence, or that fall
/// outside the locally aligned span, map to `None`. Empty input on either
/// side is a fatal precondition.
pub fn map_to_native_numbering(
    model_seq: &str,
    native_seq: &str,
    native_numbering: &[isize],
) -> Result<AlignmentMapping> {
    if model_seq.is_empty() || native_seq.is_empty() {
        return Err(DockQError::StructuralPrecondition(
            "cannot align an empty chain sequence".to_string(),
        ));
    }
    if native_seq.len() != native_numbering.len() {
        return Err(DockQError::StructuralPrecondition(format!(
            "native sequence length {} does not match its numbering length {}",
            native_seq.len(),
            native_numbering.len()
        )));
    }

    let x = model_seq.as_bytes();
    let y = native_seq.as_bytes();
    let score = |a: u8, b: u8| if a == b { MATCH } else { MISMATCH };
    let mut aligner = Aligner::with_capacity(x.len(), y.len(), GAP_OPEN, GAP_EXTEND, score);
    let alignment = aligner.local(x, y);

    let mut mapping: AlignmentMapping = vec![None; x.len()];
    let mut xi = alignment.xstart;
    let mut yi = alignment.ystart;
    for op in &alignment.operations {
        match op {
            AlignmentOperation::Match | AlignmentOperation::Subst => {
                mapping[xi] = Some(native_numbering[yi]);
                xi += 1;
                yi += 1;
            }
            // Model residue opposite a native gap: no native equivalent.
            AlignmentOperation::Ins => xi += 1,
            AlignmentOperation::Del => yi += 1,
            // Clipped ends are already accounted for by xstart/ystart.
            AlignmentOperation::Xclip(_) | AlignmentOperation::Yclip(_) => {}
        }
    }

    Ok(mapping)
}

/// Apply a mapping to a chain: residues mapped to `None` are removed, the
/// rest are relabeled with their native numbers.
///
/// Returns the number of residues dropped.
pub fn apply_mapping(chain: &mut Chain, mapping: &AlignmentMapping) -> Result<usize> {
    if mapping.len() != chain.residues.len() {
        return Err(DockQError::StructuralPrecondition(format!(
            "mapping length {} does not match chain {} residue count {}",
            mapping.len(),
            chain.id,
            chain.residues.len()
        )));
    }

    let before = chain.residues.len();
    let mut kept = Vec::with_capacity(before);
    for (mut residue, mapped) in chain.residues.drain(..).zip(mapping.iter()) {
        if let Some(number) = mapped {
            residue.number = *number;
            kept.push(residue);
        }
    }
    chain.residues = kept;
    Ok(before - chain.residues.len())
}

/// Renumber every model chain onto its positionally-corresponding native
/// chain, dropping model residues without a native equivalent.
pub fn align_model_to_native(
    model: &mut Structure,
    native: &Structure,
    model_chains: &[String],
    native_chains: &[String],
) -> Result<()> {
    for (model_id, native_id) in model_chains.iter().zip(native_chains.iter()) {
        let native_chain = native.chain(native_id).ok_or_else(|| {
            DockQError::Configuration(format!("native structure has no chain {native_id}"))
        })?;
        let native_seq = native_chain.sequence();
        let native_numbering = native_chain.numbering();

        let model_chain = model.chain(model_id).ok_or_else(|| {
            DockQError::Configuration(format!("model structure has no chain {model_id}"))
        })?;
        let model_seq = model_chain.sequence();

        let mapping = map_to_native_numbering(&model_seq, &native_seq, &native_numbering)
            .map_err(|e| DockQError::Alignment {
                model_chain: model_id.clone(),
                native_chain: native_id.clone(),
                message: e.to_string(),
            })?;

        let chain = model.chain_mut(model_id).unwrap();
        let dropped = apply_mapping(chain, &mapping)?;
        if dropped > 0 {
            debug!(
                "Dropped {dropped} residue(s) from model chain {model_id} with no equivalent in native chain {native_id}"
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{Atom, Residue};

    fn mapping(model: &str, native: &str, numbering: &[isize]) -> AlignmentMapping {
        map_to_native_numbering(model, native, numbering).unwrap()
    }

    #[test]
    fn identical_sequences_map_to_identity() {
        let numbering: Vec<isize> = (1..=6).collect();
        let m = mapping("ACDEFG", "ACDEFG", &numbering);
        assert_eq!(m, vec![Some(1), Some(2), Some(3), Some(4), Some(5), Some(6)]);
    }

    #[test]
    fn native_numbering_is_carried_over() {
        let numbering = vec![101, 102, 105, 106, 110, 111];
        let m = mapping("ACDEFG", "ACDEFG", &numbering);
        assert_eq!(m, vec![Some(101), Some(102), Some(105), Some(106), Some(110), Some(111)]);
    }

    #[test]
    fn model_overhang_has_no_native_equivalent() {
        let numbering: Vec<isize> = (1..=6).collect();
        let m = mapping("MACDEFG", "ACDEFG", &numbering);
        assert_eq!(m[0], None);
        assert_eq!(&m[1..], &[Some(1), Some(2), Some(3), Some(4), Some(5), Some(6)]);
    }

    #[test]
    fn model_gap_skips_native_numbers() {
        // Model is missing the native E at position 4.
        let numbering: Vec<isize> = (1..=9).collect();
        let m = mapping("ACDFGHIK", "ACDEFGHIK", &numbering);
        assert_eq!(
            m,
            vec![Some(1), Some(2), Some(3), Some(5), Some(6), Some(7), Some(8), Some(9)]
        );
    }

    #[test]
    fn model_insertion_maps_to_none() {
        let numbering: Vec<isize> = (1..=6).collect();
        let m = mapping("ACDWEFG", "ACDEFG", &numbering);
        assert_eq!(
            m,
            vec![Some(1), Some(2), Some(3), None, Some(4), Some(5), Some(6)]
        );
    }

    #[test]
    fn empty_sequences_are_fatal() {
        assert!(map_to_native_numbering("", "ACD", &[1, 2, 3]).is_err());
        assert!(map_to_native_numbering("ACD", "", &[]).is_err());
    }

    fn chain_of(ids: &[(isize, &str)]) -> Chain {
        Chain {
            id: "A".to_string(),
            residues: ids
                .iter()
                .map(|(n, name)| Residue {
                    number: *n,
                    name: name.to_string(),
                    atoms: vec![Atom::new("CA", 0.0, 0.0, 0.0)],
                })
                .collect(),
        }
    }

    #[test]
    fn apply_mapping_renumbers_and_prunes() {
        let mut chain = chain_of(&[(1, "MET"), (2, "ALA"), (3, "CYS")]);
        let dropped = apply_mapping(&mut chain, &vec![None, Some(7), Some(8)]).unwrap();
        assert_eq!(dropped, 1);
        assert_eq!(chain.numbering(), vec![7, 8]);
        assert_eq!(chain.residues[0].name, "ALA");
    }

    #[test]
    fn apply_mapping_length_mismatch_is_fatal() {
        let mut chain = chain_of(&[(1, "ALA")]);
        assert!(apply_mapping(&mut chain, &vec![Some(1), Some(2)]).is_err());
    }

    #[test]
    fn whole_structure_roundtrip_is_identity_for_identical_chains() {
        let native = Structure {
            chains: vec![chain_of(&[(11, "ALA"), (12, "GLY"), (13, "SER"), (14, "THR")])],
        };
        let mut model = Structure {
            chains: vec![chain_of(&[(1, "ALA"), (2, "GLY"), (3, "SER"), (4, "THR")])],
        };
        align_model_to_native(
            &mut model,
            &native,
            &["A".to_string()],
            &["A".to_string()],
        )
        .unwrap();
        assert_eq!(model.chains[0].numbering(), vec![11, 12, 13, 14]);
        assert_eq!(model.chains[0].residues.len(), 4);
    }
}
