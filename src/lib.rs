#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

//! # DockQ Library
//!
//! This library scores protein-protein docking models against a native
//! reference complex. It computes the fraction of native contacts (Fnat),
//! the fraction of non-native model contacts (Fnonnat), the interface and
//! ligand RMSDs (iRMS, LRMS), the combined DockQ score and the CAPRI
//! quality class, with optional permutation search over ambiguous
//! chain-to-chain correspondences.
//!
//! The typical entry points are [`load_structure`] to read the inputs,
//! [`resolve_chain_groups`] to pick the docking partners, and either
//! [`DockingPair::score`] for a fixed chain assignment or
//! [`permutation_search`] to explore chain orderings.

pub mod align;
pub mod complex;
pub mod contacts;
pub mod error;
pub mod permutation;
pub mod score;
pub mod structure;
pub mod superpose;
pub mod utils;

// Re-export key public types
pub use align::{align_model_to_native, apply_mapping, map_to_native_numbering, AlignmentMapping};
pub use complex::{DockingPair, ScoreOptions, BACKBONE_ATOMS, CA_ONLY_ATOMS};
pub use contacts::{
    contact_stats, interface_correspondence, residue_distance_matrix, ContactStats,
    InterfaceCorrespondence,
};
pub use error::{DockQError, Result};
pub use permutation::{permutation_search, CandidateScore, PermutationOutcome};
pub use score::{
    capri_class, capri_class_from_dockq, dockq_score, CapriClass, ChainRole, ScoreResult,
};
pub use structure::{Atom, Chain, ChainGroup, Residue, Structure};
pub use superpose::{rmsd, superpose, Superposition, Transform};
pub use utils::{
    load_structure, resolve_chain_groups, run_with_threads, write_df_to_file, DataFrameFileType,
    GroupOverrides,
};
