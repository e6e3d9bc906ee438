//! Structure loading and output plumbing.

use crate::error::{DockQError, Result};
use crate::structure::{Atom, Chain, ChainGroup, Residue, Structure};
use polars::prelude::*;
use std::path::Path;
use tracing::debug;

/// Open an atomic data file with [`pdbtbx`] and convert the first model
/// into the crate's structure types, dropping non-amino-acid residues.
///
/// Parser warnings are returned alongside the structure so the caller can
/// decide how loudly to report them; breaking parse failures become a
/// [`DockQError::StructureLoad`].
pub fn load_structure(input_file: &str) -> Result<(Structure, Vec<pdbtbx::PDBError>)> {
    let (pdb, warnings) = pdbtbx::ReadOptions::default()
        .set_only_atomic_coords(true)
        .set_level(pdbtbx::StrictnessLevel::Loose)
        .read(input_file)
        .map_err(|errors| DockQError::StructureLoad {
            path: input_file.to_string(),
            message: errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        })?;

    let model = pdb.models().next().ok_or_else(|| DockQError::StructureLoad {
        path: input_file.to_string(),
        message: "file contains no model".to_string(),
    })?;

    let mut structure = Structure::default();
    for chain in model.chains() {
        let residues: Vec<Residue> = chain
            .residues()
            .map(|res| Residue {
                number: res.serial_number(),
                name: res.name().unwrap_or("").to_string(),
                atoms: res
                    .atoms()
                    .map(|atom| {
                        let (x, y, z) = atom.pos();
                        Atom::new(atom.name(), x, y, z)
                    })
                    .collect(),
            })
            // Water, ligands and other non-protein residues don't take
            // part in the scoring.
            .filter(|res| res.one_letter().is_some())
            .collect();
        structure.chains.push(Chain {
            id: chain.id().to_string(),
            residues,
        });
    }
    debug!(
        "Loaded {} chain(s) from {input_file}",
        structure.chains.len()
    );

    Ok((structure, warnings))
}

/// Explicit chain-group selections from the command line.
///
/// Unset fields fall back the way the reference tool does: partner 2
/// defaults to the complement of partner 1, and an unset side mirrors the
/// other side's grouping.
#[derive(Debug, Clone, Default)]
pub struct GroupOverrides {
    /// Model chains of the first docking partner.
    pub model_chain1: Option<Vec<String>>,
    /// Model chains of the second docking partner.
    pub model_chain2: Option<Vec<String>>,
    /// Native chains of the first docking partner.
    pub native_chain1: Option<Vec<String>>,
    /// Native chains of the second docking partner.
    pub native_chain2: Option<Vec<String>>,
}

impl GroupOverrides {
    fn is_empty(&self) -> bool {
        self.model_chain1.is_none() && self.native_chain1.is_none()
    }
}

/// Resolve the model and native chain groups from the structures' chain
/// lists and the caller's explicit selections.
///
/// Structures with more than two chains on either side need an explicit
/// grouping; two-chain inputs default to a positional 1-1 pairing.
pub fn resolve_chain_groups(
    model_chains: &[String],
    native_chains: &[String],
    overrides: &GroupOverrides,
) -> Result<((ChainGroup, ChainGroup), (ChainGroup, ChainGroup))> {
    if (model_chains.len() > 2 || native_chains.len() > 2) && overrides.is_empty() {
        return Err(DockQError::Configuration(format!(
            "structures with more than two chains need explicit groups \
             (model chains {model_chains:?}, native chains {native_chains:?}); \
             use --model-chain1 and/or --native-chain1"
        )));
    }

    let (mut group1, mut group2) = match &overrides.model_chain1 {
        Some(chains) => {
            let g1 = chains.clone();
            let g2 = overrides
                .model_chain2
                .clone()
                .unwrap_or_else(|| complement(model_chains, &g1));
            (g1, g2)
        }
        None => first_two(model_chains, "model")?,
    };

    let (nat_group1, nat_group2) = match &overrides.native_chain1 {
        Some(chains) => {
            let n1 = chains.clone();
            let n2 = overrides
                .native_chain2
                .clone()
                .unwrap_or_else(|| complement(native_chains, &n1));
            // Without a model-side selection the model mirrors the native
            // grouping.
            if overrides.model_chain1.is_none() {
                group1 = n1.clone();
                group2 = n2.clone();
            }
            (n1, n2)
        }
        None => match &overrides.model_chain1 {
            Some(_) => (group1.clone(), group2.clone()),
            None => first_two(native_chains, "native")?,
        },
    };

    Ok((
        (ChainGroup::new(group1), ChainGroup::new(group2)),
        (ChainGroup::new(nat_group1), ChainGroup::new(nat_group2)),
    ))
}

fn first_two(chains: &[String], side: &str) -> Result<(Vec<String>, Vec<String>)> {
    if chains.len() < 2 {
        return Err(DockQError::Configuration(format!(
            "{side} structure has fewer than two chains"
        )));
    }
    Ok((vec![chains[0].clone()], vec![chains[1].clone()]))
}

fn complement(all: &[String], taken: &[String]) -> Vec<String> {
    all.iter().filter(|c| !taken.contains(c)).cloned().collect()
}

/// Run `f` on a rayon pool with the given thread count; 0 means use all
/// available cores.
pub fn run_with_threads<T: Send>(num_threads: usize, f: impl FnOnce() -> T + Send) -> T {
    match num_threads {
        0 => f(),
        n => rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()
            .expect("failed to build rayon thread pool")
            .install(f),
    }
}

/// File format for writing DataFrames.
#[derive(clap::ValueEnum, Clone, Debug, Copy)]
pub enum DataFrameFileType {
    /// Comma-separated values
    Csv,
    /// Parquet columnar storage
    Parquet,
    /// Standard JSON
    Json,
    /// Newline-delimited JSON
    NDJson,
}

impl std::fmt::Display for DataFrameFileType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DataFrameFileType::Csv => write!(f, "csv"),
            DataFrameFileType::Parquet => write!(f, "parquet"),
            DataFrameFileType::Json => write!(f, "json"),
            DataFrameFileType::NDJson => write!(f, "ndjson"),
        }
    }
}

/// Write a DataFrame to a file in the requested format.
pub fn write_df_to_file(df: &mut DataFrame, file_path: &Path, file_type: DataFrameFileType) {
    let file_suffix = file_type.to_string();
    let mut file = std::fs::File::create(file_path.with_extension(file_suffix)).unwrap();
    match file_type {
        DataFrameFileType::Csv => {
            CsvWriter::new(&mut file).finish(df).unwrap();
        }
        DataFrameFileType::Parquet => {
            ParquetWriter::new(&mut file).finish(df).unwrap();
        }
        DataFrameFileType::Json => {
            JsonWriter::new(&mut file)
                .with_json_format(JsonFormat::Json)
                .finish(df)
                .unwrap();
        }
        DataFrameFileType::NDJson => {
            JsonWriter::new(&mut file)
                .with_json_format(JsonFormat::JsonLines)
                .finish(df)
                .unwrap();
        }
    }
}
