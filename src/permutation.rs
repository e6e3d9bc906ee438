//! Combinatorial search over ambiguous chain-to-chain correspondences.
//!
//! When a docking partner has several chains of the same kind, the model's
//! chain order may not match the native's. The search scores every
//! requested ordering of the model chain groups against the fixed native
//! order and keeps the assignment with the highest DockQ.
//!
//! Candidates are enumerated deterministically (group 1 orderings outer,
//! group 2 inner, standard permutation order) and evaluated in parallel on
//! private model copies; the reduction walks the results in enumeration
//! order with strict-greater-than replacement, so ties go to the first
//! candidate exactly as in a sequential run. Cost is O(n1!·n2!) full
//! pipeline evaluations — a documented scaling limit of the method.

use crate::complex::{DockingPair, ScoreOptions};
use crate::error::{DockQError, Result};
use crate::score::ScoreResult;
use crate::structure::{ChainGroup, Structure};
use itertools::Itertools;
use rayon::prelude::*;
use tracing::{info, warn};

/// DockQ of one successfully scored candidate assignment.
#[derive(Debug, Clone)]
pub struct CandidateScore {
    /// Ordering of the first model chain group, as a joined label.
    pub group1: String,
    /// Ordering of the second model chain group.
    pub group2: String,
    /// DockQ under this assignment.
    pub dockq: f64,
}

/// The best chain assignment found by [`permutation_search`].
#[derive(Debug, Clone)]
pub struct PermutationOutcome {
    /// Full metric set of the winning assignment.
    pub best: ScoreResult,
    /// Winning ordering of the first model chain group.
    pub model_group1: ChainGroup,
    /// Winning ordering of the second model chain group.
    pub model_group2: ChainGroup,
    /// Number of candidate assignments evaluated.
    pub evaluated: usize,
    /// Scores of the candidates that completed, in enumeration order.
    pub candidates: Vec<CandidateScore>,
    /// Human-readable description of the winning assignment.
    pub description: String,
}

/// Score every requested ordering of the model chain groups and return
/// the assignment maximizing DockQ.
///
/// A side whose flag is off contributes only the identity ordering. A
/// candidate whose pipeline fails is skipped with a warning; the search
/// itself fails only if every candidate does.
pub fn permutation_search(
    model: &Structure,
    native: &Structure,
    model_groups: (&ChainGroup, &ChainGroup),
    native_groups: (&ChainGroup, &ChainGroup),
    options: ScoreOptions,
    permute_group1: bool,
    permute_group2: bool,
) -> Result<PermutationOutcome> {
    let orderings1 = orderings(model_groups.0, permute_group1);
    let orderings2 = orderings(model_groups.1, permute_group2);

    let mut candidates = Vec::with_capacity(orderings1.len() * orderings2.len());
    for g1 in &orderings1 {
        for g2 in &orderings2 {
            candidates.push((g1.clone(), g2.clone()));
        }
    }
    let total = candidates.len();
    if total > 1 {
        info!("Starting chain order permutation search ({total} candidate orderings)");
    }

    let results: Vec<Result<ScoreResult>> = candidates
        .par_iter()
        .map(|(g1, g2)| {
            DockingPair::new(
                model,
                native,
                (g1.clone(), g2.clone()),
                (native_groups.0.clone(), native_groups.1.clone()),
                options,
            )
            .score()
        })
        .collect();

    let mut best: Option<(ScoreResult, &ChainGroup, &ChainGroup)> = None;
    let mut scored = Vec::with_capacity(total);
    for (index, ((g1, g2), result)) in candidates.iter().zip(results).enumerate() {
        match result {
            Ok(score) => {
                info!(
                    "{}/{} {} -> {} {:.3}",
                    index + 1,
                    total,
                    format_assignment(g1, g2),
                    format_assignment(native_groups.0, native_groups.1),
                    score.dockq
                );
                scored.push(CandidateScore {
                    group1: g1.label(),
                    group2: g2.label(),
                    dockq: score.dockq,
                });
                if best.as_ref().map_or(true, |(b, _, _)| score.dockq > b.dockq) {
                    best = Some((score, g1, g2));
                }
            }
            Err(e) => {
                warn!(
                    "Skipping chain ordering {}: {e}",
                    format_assignment(g1, g2)
                );
            }
        }
    }

    let (best, g1, g2) = best.ok_or_else(|| {
        DockQError::StructuralPrecondition(format!(
            "all {total} candidate chain orderings failed to score"
        ))
    })?;
    let description = format!(
        "Best score ( {} ) found for model -> native, group1: {} -> {}, group2: {} -> {}",
        best.dockq,
        g1.label(),
        native_groups.0.label(),
        g2.label(),
        native_groups.1.label()
    );
    Ok(PermutationOutcome {
        best,
        model_group1: g1.clone(),
        model_group2: g2.clone(),
        evaluated: total,
        candidates: scored,
        description,
    })
}

fn orderings(group: &ChainGroup, permute: bool) -> Vec<ChainGroup> {
    if permute {
        group
            .chains
            .iter()
            .cloned()
            .permutations(group.chains.len())
            .map(ChainGroup::new)
            .collect()
    } else {
        vec![group.clone()]
    }
}

fn format_assignment(g1: &ChainGroup, g2: &ChainGroup) -> String {
    format!("{}/{}", g1.label(), g2.label())
}
