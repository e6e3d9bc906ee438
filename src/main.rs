use clap::Parser;
use dockq::{
    load_structure, permutation_search, resolve_chain_groups, run_with_threads, write_df_to_file,
    CandidateScore, DataFrameFileType, GroupOverrides, PermutationOutcome, Result, ScoreOptions,
    ScoreResult,
};
use polars::prelude::*;
use std::path::PathBuf;
use tracing::{debug, error, warn};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

/// DockQ - quality measure for protein-protein docking models
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the model structure (PDB or mmCIF)
    model: PathBuf,

    /// Path to the native structure (PDB or mmCIF)
    native: PathBuf,

    /// Superpose on CA atoms only instead of the full backbone
    #[arg(long = "use-ca")]
    use_ca: bool,

    /// CAPRI peptide mode: contacts below 4 Å, interface below 8 Å on CB
    /// atoms, peptide classification table. DockQ itself is not
    /// reoptimized for peptides
    #[arg(long = "capri-peptide")]
    capri_peptide: bool,

    /// Skip the alignment-based renumbering of model chains; use only when
    /// model and native numbering are known to be identical
    #[arg(long = "no-align")]
    no_align: bool,

    /// Skip the initial chain-count check
    #[arg(long = "skip-check")]
    skip_check: bool,

    /// Try all orderings of the first chain group (n! pipeline runs,
    /// multiplied by --perm2 when both are set)
    #[arg(long)]
    perm1: bool,

    /// Try all orderings of the second chain group
    #[arg(long)]
    perm2: bool,

    /// Model chains grouped as docking partner 1, in correspondence order
    #[arg(long = "model-chain1", num_args = 1..)]
    model_chain1: Option<Vec<String>>,

    /// Model chains grouped as docking partner 2 (complement of partner 1
    /// if not given)
    #[arg(long = "model-chain2", num_args = 1..)]
    model_chain2: Option<Vec<String>>,

    /// Native chains grouped as docking partner 1
    #[arg(long = "native-chain1", num_args = 1..)]
    native_chain1: Option<Vec<String>>,

    /// Native chains grouped as docking partner 2 (complement of partner 1
    /// if not given)
    #[arg(long = "native-chain2", num_args = 1..)]
    native_chain2: Option<Vec<String>>,

    /// Print a single-line summary instead of the full report
    #[arg(short, long)]
    short: bool,

    /// Directory for the score table; nothing is written when unset
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Name of the output file
    #[arg(short = 'f', long = "filename", default_value_t = String::from("dockq"))]
    filename: String,

    /// Output file type
    #[arg(short = 't', long, default_value_t = DataFrameFileType::Csv)]
    output_format: DataFrameFileType,

    /// Number of threads for the permutation search (0 = all cores)
    #[arg(short = 'j', long = "num-threads", default_value_t = 0)]
    num_threads: usize,

    /// Verbosity of the program:
    /// -v for info, -vv for debug, and -vvv for trace
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all logging
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let args = Args::parse();
    setup_logging(args.verbose, args.quiet);

    if let Err(e) = run(&args) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn setup_logging(verbosity: u8, quiet: bool) {
    let level_filter = if quiet {
        LevelFilter::OFF
    } else {
        match verbosity {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(level_filter)
        .with(stderr_layer)
        .init();
}

fn run(args: &Args) -> Result<()> {
    debug!("{args:?}");

    let (mut model, model_warnings) = load_structure(&args.model.to_string_lossy())?;
    log_parser_warnings(&model_warnings);
    let (mut native, native_warnings) = load_structure(&args.native.to_string_lossy())?;
    log_parser_warnings(&native_warnings);

    let model_chains = model.chain_ids();
    let native_chains = native.chain_ids();
    if !args.skip_check && (model_chains.len() < 2 || native_chains.len() < 2) {
        return Err(dockq::DockQError::Configuration(
            "need at least two chains in both the model and the native structure".to_string(),
        ));
    }

    let overrides = GroupOverrides {
        model_chain1: args.model_chain1.clone(),
        model_chain2: args.model_chain2.clone(),
        native_chain1: args.native_chain1.clone(),
        native_chain2: args.native_chain2.clone(),
    };
    let ((group1, group2), (nat_group1, nat_group2)) =
        resolve_chain_groups(&model_chains, &native_chains, &overrides)?;
    debug!(
        "Model groups {group1}/{group2}; native groups {nat_group1}/{nat_group2}"
    );

    let keep_model: Vec<String> = group1
        .chains
        .iter()
        .chain(group2.chains.iter())
        .cloned()
        .collect();
    let keep_native: Vec<String> = nat_group1
        .chains
        .iter()
        .chain(nat_group2.chains.iter())
        .cloned()
        .collect();
    model.retain_chains(&keep_model);
    native.retain_chains(&keep_native);

    let options = ScoreOptions {
        ca_only: args.use_ca,
        capri_peptide: args.capri_peptide,
        skip_alignment: args.no_align,
    };
    let outcome = run_with_threads(args.num_threads, || {
        permutation_search(
            &model,
            &native,
            (&group1, &group2),
            (&nat_group1, &nat_group2),
            options,
            args.perm1,
            args.perm2,
        )
    })?;

    report(args, &outcome);

    if let Some(output_dir) = &args.output {
        write_score_tables(args, output_dir, &outcome);
    }

    Ok(())
}

fn log_parser_warnings(warnings: &[pdbtbx::PDBError]) {
    for e in warnings {
        match e.level() {
            pdbtbx::ErrorLevel::BreakingError => error!("{e}"),
            pdbtbx::ErrorLevel::InvalidatingError => error!("{e}"),
            _ => warn!("{e}"),
        }
    }
}

fn report(args: &Args, outcome: &PermutationOutcome) {
    let result = &outcome.best;
    let label = if args.capri_peptide {
        "DockQ-capri_peptide"
    } else {
        "DockQ"
    };

    if args.short {
        println!(
            "{label} {:.3} Fnat {:.3} iRMS {:.3} LRMS {:.3} Fnonnat {:.3} CAPRI {} {} {}",
            result.dockq,
            result.fnat,
            result.irms,
            result.lrms,
            result.fnonnat,
            result.capri,
            args.model.display(),
            args.native.display(),
        );
        return;
    }

    println!("Model  : {}", args.model.display());
    println!("Native : {}", args.native.display());
    if outcome.evaluated > 1 {
        println!("{}", outcome.description);
    }
    println!(
        "Number of equivalent residues in chain {} {} ({})",
        result.group1, result.len1, result.class1
    );
    println!(
        "Number of equivalent residues in chain {} {} ({})",
        result.group2, result.len2, result.class2
    );
    println!(
        "Fnat {:.3} {} correct of {} native contacts",
        result.fnat, result.contacts.shared, result.contacts.native_total
    );
    println!(
        "Fnonnat {:.3} {} non-native of {} model contacts",
        result.fnonnat, result.contacts.non_native, result.contacts.model_total
    );
    println!("iRMS {:.3}", result.irms);
    println!("LRMS {:.3}", result.lrms);
    println!("CAPRI {}", result.capri);
    println!("CAPRI-from-DockQ {}", result.capri_dockq);
    let disclaimer = if args.capri_peptide {
        " DockQ not reoptimized for CAPRI peptide evaluation"
    } else {
        ""
    };
    println!("{label} {:.3}{disclaimer}", result.dockq);
}

fn write_score_tables(args: &Args, output_dir: &PathBuf, outcome: &PermutationOutcome) {
    let _ = std::fs::create_dir_all(output_dir);

    let mut df = result_to_df(&outcome.best);
    let output_file = output_dir
        .join(&args.filename)
        .with_extension(args.output_format.to_string());
    write_df_to_file(&mut df, &output_file, args.output_format);
    debug!("Score table saved to {}", output_file.display());

    if outcome.evaluated > 1 {
        let mut df = candidates_to_df(&outcome.candidates);
        let perm_file = output_dir
            .join(format!("{}_permutations", args.filename))
            .with_extension(args.output_format.to_string());
        write_df_to_file(&mut df, &perm_file, args.output_format);
        debug!("Permutation table saved to {}", perm_file.display());
    }
}

fn result_to_df(result: &ScoreResult) -> DataFrame {
    df!(
        "model_group1" => [result.group1.clone()],
        "model_group2" => [result.group2.clone()],
        "len1" => [result.len1 as u32],
        "len2" => [result.len2 as u32],
        "class1" => [result.class1.to_string()],
        "class2" => [result.class2.to_string()],
        "fnat" => [result.fnat],
        "fnonnat" => [result.fnonnat],
        "irms" => [result.irms],
        "lrms" => [result.lrms],
        "dockq" => [result.dockq],
        "capri" => [result.capri.to_string()],
        "capri_dockq" => [result.capri_dockq.to_string()],
    )
    .unwrap()
}

fn candidates_to_df(candidates: &[CandidateScore]) -> DataFrame {
    df!(
        "model_group1" => candidates.iter().map(|c| c.group1.clone()).collect::<Vec<String>>(),
        "model_group2" => candidates.iter().map(|c| c.group2.clone()).collect::<Vec<String>>(),
        "dockq" => candidates.iter().map(|c| c.dockq).collect::<Vec<f64>>(),
    )
    .unwrap()
    .lazy()
    .sort(
        ["dockq"],
        SortMultipleOptions::default().with_order_descending(true),
    )
    .collect()
    .unwrap()
}
