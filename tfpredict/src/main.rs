use anyhow::bail;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::classification::pipeline::{BatchEvidence, Predictor};
use crate::cli::Args;
use crate::config::PredictConfig;
use crate::data_handling::fasta::read_query_fasta;
use crate::models::SequenceRecord;
use crate::prediction_tools::interproscan::InterProScan;
use crate::prediction_tools::psiblast::{PsiBlast, PsiBlastOptions};
use crate::prediction_tools::{DomainAnnotator, HomologySearch, InterProScanTsv, TabularHits};

mod classification;
mod cli;
mod config;
mod data_handling;
mod errors;
mod features;
mod helper_functions;
mod models;
mod output;
mod prediction_tools;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    args.check()?;

    let mut config = match &args.config {
        Some(path) => PredictConfig::from_json_file(path)?,
        None => PredictConfig::default(),
    };
    args.apply(&mut config);

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()?;

    info!("Starting TF prediction");
    let sequences = read_query_fasta(&args.fasta)?;
    if let Some(max) = config.max_batch_sequences {
        if sequences.len() > max {
            bail!("{} sequences submitted, at most {} are allowed per batch", sequences.len(), max);
        }
    }

    let predictor = Predictor::from_config(&config)?;
    let evidence = collect_evidence(&args, &config, &sequences)?;
    let outcome = predictor.predict(&sequences, &evidence);

    output::log_summary(&outcome);
    output::write_report_to(args.out.as_deref(), &outcome)?;
    Ok(())
}

/// Domain annotations and homology hits, from precomputed files where given,
/// otherwise from the local tools.
fn collect_evidence(
    args: &Args,
    config: &PredictConfig,
    sequences: &[SequenceRecord],
) -> anyhow::Result<BatchEvidence> {
    let annotator: Box<dyn DomainAnnotator> = match &args.interpro_tsv {
        Some(path) => Box::new(InterProScanTsv { path: path.clone() }),
        None => Box::new(InterProScan::new(
            config.iprscan_path.as_deref(),
            config.work_dir.clone(),
        )?),
    };
    let annotations = annotator.annotate(sequences)?;

    let (tf_search, superclass_search): (Box<dyn HomologySearch>, Box<dyn HomologySearch>) =
        match (&args.tf_hits, &args.superclass_hits) {
            (Some(tf), Some(superclass)) => (
                Box::new(TabularHits { path: tf.clone() }),
                Box::new(TabularHits { path: superclass.clone() }),
            ),
            _ => {
                let psiblast = |database: &std::path::Path| {
                    PsiBlast::new(PsiBlastOptions {
                        blast_dir: config.blast_dir(),
                        database: config.resource(database),
                        iterations: config.blast_iterations,
                        work_dir: config.work_dir.clone(),
                        threads: args.threads,
                    })
                };
                (
                    Box::new(psiblast(&config.files.tf_database)?),
                    Box::new(psiblast(&config.files.superclass_database)?),
                )
            }
        };

    Ok(BatchEvidence {
        annotations,
        tf_hits: tf_search.search(sequences)?,
        superclass_hits: superclass_search.search(sequences)?,
    })
}
