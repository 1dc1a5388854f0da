use std::collections::HashMap;

use anyhow::{ensure, Context};
use rayon::prelude::*;
use tracing::{info, trace, warn};

use crate::classification::binding_domains::BindingDomainCurator;
use crate::classification::cascade::{BatchOutcome, Cascade, SequenceEvidence};
use crate::classification::classifier::{LinearModel, ProbabilisticClassifier};
use crate::classification::trivial::CharacteristicDomains;
use crate::config::PredictConfig;
use crate::data_handling::blast_hits::read_tabular_hits;
use crate::data_handling::fasta::{DatabaseLabels, LabelScheme};
use crate::features::domain_vector::ReferenceDomainList;
use crate::features::percentile::{PercentileFeatureGenerator, ScorePopulation};
use crate::features::TaskFeatures;
use crate::models::{DomainAnnotation, HitSet, SequenceRecord, Task};

/// Per-batch inputs from the external tools, keyed by sequence ID.
#[derive(Debug, Clone, Default)]
pub struct BatchEvidence {
    pub annotations: HashMap<String, DomainAnnotation>,
    pub tf_hits: HashMap<String, HitSet>,
    pub superclass_hits: HashMap<String, HitSet>,
}

/// Every static resource needed to classify a batch, loaded once.
pub struct Predictor {
    tf_features: TaskFeatures,
    superclass_features: TaskFeatures,
    characteristic: Option<CharacteristicDomains>,
    curator: BindingDomainCurator,
    tf_model: Box<dyn ProbabilisticClassifier>,
    superclass_model: Box<dyn ProbabilisticClassifier>,
}

impl Predictor {
    pub fn new(
        tf_features: TaskFeatures,
        superclass_features: TaskFeatures,
        characteristic: Option<CharacteristicDomains>,
        curator: BindingDomainCurator,
        tf_model: Box<dyn ProbabilisticClassifier>,
        superclass_model: Box<dyn ProbabilisticClassifier>,
    ) -> Self {
        Predictor {
            tf_features,
            superclass_features,
            characteristic,
            curator,
            tf_model,
            superclass_model,
        }
    }

    pub fn from_config(config: &PredictConfig) -> anyhow::Result<Self> {
        let files = &config.files;
        info!("Loading resources from {}", config.resource_dir.display());

        let tf_features = load_task_features(
            Task::TfClass,
            LabelScheme::TfNonTf,
            config,
            &files.relevant_domains_tf,
            &files.tf_database,
            &files.tf_population,
        )?;
        let superclass_features = load_task_features(
            Task::Superclass,
            LabelScheme::Superclass,
            config,
            &files.relevant_domains_superclass,
            &files.superclass_database,
            &files.superclass_population,
        )?;

        let characteristic = if config.use_characteristic_domains {
            let class_files: Vec<_> = files
                .characteristic_superclass_domains
                .iter()
                .map(|f| config.resource(f))
                .collect();
            Some(CharacteristicDomains::load(
                &config.resource(&files.characteristic_tf_domains),
                &class_files,
            )?)
        } else {
            info!("Characteristic domains disabled");
            None
        };

        let curator = BindingDomainCurator::load(
            &config.resource(&files.relevant_go_terms),
            &config.resource(&files.tf_name_to_class),
        )?;
        let tf_model = LinearModel::from_json_file(&config.resource(&files.tf_model))?;
        check_model(&tf_model, &tf_features, LabelScheme::TfNonTf)?;
        let superclass_model = LinearModel::from_json_file(&config.resource(&files.superclass_model))?;
        check_model(&superclass_model, &superclass_features, LabelScheme::Superclass)?;

        Ok(Self::new(
            tf_features,
            superclass_features,
            characteristic,
            curator,
            Box::new(tf_model),
            Box::new(superclass_model),
        ))
    }

    /// Assembles the cascade inputs of one sequence.
    pub fn evidence(&self, record: &SequenceRecord, batch: &BatchEvidence) -> SequenceEvidence {
        let annotation = batch.annotations.get(&record.id);
        let domain_ids: Vec<&str> = annotation.map(|a| a.domain_ids()).unwrap_or_default();
        let tf_features = self
            .tf_features
            .build(&record.id, batch.tf_hits.get(&record.id), &domain_ids);
        trace!(
            "{}: {} TF-relevant domain(s), features [{}]",
            record.id,
            self.tf_features.reference_domains.count_relevant(&domain_ids),
            tf_features.as_ref().map(|v| v.to_libsvm()).unwrap_or_default()
        );

        SequenceEvidence {
            sequence_id: record.id.clone(),
            tf_features,
            superclass_features: self.superclass_features.build(
                &record.id,
                batch.superclass_hits.get(&record.id),
                &domain_ids,
            ),
            superclass_fallback: Some(self.superclass_features.build_domain_only(&domain_ids)),
            binding: self.curator.curate(record, annotation),
            domain_ids: domain_ids.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn predict(&self, sequences: &[SequenceRecord], batch: &BatchEvidence) -> BatchOutcome {
        let evidence: Vec<SequenceEvidence> = sequences
            .par_iter()
            .map(|record| self.evidence(record, batch))
            .collect();

        let cascade = Cascade::new(
            self.tf_model.as_ref(),
            self.superclass_model.as_ref(),
            self.characteristic.as_ref(),
        );
        cascade.classify_batch(&evidence)
    }
}

fn load_task_features(
    task: Task,
    scheme: LabelScheme,
    config: &PredictConfig,
    domain_file: &std::path::Path,
    database: &std::path::Path,
    population: &std::path::Path,
) -> anyhow::Result<TaskFeatures> {
    let reference_domains = ReferenceDomainList::from_file(&config.resource(domain_file))?;
    let labels = DatabaseLabels::from_fasta(&config.resource(database), scheme)?;
    let all_vs_all = read_tabular_hits(&config.resource(population))
        .with_context(|| format!("Failed to load the {} score population", task))?;
    let population = ScorePopulation::from_hit_sets(&all_vs_all, &labels);
    if reference_domains.is_empty() {
        warn!("No reference domains for the {} task, domain block stays empty", task);
    }
    let class_sizes: Vec<String> = (0..population.num_classes())
        .map(|class| population.class_size(class).to_string())
        .collect();
    info!(
        "{} features: {} reference domains, population of {} sources, class sizes [{}]",
        task,
        reference_domains.len(),
        all_vs_all.len(),
        class_sizes.join(", ")
    );
    for class in 0..population.num_classes() {
        if population.class_size(class) == 0 {
            warn!("{} class {} has no reference scores, its percentiles are always 0", task, class);
        }
    }
    TaskFeatures::new(
        task,
        reference_domains,
        PercentileFeatureGenerator::new(labels, population),
        config.feature_offset,
    )
}

/// A model must read the task's feature layout and emit its labels in class
/// index order.
fn check_model(model: &LinearModel, features: &TaskFeatures, scheme: LabelScheme) -> anyhow::Result<()> {
    let task = features.task;
    ensure!(
        model.dimension() == features.dimension(),
        "{} model expects {} features, the {} layout has {}",
        task,
        model.dimension(),
        task,
        features.dimension()
    );
    ensure!(
        model.labels().len() == task.label_count(),
        "{} model has {} labels, expected {}",
        task,
        model.labels().len(),
        task.label_count()
    );
    for (index, label) in model.labels().iter().enumerate() {
        ensure!(
            scheme.parse(label) == Some(index),
            "{} model label {:?} at position {} is out of order",
            task,
            label,
            index
        );
    }
    Ok(())
}
