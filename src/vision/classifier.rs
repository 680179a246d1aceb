// src/vision/classifier.rs
//! Exported plant disease model: loading and single-image inference.
//!
//! A model export is two files side by side:
//! - `<name>.json`, the manifest: network config plus the ordered label list
//! - `<name>.mpk.gz`, the burn record written with `CompactRecorder`

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use burn::{
    module::Module,
    record::CompactRecorder,
    tensor::{Tensor, TensorData, backend::Backend},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::{
    model::{InferenceBackend, PlantClassifier, PlantClassifierConfig},
    preprocess::ImageTensor,
};

/// Extension `CompactRecorder` gives record files.
pub const RECORD_EXTENSION: &str = "mpk.gz";
/// Four 2x2 pools need at least this many pixels per side.
pub const MIN_INPUT_SIDE: usize = 16;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("model file not found: {0}")]
    NotFound(String),
    #[error("error loading model: {0}")]
    Load(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Top-1 prediction for one uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: String,
    /// Probability of `label` as a percentage in `[0, 100]`.
    pub confidence: f32,
    pub class_index: usize,
}

/// Anything that can turn a normalized tensor into a disease label.
pub trait Classifier: Send + Sync {
    /// Ordered label set fixed at export time.
    fn labels(&self) -> &[String];

    fn predict(&self, tensor: &ImageTensor) -> Result<PredictionResult, ClassifierError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelManifest {
    #[serde(default = "default_architecture")]
    pub architecture: String,
    pub config: PlantClassifierConfig,
    pub labels: Vec<String>,
}

fn default_architecture() -> String {
    "plant-cnn".to_string()
}

impl ModelManifest {
    fn validate(&self) -> Result<(), ClassifierError> {
        if self.labels.is_empty() {
            return Err(ClassifierError::Load("label list is empty".into()));
        }
        if self.labels.len() != self.config.num_classes {
            return Err(ClassifierError::Load(format!(
                "{} labels for a {}-class network",
                self.labels.len(),
                self.config.num_classes
            )));
        }
        Ok(())
    }
}

/// Path handed to the recorder, which appends its own extension.
fn record_stem(manifest_path: &Path) -> PathBuf {
    manifest_path.with_extension("")
}

pub fn record_path(manifest_path: &Path) -> PathBuf {
    manifest_path.with_extension(RECORD_EXTENSION)
}

/// Write a trained network and its labels as a loadable export.
pub fn export_model(
    model: PlantClassifier<InferenceBackend>,
    config: PlantClassifierConfig,
    labels: Vec<String>,
    manifest_path: &Path,
) -> Result<(), ClassifierError> {
    let manifest = ModelManifest { architecture: default_architecture(), config, labels };
    manifest.validate()?;

    if let Some(parent) = manifest_path.parent() {
        fs::create_dir_all(parent).map_err(|e| ClassifierError::Load(e.to_string()))?;
    }
    let json = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| ClassifierError::Load(e.to_string()))?;
    fs::write(manifest_path, json).map_err(|e| ClassifierError::Load(e.to_string()))?;

    model
        .save_file(record_stem(manifest_path), &CompactRecorder::new())
        .map_err(|e| ClassifierError::Load(format!("{e:?}")))
}

/// A model loaded from disk, immutable and shared across sessions.
#[derive(Debug)]
pub struct LoadedModel {
    // burn modules are Send but not Sync; forward passes take turns.
    model: Mutex<PlantClassifier<InferenceBackend>>,
    labels: Vec<String>,
    in_channels: usize,
}

impl LoadedModel {
    pub fn load(manifest_path: &Path) -> Result<Self, ClassifierError> {
        let raw = fs::read(manifest_path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                ClassifierError::NotFound(manifest_path.display().to_string())
            }
            _ => ClassifierError::Load(format!("{}: {e}", manifest_path.display())),
        })?;
        let manifest: ModelManifest = serde_json::from_slice(&raw)
            .map_err(|e| ClassifierError::Load(format!("{}: {e}", manifest_path.display())))?;
        manifest.validate()?;

        let record = record_path(manifest_path);
        if !record.exists() {
            return Err(ClassifierError::NotFound(record.display().to_string()));
        }

        let device = <InferenceBackend as Backend>::Device::default();
        let network = PlantClassifier::<InferenceBackend>::new(&manifest.config, &device)
            .load_file(record_stem(manifest_path), &CompactRecorder::new(), &device)
            .map_err(|e| ClassifierError::Load(format!("{}: {e:?}", record.display())))?;

        info!(
            path = %manifest_path.display(),
            architecture = %manifest.architecture,
            classes = manifest.labels.len(),
            "model loaded"
        );
        Self::from_parts(network, &manifest.config, manifest.labels)
    }

    /// Wrap an in-memory network.
    pub fn from_parts(
        network: PlantClassifier<InferenceBackend>,
        config: &PlantClassifierConfig,
        labels: Vec<String>,
    ) -> Result<Self, ClassifierError> {
        if labels.is_empty() || labels.len() != config.num_classes {
            return Err(ClassifierError::Load(format!(
                "{} labels for a {}-class network",
                labels.len(),
                config.num_classes
            )));
        }
        Ok(Self {
            model: Mutex::new(network),
            labels,
            in_channels: config.in_channels,
        })
    }
}

impl Classifier for LoadedModel {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn predict(&self, tensor: &ImageTensor) -> Result<PredictionResult, ClassifierError> {
        let [channels, height, width] = tensor.shape();
        if channels != self.in_channels || height < MIN_INPUT_SIDE || width < MIN_INPUT_SIDE {
            return Err(ClassifierError::Inference(format!(
                "tensor shape {:?} not accepted by the network",
                tensor.shape()
            )));
        }

        let device = <InferenceBackend as Backend>::Device::default();
        let input = Tensor::<InferenceBackend, 4>::from_data(
            TensorData::new(tensor.as_slice().to_vec(), [1, channels, height, width]),
            &device,
        );

        let output = {
            let network = self
                .model
                .lock()
                .map_err(|_| ClassifierError::Inference("model lock poisoned".into()))?;
            network.forward_softmax(input)
        };
        let probabilities: Vec<f32> = output
            .into_data()
            .to_vec()
            .map_err(|e| ClassifierError::Inference(format!("{e:?}")))?;

        let (class_index, &probability) = probabilities
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| f32::total_cmp(a, b))
            .ok_or_else(|| ClassifierError::Inference("model produced no scores".into()))?;

        if !probability.is_finite() {
            return Err(ClassifierError::Inference("class scores are not finite".into()));
        }
        let label = self
            .labels
            .get(class_index)
            .cloned()
            .ok_or_else(|| ClassifierError::Inference(format!("class {class_index} has no label")))?;

        let confidence = (probability * 100.0).clamp(0.0, 100.0);
        debug!(%label, confidence, "prediction");

        Ok(PredictionResult { label, confidence, class_index })
    }
}
