// src/vision/mod.rs
pub mod classifier;
pub mod model;
pub mod preprocess;

pub use classifier::{
    Classifier, ClassifierError, LoadedModel, ModelManifest, PredictionResult, export_model,
    record_path,
};
pub use model::{InferenceBackend, PlantClassifier, PlantClassifierConfig};
pub use preprocess::{ImageTensor, PreprocessError, preprocess_image};
