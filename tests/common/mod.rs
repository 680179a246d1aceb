#![allow(dead_code)]

use std::{io::Cursor, path::Path, sync::Arc};

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tokio::sync::Mutex;

use leaf_doctor::{
    services::advisor::AdviceService,
    vision::{InferenceBackend, LoadedModel, PlantClassifier, PlantClassifierConfig, export_model},
};

pub const LABELS: [&str; 3] = ["Apple Scab", "Tomato Early Blight", "Tomato Healthy"];

/// Advisor double that records every prompt it receives.
#[derive(Clone, Default)]
pub struct RecordingAdvisor {
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl RecordingAdvisor {
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl AdviceService for RecordingAdvisor {
    async fn ask(&self, prompt: &str) -> String {
        self.prompts.lock().await.push(prompt.to_string());
        format!("advice #{}", self.prompts.lock().await.len())
    }
}

/// Small untrained network over `LABELS`; enough to exercise the full path.
pub fn network() -> (PlantClassifier<InferenceBackend>, PlantClassifierConfig) {
    let config = PlantClassifierConfig::new(LABELS.len()).with_base_filters(4);
    let network = PlantClassifier::new(&config, &Default::default());
    (network, config)
}

pub fn labels() -> Vec<String> {
    LABELS.iter().map(|s| s.to_string()).collect()
}

pub fn loaded_model() -> LoadedModel {
    let (network, config) = network();
    LoadedModel::from_parts(network, &config, labels()).unwrap()
}

/// Export manifest and weights record next to each other.
pub fn write_model(path: &Path) {
    let (network, config) = network();
    export_model(network, config, labels(), path).unwrap();
}

pub fn solid_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}
