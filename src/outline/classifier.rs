// Heading classifier capability - ONNX artifact behind a trait
use std::path::Path;

use anyhow::Result;
use ndarray::ArrayView2;
use ort::{
    init, inputs,
    session::builder::GraphOptimizationLevel,
    session::Session,
    value::Value,
};

use crate::error::DocsiftError;
use crate::outline::features::FeatureVariant;
use crate::types::{Label, Prediction};

/// Classifier contract: one label + confidence per feature row. Must be
/// deterministic for a fixed artifact and input. The pipeline accepts either
/// artifact variant (lite/full) through this same call.
pub trait Classify {
    fn n_features(&self) -> usize;
    fn classify_batch(&mut self, features: ArrayView2<'_, f32>) -> Result<Vec<Prediction>>;
}

/// Pretrained tabular classifier loaded from an ONNX file. Input is
/// `[rows, n_features]` f32, output `[rows, 7]` logits over the label set.
#[derive(Debug)]
pub struct OnnxClassifier {
    session: Session,
    variant: FeatureVariant,
}

impl OnnxClassifier {
    /// A missing or unreadable artifact is a fatal configuration error.
    pub fn load(model_path: &Path, variant: FeatureVariant) -> Result<Self> {
        if !model_path.exists() {
            return Err(DocsiftError::Configuration(format!(
                "classifier artifact not found at {}",
                model_path.display()
            ))
            .into());
        }

        let _ = init();
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(ort::Error::<()>::from)?
            .with_intra_threads(4)
            .map_err(ort::Error::<()>::from)?
            .commit_from_file(model_path)
            .map_err(|e| {
                DocsiftError::Configuration(format!(
                    "incompatible classifier artifact {}: {e}",
                    model_path.display()
                ))
            })?;

        Ok(Self { session, variant })
    }
}

impl Classify for OnnxClassifier {
    fn n_features(&self) -> usize {
        self.variant.len()
    }

    fn classify_batch(&mut self, features: ArrayView2<'_, f32>) -> Result<Vec<Prediction>> {
        let rows = features.nrows();
        let cols = features.ncols();
        if rows == 0 {
            return Ok(Vec::new());
        }

        let flat: Vec<f32> = features.iter().copied().collect();
        let input = Value::from_array(([rows, cols], flat.into_boxed_slice()))?;
        let outputs = self.session.run(inputs![input])?;
        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;

        let classes = shape[shape.len() - 1] as usize;
        let mut predictions = Vec::with_capacity(rows);
        for row in 0..rows {
            let logits = &data[row * classes..(row + 1) * classes];
            let probs = softmax(logits);
            let (index, confidence) = argmax(&probs);
            let label = Label::from_class_index(index).unwrap_or(Label::Other);
            predictions.push(Prediction::new(label, confidence));
        }
        Ok(predictions)
    }
}

/// Deterministic rule-based classifier. Stands in for the trained artifact in
/// tests and mirrors what the model learns from the dominant features:
/// relative font size, boldness and centering.
pub struct ThresholdClassifier {
    variant: FeatureVariant,
}

impl ThresholdClassifier {
    pub fn new(variant: FeatureVariant) -> Self {
        Self { variant }
    }

    fn classify_row(&self, row: &[f32]) -> Prediction {
        // Feature layout indices are fixed by LITE_FEATURES.
        let relative_size = row[3];
        let bold = row[1] > 0.5;
        let centered = row[9] > 0.5;
        let char_count = row[15];

        if relative_size >= 2.0 && centered {
            Prediction::new(Label::Title, 0.9)
        } else if relative_size >= 1.6 {
            Prediction::new(Label::H1, 0.85)
        } else if relative_size >= 1.3 {
            Prediction::new(Label::H2, 0.8)
        } else if relative_size >= 1.1 && bold && char_count < 80.0 {
            Prediction::new(Label::H3, 0.7)
        } else if bold && char_count < 40.0 {
            Prediction::new(Label::H4, 0.6)
        } else {
            Prediction::new(Label::Body, 0.75)
        }
    }
}

impl Classify for ThresholdClassifier {
    fn n_features(&self) -> usize {
        self.variant.len()
    }

    fn classify_batch(&mut self, features: ArrayView2<'_, f32>) -> Result<Vec<Prediction>> {
        Ok(features
            .rows()
            .into_iter()
            .map(|row| {
                let row: Vec<f32> = row.iter().copied().collect();
                self.classify_row(&row)
            })
            .collect())
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exp.iter().sum();
    exp.iter().map(|&e| e / sum).collect()
}

fn argmax(values: &[f32]) -> (usize, f32) {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    (best, values.get(best).copied().unwrap_or(0.0))
}
