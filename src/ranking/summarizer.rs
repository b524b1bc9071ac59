// Abstractive summarization over an opaque seq2seq ONNX pair
use anyhow::Result;
use ort::{
    init,
    inputs,
    session::builder::GraphOptimizationLevel,
    session::Session,
    value::Value,
};
use tokenizers::tokenizer::Tokenizer;

use crate::config::SummarizerPaths;
use crate::error::DocsiftError;

const MAX_INPUT_TOKENS: usize = 512;
const MAX_OUTPUT_TOKENS: usize = 96;
const DECODER_START_ID: i64 = 0;
const EOS_TOKEN_ID: u32 = 1;

/// Produces a short summary for a chunk of text. The ranking pipeline only
/// depends on this trait; tests inject [`LeadSummarizer`] instead of the
/// ONNX-backed implementation.
pub trait Summarize {
    fn summarize(&mut self, text: &str) -> Result<String>;
}

/// Deterministic fallback: the first words of the chunk, no model involved.
pub struct LeadSummarizer {
    pub max_words: usize,
}

impl Default for LeadSummarizer {
    fn default() -> Self {
        Self { max_words: 40 }
    }
}

impl Summarize for LeadSummarizer {
    fn summarize(&mut self, text: &str) -> Result<String> {
        let words: Vec<&str> = text.split_whitespace().take(self.max_words).collect();
        Ok(words.join(" "))
    }
}

/// Encoder/decoder summarizer backed by the configured ONNX artifacts.
#[derive(Debug)]
pub struct OnnxSummarizer {
    encoder: Session,
    decoder: Session,
    tokenizer: Tokenizer,
}

impl OnnxSummarizer {
    /// Load the artifact pair. A missing or unloadable artifact is fatal:
    /// the ranking run is not useful without summaries.
    pub fn load(paths: &SummarizerPaths) -> Result<Self> {
        for path in [&paths.encoder, &paths.decoder, &paths.tokenizer] {
            if !path.exists() {
                return Err(DocsiftError::Configuration(format!(
                    "summarizer artifact not found: {}",
                    path.display()
                ))
                .into());
            }
        }

        let _ = init();
        let encoder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(ort::Error::<()>::from)?
            .with_intra_threads(4)
            .map_err(ort::Error::<()>::from)?
            .commit_from_file(&paths.encoder)
            .map_err(|e| {
                DocsiftError::Configuration(format!(
                    "cannot load encoder {}: {e}",
                    paths.encoder.display()
                ))
            })?;
        let decoder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(ort::Error::<()>::from)?
            .with_intra_threads(4)
            .map_err(ort::Error::<()>::from)?
            .commit_from_file(&paths.decoder)
            .map_err(|e| {
                DocsiftError::Configuration(format!(
                    "cannot load decoder {}: {e}",
                    paths.decoder.display()
                ))
            })?;
        let tokenizer = Tokenizer::from_file(&paths.tokenizer).map_err(|e| {
            DocsiftError::Configuration(format!(
                "cannot load tokenizer {}: {e}",
                paths.tokenizer.display()
            ))
        })?;

        Ok(Self {
            encoder,
            decoder,
            tokenizer,
        })
    }

    fn encode_input(&self, text: &str) -> Result<Vec<i64>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("tokenization failed: {e}"))?;
        // Oversized chunks are windowed, never rejected.
        let ids: Vec<i64> = encoding
            .get_ids()
            .iter()
            .take(MAX_INPUT_TOKENS)
            .map(|&id| id as i64)
            .collect();
        Ok(ids)
    }
}

impl Summarize for OnnxSummarizer {
    fn summarize(&mut self, text: &str) -> Result<String> {
        let input_ids = self.encode_input(text)?;
        if input_ids.is_empty() {
            return Ok(String::new());
        }
        let seq_len = input_ids.len();

        let ids_value = Value::from_array(([1_usize, seq_len], input_ids.into_boxed_slice()))?;
        let mask_value = Value::from_array((
            [1_usize, seq_len],
            vec![1_i64; seq_len].into_boxed_slice(),
        ))?;
        let encoder_outputs = self.encoder.run(inputs![
            "input_ids" => ids_value,
            "attention_mask" => mask_value,
        ])?;
        let (enc_shape, enc_data) = encoder_outputs[0].try_extract_tensor::<f32>()?;
        let enc_data_vec = enc_data.to_vec();

        let mut decoder_input_ids: Vec<i64> = vec![DECODER_START_ID];
        let mut generated: Vec<u32> = Vec::new();

        for _ in 0..MAX_OUTPUT_TOKENS {
            let decoder_ids = Value::from_array((
                [1_usize, decoder_input_ids.len()],
                decoder_input_ids.clone().into_boxed_slice(),
            ))?;
            let hidden_states = Value::from_array((
                enc_shape.clone(),
                enc_data_vec.clone().into_boxed_slice(),
            ))?;
            let decoder_outputs = self.decoder.run(inputs![
                "input_ids" => decoder_ids,
                "encoder_hidden_states" => hidden_states,
            ])?;
            let (logits_shape, logits_data) = decoder_outputs[0].try_extract_tensor::<f32>()?;

            let vocab_size = logits_shape[2] as usize;
            let last_start = ((logits_shape[1] - 1) * logits_shape[2]) as usize;
            let last_logits = &logits_data[last_start..last_start + vocab_size];

            // Greedy argmax keeps the output deterministic for identical input.
            let next_token = last_logits
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(idx, _)| idx as u32)
                .unwrap_or(EOS_TOKEN_ID);

            if next_token == EOS_TOKEN_ID {
                break;
            }

            generated.push(next_token);
            decoder_input_ids.push(next_token as i64);

            // Bail on a stuck single-token loop.
            if generated.len() >= 5 {
                let tail = &generated[generated.len() - 5..];
                if tail.iter().all(|&t| t == tail[0]) {
                    break;
                }
            }
        }

        let summary = self
            .tokenizer
            .decode(&generated, true)
            .map_err(|e| anyhow::anyhow!("decoding failed: {e}"))?;
        Ok(summary.trim().to_string())
    }
}
