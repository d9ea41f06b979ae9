//! Whisper-based language classifier

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};
use whisper_rs::{WhisperContext, WhisperContextParameters};

use crate::config::{ClassifierConfig, ModelConfig};
use crate::error::ClassifierError;
use crate::lid::classifier::{
    crop_for_inference, rank_top_k, LanguageClassifier, LanguageDictionary,
    SegmentPredictionBatch,
};

/// Language classifier backed by Whisper's language detection head
pub struct WhisperLanguageClassifier {
    ctx: WhisperContext,
    threads: usize,
    top_k: usize,
    infer_num_samples: Option<usize>,
    dictionary: Option<LanguageDictionary>,
    rng: StdRng,
}

impl WhisperLanguageClassifier {
    /// Load the model and the optional language dictionary
    pub fn new(model: &ModelConfig, classifier: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let model_path = &model.language_model;

        if !model_path.exists() {
            return Err(ClassifierError::ModelNotFound(
                model_path.display().to_string(),
            ));
        }

        info!("Loading Whisper model from: {}", model_path.display());

        let model_path_str = model_path.to_str().ok_or_else(|| {
            ClassifierError::ModelLoad(format!("non UTF-8 path: {}", model_path.display()))
        })?;
        let ctx = WhisperContext::new_with_params(model_path_str, WhisperContextParameters::default())
            .map_err(|e| ClassifierError::ModelLoad(e.to_string()))?;

        let dictionary = LanguageDictionary::load(&model.lang_dict_dir)?;
        if let Some(ref dictionary) = dictionary {
            let vocabulary = (0..=whisper_rs::get_lang_max_id()).filter_map(whisper_rs::get_lang_str);
            let shared = dictionary.check_vocabulary(vocabulary)?;
            info!("Restricting predictions to {} dictionary languages", shared);
        }

        info!("Whisper model loaded successfully");

        Ok(Self {
            ctx,
            threads: model.threads as usize,
            top_k: classifier.top_k,
            infer_num_samples: classifier.infer_num_samples,
            dictionary,
            rng: StdRng::seed_from_u64(classifier.seed),
        })
    }

    fn classify(&mut self, samples: &[f32]) -> Result<Vec<(String, f64)>, ClassifierError> {
        if samples.is_empty() {
            return Err(ClassifierError::InvalidAudioData);
        }

        let input = crop_for_inference(samples, self.infer_num_samples, &mut self.rng);
        debug!("Classifying {} samples ({:.2}s)", input.len(), input.len() as f32 / 16000.0);

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        state
            .pcm_to_mel(input, self.threads)
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        let (_, probabilities) = state
            .lang_detect(0, self.threads)
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let scores = probabilities
            .iter()
            .enumerate()
            .filter_map(|(id, &p)| {
                let language = whisper_rs::get_lang_str(id as i32)?;
                Some((language.to_string(), p as f64))
            })
            .filter(|(language, _)| {
                self.dictionary
                    .as_ref()
                    .map_or(true, |dictionary| dictionary.contains(language))
            })
            .collect();

        Ok(scores)
    }
}

impl LanguageClassifier for WhisperLanguageClassifier {
    fn infer(&mut self, batch: &[&[f32]]) -> Result<SegmentPredictionBatch, ClassifierError> {
        let mut predictions = SegmentPredictionBatch::new();

        for (index, samples) in batch.iter().enumerate() {
            let scores = self.classify(samples)?;
            predictions.push(index.to_string(), rank_top_k(scores, self.top_k));
        }

        Ok(predictions)
    }
}
