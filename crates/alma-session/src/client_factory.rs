use alma_llm::LanguageModel;
use alma_types::Provider;
use anyhow::Result;
use std::sync::Arc;

/// Builds the model capability for a resolved provider.
///
/// Concrete provider clients are supplied by the embedding application.
pub trait ModelFactory: Send + Sync {
    fn create(&self, provider: &Provider, model_name: &str) -> Result<Arc<dyn LanguageModel>>;
}

/// Hands out the same model for every provider
pub struct StaticModelFactory {
    model: Arc<dyn LanguageModel>,
}

impl StaticModelFactory {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

impl ModelFactory for StaticModelFactory {
    fn create(&self, _provider: &Provider, _model_name: &str) -> Result<Arc<dyn LanguageModel>> {
        Ok(Arc::clone(&self.model))
    }
}
