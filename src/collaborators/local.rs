use async_trait::async_trait;

use super::{AnalysisError, AnalysisProvider, AnalysisRequest, AnalysisResponse};

const NOTHING_TO_SEE: &str = "not much on screen right now, but you've got this.";

/// Offline stand-in used when no remote provider is configured.
#[derive(Debug, Clone, Default)]
pub struct LocalAnalysisProvider;

impl LocalAnalysisProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AnalysisProvider for LocalAnalysisProvider {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResponse, AnalysisError> {
        let hint = request
            .context
            .contextual_hint()
            .map(|hint| hint.replace('\n', " · "))
            .unwrap_or_else(|| NOTHING_TO_SEE.to_string());

        Ok(AnalysisResponse {
            text: format!(
                "Mock mode - if I could see it I'd toss a quick little reaction like a buddy. Maybe glance at {hint}."
            ),
            usage: None,
        })
    }

    fn describe(&self) -> String {
        "Mock offline".to_string()
    }
}
