use log::{debug, error, info};

use crate::ai::claude::ClaudeProvider;
use crate::ai::provider::AiProvider;
use crate::chart::feedback::FeedbackRecord;
use crate::chart::image::{encode_image, ChartFile};
use crate::chart::prompts::build_analysis_messages;
use crate::chart::recover::recover_feedback;
use crate::config::AppConfig;
use crate::error::AppError;

/// Critique a chart image. Always resolves to a record; failures become placeholder records.
///
/// Configuration (including the API key) is loaded fresh on every call.
pub async fn analyze(file: &ChartFile) -> FeedbackRecord {
    match AppConfig::load_with_env() {
        Ok(config) => analyze_with_config(file, &config).await,
        Err(e) => fail(e, None),
    }
}

/// Like [`analyze`] with an explicit configuration.
pub async fn analyze_with_config(file: &ChartFile, config: &AppConfig) -> FeedbackRecord {
    let Some(api_key) = config.credential() else {
        return fail(AppError::MissingCredential, None);
    };
    let provider = ClaudeProvider::new(
        api_key.to_string(),
        config.model.clone(),
        config.api_url.clone(),
    );
    analyze_with_provider(&provider, file, Some(config.max_tokens)).await
}

/// Run one analysis against any provider: encode, request, recover.
pub async fn analyze_with_provider(
    provider: &dyn AiProvider,
    file: &ChartFile,
    max_tokens: Option<u32>,
) -> FeedbackRecord {
    let image = match encode_image(file).await {
        Ok(image) => image,
        Err(e) => return fail(e, None),
    };
    debug!(
        "Encoded {} as {} ({} base64 chars)",
        file.name,
        image.media_type.as_str(),
        image.data.len()
    );

    let messages = build_analysis_messages(image);
    let completion = match provider.complete(&messages, max_tokens).await {
        Ok(completion) => completion,
        Err(e) => return fail(e, None),
    };
    debug!("Raw API response text: {}", completion.text);

    match recover_feedback(&completion.text) {
        Ok(recovered) => {
            info!("Analysis of {} complete ({:?} parse)", file.name, recovered.tier);
            recovered.record
        }
        Err(e) => {
            error!("Raw response that failed parsing: {}", completion.text);
            fail(e, Some(&completion.text))
        }
    }
}

fn fail(err: AppError, raw: Option<&str>) -> FeedbackRecord {
    error!("Chart analysis failed: {}", err);
    FeedbackRecord::placeholder_for(&err, raw)
}
