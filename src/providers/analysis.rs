//! Analysis provider
//!
//! Builds the structured analysis prompt from the body profile and attached
//! lab reports, posts it, and strict-validates the JSON response. A failed
//! request leaves no partial state anywhere; the caller keeps whatever it had.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::{Attachment, CompletionRequest, JsonCompletion};
use crate::error::ReportResult;
use crate::models::{annotate_metrics, compute_bmi, validate_analysis, AnalysisResponse, BodyProfile};

/// Rotating status lines logged while an analysis request is in flight
const STATUS_MESSAGES: [&str; 7] = [
    "Reading your lab report...",
    "Checking metrics against reference ranges...",
    "Scoring health categories...",
    "Looking at your body profile...",
    "Weighing the overall picture...",
    "Picking food suggestions...",
    "Almost there...",
];

const STATUS_INTERVAL: Duration = Duration::from_secs(3);

/// Aborts the status rotation task when dropped, so the ticker stops on
/// every exit path of the enclosing request, including unwinds.
struct StatusTicker {
    handle: tokio::task::JoinHandle<()>,
}

impl StatusTicker {
    fn spawn() -> Self {
        let handle = tokio::spawn(async {
            let mut interval = tokio::time::interval(STATUS_INTERVAL);
            let mut step = 0usize;
            loop {
                interval.tick().await;
                info!(status = STATUS_MESSAGES[step % STATUS_MESSAGES.len()], "analysis in flight");
                step += 1;
            }
        });
        StatusTicker { handle }
    }

    #[cfg(test)]
    fn abort_handle(&self) -> tokio::task::AbortHandle {
        self.handle.abort_handle()
    }
}

impl Drop for StatusTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct AnalysisProvider {
    backend: Arc<dyn JsonCompletion>,
}

impl AnalysisProvider {
    pub fn new(backend: Arc<dyn JsonCompletion>) -> Self {
        AnalysisProvider { backend }
    }

    /// Run one analysis: prompt, request, validate, annotate.
    ///
    /// The status rotation ticks every 3 seconds while the request is in
    /// flight and is aborted unconditionally once it settles, success or not.
    pub async fn analyze(
        &self,
        profile: &BodyProfile,
        attachments: Vec<Attachment>,
    ) -> ReportResult<AnalysisResponse> {
        let prompt = build_analysis_prompt(profile)?;
        let request = CompletionRequest {
            prompt,
            attachments,
        };

        let raw = {
            let _ticker = StatusTicker::spawn();
            self.backend.complete_json(request).await
        }?;

        let mut response = validate_analysis(&raw)?;
        annotate_metrics(&mut response)?;
        Ok(response)
    }
}

/// Build the analysis prompt. BMI is computed locally and embedded so the
/// provider comments on it instead of rederiving it.
pub fn build_analysis_prompt(profile: &BodyProfile) -> ReportResult<String> {
    let bmi = compute_bmi(profile.height_cm, profile.weight_kg)?;

    Ok(format!(
        "You are a clinical lab-report analyst. Analyze the attached lab report \
         for the following person and respond with a single JSON object only.\n\
         \n\
         Profile:\n\
         - Age: {age}\n\
         - Gender: {gender}\n\
         - Height: {height:.1} cm\n\
         - Weight: {weight:.1} kg\n\
         - Occupation: {occupation}\n\
         - BMI (precomputed, do not recalculate): {bmi:.1} ({bmi_class})\n\
         \n\
         The JSON object must have exactly these keys:\n\
         - \"overallHealthScore\": {{ \"score\" (0-100), \"label\", \"explanation\" }}\n\
         - \"bmiAnalysis\": {{ \"summary\" }} commenting on the precomputed BMI\n\
         - \"healthAnalysis\": {{ \"categories\": [{{ \"categoryName\" (array of words), \
         \"score\" (0-10), \"summary\", \"iconName\" }}] }}\n\
         - \"metrics\": [{{ \"name\", \"value\", \"unit\", \"referenceRange\" \
         (\"low-high\"), \"classification\" (\"Normal\"|\"High\"|\"Low\"), \"explanation\" }}]\n\
         - \"recommendedFoods\": [{{ \"foodName\", \"benefit\", \"servingSuggestion\", \
         \"suggestedStore\" (\"Lotte Mart\"|\"Co.op Food\"|\"Bách Hóa Xanh\") }}]\n\
         \n\
         Use every metric present in the report. Do not invent metrics.",
        age = profile.age,
        gender = profile.gender.display_name(),
        height = profile.height_cm,
        weight = profile.weight_kg,
        occupation = profile.occupation,
        bmi = bmi.value,
        bmi_class = bmi.class.display_name(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use crate::models::{Classification, Gender};
    use crate::providers::MockBackend;
    use serde_json::json;

    fn profile() -> BodyProfile {
        BodyProfile {
            age: 34,
            height_cm: 170.0,
            weight_kg: 70.0,
            gender: Gender::Male,
            occupation: "office worker".to_string(),
        }
    }

    fn provider_json() -> serde_json::Value {
        json!({
            "overallHealthScore": { "score": 82.0, "label": "Good", "explanation": "ok" },
            "bmiAnalysis": { "summary": "Normal range." },
            "healthAnalysis": { "categories": [] },
            "metrics": [{
                "name": "Glucose",
                "value": "105",
                "unit": "mg/dL",
                "referenceRange": "70-99",
                "classification": "Normal",
                "explanation": "Fasting."
            }],
            "recommendedFoods": []
        })
    }

    #[test]
    fn test_prompt_embeds_precomputed_bmi() {
        let prompt = build_analysis_prompt(&profile()).unwrap();
        assert!(prompt.contains("BMI (precomputed, do not recalculate): 24.2 (Normal)"));
        assert!(prompt.contains("Age: 34"));
        assert!(prompt.contains("Gender: Male"));
    }

    #[test]
    fn test_prompt_rejects_invalid_profile() {
        let mut bad = profile();
        bad.weight_kg = 0.0;
        assert!(matches!(
            build_analysis_prompt(&bad),
            Err(ReportError::InvalidBodyProfile(_))
        ));
    }

    #[tokio::test]
    async fn test_analyze_validates_and_annotates() {
        let provider = AnalysisProvider::new(Arc::new(MockBackend::new(provider_json())));
        let response = provider.analyze(&profile(), vec![]).await.unwrap();
        // 105 against 70-99 is rederived as High despite the provider's label
        assert_eq!(response.metrics[0].classification, Classification::High);
    }

    #[tokio::test]
    async fn test_analyze_surfaces_provider_failure() {
        let provider = AnalysisProvider::new(Arc::new(MockBackend::failing("endpoint down")));
        assert!(matches!(
            provider.analyze(&profile(), vec![]).await,
            Err(ReportError::Provider(_))
        ));
    }

    async fn wait_until_finished(abort: &tokio::task::AbortHandle) {
        for _ in 0..100 {
            if abort.is_finished() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
    }

    #[tokio::test]
    async fn test_status_ticker_stops_on_drop() {
        let ticker = StatusTicker::spawn();
        let abort = ticker.abort_handle();
        assert!(!abort.is_finished());

        drop(ticker);
        wait_until_finished(&abort).await;
        assert!(abort.is_finished());
    }

    #[tokio::test]
    async fn test_ticker_guard_stops_on_early_return() {
        // the guard pattern analyze() uses: scope exit aborts the ticker
        // whether the enclosed request succeeded or failed
        async fn settle(fail: bool, out: &mut Option<tokio::task::AbortHandle>) -> Result<(), ()> {
            let ticker = StatusTicker::spawn();
            *out = Some(ticker.abort_handle());
            if fail {
                return Err(());
            }
            Ok(())
        }

        for fail in [false, true] {
            let mut abort = None;
            let _ = settle(fail, &mut abort).await;
            let abort = abort.unwrap();
            wait_until_finished(&abort).await;
            assert!(abort.is_finished());
        }
    }

    #[tokio::test]
    async fn test_analyze_rejects_malformed_schema() {
        let provider = AnalysisProvider::new(Arc::new(MockBackend::new(json!({ "not": "it" }))));
        assert!(matches!(
            provider.analyze(&profile(), vec![]).await,
            Err(ReportError::SchemaMismatch(_))
        ));
    }
}
