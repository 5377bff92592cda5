//! Rule suggestions derived from a finished organize run

use std::path::Path;
use std::sync::Arc;

use crate::ai::{GenerateRulesRequest, OrganizeApi};
use crate::error::ApiError;
use crate::models::{OrganizeResult, SuggestedRule};

pub struct RuleSynthesizer {
    api: Arc<dyn OrganizeApi>,
}

impl RuleSynthesizer {
    pub fn new(api: Arc<dyn OrganizeApi>) -> Self {
        Self { api }
    }

    /// Same result and folder always produce the same request
    pub fn build_request(result: &OrganizeResult, source_folder: &Path) -> GenerateRulesRequest {
        GenerateRulesRequest {
            folders: result.folders.clone(),
            source_folder: source_folder.to_string_lossy().to_string(),
        }
    }

    /// Ask the service for rules. Every returned rule starts selected.
    pub async fn suggest(
        &self,
        token: &str,
        result: &OrganizeResult,
        source_folder: &Path,
    ) -> Result<Vec<SuggestedRule>, ApiError> {
        let request = Self::build_request(result, source_folder);
        let response = self.api.generate_rules(token, &request).await?;

        let rules: Vec<SuggestedRule> = response
            .rules
            .into_iter()
            .map(|rule| SuggestedRule {
                selected: true,
                ..rule
            })
            .collect();

        tracing::info!(
            rules = rules.len(),
            reported = response.total_rules,
            "Received rule suggestions"
        );
        Ok(rules)
    }
}

/// Comparable identity of a rule, ignoring order and selection
pub fn rule_key(rule: &SuggestedRule) -> (String, String, String, u64) {
    (
        rule.rule_type.clone(),
        rule.pattern.clone(),
        rule.target_folder.clone(),
        rule.confidence.to_bits(),
    )
}
