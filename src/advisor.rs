//! Financial advisor
//!
//! Spending advice and insurance recommendations drawn from a user's recent
//! transactions. Both features always return something: model failures fall
//! back to fixed text.

use crate::llm::LanguageModel;
use crate::models::{
    format_naira, GenerationRequest, InsightScope, InsuranceRecommendation, InsuranceType,
    ModelOutput, Transaction, TransactionType, UserProfile,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

pub const ADVICE_FALLBACK: &str =
    "Our AI services are currently experiencing high traffic. Please try again later.";
pub const ADVICE_EMPTY: &str = "Unable to generate insights at this time.";
pub const INSURANCE_FALLBACK: &str =
    "Based on your general profile, we recommend starting with a basic health plan.";
pub const INSURANCE_DEFAULT_REASON: &str = "We recommend reviewing our general health plans.";

const ADVICE_TRANSACTION_LIMIT: usize = 20;
const INSURANCE_TRANSACTION_LIMIT: usize = 30;

const ADVISOR_SYSTEM: &str = "You are a helpful, professional, and culturally aware financial assistant for the Nigerian market. Use the Naira symbol (₦) where appropriate.";

pub struct FinancialAdvisor {
    model: Arc<dyn LanguageModel>,
}

impl FinancialAdvisor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Short advice for the given scope
    pub async fn advice(&self, transactions: &[Transaction], scope: InsightScope) -> String {
        let summary = summarize_for_advice(transactions);
        let mut request = GenerationRequest::prompt(build_advice_prompt(&summary, scope));
        request.system = Some(ADVISOR_SYSTEM.to_string());

        match self.model.generate(&request).await {
            Ok(ModelOutput::Text(text)) if !text.trim().is_empty() => {
                info!(?scope, "Advice generated");
                text
            }
            Ok(ModelOutput::Text(_)) => ADVICE_EMPTY.to_string(),
            Ok(ModelOutput::ToolInvocation { name, .. }) => {
                warn!(tool = %name, "Unexpected tool invocation while generating advice");
                ADVICE_FALLBACK.to_string()
            }
            Err(e) => {
                warn!("Advice generation failed: {}", e);
                ADVICE_FALLBACK.to_string()
            }
        }
    }

    /// The single insurance product that best fits the profile
    pub async fn recommend_insurance(
        &self,
        transactions: &[Transaction],
        profile: &UserProfile,
    ) -> InsuranceRecommendation {
        let summary = summarize_for_insurance(transactions);
        let mut request = GenerationRequest::prompt(build_insurance_prompt(&summary, profile));
        request.response_mime_type = Some("application/json".to_string());

        let text = match self.model.generate(&request).await {
            Ok(ModelOutput::Text(text)) => text,
            Ok(ModelOutput::ToolInvocation { name, .. }) => {
                warn!(tool = %name, "Unexpected tool invocation while recommending insurance");
                return fallback_recommendation();
            }
            Err(e) => {
                warn!("Insurance recommendation failed: {}", e);
                return fallback_recommendation();
            }
        };

        match parse_recommendation(&text) {
            Some(recommendation) => {
                info!(recommended = %recommendation.recommended_type, "Insurance recommended");
                recommendation
            }
            None => {
                warn!("Could not parse insurance recommendation: {}", text);
                fallback_recommendation()
            }
        }
    }
}

fn fallback_recommendation() -> InsuranceRecommendation {
    InsuranceRecommendation {
        recommended_type: InsuranceType::Health,
        rationale: INSURANCE_FALLBACK.to_string(),
    }
}

/// `2024-05-01: -₦4500 at Chicken Republic (Food)`, one line each
pub fn summarize_for_advice(transactions: &[Transaction]) -> String {
    transactions
        .iter()
        .take(ADVICE_TRANSACTION_LIMIT)
        .map(|t| {
            let sign = match t.kind {
                TransactionType::Credit => '+',
                TransactionType::Debit => '-',
            };
            format!(
                "{}: {}{} at {} ({})",
                t.date,
                sign,
                format_naira(t.amount),
                t.merchant,
                t.category
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `Spent ₦4500 on Food (Chicken Republic)`, one line each
pub fn summarize_for_insurance(transactions: &[Transaction]) -> String {
    transactions
        .iter()
        .take(INSURANCE_TRANSACTION_LIMIT)
        .map(|t| {
            let verb = match t.kind {
                TransactionType::Debit => "Spent",
                TransactionType::Credit => "Earned",
            };
            format!(
                "{} {} on {} ({})",
                verb,
                format_naira(t.amount),
                t.category,
                t.merchant
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_advice_prompt(summary: &str, scope: InsightScope) -> String {
    match scope {
        InsightScope::Individual => format!(
            r#"Act as a senior financial advisor for a Nigerian user.
Analyze these recent transactions:
{}

Give 3 brief, actionable bullet points on how this user can grow savings or cut costs.
Focus on spending habits. Be encouraging but direct."#,
            summary
        ),
        InsightScope::Community => format!(
            r#"Act as a community data analyst.
These transactions belong to a user in an urban Lagos demographic:
{}

Compare the pattern with typical community trends in Nigeria (food inflation, transport costs).
Give 2 insights on how they compare with the average peer and suggest one community savings challenge to join."#,
            summary
        ),
        InsightScope::Market => format!(
            r#"Act as a market analyst for the Nigerian fintech sector.
The user spends money in these categories:
{}

Suggest 2 emerging Nigerian investment sectors that relate to this spending.
Also name one economic risk factor (such as currency fluctuation) to watch this week."#,
            summary
        ),
    }
}

fn build_insurance_prompt(summary: &str, profile: &UserProfile) -> String {
    format!(
        r#"Recommend the ONE insurance product type that best fits this Nigerian user.

Profile:
- Balance: {}
- Savings: {}
- Recent activity:
{}

Product types:
1. "health" (high pharmacy or hospital spend)
2. "agriculture" (farming or agro-allied spend)
3. "device" (electronics or data spend)
4. "life" (frequent transfers to dependents)
5. "education" (school fees, bookshops, child-related spend)
6. "business" (inventory restocking, many small merchant payments)

Return ONLY a JSON object:
{{
  "type": "health" | "agriculture" | "device" | "life" | "education" | "business",
  "reason": "Two sentences explaining the fit, citing specific merchants."
}}"#,
        format_naira(profile.balance),
        format_naira(profile.savings),
        summary
    )
}

#[derive(Debug, Deserialize)]
struct RawRecommendation {
    #[serde(rename = "type")]
    kind: Option<String>,
    reason: Option<String>,
}

/// Parse the model's JSON, tolerating a fenced code block around it.
/// Missing or unknown fields fall back to health and the default reason.
fn parse_recommendation(response: &str) -> Option<InsuranceRecommendation> {
    let cleaned = response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let raw: RawRecommendation = serde_json::from_str(cleaned).ok()?;

    let recommended_type = raw
        .kind
        .and_then(|k| serde_json::from_value(serde_json::Value::String(k.to_lowercase())).ok())
        .unwrap_or(InsuranceType::Health);

    let rationale = raw
        .reason
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| INSURANCE_DEFAULT_REASON.to_string());

    Some(InsuranceRecommendation {
        recommended_type,
        rationale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssistantError;
    use crate::llm::ScriptedModel;
    use chrono::NaiveDate;
    use serde_json::json;

    fn transactions() -> Vec<Transaction> {
        vec![
            Transaction {
                id: "t1".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                merchant: "Chicken Republic".to_string(),
                amount: 4500.0,
                kind: TransactionType::Debit,
                category: "Food".to_string(),
            },
            Transaction {
                id: "t2".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
                merchant: "Salary".to_string(),
                amount: 350000.0,
                kind: TransactionType::Credit,
                category: "Income".to_string(),
            },
        ]
    }

    fn profile() -> UserProfile {
        UserProfile {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            balance: 125000.0,
            savings: 40000.0,
            risk_score: 42,
        }
    }

    #[test]
    fn test_summaries() {
        let advice = summarize_for_advice(&transactions());
        assert_eq!(
            advice,
            "2024-05-01: -₦4500 at Chicken Republic (Food)\n2024-05-02: +₦350000 at Salary (Income)"
        );

        let insurance = summarize_for_insurance(&transactions());
        assert!(insurance.starts_with("Spent ₦4500 on Food (Chicken Republic)"));
        assert!(insurance.contains("Earned ₦350000 on Income (Salary)"));
    }

    #[test]
    fn test_summary_is_capped() {
        let many: Vec<_> = std::iter::repeat(transactions()[0].clone()).take(50).collect();
        assert_eq!(summarize_for_advice(&many).lines().count(), 20);
        assert_eq!(summarize_for_insurance(&many).lines().count(), 30);
    }

    #[tokio::test]
    async fn test_advice_uses_scope_prompt() {
        let model = Arc::new(ScriptedModel::text("- Cook at home more often"));
        let advisor = FinancialAdvisor::new(model.clone());

        let advice = advisor.advice(&transactions(), InsightScope::Community).await;
        assert_eq!(advice, "- Cook at home more often");

        let requests = model.requests().await;
        assert!(requests[0].turns[0].text.contains("community data analyst"));
        assert_eq!(requests[0].system.as_deref(), Some(ADVISOR_SYSTEM));
    }

    #[tokio::test]
    async fn test_advice_falls_back() {
        let model = Arc::new(ScriptedModel::new(vec![
            Err(AssistantError::LlmError("429".to_string())),
            Ok(ModelOutput::Text("  ".to_string())),
        ]));
        let advisor = FinancialAdvisor::new(model);

        assert_eq!(
            advisor.advice(&transactions(), InsightScope::Individual).await,
            ADVICE_FALLBACK
        );
        assert_eq!(
            advisor.advice(&transactions(), InsightScope::Market).await,
            ADVICE_EMPTY
        );
    }

    #[tokio::test]
    async fn test_insurance_recommendation() {
        let model = Arc::new(ScriptedModel::text(
            &json!({ "type": "device", "reason": "Frequent data purchases." }).to_string(),
        ));
        let advisor = FinancialAdvisor::new(model.clone());

        let recommendation = advisor.recommend_insurance(&transactions(), &profile()).await;
        assert_eq!(recommendation.recommended_type, InsuranceType::Device);
        assert_eq!(recommendation.rationale, "Frequent data purchases.");

        let requests = model.requests().await;
        assert_eq!(requests[0].response_mime_type.as_deref(), Some("application/json"));
        assert!(requests[0].turns[0].text.contains("₦125000"));
    }

    #[test]
    fn test_parse_recommendation_variants() {
        let fenced = parse_recommendation(
            "```json\n{\"type\": \"Education\", \"reason\": \"School fees at Greenfield.\"}\n```",
        )
        .unwrap();
        assert_eq!(fenced.recommended_type, InsuranceType::Education);

        let partial = parse_recommendation(r#"{"type": "spaceflight"}"#).unwrap();
        assert_eq!(partial.recommended_type, InsuranceType::Health);
        assert_eq!(partial.rationale, INSURANCE_DEFAULT_REASON);

        assert!(parse_recommendation("not json").is_none());
    }

    #[tokio::test]
    async fn test_insurance_falls_back_on_garbage() {
        let model = Arc::new(ScriptedModel::text("I think health?"));
        let advisor = FinancialAdvisor::new(model);

        let recommendation = advisor.recommend_insurance(&transactions(), &profile()).await;
        assert_eq!(recommendation.recommended_type, InsuranceType::Health);
        assert_eq!(recommendation.rationale, INSURANCE_FALLBACK);
    }
}
