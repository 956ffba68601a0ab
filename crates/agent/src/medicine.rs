//! Medicine lookup generation
//!
//! Tool-augmented: one search round through the external search
//! capability, then a single synthesis call that cites the retrieved
//! links. When the search tool abstains the prompt forbids inventing
//! sources; missing attribution is a content-quality concern that gets
//! logged, not a validation failure.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use health_agent_core::{
    ChatTurn, FieldType, GenerateRequest, LanguageModel, Schema, SchemaViolation, SearchProvider,
    SearchResult,
};

use crate::{parse_validated, push_history, AgentError};

const MEDICINE_SYSTEM_PROMPT: &str = "\
You are a health-information assistant answering a question about a \
specific medicine.

Produce a factual, plainly-worded summary of the medicine: what it is \
for, how it is commonly taken, and notable side effects or interactions. \
Base the answer on the search results provided below when they are \
relevant, and cite them in the sources array. Never invent a source: if \
no search results are provided, return an empty sources array.

Respond with JSON only, matching the declared schema.";

/// One cited source link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceLink {
    pub title: String,
    pub url: String,
}

/// Structured medicine lookup result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicineAnswer {
    pub summary: String,
    #[serde(default)]
    pub key_findings: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub sources: Vec<SourceLink>,
}

fn answer_schema() -> Schema {
    Schema::new()
        .required("summary", FieldType::String)
        .required("key_findings", FieldType::Array(Box::new(FieldType::String)))
        .required(
            "recommendations",
            FieldType::Array(Box::new(FieldType::String)),
        )
        .optional(
            "sources",
            FieldType::Array(Box::new(FieldType::Object(
                Schema::new()
                    .required("title", FieldType::String)
                    .required("url", FieldType::String),
            ))),
        )
}

/// Medicine lookup generator
pub struct MedicineGenerator {
    llm: Arc<dyn LanguageModel>,
    search: Arc<dyn SearchProvider>,
}

impl MedicineGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>, search: Arc<dyn SearchProvider>) -> Self {
        Self { llm, search }
    }

    /// Look up a medicine and synthesize a sourced answer
    pub async fn lookup(
        &self,
        medicine_name: &str,
        history: &[ChatTurn],
    ) -> Result<MedicineAnswer, AgentError> {
        let results = self.retrieve(medicine_name).await;

        let schema = answer_schema();
        let mut system = MEDICINE_SYSTEM_PROMPT.to_string();
        system.push_str("\n\n");
        system.push_str(&render_results(&results));

        let request = push_history(
            GenerateRequest::new(system).with_response_schema(schema.to_wire()),
            history,
        )
        .with_user_message(format!("Tell me about {}", medicine_name));

        let response = self.llm.generate(request).await?;
        let answer: MedicineAnswer = parse_validated(&response.text, &schema)?;

        // An empty summary is a missing summary as far as the contract is
        // concerned.
        if answer.summary.trim().is_empty() {
            return Err(AgentError::Validation(SchemaViolation::MissingField(
                "summary".to_string(),
            )));
        }

        if answer.sources.is_empty() {
            tracing::warn!(
                medicine = %medicine_name,
                "Medicine answer carries no source attribution"
            );
        }

        Ok(answer)
    }

    /// One search round. Search failure degrades to an unsourced answer
    /// rather than failing the turn.
    async fn retrieve(&self, medicine_name: &str) -> Vec<SearchResult> {
        let query = format!("{} medicine uses dosage side effects", medicine_name);
        match self.search.search(&query).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(
                    medicine = %medicine_name,
                    error = %e,
                    "Search unavailable, generating without retrieved context"
                );
                Vec::new()
            }
        }
    }
}

fn render_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No search results are available for this query.".to_string();
    }

    let mut block = String::from("Search results:\n");
    for (i, result) in results.iter().enumerate() {
        block.push_str(&format!(
            "{}. {} — {}\n   {}\n",
            i + 1,
            result.title,
            result.url,
            result.snippet
        ));
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use health_agent_core::{Error, GenerateResponse};
    use parking_lot::Mutex;

    struct RecordingLlm {
        reply: &'static str,
        last_request: Mutex<Option<GenerateRequest>>,
    }

    #[async_trait]
    impl LanguageModel for RecordingLlm {
        async fn generate(
            &self,
            request: GenerateRequest,
        ) -> health_agent_core::Result<GenerateResponse> {
            *self.last_request.lock() = Some(request);
            Ok(GenerateResponse::text(self.reply))
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    struct StaticSearch {
        results: health_agent_core::Result<Vec<SearchResult>>,
    }

    #[async_trait]
    impl SearchProvider for StaticSearch {
        async fn search(&self, _query: &str) -> health_agent_core::Result<Vec<SearchResult>> {
            match &self.results {
                Ok(results) => Ok(results.clone()),
                Err(_) => Err(Error::Generation("search down".to_string())),
            }
        }
    }

    const VALID_ANSWER: &str = r#"{
        "summary": "Paracetamol relieves mild pain and reduces fever.",
        "key_findings": ["analgesic", "antipyretic"],
        "recommendations": ["Do not exceed 4g in 24 hours"],
        "sources": [{"title": "NHS", "url": "https://nhs.uk/paracetamol"}]
    }"#;

    fn llm(reply: &'static str) -> Arc<RecordingLlm> {
        Arc::new(RecordingLlm {
            reply,
            last_request: Mutex::new(None),
        })
    }

    fn search_with(results: Vec<SearchResult>) -> Arc<StaticSearch> {
        Arc::new(StaticSearch {
            results: Ok(results),
        })
    }

    #[tokio::test]
    async fn test_lookup_produces_sourced_answer() {
        let llm = llm(VALID_ANSWER);
        let search = search_with(vec![SearchResult {
            title: "NHS - Paracetamol".to_string(),
            url: "https://nhs.uk/paracetamol".to_string(),
            snippet: "Used for pain relief".to_string(),
        }]);
        let generator = MedicineGenerator::new(llm.clone(), search);

        let answer = generator.lookup("paracetamol", &[]).await.unwrap();
        assert!(!answer.summary.is_empty());
        assert_eq!(answer.sources.len(), 1);

        // The retrieved snippet reached the synthesis prompt.
        let request = llm.last_request.lock().clone().unwrap();
        assert!(request.messages[0].content.contains("Used for pain relief"));
    }

    #[tokio::test]
    async fn test_abstaining_search_is_not_an_error() {
        let generator = MedicineGenerator::new(llm(VALID_ANSWER), search_with(Vec::new()));
        let answer = generator.lookup("paracetamol", &[]).await.unwrap();
        assert!(!answer.summary.is_empty());
    }

    #[tokio::test]
    async fn test_search_failure_degrades_to_unsourced_generation() {
        let llm = llm(VALID_ANSWER);
        let search = Arc::new(StaticSearch {
            results: Err(Error::Generation("search down".to_string())),
        });
        let generator = MedicineGenerator::new(llm.clone(), search);

        let answer = generator.lookup("paracetamol", &[]).await.unwrap();
        assert!(!answer.summary.is_empty());

        let request = llm.last_request.lock().clone().unwrap();
        assert!(request.messages[0]
            .content
            .contains("No search results are available"));
    }

    #[tokio::test]
    async fn test_empty_summary_fails_validation() {
        let reply = r#"{"summary":"  ","key_findings":[],"recommendations":[],"sources":[]}"#;
        let generator = MedicineGenerator::new(llm(reply), search_with(Vec::new()));

        let err = generator.lookup("paracetamol", &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
    }

    #[tokio::test]
    async fn test_wrong_shape_fails_validation() {
        let reply = r#"{"summary":"ok","key_findings":"not-an-array","recommendations":[]}"#;
        let generator = MedicineGenerator::new(llm(reply), search_with(Vec::new()));

        let err = generator.lookup("paracetamol", &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
    }
}
