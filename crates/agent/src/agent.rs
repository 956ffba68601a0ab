//! Health assistant orchestration
//!
//! Ties the router and the two generators into one logical turn:
//! route first, then exactly one generator, each result gated by its
//! output schema. Turns from different callers run fully concurrently;
//! nothing here is shared mutable state.

use std::sync::Arc;

use serde::Serialize;

use health_agent_core::{ChatRequest, LanguageModel, SearchProvider};

use crate::general::{GeneralGenerator, GeneralReply};
use crate::medicine::{MedicineAnswer, MedicineGenerator};
use crate::router::{IntentRouter, Route};
use crate::AgentError;

/// Reply from one conversational turn
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatReply {
    General(GeneralReply),
    Medicine(MedicineAnswer),
}

impl ChatReply {
    /// The text a speech request for this reply would synthesize
    pub fn spoken_text(&self) -> &str {
        match self {
            ChatReply::General(reply) => &reply.response,
            ChatReply::Medicine(answer) => &answer.summary,
        }
    }
}

/// Conversational health assistant
pub struct HealthAgent {
    router: IntentRouter,
    general: GeneralGenerator,
    medicine: MedicineGenerator,
}

impl HealthAgent {
    pub fn new(llm: Arc<dyn LanguageModel>, search: Arc<dyn SearchProvider>) -> Self {
        Self {
            router: IntentRouter::new(llm.clone()),
            general: GeneralGenerator::new(llm.clone()),
            medicine: MedicineGenerator::new(llm, search),
        }
    }

    /// Run one turn: route, generate, validate.
    ///
    /// Router failures were already absorbed into the general path; an
    /// error from here means the terminal generator itself failed, which
    /// the caller surfaces as the fixed fallback message.
    pub async fn respond(&self, request: &ChatRequest) -> Result<ChatReply, AgentError> {
        let route = self.router.route(&request.message, &request.history).await;

        match route {
            Route::General => {
                let reply = self.general.generate(request).await?;
                Ok(ChatReply::General(reply))
            }
            Route::Medicine { name } => {
                tracing::info!(medicine = %name, "Routing to medicine lookup");
                let answer = self.medicine.lookup(&name, &request.history).await?;
                Ok(ChatReply::Medicine(answer))
            }
        }
    }
}
