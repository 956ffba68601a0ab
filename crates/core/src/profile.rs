//! User health profile
//!
//! Read-only enrichment data fetched from the external document store.

use serde::{Deserialize, Serialize};

/// Health profile attached to a generation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthProfile {
    /// Known allergies
    #[serde(default)]
    pub allergies: Vec<String>,
    /// Chronic conditions
    #[serde(default)]
    pub chronic_conditions: Vec<String>,
    /// Emergency contact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<String>,
}

impl HealthProfile {
    /// Whether the profile carries anything worth conditioning on
    pub fn is_empty(&self) -> bool {
        self.allergies.is_empty()
            && self.chronic_conditions.is_empty()
            && self.emergency_contact.is_none()
    }

    /// Render the profile as prompt context
    pub fn prompt_context(&self) -> String {
        let mut lines = Vec::new();
        if !self.allergies.is_empty() {
            lines.push(format!("Allergies: {}", self.allergies.join(", ")));
        }
        if !self.chronic_conditions.is_empty() {
            lines.push(format!(
                "Chronic conditions: {}",
                self.chronic_conditions.join(", ")
            ));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_profile() {
        assert!(HealthProfile::default().is_empty());
    }

    #[test]
    fn test_prompt_context() {
        let profile = HealthProfile {
            allergies: vec!["penicillin".to_string()],
            chronic_conditions: vec!["asthma".to_string()],
            emergency_contact: None,
        };
        let context = profile.prompt_context();
        assert!(context.contains("penicillin"));
        assert!(context.contains("asthma"));
    }
}
