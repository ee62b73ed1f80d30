use crate::domain::advisory::{AdvisoryOutput, Provenance};
use crate::domain::wizard::WizardInput;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A completed wizard run as persisted in the history list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub input: WizardInput,
    pub results: AdvisoryOutput,
    /// True when `results` came from the model rather than local synthesis.
    pub is_real_time: bool,
    #[serde(default)]
    pub has_advanced_opt_in: bool,
}

impl Simulation {
    pub fn new(input: WizardInput, results: AdvisoryOutput, created_at: DateTime<Utc>) -> Self {
        let is_real_time = results.provenance == Provenance::Model;
        let has_advanced_opt_in = input.wants_advanced_analysis();
        Self {
            id: Uuid::new_v4(),
            created_at,
            input,
            results,
            is_real_time,
            has_advanced_opt_in,
        }
    }
}
