use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::dto::validation::validate_not_blank;

/// Payload registering the name a player appears under on the game host.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetAliasRequest {
    /// Name reported by the external host, matched exactly.
    pub alias: String,
}

impl Validate for SetAliasRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_not_blank(&self.alias) {
            errors.add("alias", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// One registered alias override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AliasSummary {
    pub player_id: String,
    pub alias: String,
}

/// Outcome of an alias removal.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClearAliasResponse {
    /// Whether an alias was registered for the player.
    pub removed: bool,
}
