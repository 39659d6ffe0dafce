use serde::{Deserialize, Serialize};

use crate::dto::draft_dto::ActionType;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub team_name: String,
    pub champion: String,
    pub action: ActionType,
    pub expected_step: u8,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceRequest {
    pub expected_step: u8,
}
