use serde::{Deserialize, Serialize};

use crate::dto::draft_dto::Side;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitMatch {
    pub mode: String,
    pub team_name: String,
    pub opposite_team: String,
    pub initial_side: Side,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyRequest {
    pub team_name: String,
    #[serde(default)]
    pub initial_side: Option<Side>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PreparingRequest {
    pub value: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextSetRequest {
    pub winning_side: Side,
    pub team_name: String,
    pub opposite_team: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalRequest {
    pub team_name: String,
}
