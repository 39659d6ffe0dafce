use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SLOTS_PER_TEAM: usize = 5;

/// Slot-indexed champion names for one team. Empty string means unfilled.
pub type Slots = [String; SLOTS_PER_TEAM];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Blue,
    Red,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Blue => Side::Red,
            Side::Red => Side::Blue,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Blue => write!(f, "blue"),
            Side::Red => write!(f, "red"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Ban,
    Pick,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::Ban => write!(f, "ban"),
            ActionType::Pick => write!(f, "pick"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    #[default]
    Pending,
    Ready,
}

/// Which literal team occupies each side for one set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideTeams {
    pub blue: String,
    pub red: String,
}

impl SideTeams {
    /// Puts `team_name` on `side` and `opposite_team` on the other one.
    pub fn assign(side: Side, team_name: &str, opposite_team: &str) -> Self {
        match side {
            Side::Blue => Self { blue: team_name.to_string(), red: opposite_team.to_string() },
            Side::Red => Self { blue: opposite_team.to_string(), red: team_name.to_string() },
        }
    }

    pub fn get(&self, side: Side) -> &str {
        match side {
            Side::Blue => &self.blue,
            Side::Red => &self.red,
        }
    }

    pub fn set(&mut self, side: Side, team_name: &str) {
        match side {
            Side::Blue => self.blue = team_name.to_string(),
            Side::Red => self.red = team_name.to_string(),
        }
    }

    pub fn side_of(&self, team_name: &str) -> Option<Side> {
        if self.blue == team_name {
            Some(Side::Blue)
        } else if self.red == team_name {
            Some(Side::Red)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedFlags {
    pub blue_team: Readiness,
    pub red_team: Readiness,
}

impl StartedFlags {
    pub fn get(&self, side: Side) -> Readiness {
        match side {
            Side::Blue => self.blue_team,
            Side::Red => self.red_team,
        }
    }

    pub fn set(&mut self, side: Side, readiness: Readiness) {
        match side {
            Side::Blue => self.blue_team = readiness,
            Side::Red => self.red_team = readiness,
        }
    }

    pub fn both_ready(&self) -> bool {
        self.blue_team == Readiness::Ready && self.red_team == Readiness::Ready
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDraft {
    pub teams: SideTeams,
    pub current_step: u8,
    pub started: StartedFlags,
    pub ban: BTreeMap<String, Slots>,
    pub pick: BTreeMap<String, Slots>,
    pub started_at: Option<DateTime<Utc>>,
}

impl SetDraft {
    /// A set nobody has touched yet: step 0, both sides pending, all slots empty.
    pub fn fresh(teams: SideTeams) -> Self {
        let empty = || {
            BTreeMap::from([
                (teams.blue.clone(), Slots::default()),
                (teams.red.clone(), Slots::default()),
            ])
        };
        Self {
            ban: empty(),
            pick: empty(),
            teams,
            current_step: 0,
            started: StartedFlags::default(),
            started_at: None,
        }
    }

    pub fn slots(&self, action: ActionType) -> &BTreeMap<String, Slots> {
        match action {
            ActionType::Ban => &self.ban,
            ActionType::Pick => &self.pick,
        }
    }

    pub fn slots_mut(&mut self, action: ActionType) -> &mut BTreeMap<String, Slots> {
        match action {
            ActionType::Ban => &mut self.ban,
            ActionType::Pick => &mut self.pick,
        }
    }

    /// Every non-empty champion name in this set's bans and picks.
    pub fn selections(&self) -> impl Iterator<Item = &str> {
        self.ban
            .values()
            .chain(self.pick.values())
            .flat_map(|slots| slots.iter())
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDraft {
    pub mode: String,
    pub is_next_set_preparing: bool,
    pub current_set: u32,
    pub total: BTreeMap<String, Vec<String>>,
    pub sets: BTreeMap<u32, SetDraft>,
}

impl MatchDraft {
    pub fn new(mode: &str, team_name: &str, opposite_team: &str, initial_side: Side) -> Self {
        let first_set = 1;
        Self {
            mode: mode.to_string(),
            is_next_set_preparing: false,
            current_set: first_set,
            total: BTreeMap::from([
                (team_name.to_string(), Vec::new()),
                (opposite_team.to_string(), Vec::new()),
            ]),
            sets: BTreeMap::from([(
                first_set,
                SetDraft::fresh(SideTeams::assign(initial_side, team_name, opposite_team)),
            )]),
        }
    }

    pub fn active_set(&self) -> Option<&SetDraft> {
        self.sets.get(&self.current_set)
    }

    pub fn active_set_mut(&mut self) -> Option<&mut SetDraft> {
        self.sets.get_mut(&self.current_set)
    }

    /// Fearless modes forbid re-picking anything already in a cross-set total.
    pub fn is_fearless(&self) -> bool {
        self.mode.to_ascii_lowercase().contains("fearless")
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDraft {
    pub r#type: String,
    pub match_id: String,
    pub draft: MatchDraft,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_draft_serializes_to_document_shape() {
        let draft = MatchDraft::new("blind", "TeamA", "TeamB", Side::Blue);
        let value = serde_json::to_value(&draft).unwrap();

        assert_eq!(value["currentSet"], json!(1));
        assert_eq!(value["isNextSetPreparing"], json!(false));
        assert_eq!(value["sets"]["1"]["teams"], json!({"blue": "TeamA", "red": "TeamB"}));
        assert_eq!(value["sets"]["1"]["started"], json!({"blueTeam": "pending", "redTeam": "pending"}));
        assert_eq!(value["sets"]["1"]["ban"]["TeamA"], json!(["", "", "", "", ""]));
        assert_eq!(value["sets"]["1"]["startedAt"], json!(null));
        assert_eq!(value["total"]["TeamB"], json!([]));
    }

    #[test]
    fn document_round_trips_through_json_text() {
        let mut draft = MatchDraft::new("fearless", "TeamA", "TeamB", Side::Red);
        draft.active_set_mut().unwrap().started_at = Some(Utc::now());
        let text = serde_json::to_string(&draft).unwrap();
        let back: MatchDraft = serde_json::from_str(&text).unwrap();
        assert_eq!(back, draft);
        assert!(back.is_fearless());
    }

    #[test]
    fn side_teams_resolve_names() {
        let teams = SideTeams::assign(Side::Red, "TeamA", "TeamB");
        assert_eq!(teams.get(Side::Red), "TeamA");
        assert_eq!(teams.side_of("TeamB"), Some(Side::Blue));
        assert_eq!(teams.side_of("Nobody"), None);
    }

    #[test]
    fn wrong_slot_count_is_rejected() {
        let text = r#"{"teams":{"blue":"A","red":"B"},"currentStep":0,
            "started":{"blueTeam":"pending","redTeam":"pending"},
            "ban":{"A":["","",""]},"pick":{},"startedAt":null}"#;
        assert!(serde_json::from_str::<SetDraft>(text).is_err());
    }
}
