pub mod champion_dto;
pub mod draft_dto;
pub mod match_dto;
pub mod turn_dto;
