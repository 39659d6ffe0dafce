pub mod champion_catalog;
pub mod change_feed;
pub mod initializer;
pub mod phase_script;
pub mod readiness;
pub mod session;
pub mod set_advancer;
pub mod totals;
pub mod turn_coordinator;
pub mod turn_timer;
pub mod websocket;
