pub mod composition;
pub mod frame_stats;
pub mod mouth_state;
pub mod primary_character;
