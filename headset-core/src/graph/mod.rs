pub mod engine;
pub mod input_node;
pub mod player_node;
