pub mod constants;
pub mod game_loop;
pub mod input_buffer;
pub mod leaderboard;
pub mod placement;
pub mod state;
pub mod systems;
