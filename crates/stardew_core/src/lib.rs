pub mod core_api;
pub mod entity;
pub mod enumerate;
pub mod filter;
pub mod flatten;
pub mod game_data;
pub mod saves;
pub mod xml;
