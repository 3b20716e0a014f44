pub mod day_number;
pub mod db;
pub mod export;
pub mod food_cache;
pub mod import;
pub mod macrofactor;
pub mod models;
pub mod sheet;
