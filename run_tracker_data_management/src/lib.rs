use const_format::concatcp;

pub mod database;
mod data_manager;
mod gpx_util;

pub use data_manager::*;
pub use gpx_util::run_to_gpx;

pub const DATA_DIR: &str = "data/";
pub const DATABASE_PATH: &str = concatcp!(DATA_DIR, "database.db");

#[derive(Debug)]
pub enum DataManagerError {
    Database(String),
    Export(String),
}
