pub use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use tera::Tera;

pub mod cacti;
pub mod cli;
pub mod config;
pub mod dims;
pub mod error;
pub mod grid;
pub mod layout;
pub mod lef;
pub mod liberty;
pub mod paths;
pub mod plan;
pub mod tech_override;

lazy_static! {
    pub static ref TEMPLATES: Tera =
        match Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/*")) {
            Ok(t) => t,
            Err(e) => panic!("Error parsing templates: {e}"),
        };
}
