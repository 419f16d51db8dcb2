//! Core types, configuration and the ingest-side text pipeline: episode
//! identity parsing, SubRip reading and token-bounded chunking.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod chunker;
pub mod config;
pub mod data_processor;
pub mod error;
pub mod identity;
pub mod subtitle;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
