//! Service layer: diff engine, insertion handler and bus worker.

pub mod diff_engine;
pub mod insertion_handler;
pub mod worker;

pub use diff_engine::DiffEngine;
pub use insertion_handler::InsertionHandler;
