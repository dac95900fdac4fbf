pub mod compaction;
pub mod entity;
pub mod keys;
pub mod log;
pub mod pipeline;
pub mod stages;

pub use compaction::Compactor;
pub use entity::{LogStage, MvccEntity, MvccLogEntry};
pub use log::MvccLogReader;
pub use pipeline::WritePipeline;
pub use stages::{Create, MarkCommit, MarkStart, Update, WriteCommit, WriteStart, WriteVerifier, WriteVerify};
