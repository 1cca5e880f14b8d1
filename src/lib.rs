pub mod average;
pub mod cli;
pub mod compliance;
pub mod config;
pub mod decode;
pub mod diagnostics;
pub mod error;
pub mod format;
pub mod metadata;
pub mod pipeline;
pub mod report;
pub mod section;
pub mod text;
pub mod util;
pub mod vocabulary;
