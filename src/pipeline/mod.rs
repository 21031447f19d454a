// file: src/pipeline/mod.rs
// description: pipeline module exports and public api
// reference: pipeline orchestration

pub mod batch;
pub mod driver;
pub mod maintenance;
pub mod mapper;
mod progress;

pub use batch::{Batch, BatchSettings, BatchingPipeline};
pub use driver::{MigrationDriver, migrate};
pub use maintenance::NamespaceMaintenance;
pub use mapper::{build_text, map_row};
pub use progress::{MigrationStats, ProgressTracker, TableProgress, TableStats};
