pub mod control;
pub mod integrity;
pub mod memory;
pub mod orchestrator;
pub mod progress;
pub mod task;
pub mod transport;

pub use control::DownloadControl;
pub use integrity::{IntegrityHash, IntegrityHasher};
pub use memory::{FailurePlan, MemoryObject, MemoryTransport};
pub use orchestrator::{
    part_path, DownloadOrchestrator, FailedArtifact, FetchOutcome, FetchReport,
    OrchestratorSettings, TaskReport,
};
pub use progress::{ignore_progress, AggregateProgress, ArtifactProgress, ProgressCallback};
pub use task::{DownloadTask, TaskStatus};
pub use transport::{ArtifactTransport, ReqwestTransport, TransferStream};
