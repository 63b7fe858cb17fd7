pub mod builder;
pub mod invocation;
pub mod natives;
pub mod process;

pub use builder::LaunchBuilder;
pub use invocation::LaunchInvocation;
pub use natives::extract_natives;
pub use process::{ProcessHandle, ProcessSink, RecordingProcessSink, SystemProcessSink};
