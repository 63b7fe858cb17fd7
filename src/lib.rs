pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::auth::{AccountKind, Identity, IdentityProvider, StaticIdentityProvider};
pub use crate::core::catalog::ArtifactCatalog;
pub use crate::core::config::{InstallLayout, LauncherConfig};
pub use crate::core::coordinator::{InstallReport, LaunchCoordinator};
pub use crate::core::downloader::{
    ArtifactTransport, DownloadControl, DownloadOrchestrator, FetchOutcome, ReqwestTransport,
};
pub use crate::core::error::{LauncherError, LauncherResult};
pub use crate::core::launch::{LaunchBuilder, LaunchInvocation, ProcessSink, SystemProcessSink};
pub use crate::core::resolver::{DependencyResolver, ResolvedManifest};
pub use crate::core::state::{JsonFileSettingsStore, SettingsStore};

/// Install the fmt subscriber with `RUST_LOG` or the crate default filter.
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,interface_core=debug")),
        )
        .try_init();
}
