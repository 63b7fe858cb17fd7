mod artifact;

pub use artifact::MavenArtifact;

/// Repositories used when a loader library does not name its own.
pub const MAVEN_CENTRAL: &str = "https://repo1.maven.org/maven2";
pub const FABRIC_MAVEN: &str = "https://maven.fabricmc.net";
pub const QUILT_MAVEN: &str = "https://maven.quiltmc.org/repository/release";

/// Pick the default repository for a loader id.
pub fn default_repository(loader_id: &str) -> &'static str {
    match loader_id {
        "fabric" => FABRIC_MAVEN,
        "quilt" => QUILT_MAVEN,
        _ => MAVEN_CENTRAL,
    }
}
