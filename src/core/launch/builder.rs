// ─── Launch Parameter Builder ───
// Turns a resolved manifest, the active identity and the user's settings
// into an ordered `LaunchInvocation`. Pure: no filesystem or env access.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::invocation::{classpath_separator, native_library_var, path_str, LaunchInvocation};
use crate::core::auth::Identity;
use crate::core::catalog::ArgumentToken;
use crate::core::config::{InstallLayout, LauncherConfig};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::resolver::ResolvedManifest;
use crate::core::state::LaunchSettings;

pub const DEFAULT_SERVER_PORT: u16 = 25565;
const MIN_HEAP_CAP_MB: u32 = 512;

/// Classpath switches in templates; the invocation emits its own.
const CLASSPATH_SWITCHES: [&str; 3] = ["-cp", "-classpath", "--class-path"];
const BRAND_PROPERTY: &str = "-Dminecraft.launcher.brand=";
const VERSION_PROPERTY: &str = "-Dminecraft.launcher.version=";

#[derive(Debug, Clone)]
pub struct LaunchBuilder {
    layout: InstallLayout,
    launcher_name: String,
    launcher_version: String,
}

impl LaunchBuilder {
    pub fn new(
        layout: InstallLayout,
        launcher_name: impl Into<String>,
        launcher_version: impl Into<String>,
    ) -> Self {
        Self {
            layout,
            launcher_name: launcher_name.into(),
            launcher_version: launcher_version.into(),
        }
    }

    pub fn from_config(config: &LauncherConfig) -> Self {
        Self::new(
            config.layout(),
            config.launcher_name.clone(),
            config.launcher_version.clone(),
        )
    }

    pub fn build(
        &self,
        manifest: &ResolvedManifest,
        identity: &Identity,
        settings: &LaunchSettings,
    ) -> LauncherResult<LaunchInvocation> {
        let meta = &manifest.runtime_metadata;
        let entry_point = meta
            .entry_point
            .clone()
            .ok_or_else(|| LauncherError::MissingEntryPoint(meta.version_name.clone()))?;

        validate(settings)?;
        let server = settings
            .direct_connect
            .as_deref()
            .map(str::trim)
            .filter(|target| !target.is_empty())
            .map(split_server_target)
            .transpose()?;

        let game_dir = settings
            .game_directory
            .clone()
            .unwrap_or_else(|| self.layout.game_dir());
        let natives_dir = self.layout.natives_dir(&meta.version_name);
        let search_path_entries: Vec<PathBuf> = manifest
            .search_path_artifacts()
            .map(|a| self.layout.resolve(&a.target_path))
            .collect();

        let bindings = self.bindings(manifest, identity, settings, &game_dir, &natives_dir, &search_path_entries);
        let lookup = |key: &str| bindings.get(key).map(String::as_str);

        // ── Runtime flags ──
        let mut runtime_flags = vec![
            format!("-Xmx{}M", settings.memory_mb),
            format!("-Xms{}M", settings.memory_mb.min(MIN_HEAP_CAP_MB)),
        ];
        runtime_flags.extend(
            settings
                .extra_jvm_flags
                .split_whitespace()
                .map(str::to_string),
        );
        runtime_flags.push(format!("{}{}", BRAND_PROPERTY, self.launcher_name));
        runtime_flags.push(format!("{}{}", VERSION_PROPERTY, self.launcher_version));
        runtime_flags.extend(
            render_runtime_template(&meta.jvm_template, &lookup)
                .into_iter()
                .filter(|flag| !flag.starts_with(BRAND_PROPERTY) && !flag.starts_with(VERSION_PROPERTY)),
        );

        // ── Application args ──
        let mut application_args: Vec<String> =
            meta.game_template.iter().map(|t| t.render(&lookup)).collect();

        if !meta.game_template.iter().any(|t| t.is_literal("--width")) {
            application_args.push("--width".into());
            application_args.push(settings.display_width.to_string());
            application_args.push("--height".into());
            application_args.push(settings.display_height.to_string());
        }

        if let Some((host, port)) = server {
            application_args.push("--server".into());
            application_args.push(host);
            application_args.push("--port".into());
            application_args.push(port.to_string());
        }

        let runtime = settings
            .java_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("java"));

        debug!(
            "Built invocation for {}: {} flags, {} search path entries, {} args",
            meta.version_name,
            runtime_flags.len(),
            search_path_entries.len(),
            application_args.len()
        );

        Ok(LaunchInvocation {
            runtime,
            entry_point,
            search_path_entries,
            runtime_flags,
            application_args,
            working_directory: game_dir,
            environment: vec![(native_library_var().to_string(), path_str(&natives_dir))],
        })
    }

    fn bindings(
        &self,
        manifest: &ResolvedManifest,
        identity: &Identity,
        settings: &LaunchSettings,
        game_dir: &Path,
        natives_dir: &Path,
        search_path: &[PathBuf],
    ) -> HashMap<&'static str, String> {
        let meta = &manifest.runtime_metadata;
        let assets_root = path_str(&self.layout.assets_dir());
        let classpath = search_path
            .iter()
            .map(|p| path_str(p))
            .collect::<Vec<_>>()
            .join(classpath_separator());

        let mut bindings = HashMap::from([
            ("auth_player_name", identity.display_name.clone()),
            ("auth_uuid", identity.unique_id.clone()),
            ("auth_access_token", identity.credential_token.clone()),
            ("auth_session", identity.credential_token.clone()),
            ("auth_xuid", identity.xuid.clone()),
            ("clientid", identity.client_id.clone()),
            ("user_type", identity.user_type().to_string()),
            ("user_properties", "{}".to_string()),
            ("version_name", meta.version_name.clone()),
            ("version_type", meta.version_kind.to_string()),
            ("game_directory", path_str(game_dir)),
            ("assets_root", assets_root.clone()),
            ("game_assets", assets_root),
            ("resolution_width", settings.display_width.to_string()),
            ("resolution_height", settings.display_height.to_string()),
            ("natives_directory", path_str(natives_dir)),
            ("library_directory", path_str(&self.layout.libraries_dir())),
            ("classpath", classpath),
            ("classpath_separator", classpath_separator().to_string()),
            ("launcher_name", self.launcher_name.clone()),
            ("launcher_version", self.launcher_version.clone()),
        ]);
        if let Some(index) = &meta.asset_index {
            bindings.insert("assets_index_name", index.id.clone());
        }
        bindings
    }
}

fn validate(settings: &LaunchSettings) -> LauncherResult<()> {
    for (name, value) in [
        ("memory_mb", settings.memory_mb),
        ("display_width", settings.display_width),
        ("display_height", settings.display_height),
    ] {
        if value == 0 {
            return Err(LauncherError::InvalidSettings(format!("{} must be positive", name)));
        }
    }
    Ok(())
}

/// Render the runtime template, dropping classpath switches and their value.
fn render_runtime_template<'a, F>(template: &[ArgumentToken], lookup: &F) -> Vec<String>
where
    F: Fn(&str) -> Option<&'a str>,
{
    let mut flags = Vec::with_capacity(template.len());
    let mut tokens = template.iter();
    while let Some(token) = tokens.next() {
        if CLASSPATH_SWITCHES.iter().any(|switch| token.is_literal(switch)) {
            tokens.next();
            continue;
        }
        flags.push(token.render(lookup));
    }
    flags
}

/// `host[:port]`, splitting on the last colon.
fn split_server_target(target: &str) -> LauncherResult<(String, u16)> {
    let invalid = || LauncherError::InvalidSettings(format!("invalid server address: {}", target));

    let (host, port) = match target.rsplit_once(':') {
        // A bare IPv6 literal has colons but no port.
        Some((host, _)) if host.contains(':') && !host.ends_with(']') => {
            (target.to_string(), DEFAULT_SERVER_PORT)
        }
        Some((host, port)) => {
            let port: u16 = port.parse().map_err(|_| invalid())?;
            (host.to_string(), port)
        }
        None => (target.to_string(), DEFAULT_SERVER_PORT),
    };

    if host.is_empty() || port == 0 {
        return Err(invalid());
    }
    Ok((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::tests::fixture_catalog;
    use crate::core::catalog::Platform;
    use crate::core::resolver::DependencyResolver;
    use std::sync::Arc;

    fn manifest(version: &str, loader: Option<&str>) -> ResolvedManifest {
        DependencyResolver::new(Arc::new(fixture_catalog()))
            .with_platform(Platform::new("linux", "x86_64"))
            .resolve(version, loader)
            .unwrap()
    }

    fn builder() -> LaunchBuilder {
        LaunchBuilder::new(InstallLayout::new(PathBuf::from("/data")), "InterfaceOficial", "1.0.0")
    }

    fn steve() -> Identity {
        Identity {
            display_name: "Steve".into(),
            unique_id: "u-1".into(),
            credential_token: "token-abc".into(),
            account_kind: crate::core::auth::AccountKind::Microsoft,
            xuid: "42".into(),
            client_id: "client".into(),
        }
    }

    fn settings(memory_mb: u32) -> LaunchSettings {
        LaunchSettings {
            memory_mb,
            ..LaunchSettings::default()
        }
    }

    #[test]
    fn heap_flags_follow_memory_setting() {
        let m = manifest("1.20.4", None);
        let inv = builder().build(&m, &steve(), &settings(1024)).unwrap();
        assert_eq!(inv.runtime_flags[..2], ["-Xmx1024M", "-Xms512M"]);

        let inv = builder().build(&m, &steve(), &settings(256)).unwrap();
        assert_eq!(inv.runtime_flags[..2], ["-Xmx256M", "-Xms256M"]);
    }

    #[test]
    fn identity_placeholders_are_substituted_in_order() {
        let m = manifest("1.20.4", None);
        let inv = builder().build(&m, &steve(), &settings(2048)).unwrap();

        assert_eq!(
            inv.application_args,
            vec![
                "--username", "Steve",
                "--version", "1.20.4",
                "--gameDir", "/data/minecraft",
                "--assetsDir", "/data/assets",
                "--assetIndex", "12",
                "--uuid", "u-1",
                "--accessToken", "token-abc",
                "--userType", "msa",
                "--versionType", "release",
                "--width", "854",
                "--height", "480",
            ]
        );
        assert_eq!(inv.entry_point, "net.minecraft.client.main.Main");
        assert_eq!(inv.working_directory, PathBuf::from("/data/minecraft"));
    }

    #[test]
    fn runtime_flags_are_ordered_and_drop_template_classpath() {
        let m = manifest("1.20.4", None);
        let mut s = settings(2048);
        s.extra_jvm_flags = "  -XX:+UseG1GC   -Dfoo=bar ".into();
        let inv = builder().build(&m, &steve(), &s).unwrap();

        assert_eq!(
            inv.runtime_flags,
            vec![
                "-Xmx2048M",
                "-Xms512M",
                "-XX:+UseG1GC",
                "-Dfoo=bar",
                "-Dminecraft.launcher.brand=InterfaceOficial",
                "-Dminecraft.launcher.version=1.0.0",
                "-Djava.library.path=/data/natives/1.20.4",
            ]
        );
    }

    #[test]
    fn search_path_keeps_manifest_order_and_skips_non_code_artifacts() {
        let m = manifest("1.20.4", Some("fabric"));
        let inv = builder().build(&m, &steve(), &settings(2048)).unwrap();

        let expected: Vec<PathBuf> = m
            .artifacts
            .iter()
            .filter(|a| a.on_search_path())
            .map(|a| PathBuf::from("/data").join(&a.target_path))
            .collect();
        assert_eq!(inv.search_path_entries, expected);
        assert_eq!(inv.search_path_entries[0], PathBuf::from("/data/versions/1.20.4/1.20.4.jar"));
        assert!(inv.search_path_entries.iter().all(|p| p.extension().is_some_and(|e| e == "jar")));
    }

    #[test]
    fn loader_build_uses_loader_entry_point_and_tokens() {
        let m = manifest("1.20.4", Some("fabric"));
        let inv = builder().build(&m, &steve(), &settings(2048)).unwrap();
        assert_eq!(inv.entry_point, "net.fabricmc.loader.impl.launch.knot.KnotClient");
        assert_eq!(
            inv.runtime_flags.last().map(String::as_str),
            Some("-DFabricMcEmu= net.minecraft.client.main.Main ")
        );
        assert!(inv.application_args.contains(&"1.20.4-fabric-0.15.6".to_string()));
    }

    #[test]
    fn unknown_placeholders_pass_through() {
        let mut m = manifest("1.20.4", None);
        m.runtime_metadata.game_template.push(ArgumentToken::parse("--quickPlayPath"));
        m.runtime_metadata.game_template.push(ArgumentToken::parse("${quickPlayPath}"));
        let inv = builder().build(&m, &steve(), &settings(2048)).unwrap();
        assert!(inv.application_args.contains(&"${quickPlayPath}".to_string()));
    }

    #[test]
    fn direct_connect_appends_server_and_port() {
        let m = manifest("1.20.4", None);
        let mut s = settings(2048);
        s.direct_connect = Some("play.example.net:25570".into());
        let inv = builder().build(&m, &steve(), &s).unwrap();
        assert_eq!(
            inv.application_args[inv.application_args.len() - 4..],
            ["--server", "play.example.net", "--port", "25570"]
        );

        s.direct_connect = Some("play.example.net".into());
        let inv = builder().build(&m, &steve(), &s).unwrap();
        assert_eq!(inv.application_args.last().map(String::as_str), Some("25565"));
    }

    #[test]
    fn server_target_parsing() {
        assert_eq!(split_server_target("[::1]:25566").unwrap(), ("[::1]".to_string(), 25566));
        assert_eq!(split_server_target("::1").unwrap(), ("::1".to_string(), DEFAULT_SERVER_PORT));
        assert!(split_server_target("host:notaport").is_err());
        assert!(split_server_target("host:0").is_err());
        assert!(split_server_target(":25565").is_err());
    }

    #[test]
    fn legacy_versions_get_natives_flag_and_legacy_args() {
        let m = manifest("1.12.2", None);
        let inv = builder().build(&m, &steve(), &settings(2048)).unwrap();
        assert!(inv.runtime_flags.contains(&"-Djava.library.path=/data/natives/1.12.2".to_string()));
        assert_eq!(inv.application_args[..2], ["--username", "Steve"]);
    }

    #[test]
    fn missing_entry_point_is_rejected() {
        let m = manifest("broken-1.0", None);
        let err = builder().build(&m, &steve(), &settings(2048)).unwrap_err();
        assert!(matches!(err, LauncherError::MissingEntryPoint(v) if v == "broken-1.0"));
    }

    #[test]
    fn non_positive_numbers_are_rejected() {
        let m = manifest("1.20.4", None);
        for s in [
            settings(0),
            LaunchSettings { display_width: 0, ..LaunchSettings::default() },
            LaunchSettings { display_height: 0, ..LaunchSettings::default() },
        ] {
            assert!(matches!(
                builder().build(&m, &steve(), &s),
                Err(LauncherError::InvalidSettings(_))
            ));
        }
    }

    #[test]
    fn build_is_deterministic() {
        let m = manifest("1.20.4", Some("fabric"));
        let mut s = settings(3072);
        s.direct_connect = Some("localhost:25565".into());
        let first = builder().build(&m, &steve(), &s).unwrap();
        let second = builder().build(&m, &steve(), &s).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.command_line(), second.command_line());
    }
}
