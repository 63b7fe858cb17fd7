use std::path::{Path, PathBuf};

use serde::Serialize;

/// Everything needed to start the game, kept structured until
/// [`LaunchInvocation::command_line`] flattens it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchInvocation {
    /// Java executable.
    pub runtime: PathBuf,
    pub entry_point: String,
    pub search_path_entries: Vec<PathBuf>,
    pub runtime_flags: Vec<String>,
    pub application_args: Vec<String>,
    pub working_directory: PathBuf,
    /// Variables to prefix onto the child's environment, e.g. the native
    /// library search path.
    pub environment: Vec<(String, String)>,
}

impl LaunchInvocation {
    /// Search path joined with the platform separator.
    pub fn classpath(&self) -> String {
        self.search_path_entries
            .iter()
            .map(|p| path_str(p))
            .collect::<Vec<_>>()
            .join(classpath_separator())
    }

    /// Arguments after the executable: flags, `-cp <classpath>`, entry point,
    /// application args.
    pub fn command_line(&self) -> Vec<String> {
        let mut args = self.runtime_flags.clone();
        if !self.search_path_entries.is_empty() {
            args.push("-cp".into());
            args.push(self.classpath());
        }
        args.push(self.entry_point.clone());
        args.extend(self.application_args.iter().cloned());
        args
    }

    /// Copy/paste-able command for logs. The access token is masked.
    pub fn display_command(&self, secret: Option<&str>) -> String {
        std::iter::once(path_str(&self.runtime))
            .chain(self.command_line())
            .map(|arg| match secret {
                Some(s) if !s.is_empty() && arg.contains(s) => arg.replace(s, "********"),
                _ => arg,
            })
            .map(|arg| shell_escape(&arg))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub fn classpath_separator() -> &'static str {
    if cfg!(target_os = "windows") {
        ";"
    } else {
        ":"
    }
}

/// Variable the JVM's native loader consults on this host.
pub fn native_library_var() -> &'static str {
    if cfg!(target_os = "windows") {
        "PATH"
    } else if cfg!(target_os = "macos") {
        "DYLD_LIBRARY_PATH"
    } else {
        "LD_LIBRARY_PATH"
    }
}

/// Path as a launch argument. Windows extended-length prefixes break
/// classpath handling in the JVM, so they are stripped.
pub fn path_str(path: &Path) -> String {
    let text = path.to_string_lossy().to_string();
    match text.strip_prefix(r"\\?\") {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

fn shell_escape(raw: &str) -> String {
    if raw.is_empty() {
        return "\"\"".to_string();
    }

    if raw.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '\\' | '=' | ';')
    }) {
        return raw.to_string();
    }

    format!("\"{}\"", raw.replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation() -> LaunchInvocation {
        LaunchInvocation {
            runtime: PathBuf::from("java"),
            entry_point: "net.minecraft.client.main.Main".into(),
            search_path_entries: vec![PathBuf::from("/d/libraries/a.jar"), PathBuf::from("/d/versions/v.jar")],
            runtime_flags: vec!["-Xmx1024M".into(), "-Xms512M".into()],
            application_args: vec!["--username".into(), "Steve".into(), "--accessToken".into(), "tok123".into()],
            working_directory: PathBuf::from("/d/minecraft"),
            environment: Vec::new(),
        }
    }

    #[test]
    fn command_line_orders_flags_classpath_entry_and_args() {
        let inv = invocation();
        let sep = classpath_separator();
        assert_eq!(
            inv.command_line(),
            vec![
                "-Xmx1024M".to_string(),
                "-Xms512M".into(),
                "-cp".into(),
                format!("/d/libraries/a.jar{}/d/versions/v.jar", sep),
                "net.minecraft.client.main.Main".into(),
                "--username".into(),
                "Steve".into(),
                "--accessToken".into(),
                "tok123".into(),
            ]
        );
    }

    #[test]
    fn empty_search_path_omits_classpath_switch() {
        let mut inv = invocation();
        inv.search_path_entries.clear();
        assert!(!inv.command_line().contains(&"-cp".to_string()));
    }

    #[test]
    fn display_command_masks_secret_and_quotes_spaces() {
        let mut inv = invocation();
        inv.application_args.push("--title".into());
        inv.application_args.push("My World".into());
        let shown = inv.display_command(Some("tok123"));
        assert!(shown.starts_with("java -Xmx1024M"));
        assert!(!shown.contains("tok123"));
        assert!(shown.contains("\"My World\""));
    }

    #[test]
    fn extended_length_prefix_is_stripped() {
        assert_eq!(path_str(Path::new(r"\\?\C:\game\lib.jar")), r"C:\game\lib.jar");
    }
}
