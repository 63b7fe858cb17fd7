// ─── Native Extraction ───
// Unpacks platform libraries from native archives into the natives directory.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};

const NATIVE_SUFFIXES: [&str; 4] = [".dll", ".so", ".dylib", ".jnilib"];

/// Recreate `natives_dir` and fill it with the native libraries found at the
/// top level of each archive. Returns the number of files written.
pub async fn extract_natives(archives: Vec<PathBuf>, natives_dir: PathBuf) -> LauncherResult<usize> {
    // Clean previous session
    if natives_dir.exists() {
        let _ = tokio::fs::remove_dir_all(&natives_dir).await;
    }
    tokio::fs::create_dir_all(&natives_dir)
        .await
        .map_err(|e| LauncherError::io(&natives_dir, e))?;

    let mut extracted = 0;
    for archive in archives {
        let bytes = tokio::fs::read(&archive)
            .await
            .map_err(|e| LauncherError::io(&archive, e))?;

        let dest_dir = natives_dir.clone();
        extracted += tokio::task::spawn_blocking(move || unpack(bytes, &dest_dir))
            .await
            .map_err(|e| LauncherError::Other(format!("Task join error: {}", e)))??;
    }

    info!("Extracted {} native file(s) into {:?}", extracted, natives_dir);
    Ok(extracted)
}

fn unpack(bytes: Vec<u8>, dest_dir: &Path) -> LauncherResult<usize> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut count = 0;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let name = file.name().to_string();

        if name.contains("META-INF") || name.contains('/') || name.contains('\\') {
            continue;
        }
        if !NATIVE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
            continue;
        }

        let dest = dest_dir.join(&name);
        let mut out = std::fs::File::create(&dest).map_err(|e| LauncherError::io(&dest, e))?;
        std::io::copy(&mut file, &mut out).map_err(|e| LauncherError::io(&dest, e))?;
        debug!("Extracted native: {}", name);
        count += 1;
    }

    Ok(count)
}
