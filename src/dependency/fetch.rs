//! Manifest-driven artifact installer
//!
//! Downloads a dependency archive into its cache slot (or reuses a verified
//! copy already there), checks its SHA-256 and unpacks it into the staging
//! location.

use crate::dependency::installer::ArtifactInstaller;
use crate::dependency::manifest::BuildpackManifest;
use crate::dependency::Dependency;
use crate::error::{BuildpackError, BuildpackResult};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};

/// Installs dependencies listed in the buildpack manifest
pub struct ManifestInstaller {
    manifest: Arc<BuildpackManifest>,
}

impl ManifestInstaller {
    pub fn new(manifest: Arc<BuildpackManifest>) -> Self {
        Self { manifest }
    }
}

#[async_trait]
impl ArtifactInstaller for ManifestInstaller {
    async fn install(
        &self,
        dependency: &Dependency,
        cache_slot: &Path,
        target: &Path,
    ) -> BuildpackResult<()> {
        let entry = self
            .manifest
            .entry(&dependency.name, &dependency.version)
            .ok_or_else(|| {
                BuildpackError::install_failed(
                    &dependency.name,
                    format!("version {} is not listed in manifest.yml", dependency.version),
                )
            })?;

        let archive = cache_slot.join(archive_name(&entry.uri));

        if is_verified(&archive, &entry.sha256).await? {
            info!("       Using cached {}", dependency.dir_name);
        } else {
            fs::create_dir_all(cache_slot).await.map_err(|e| {
                BuildpackError::io(format!("creating cache slot {}", cache_slot.display()), e)
            })?;

            info!("       Downloading {}", redact(&entry.uri));
            let partial = archive.with_extension("part");
            fetch(&entry.uri, &partial).await?;

            let actual = sha256_file(&partial).await?;
            if !actual.eq_ignore_ascii_case(&entry.sha256) {
                let _ = fs::remove_file(&partial).await;
                return Err(BuildpackError::ChecksumMismatch {
                    dependency: dependency.name.clone(),
                    expected: entry.sha256.clone(),
                    actual,
                });
            }
            fs::rename(&partial, &archive)
                .await
                .map_err(|e| BuildpackError::io(format!("storing {}", archive.display()), e))?;
        }

        extract(&archive, target).await
    }
}

/// Last path segment of a URI, without query string
fn archive_name(uri: &str) -> String {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    path.rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or("artifact")
        .to_string()
}

/// Strip user info from a URI before logging it
fn redact(uri: &str) -> String {
    match (uri.find("://"), uri.find('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://-redacted-@{}", &uri[..scheme_end], &uri[at + 1..])
        }
        _ => uri.to_string(),
    }
}

async fn is_verified(archive: &Path, sha256: &str) -> BuildpackResult<bool> {
    match fs::metadata(archive).await {
        Ok(meta) if meta.is_file() => {}
        _ => return Ok(false),
    }
    let actual = sha256_file(archive).await?;
    let verified = actual.eq_ignore_ascii_case(sha256);
    if !verified {
        debug!("Cached archive {} failed verification", archive.display());
    }
    Ok(verified)
}

/// Hex SHA-256 of a file
pub async fn sha256_file(path: &Path) -> BuildpackResult<String> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> BuildpackResult<String> {
        let mut file = std::fs::File::open(&path)
            .map_err(|e| BuildpackError::io(format!("opening {}", path.display()), e))?;
        let mut hasher = Sha256::new();
        std::io::copy(&mut file, &mut hasher)
            .map_err(|e| BuildpackError::io(format!("hashing {}", path.display()), e))?;
        Ok(hex::encode(hasher.finalize()))
    })
    .await
    .map_err(|e| BuildpackError::Internal(format!("hash task failed: {e}")))?
}

/// Copy a `file://` URI or plain path, or download over HTTP(S)
async fn fetch(uri: &str, dest: &Path) -> BuildpackResult<()> {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        return download(uri, dest).await;
    }

    let source = PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri));
    fs::copy(&source, dest)
        .await
        .map(|_| ())
        .map_err(|e| BuildpackError::io(format!("copying {}", source.display()), e))
}

async fn download(url: &str, dest: &Path) -> BuildpackResult<()> {
    let url = url.to_string();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || -> BuildpackResult<()> {
        let response = ureq::get(url.as_str())
            .call()
            .map_err(|e| BuildpackError::Download {
                url: redact(&url),
                reason: e.to_string(),
            })?;

        let mut reader = response.into_body().into_reader();
        let mut file = std::fs::File::create(&dest)
            .map_err(|e| BuildpackError::io(format!("creating {}", dest.display()), e))?;
        std::io::copy(&mut reader, &mut file).map_err(|e| BuildpackError::Download {
            url: redact(&url),
            reason: e.to_string(),
        })?;
        Ok(())
    })
    .await
    .map_err(|e| BuildpackError::Internal(format!("download task failed: {e}")))?
}

/// Unpack an archive into `target`; plain files are copied as executables
async fn extract(archive: &Path, target: &Path) -> BuildpackResult<()> {
    fs::create_dir_all(target)
        .await
        .map_err(|e| BuildpackError::io(format!("creating {}", target.display()), e))?;

    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut cmd = if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        let mut cmd = Command::new("tar");
        cmd.arg("xzf").arg(archive).arg("-C").arg(target);
        cmd
    } else if name.ends_with(".tar.xz") {
        let mut cmd = Command::new("tar");
        cmd.arg("xJf").arg(archive).arg("-C").arg(target);
        cmd
    } else if name.ends_with(".zip") {
        let mut cmd = Command::new("unzip");
        cmd.arg("-q").arg("-o").arg(archive).arg("-d").arg(target);
        cmd
    } else {
        return copy_executable(archive, &target.join(&name)).await;
    };

    debug!("Extracting {} to {}", archive.display(), target.display());
    let output = cmd
        .output()
        .await
        .map_err(|e| BuildpackError::command_failed(format!("extract {name}"), e))?;

    if !output.status.success() {
        return Err(BuildpackError::command_exec(
            format!("extract {name}"),
            String::from_utf8_lossy(&output.stderr).trim(),
        ));
    }
    Ok(())
}

async fn copy_executable(source: &Path, dest: &Path) -> BuildpackResult<()> {
    fs::copy(source, dest)
        .await
        .map_err(|e| BuildpackError::io(format!("copying {}", source.display()), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dest, std::fs::Permissions::from_mode(0o755))
            .await
            .map_err(|e| BuildpackError::io(format!("setting mode on {}", dest.display()), e))?;
    }
    Ok(())
}
