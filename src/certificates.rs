//! User certificates shipped in `<build>/certificates`

use crate::error::{BuildpackError, BuildpackResult};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

/// Directory of the application holding `<name>.crt` files
pub const CERTIFICATES_DIR: &str = "certificates";

const CRT_SUFFIX: &str = ".crt";

/// Map certificate name to file name for every `.crt` in `dir`.
///
/// A missing or unreadable directory yields an empty map.
pub async fn local_certificates(dir: &Path) -> BTreeMap<String, String> {
    let mut certs = BTreeMap::new();
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot read certificates directory {}: {}", dir.display(), e);
            return certs;
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if let Some(name) = file_name.strip_suffix(CRT_SUFFIX) {
            if !name.is_empty() && !name.contains(CRT_SUFFIX) {
                certs.insert(name.to_string(), file_name.clone());
            }
        }
    }
    certs
}

/// Runtime paths of the configured certificates, in configured order
pub async fn resolve_certificates(
    build_dir: &Path,
    configured: &[String],
) -> BuildpackResult<Vec<String>> {
    if configured.is_empty() {
        return Ok(vec![]);
    }

    let local = local_certificates(&build_dir.join(CERTIFICATES_DIR)).await;
    configured
        .iter()
        .map(|name| -> BuildpackResult<String> {
            let file = local
                .get(name)
                .ok_or_else(|| BuildpackError::CertificateNotFound { name: name.clone() })?;
            info!("-----> Adding user certificate '{}'", name);
            Ok(format!("$HOME/{CERTIFICATES_DIR}/{file}"))
        })
        .collect()
}

/// profile.d script exporting the certificate list as `K_CERTS`
pub fn profile_script(runtime_paths: &[String]) -> BuildpackResult<String> {
    let json = serde_json::to_string(runtime_paths)?;
    Ok(format!("export K_CERTS=\"{}\"\n", json.replace('"', "\\\"")))
}
