//! Stack manifest materialization
//!
//! Computes the on-disk folder and filename for a stack and writes the
//! manifest bytes. Kubernetes manifests deployed with private registry
//! credentials are rewritten to carry image pull secrets before hitting
//! disk.

pub mod pull_secrets;

use std::path::PathBuf;

use crate::errors::AgentError;
use crate::filesys::file::File;
use crate::models::stack::{EngineKind, RegistryCredential, StackId};
use crate::storage::layout::StackLayout;

/// Manifest filename for a stack under the given engine.
///
/// Without a configured engine the compose filename is used.
pub fn manifest_file_name(engine: Option<EngineKind>, stack_name: &str) -> String {
    match engine {
        Some(EngineKind::Kubernetes) => format!("{}.yml", stack_name),
        Some(EngineKind::Nomad) => format!("{}.hcl", stack_name),
        _ => "docker-compose.yml".to_string(),
    }
}

/// Materialize a stack manifest on disk.
///
/// Returns the stack folder and the chosen filename. The folder is created
/// if absent and an existing manifest file is replaced; the file ends up
/// world-readable (0644).
pub async fn write_manifest(
    layout: &StackLayout,
    id: StackId,
    engine: Option<EngineKind>,
    stack_name: &str,
    content: &str,
    credentials: &[RegistryCredential],
) -> Result<(PathBuf, String), AgentError> {
    let file_name = manifest_file_name(engine, stack_name);

    let mut body = content.to_string();
    if engine == Some(EngineKind::Kubernetes) && !credentials.is_empty() {
        body = pull_secrets::add_image_pull_secrets(&body, credentials)?;
    }

    let folder = layout.stack_dir(id);
    let file = File::new(folder.join(&file_name));
    file.write_bytes(body.as_bytes()).await?;
    file.set_permissions_644().await?;

    Ok((folder, file_name))
}
