//! Finds parent POMs on disk by following `relativePath`.

use anyhow::{Context, Result};
use pom_core::{InMemorySupplier, ParentRef, RawModel, build_raw_model, parse_document};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const DEFAULT_RELATIVE_PATH: &str = "../pom.xml";

/// Walks the parent chain of the POM at `pom` (whose content is `xml`) and
/// registers every parent found on disk in `supplier`.
///
/// A parent is only taken from disk when the file declares exactly the
/// referenced coordinates. The walk stops at the first parent that is not on
/// disk; the remaining ancestors are left to the repository.
///
/// Returns the number of registered documents.
pub(crate) async fn register_local_parents(
    pom: &Path,
    xml: &str,
    supplier: &InMemorySupplier,
) -> Result<usize> {
    let document =
        parse_document(xml).with_context(|| format!("failed to parse {}", pom.display()))?;
    let mut model = build_raw_model(&document)?;
    let mut dir = pom.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut seen = HashSet::new();
    let mut registered = 0;

    while let Some(parent) = model.parent.take() {
        let Some(path) = candidate_path(&dir, &parent).await else {
            tracing::debug!("parent {} is not on disk", parent.gav());
            break;
        };
        if !seen.insert(path.clone()) {
            break;
        }
        let Some((parent_model, document)) = load(&path).await else {
            break;
        };
        if parent_model.declared_gav() != Some(parent.gav()) {
            tracing::debug!(
                "{} does not declare {}, leaving it to the repository",
                path.display(),
                parent.gav()
            );
            break;
        }

        tracing::debug!("found parent {} at {}", parent.gav(), path.display());
        supplier.insert(parent.gav(), document);
        registered += 1;
        dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        model = parent_model;
    }

    Ok(registered)
}

/// Resolves `relativePath` against `dir`. An empty `<relativePath/>` turns
/// the lookup off; a directory means its `pom.xml`.
async fn candidate_path(dir: &Path, parent: &ParentRef) -> Option<PathBuf> {
    let relative = parent
        .relative_path
        .as_deref()
        .unwrap_or(DEFAULT_RELATIVE_PATH)
        .trim();
    if relative.is_empty() {
        return None;
    }

    let mut path = dir.join(relative);
    if tokio::fs::metadata(&path).await.ok()?.is_dir() {
        path.push("pom.xml");
    }
    tokio::fs::canonicalize(&path).await.ok()
}

async fn load(path: &Path) -> Option<(RawModel, pom_core::Element)> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("failed to read {}: {}", path.display(), e);
            return None;
        }
    };
    let parsed = parse_document(&content).and_then(|document| {
        let model = build_raw_model(&document)?;
        Ok((model, document))
    });
    match parsed {
        Ok(loaded) => Some(loaded),
        Err(e) => {
            tracing::warn!("ignoring {}: {}", path.display(), e);
            None
        }
    }
}
