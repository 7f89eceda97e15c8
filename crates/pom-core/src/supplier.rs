//! Sources of POM documents for parents and transitive dependencies.
//!
//! The resolvers never touch the filesystem or network themselves; they ask
//! a [`PomSupplier`] for the document of a coordinate and get back a parsed
//! element tree, or `None` when the supplier does not know it.

use crate::error::{PomError, Result};
use crate::types::Gav;
use crate::xml::{Element, parse_document};
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Maximum size of a POM read from a local repository (10MB).
///
/// Real POMs are a few kilobytes; anything past this is not a POM.
const MAX_POM_SIZE: u64 = 10_000_000;

/// Supplies POM documents by coordinates.
///
/// # Examples
///
/// ```
/// use pom_core::{Gav, InMemorySupplier, PomSupplier};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> pom_core::Result<()> {
/// let supplier = InMemorySupplier::new();
/// supplier.register_xml(
///     "<project><groupId>g</groupId><artifactId>a</artifactId><version>1</version></project>",
/// )?;
/// assert!(supplier.fetch(&Gav::new("g", "a", "1")).await?.is_some());
/// assert!(supplier.fetch(&Gav::new("g", "a", "2")).await?.is_none());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait PomSupplier: Send + Sync {
    /// Returns the document for `gav`, `Ok(None)` when it is not available.
    ///
    /// # Errors
    ///
    /// Returns an error when the document exists but cannot be read or parsed.
    async fn fetch(&self, gav: &Gav) -> Result<Option<Element>>;
}

#[async_trait]
impl<S: PomSupplier + ?Sized> PomSupplier for Arc<S> {
    async fn fetch(&self, gav: &Gav) -> Result<Option<Element>> {
        (**self).fetch(gav).await
    }
}

#[async_trait]
impl<S: PomSupplier + ?Sized> PomSupplier for Box<S> {
    async fn fetch(&self, gav: &Gav) -> Result<Option<Element>> {
        (**self).fetch(gav).await
    }
}

/// Documents held in memory, keyed by coordinates.
#[derive(Debug, Default)]
pub struct InMemorySupplier {
    documents: DashMap<Gav, Element>,
}

impl InMemorySupplier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, gav: Gav, document: Element) {
        self.documents.insert(gav, document);
    }

    /// Parses `xml` and registers it under the coordinates it declares.
    ///
    /// groupId and version fall back to the parent reference, as they would
    /// after inheritance.
    pub fn register_xml(&self, xml: &str) -> Result<Gav> {
        let document = parse_document(xml)?;
        let gav = crate::builder::build_raw_model(&document)?
            .declared_gav()
            .ok_or_else(|| {
                PomError::malformed("project", "document does not declare its coordinates")
            })?;
        tracing::debug!("registered in-memory POM {}", gav);
        self.documents.insert(gav.clone(), document);
        Ok(gav)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn contains(&self, gav: &Gav) -> bool {
        self.documents.contains_key(gav)
    }
}

#[async_trait]
impl PomSupplier for InMemorySupplier {
    async fn fetch(&self, gav: &Gav) -> Result<Option<Element>> {
        Ok(self.documents.get(gav).map(|doc| doc.value().clone()))
    }
}

/// Reads POMs from a Maven local repository layout:
/// `<root>/<group/as/path>/<artifact>/<version>/<artifact>-<version>.pom`.
#[derive(Debug, Clone)]
pub struct LocalRepositorySupplier {
    root: PathBuf,
}

impl LocalRepositorySupplier {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Supplier over `~/.m2/repository`, `None` when no home directory is set.
    pub fn user_default() -> Option<Self> {
        default_local_repository().map(Self::new)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pom_path(&self, gav: &Gav) -> PathBuf {
        let mut path = self.root.clone();
        for segment in gav.group_id.split('.') {
            path.push(segment);
        }
        path.push(&gav.artifact_id);
        path.push(&gav.version);
        path.push(format!("{}-{}.pom", gav.artifact_id, gav.version));
        path
    }
}

#[async_trait]
impl PomSupplier for LocalRepositorySupplier {
    async fn fetch(&self, gav: &Gav) -> Result<Option<Element>> {
        let path = self.pom_path(gav);

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("{} not in local repository ({})", gav, path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if metadata.len() > MAX_POM_SIZE {
            return Err(PomError::malformed(
                path.display().to_string(),
                format!(
                    "file is {} bytes, larger than the {} byte limit",
                    metadata.len(),
                    MAX_POM_SIZE
                ),
            ));
        }

        let content = tokio::fs::read_to_string(&path).await?;
        tracing::debug!("loaded {} from {}", gav, path.display());
        parse_document(&content).map(Some)
    }
}

/// Asks each supplier in turn; the first one that has the document wins.
#[derive(Default)]
pub struct SupplierChain {
    suppliers: Vec<Box<dyn PomSupplier>>,
}

impl SupplierChain {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, supplier: impl PomSupplier + 'static) -> Self {
        self.suppliers.push(Box::new(supplier));
        self
    }

    pub fn push(&mut self, supplier: impl PomSupplier + 'static) {
        self.suppliers.push(Box::new(supplier));
    }

    pub fn len(&self) -> usize {
        self.suppliers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suppliers.is_empty()
    }
}

#[async_trait]
impl PomSupplier for SupplierChain {
    async fn fetch(&self, gav: &Gav) -> Result<Option<Element>> {
        for supplier in &self.suppliers {
            if let Some(document) = supplier.fetch(gav).await? {
                return Ok(Some(document));
            }
        }
        Ok(None)
    }
}

/// `~/.m2/repository`, from `HOME` or `USERPROFILE`.
pub fn default_local_repository() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)?;
    Some(home.join(".m2").join("repository"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LIB_POM: &str = r"<project>
  <groupId>org.example</groupId>
  <artifactId>lib</artifactId>
  <version>1.2</version>
</project>";

    #[tokio::test]
    async fn test_in_memory_register_xml() {
        let supplier = InMemorySupplier::new();
        let gav = supplier.register_xml(LIB_POM).unwrap();
        assert_eq!(gav, Gav::new("org.example", "lib", "1.2"));
        assert_eq!(supplier.len(), 1);

        let doc = supplier.fetch(&gav).await.unwrap().unwrap();
        assert_eq!(doc.child_text("artifactId"), Some("lib"));
    }

    #[tokio::test]
    async fn test_in_memory_register_inherits_parent_coordinates() {
        let supplier = InMemorySupplier::new();
        let gav = supplier
            .register_xml(
                r"<project>
  <parent><groupId>org.example</groupId><artifactId>parent</artifactId><version>3</version></parent>
  <artifactId>child</artifactId>
</project>",
            )
            .unwrap();
        assert_eq!(gav.to_string(), "org.example:child:3");
    }

    #[test]
    fn test_in_memory_register_without_coordinates_fails() {
        let supplier = InMemorySupplier::new();
        assert!(matches!(
            supplier.register_xml("<project><artifactId>a</artifactId></project>"),
            Err(PomError::MalformedModel { .. })
        ));
    }

    #[test]
    fn test_pom_path_layout() {
        let supplier = LocalRepositorySupplier::new("/repo");
        let path = supplier.pom_path(&Gav::new("org.apache.commons", "commons-lang3", "3.14.0"));
        assert_eq!(
            path,
            Path::new("/repo/org/apache/commons/commons-lang3/3.14.0/commons-lang3-3.14.0.pom")
        );
    }

    #[tokio::test]
    async fn test_local_repository_fetch() {
        let dir = TempDir::new().unwrap();
        let supplier = LocalRepositorySupplier::new(dir.path());
        let gav = Gav::new("org.example", "lib", "1.2");
        let path = supplier.pom_path(&gav);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, LIB_POM).unwrap();

        let doc = supplier.fetch(&gav).await.unwrap().unwrap();
        assert_eq!(doc.child_text("version"), Some("1.2"));
    }

    #[tokio::test]
    async fn test_local_repository_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let supplier = LocalRepositorySupplier::new(dir.path());
        let result = supplier.fetch(&Gav::new("no", "such", "1")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_local_repository_invalid_xml() {
        let dir = TempDir::new().unwrap();
        let supplier = LocalRepositorySupplier::new(dir.path());
        let gav = Gav::new("g", "broken", "1");
        let path = supplier.pom_path(&gav);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "<project><groupId>").unwrap();

        assert!(matches!(
            supplier.fetch(&gav).await,
            Err(PomError::XmlParse { .. })
        ));
    }

    #[tokio::test]
    async fn test_chain_first_hit_wins() {
        let first = InMemorySupplier::new();
        first.insert(
            Gav::new("g", "a", "1"),
            Element::new("project").with_child(Element::with_text("name", "first")),
        );
        let second = InMemorySupplier::new();
        second.insert(
            Gav::new("g", "a", "1"),
            Element::new("project").with_child(Element::with_text("name", "second")),
        );
        second.insert(Gav::new("g", "b", "1"), Element::new("project"));

        let chain = SupplierChain::new().with(first).with(second);
        assert_eq!(chain.len(), 2);

        let a = chain.fetch(&Gav::new("g", "a", "1")).await.unwrap().unwrap();
        assert_eq!(a.child_text("name"), Some("first"));
        assert!(chain.fetch(&Gav::new("g", "b", "1")).await.unwrap().is_some());
        assert!(chain.fetch(&Gav::new("g", "c", "1")).await.unwrap().is_none());
    }
}
