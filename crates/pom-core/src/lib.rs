//! Maven POM resolution.
//!
//! This crate turns POM documents into a resolved project model: parent
//! inheritance, `${...}` property interpolation, dependency management and
//! transitive dependency graphs with nearest-wins conflict resolution.
//!
//! Documents are obtained through a [`PomSupplier`]; the crate itself does
//! no network access.
//!
//! ```no_run
//! use pom_core::{Analyzer, LocalRepositorySupplier, ResolverConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> pom_core::Result<()> {
//! let supplier = Arc::new(LocalRepositorySupplier::new("/home/me/.m2/repository"));
//! let analyzer = Analyzer::new(supplier, ResolverConfig::default());
//! let analysis = analyzer.analyze_str(&std::fs::read_to_string("pom.xml")?).await?;
//! for dep in analysis.flattened_dependencies() {
//!     println!("{}:{}", dep.gav(), dep.scope);
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod builder;
pub mod config;
pub mod error;
pub mod graph;
pub mod inheritance;
pub mod model;
pub mod properties;
pub mod supplier;
pub mod types;
pub mod version;
pub mod xml;

pub use analysis::{
    Analysis, AnalysisReport, Analyzer, BuildInfo, Conflict, ConflictCandidate, DependencySummary,
    JavaVersionInfo, PluginSummary, ProjectInfo,
};
pub use builder::{build_raw_model, parse_raw_model};
pub use config::{FetchFailurePolicy, ResolverConfig};
pub use error::{PomError, Result};
pub use graph::{
    Candidate, DependencyGraph, DependencyNode, GraphResolver, NodeStatus, ResolvedDependency,
    SkipReason, UnresolvedDependency, VersionSource,
};
pub use inheritance::{InheritanceResolver, ProfileScope, VisitState};
pub use model::{EffectiveModel, Profile, RawModel};
pub use properties::{PropertyResolver, PropertyTable};
pub use supplier::{
    InMemorySupplier, LocalRepositorySupplier, PomSupplier, SupplierChain,
    default_local_repository,
};
pub use types::{
    ArtifactKey, BuildSettings, ConfigEntry, ConfigValue, DependencyDecl, Exclusion, Gav,
    ParentRef, PluginDescriptor, PluginExecution, Scope,
};
pub use xml::{Element, parse_document};
