//! Transitive dependency graph with nearest-wins conflict resolution.
//!
//! The tree is built breadth-first, one depth level at a time. Within a
//! level, declarations are visited in merge order (child before parent, then
//! document order), so the first node visited for a coordinate is the
//! shallowest one and, among equally shallow ones, the first declared. That
//! node wins; later nodes of the same coordinate stay in the tree as
//! [`NodeStatus::Omitted`] and are not expanded.
//!
//! Exclusions and dependency-management scopes flow down each path as
//! shared immutable snapshots. POMs of one level are loaded concurrently and
//! their results are consumed in declaration order.

use crate::config::ResolverConfig;
use crate::error::{PomError, Result};
use crate::inheritance::InheritanceResolver;
use crate::model::EffectiveModel;
use crate::properties::PropertyTable;
use crate::supplier::PomSupplier;
use crate::types::{ArtifactKey, DependencyDecl, Exclusion, Gav, Scope};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Where a node's version came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VersionSource {
    Declared,
    /// Filled in by the dependency management of the named model.
    Managed { by: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Optional,
    SystemScope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NodeStatus {
    /// Selected for its coordinate and expanded.
    Resolved,
    /// Lost to a nearer (or equally near, earlier) node of the same coordinate.
    Omitted { selected_version: String },
    /// Selected but deliberately not expanded.
    Skipped { reason: SkipReason },
    /// Its POM could not be obtained. Only produced in lenient mode.
    Unresolved { reason: String },
}

/// One node of the raw, pre-conflict-resolution tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyNode {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub scope: Scope,
    #[serde(rename = "type")]
    pub dep_type: String,
    pub classifier: Option<String>,
    pub optional: bool,
    /// 0 for direct dependencies.
    pub depth: usize,
    pub version_source: VersionSource,
    #[serde(flatten)]
    pub status: NodeStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DependencyNode>,
}

impl DependencyNode {
    pub fn key(&self) -> ArtifactKey {
        ArtifactKey::new(&self.group_id, &self.artifact_id)
    }

    pub fn gav(&self) -> Gav {
        Gav::new(&self.group_id, &self.artifact_id, &self.version)
    }

    pub const fn is_omitted(&self) -> bool {
        matches!(self.status, NodeStatus::Omitted { .. })
    }
}

/// The selected node of one coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    /// Declared (or managed) scope of the selected node; no transitive
    /// scope narrowing is applied.
    pub scope: Scope,
    #[serde(rename = "type")]
    pub dep_type: String,
    pub classifier: Option<String>,
    pub optional: bool,
    pub depth: usize,
    /// Coordinates from the project down to the node's parent.
    pub path: Vec<String>,
    pub version_source: VersionSource,
    #[serde(flatten)]
    pub status: NodeStatus,
}

impl ResolvedDependency {
    pub fn key(&self) -> ArtifactKey {
        ArtifactKey::new(&self.group_id, &self.artifact_id)
    }

    pub fn gav(&self) -> Gav {
        Gav::new(&self.group_id, &self.artifact_id, &self.version)
    }
}

/// Every occurrence of a coordinate in the tree, selected or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub depth: usize,
    pub path: Vec<String>,
    pub selected: bool,
}

impl Candidate {
    pub fn key(&self) -> ArtifactKey {
        ArtifactKey::new(&self.group_id, &self.artifact_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedDependency {
    pub coordinates: String,
    pub reason: String,
    pub path: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DependencyGraph {
    root: Gav,
    tree: Vec<DependencyNode>,
    flattened: Vec<ResolvedDependency>,
    candidates: Vec<Candidate>,
    unresolved: Vec<UnresolvedDependency>,
    #[serde(skip)]
    index: HashMap<ArtifactKey, usize>,
}

impl DependencyGraph {
    pub const fn root(&self) -> &Gav {
        &self.root
    }

    /// Direct dependencies with their transitive subtrees, losers included.
    pub fn tree(&self) -> &[DependencyNode] {
        &self.tree
    }

    /// One entry per coordinate, in selection order.
    pub fn flattened(&self) -> &[ResolvedDependency] {
        &self.flattened
    }

    pub fn get(&self, key: &ArtifactKey) -> Option<&ResolvedDependency> {
        self.index.get(key).map(|&i| &self.flattened[i])
    }

    /// All tree nodes in visiting order.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn unresolved(&self) -> &[UnresolvedDependency] {
        &self.unresolved
    }

    /// `false` when lenient resolution left branches unresolved.
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.candidates.iter().map(|c| c.depth).max()
    }
}

/// A declaration waiting to be placed in the tree.
struct Pending {
    parent: Option<usize>,
    /// Position within the declaring model, for error paths.
    index: usize,
    decl: DependencyDecl,
    /// Declaring model first, then tree ancestors nearest first.
    management: Arc<Vec<Arc<EffectiveModel>>>,
    /// Union of the exclusions of every ancestor.
    exclusions: Arc<Vec<Exclusion>>,
    path: Arc<Vec<String>>,
}

/// A selected node whose POM must be loaded.
struct Expansion {
    slot: usize,
    gav: Gav,
    management: Arc<Vec<Arc<EffectiveModel>>>,
    exclusions: Arc<Vec<Exclusion>>,
    /// Path for the children: the node's path plus the node itself.
    path: Arc<Vec<String>>,
}

struct Slot {
    node: DependencyNode,
    parent: Option<usize>,
    path: Arc<Vec<String>>,
}

struct Managed {
    version: Option<(String, VersionSource)>,
    scope: Scope,
}

/// Builds a [`DependencyGraph`] for one analysis run.
pub struct GraphResolver<'a, S: ?Sized> {
    inheritance: &'a InheritanceResolver<S>,
    config: &'a ResolverConfig,
    overrides: PropertyTable,
}

impl<'a, S: PomSupplier + ?Sized> GraphResolver<'a, S> {
    pub fn new(inheritance: &'a InheritanceResolver<S>, config: &'a ResolverConfig) -> Self {
        Self {
            inheritance,
            config,
            overrides: config.overrides(),
        }
    }

    /// Resolves the transitive dependencies of an interpolated project model.
    pub async fn resolve(&self, project: Arc<EffectiveModel>) -> Result<DependencyGraph> {
        let root = project.gav();
        let root_path = Arc::new(vec![root.to_string()]);
        let root_management = Arc::new(vec![Arc::clone(&project)]);
        let no_exclusions = Arc::new(Vec::new());

        let mut level: Vec<Pending> = project
            .dependencies
            .iter()
            .enumerate()
            .map(|(index, decl)| Pending {
                parent: None,
                index,
                decl: decl.clone(),
                management: Arc::clone(&root_management),
                exclusions: Arc::clone(&no_exclusions),
                path: Arc::clone(&root_path),
            })
            .collect();

        let mut arena: Vec<Slot> = Vec::new();
        let mut winners: HashMap<ArtifactKey, usize> = HashMap::new();
        let mut selection_order: Vec<usize> = Vec::new();
        let mut unresolved: Vec<UnresolvedDependency> = Vec::new();
        let mut depth = 0;

        while !level.is_empty() {
            let mut expansions = Vec::new();
            for pending in level {
                let key = pending.decl.key();
                if let Some(exclusion) = pending.exclusions.iter().find(|e| e.matches(&key)) {
                    tracing::debug!(
                        "excluded {} below {} by {}:{}",
                        key,
                        pending.path.last().map_or("?", String::as_str),
                        exclusion.group_id,
                        exclusion.artifact_id
                    );
                    continue;
                }
                if pending.decl.scope.as_deref() == Some("import") {
                    continue;
                }
                check_limit("max_depth", self.config.max_depth, depth)?;

                let managed = manage(&pending.decl, &pending.management);
                // Lenient mode keeps a versionless transitive declaration in
                // the tree as an unresolved leaf.
                let mut missing_version = None;
                let (version, version_source) = match managed.version {
                    Some(found) => found,
                    None if depth == 0 => {
                        return Err(PomError::malformed(
                            format!("project.dependencies.dependency[{}].version", pending.index),
                            format!("no version declared or managed for {key}"),
                        ));
                    }
                    None => {
                        let err = PomError::UnresolvedArtifact {
                            coordinates: key.to_string(),
                            requested_by: pending.path.last().cloned().unwrap_or_default(),
                        };
                        missing_version = Some(err.to_string());
                        self.record_failure(err, &pending.path, &mut unresolved)?;
                        (String::new(), VersionSource::Declared)
                    }
                };

                check_limit("max_nodes", self.config.max_nodes, arena.len() + 1)?;
                let slot = arena.len();

                let status = if let Some(&winner) = winners.get(&key) {
                    NodeStatus::Omitted {
                        selected_version: arena[winner].node.version.clone(),
                    }
                } else if let Some(reason) = missing_version {
                    NodeStatus::Unresolved { reason }
                } else if pending.decl.optional {
                    NodeStatus::Skipped {
                        reason: SkipReason::Optional,
                    }
                } else if managed.scope == Scope::System {
                    NodeStatus::Skipped {
                        reason: SkipReason::SystemScope,
                    }
                } else {
                    NodeStatus::Resolved
                };

                match &status {
                    NodeStatus::Omitted { selected_version } => tracing::debug!(
                        "{}:{} at depth {} omitted for {}",
                        key,
                        version,
                        depth,
                        selected_version
                    ),
                    _ => {
                        winners.insert(key.clone(), slot);
                        selection_order.push(slot);
                    }
                }

                if status == NodeStatus::Resolved {
                    let gav = Gav::new(&key.group_id, &key.artifact_id, &version);
                    let mut path = pending.path.as_ref().clone();
                    path.push(gav.to_string());
                    expansions.push(Expansion {
                        slot,
                        gav,
                        management: Arc::clone(&pending.management),
                        exclusions: with_exclusions(&pending.exclusions, &pending.decl.exclusions),
                        path: Arc::new(path),
                    });
                }

                arena.push(Slot {
                    node: DependencyNode {
                        group_id: key.group_id,
                        artifact_id: key.artifact_id,
                        version,
                        scope: managed.scope,
                        dep_type: pending.decl.dep_type.clone().unwrap_or_else(|| "jar".into()),
                        classifier: pending.decl.classifier.clone(),
                        optional: pending.decl.optional,
                        depth,
                        version_source,
                        status,
                        children: Vec::new(),
                    },
                    parent: pending.parent,
                    path: pending.path,
                });
            }

            let loaded: Vec<Result<Option<Arc<EffectiveModel>>>> =
                stream::iter(expansions.iter().map(|e| self.load(&e.gav)))
                    .buffered(self.config.concurrency.max(1))
                    .collect()
                    .await;

            let mut next = Vec::new();
            for (expansion, result) in expansions.into_iter().zip(loaded) {
                let model = match result {
                    Ok(Some(model)) => model,
                    Ok(None) => {
                        let err = PomError::UnresolvedArtifact {
                            coordinates: expansion.gav.to_string(),
                            requested_by: arena[expansion.slot]
                                .path
                                .last()
                                .cloned()
                                .unwrap_or_default(),
                        };
                        let reason = err.to_string();
                        self.record_failure(err, &arena[expansion.slot].path, &mut unresolved)?;
                        arena[expansion.slot].node.status = NodeStatus::Unresolved { reason };
                        continue;
                    }
                    Err(err) if err.is_fetch_failure() => {
                        let reason = err.to_string();
                        self.record_failure(err, &arena[expansion.slot].path, &mut unresolved)?;
                        arena[expansion.slot].node.status = NodeStatus::Unresolved { reason };
                        continue;
                    }
                    Err(err) => return Err(err),
                };

                let mut management = Vec::with_capacity(expansion.management.len() + 1);
                management.push(Arc::clone(&model));
                management.extend(expansion.management.iter().cloned());
                let management = Arc::new(management);

                for (index, decl) in model.dependencies.iter().enumerate() {
                    if self.config.prune_non_transitive_scopes
                        && matches!(decl.declared_scope(), Some(Scope::Test | Scope::Provided))
                    {
                        continue;
                    }
                    next.push(Pending {
                        parent: Some(expansion.slot),
                        index,
                        decl: decl.clone(),
                        management: Arc::clone(&management),
                        exclusions: Arc::clone(&expansion.exclusions),
                        path: Arc::clone(&expansion.path),
                    });
                }
            }

            level = next;
            depth += 1;
        }

        let graph = assemble(root, arena, &selection_order, unresolved);
        tracing::info!(
            "resolved dependency graph for {}: {} nodes, {} selected, {} unresolved",
            graph.root,
            graph.node_count(),
            graph.flattened.len(),
            graph.unresolved.len()
        );
        Ok(graph)
    }

    async fn load(&self, gav: &Gav) -> Result<Option<Arc<EffectiveModel>>> {
        let Some(model) = self.inheritance.resolve_dependency(gav).await? else {
            return Ok(None);
        };
        Ok(Some(Arc::new(model.interpolate(&self.overrides)?)))
    }

    fn record_failure(
        &self,
        err: PomError,
        path: &[String],
        unresolved: &mut Vec<UnresolvedDependency>,
    ) -> Result<()> {
        if !self.config.is_lenient() {
            return Err(err);
        }
        tracing::warn!("continuing without unresolved dependency: {}", err);
        let coordinates = match &err {
            PomError::UnresolvedArtifact { coordinates, .. } => coordinates.clone(),
            PomError::UnresolvedParent { child, .. } => child.clone(),
            _ => path.last().cloned().unwrap_or_default(),
        };
        unresolved.push(UnresolvedDependency {
            coordinates,
            reason: err.to_string(),
            path: path.to_vec(),
        });
        Ok(())
    }
}

fn check_limit(limit: &'static str, max: Option<usize>, value: usize) -> Result<()> {
    match max {
        Some(max) if value > max => Err(PomError::ResolutionLimitExceeded { limit, max, value }),
        _ => Ok(()),
    }
}

/// Fills a missing version and scope from the nearest dependency management.
fn manage(decl: &DependencyDecl, management: &[Arc<EffectiveModel>]) -> Managed {
    let key = decl.key();

    let version = decl
        .version
        .clone()
        .map(|v| (v, VersionSource::Declared))
        .or_else(|| {
            management.iter().find_map(|model| {
                let entry = model.managed(&key)?;
                let version = entry.version.clone()?;
                Some((
                    version,
                    VersionSource::Managed {
                        by: model.gav().to_string(),
                    },
                ))
            })
        });

    let scope = decl
        .scope
        .clone()
        .or_else(|| {
            management
                .iter()
                .find_map(|model| model.managed(&key).and_then(|entry| entry.scope.clone()))
        })
        .map_or(Scope::Compile, |name| {
            Scope::from_name(&name).unwrap_or_else(|| {
                tracing::warn!("unknown scope '{}' on {}, treating as compile", name, key);
                Scope::Compile
            })
        });

    Managed { version, scope }
}

fn with_exclusions(inherited: &Arc<Vec<Exclusion>>, own: &[Exclusion]) -> Arc<Vec<Exclusion>> {
    if own.is_empty() {
        return Arc::clone(inherited);
    }
    let mut all = inherited.as_ref().clone();
    all.extend(own.iter().filter(|e| !inherited.contains(e)).cloned());
    Arc::new(all)
}

fn assemble(
    root: Gav,
    arena: Vec<Slot>,
    selection_order: &[usize],
    unresolved: Vec<UnresolvedDependency>,
) -> DependencyGraph {
    let candidates: Vec<Candidate> = arena
        .iter()
        .map(|slot| Candidate {
            group_id: slot.node.group_id.clone(),
            artifact_id: slot.node.artifact_id.clone(),
            version: slot.node.version.clone(),
            depth: slot.node.depth,
            path: slot.path.as_ref().clone(),
            selected: !slot.node.is_omitted(),
        })
        .collect();

    let flattened: Vec<ResolvedDependency> = selection_order
        .iter()
        .map(|&i| {
            let Slot { node, path, .. } = &arena[i];
            ResolvedDependency {
                group_id: node.group_id.clone(),
                artifact_id: node.artifact_id.clone(),
                version: node.version.clone(),
                scope: node.scope,
                dep_type: node.dep_type.clone(),
                classifier: node.classifier.clone(),
                optional: node.optional,
                depth: node.depth,
                path: path.as_ref().clone(),
                version_source: node.version_source.clone(),
                status: node.status.clone(),
            }
        })
        .collect();

    let index = flattened
        .iter()
        .enumerate()
        .map(|(i, dep)| (dep.key(), i))
        .collect();

    // Children always come after their parent in the arena, so walking it
    // backwards finishes every subtree before its parent is taken.
    let parents: Vec<Option<usize>> = arena.iter().map(|slot| slot.parent).collect();
    let mut nodes: Vec<Option<DependencyNode>> = arena.into_iter().map(|slot| Some(slot.node)).collect();
    let mut tree = Vec::new();
    for i in (0..nodes.len()).rev() {
        let Some(mut node) = nodes[i].take() else {
            continue;
        };
        node.children.reverse();
        match parents[i] {
            Some(p) => {
                if let Some(parent) = nodes[p].as_mut() {
                    parent.children.push(node);
                }
            }
            None => tree.push(node),
        }
    }
    tree.reverse();

    DependencyGraph {
        root,
        tree,
        flattened,
        candidates,
        unresolved,
        index,
    }
}
