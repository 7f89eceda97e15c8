//! Parent chain resolution.
//!
//! A POM is merged over its parent's effective model, which is merged over
//! its own parent, and so on up to a POM without a parent. The chain is
//! walked upwards iteratively, collecting raw models until a root or an
//! already-resolved ancestor is reached, and then merged top-down.
//!
//! Effective models are cached for the lifetime of the resolver, keyed by
//! coordinates and [`ProfileScope`], so a POM reached both as a project and
//! as an ancestor of a dependency is merged once. Requested profile ids only
//! apply to the project and its parents; dependency POMs see their
//! `activeByDefault` profiles alone.

use crate::builder::build_raw_model;
use crate::error::{PomError, Result};
use crate::model::{EffectiveModel, RawModel};
use crate::supplier::PomSupplier;
use crate::types::Gav;
use crate::xml::Element;
use dashmap::DashMap;
use std::sync::Arc;

/// Where a POM stands within one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    Unvisited,
    /// On the chain currently being walked.
    Resolving,
    Resolved,
}

/// Which profiles a chain is merged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileScope {
    /// Requested ids plus `activeByDefault`.
    Project,
    /// `activeByDefault` only.
    Dependency,
}

/// Resolves and caches effective (uninterpolated) models.
pub struct InheritanceResolver<S: ?Sized> {
    supplier: Arc<S>,
    active_profiles: Vec<String>,
    cache: DashMap<(Gav, ProfileScope), Arc<EffectiveModel>>,
}

impl<S: PomSupplier + ?Sized> InheritanceResolver<S> {
    pub fn new(supplier: Arc<S>, active_profiles: Vec<String>) -> Self {
        Self {
            supplier,
            active_profiles,
            cache: DashMap::new(),
        }
    }

    pub fn supplier(&self) -> &Arc<S> {
        &self.supplier
    }

    /// Number of effective models resolved so far.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn state(&self, gav: &Gav, chain: &[Gav], scope: ProfileScope) -> VisitState {
        if chain.contains(gav) {
            VisitState::Resolving
        } else if self.cache.contains_key(&self.cache_key(gav, scope)) {
            VisitState::Resolved
        } else {
            VisitState::Unvisited
        }
    }

    /// Resolves a project document that was handed in directly rather than
    /// fetched.
    pub async fn resolve_document(&self, document: &Element) -> Result<Arc<EffectiveModel>> {
        let raw = build_raw_model(document)?;
        self.resolve_raw(raw, None, ProfileScope::Project).await
    }

    /// Fetches and resolves the project POM of `gav`; `Ok(None)` when the
    /// supplier does not have it.
    pub async fn resolve_coordinates(&self, gav: &Gav) -> Result<Option<Arc<EffectiveModel>>> {
        self.fetch_and_resolve(gav, ProfileScope::Project).await
    }

    /// Like [`resolve_coordinates`](Self::resolve_coordinates), for a POM
    /// reached as a dependency.
    pub async fn resolve_dependency(&self, gav: &Gav) -> Result<Option<Arc<EffectiveModel>>> {
        self.fetch_and_resolve(gav, ProfileScope::Dependency).await
    }

    async fn fetch_and_resolve(
        &self,
        gav: &Gav,
        scope: ProfileScope,
    ) -> Result<Option<Arc<EffectiveModel>>> {
        if let Some(model) = self.cache.get(&self.cache_key(gav, scope)) {
            return Ok(Some(Arc::clone(model.value())));
        }
        let Some(document) = self.supplier.fetch(gav).await? else {
            return Ok(None);
        };
        let raw = build_raw_model(&document)?;
        self.resolve_raw(raw, Some(gav.clone()), scope).await.map(Some)
    }

    /// Merges `raw` with all of its ancestors.
    ///
    /// `key` is the coordinate the model was requested under. Documents
    /// handed in directly are keyed by what they declare.
    pub async fn resolve_raw(
        &self,
        raw: RawModel,
        key: Option<Gav>,
        scope: ProfileScope,
    ) -> Result<Arc<EffectiveModel>> {
        let mut resolving: Vec<Gav> = key.iter().cloned().collect();
        if resolving.is_empty()
            && let Some(declared) = raw.declared_gav()
        {
            resolving.push(declared);
        }

        // Descendants waiting for their parent, nearest last.
        let mut pending: Vec<(Option<Gav>, RawModel)> = Vec::new();
        let mut current = (key, raw);

        let mut base: Option<Arc<EffectiveModel>> = None;
        while let Some(parent_ref) = &current.1.parent {
            let parent_gav = parent_ref.gav();
            match self.state(&parent_gav, &resolving, scope) {
                VisitState::Resolving => {
                    let mut chain: Vec<String> = resolving.iter().map(ToString::to_string).collect();
                    chain.push(parent_gav.to_string());
                    return Err(PomError::CyclicInheritance { chain });
                }
                VisitState::Resolved => {
                    base = self
                        .cache
                        .get(&self.cache_key(&parent_gav, scope))
                        .map(|m| Arc::clone(m.value()));
                    break;
                }
                VisitState::Unvisited => {}
            }

            let Some(document) = self.supplier.fetch(&parent_gav).await? else {
                return Err(PomError::UnresolvedParent {
                    parent: parent_gav.to_string(),
                    child: current.1.label(),
                });
            };
            tracing::debug!("fetched parent {} of {}", parent_gav, current.1.label());
            let parent_raw = build_raw_model(&document)?;
            resolving.push(parent_gav.clone());
            pending.push(std::mem::replace(&mut current, (Some(parent_gav), parent_raw)));
        }

        let mut effective = self.merge_and_cache(current, base.as_deref(), scope)?;
        while let Some(child) = pending.pop() {
            effective = self.merge_and_cache(child, Some(&effective), scope)?;
        }
        Ok(effective)
    }

    /// Without requested ids both scopes merge identically and share entries.
    fn cache_key(&self, gav: &Gav, scope: ProfileScope) -> (Gav, ProfileScope) {
        if self.active_profiles.is_empty() {
            (gav.clone(), ProfileScope::Dependency)
        } else {
            (gav.clone(), scope)
        }
    }

    fn merge_and_cache(
        &self,
        (key, raw): (Option<Gav>, RawModel),
        parent: Option<&EffectiveModel>,
        scope: ProfileScope,
    ) -> Result<Arc<EffectiveModel>> {
        let profiles: &[String] = match scope {
            ProfileScope::Project => &self.active_profiles,
            ProfileScope::Dependency => &[],
        };
        let merged = Arc::new(EffectiveModel::merge(&raw, parent, profiles)?);
        tracing::debug!(
            "resolved effective model {} ({} dependencies, {} managed)",
            key.clone().unwrap_or_else(|| merged.gav()),
            merged.dependencies.len(),
            merged.dependency_management.len()
        );

        match key {
            // A concurrent resolution of the same POM may have finished
            // first; keep whichever landed first so every caller shares one
            // model.
            Some(key) => {
                let cached = self.cache.entry(self.cache_key(&key, scope)).or_insert(merged);
                Ok(Arc::clone(cached.value()))
            }
            // A document handed in directly is always its own model. It may
            // inherit coordinates that another POM already holds in the
            // cache, so it is only stored when the slot is free.
            None => {
                self.cache
                    .entry(self.cache_key(&merged.gav(), scope))
                    .or_insert_with(|| Arc::clone(&merged));
                Ok(merged)
            }
        }
    }
}
