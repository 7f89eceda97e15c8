//! Raw (per-document) and effective (inheritance-merged) POM models.

use crate::error::{PomError, Result};
use crate::properties::{PropertyResolver, PropertyTable};
use crate::types::{
    ArtifactKey, BuildSettings, ConfigEntry, ConfigValue, DependencyDecl, Gav, ParentRef,
    PluginDescriptor, PluginExecution,
};
use serde::Serialize;
use std::collections::HashSet;
use std::hash::Hash;

/// `<profile>` contents that take part in model merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub id: String,
    pub active_by_default: bool,
    pub properties: Vec<(String, String)>,
    pub dependencies: Vec<DependencyDecl>,
    pub dependency_management: Vec<DependencyDecl>,
    pub plugins: Vec<PluginDescriptor>,
}

/// Unresolved view of a single POM document.
///
/// Coordinates are `None` when the document leaves them to its parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawModel {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub parent: Option<ParentRef>,
    /// Declaration order is kept; later duplicates win.
    pub properties: Vec<(String, String)>,
    pub dependencies: Vec<DependencyDecl>,
    pub dependency_management: Vec<DependencyDecl>,
    pub plugins: Vec<PluginDescriptor>,
    pub plugin_management: Vec<PluginDescriptor>,
    pub build: BuildSettings,
    pub modules: Vec<String>,
    pub profiles: Vec<Profile>,
}

impl RawModel {
    /// Coordinates as far as this document alone determines them, falling
    /// back to the parent reference for groupId and version.
    pub fn declared_gav(&self) -> Option<Gav> {
        let group_id = self
            .group_id
            .clone()
            .or_else(|| self.parent.as_ref().map(|p| p.group_id.clone()))?;
        let artifact_id = self.artifact_id.clone()?;
        let version = self
            .version
            .clone()
            .or_else(|| self.parent.as_ref().map(|p| p.version.clone()))?;
        Some(Gav::new(group_id, artifact_id, version))
    }

    /// Best-effort label for log and error messages.
    pub fn label(&self) -> String {
        self.declared_gav().map_or_else(
            || {
                format!(
                    "{}:{}",
                    self.group_id.as_deref().unwrap_or("?"),
                    self.artifact_id.as_deref().unwrap_or("?")
                )
            },
            |gav| gav.to_string(),
        )
    }

    /// Ids of the profiles that apply for the requested profile ids.
    ///
    /// `activeByDefault` profiles only apply when none of this document's
    /// profiles was requested explicitly.
    pub fn active_profile_ids(&self, requested: &[String]) -> Vec<String> {
        let explicit: Vec<String> = self
            .profiles
            .iter()
            .filter(|p| requested.contains(&p.id))
            .map(|p| p.id.clone())
            .collect();
        if !explicit.is_empty() {
            return explicit;
        }
        self.profiles
            .iter()
            .filter(|p| p.active_by_default)
            .map(|p| p.id.clone())
            .collect()
    }

    /// Copy of this model with the active profiles folded in.
    #[must_use]
    pub fn with_profiles(&self, active: &[String]) -> Self {
        let mut model = self.clone();
        for profile in self.profiles.iter().filter(|p| active.contains(&p.id)) {
            model.properties.extend(profile.properties.iter().cloned());
            model
                .dependencies
                .extend(profile.dependencies.iter().cloned());
            model
                .dependency_management
                .extend(profile.dependency_management.iter().cloned());
            model.plugins.extend(profile.plugins.iter().cloned());
        }
        model
    }
}

/// Inheritance-merged model.
///
/// Produced uninterpolated by [`EffectiveModel::merge`]; [`EffectiveModel::interpolate`]
/// derives the substituted copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveModel {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub packaging: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub parent: Option<ParentRef>,
    pub properties: PropertyTable,
    pub dependencies: Vec<DependencyDecl>,
    pub dependency_management: Vec<DependencyDecl>,
    pub plugins: Vec<PluginDescriptor>,
    pub plugin_management: Vec<PluginDescriptor>,
    pub build: BuildSettings,
    pub modules: Vec<String>,
    /// Profiles applied to this document (not its ancestors).
    pub active_profiles: Vec<String>,
    /// Placeholders that were referenced but never defined. Only filled by
    /// [`EffectiveModel::interpolate`].
    pub unresolved_placeholders: Vec<String>,
}

impl EffectiveModel {
    /// Merges `raw` over its already-merged parent.
    ///
    /// Child values win. Lists are concatenated child-first and de-duplicated
    /// by `groupId:artifactId`, keeping the first occurrence.
    pub fn merge(raw: &RawModel, parent: Option<&Self>, active_profiles: &[String]) -> Result<Self> {
        let activated = raw.active_profile_ids(active_profiles);
        let raw = &raw.with_profiles(&activated);
        let parent_ref = raw.parent.as_ref();

        let group_id = raw
            .group_id
            .clone()
            .or_else(|| parent.map(|p| p.group_id.clone()))
            .or_else(|| parent_ref.map(|p| p.group_id.clone()))
            .ok_or_else(|| PomError::malformed("project.groupId", "missing and not inherited"))?;
        let artifact_id = raw
            .artifact_id
            .clone()
            .or_else(|| parent.map(|p| p.artifact_id.clone()))
            .ok_or_else(|| PomError::malformed("project.artifactId", "missing and not inherited"))?;
        let version = raw
            .version
            .clone()
            .or_else(|| parent.map(|p| p.version.clone()))
            .or_else(|| parent_ref.map(|p| p.version.clone()))
            .ok_or_else(|| PomError::malformed("project.version", "missing and not inherited"))?;

        let mut properties = parent.map(|p| p.properties.clone()).unwrap_or_default();
        for (k, v) in &raw.properties {
            properties.insert(k.clone(), v.clone());
        }

        let empty_deps: &[DependencyDecl] = &[];
        let empty_plugins: &[PluginDescriptor] = &[];

        let dependencies = child_first(
            &raw.dependencies,
            parent.map_or(empty_deps, |p| p.dependencies.as_slice()),
            DependencyDecl::key,
        );
        let dependency_management = child_first(
            &raw.dependency_management,
            parent.map_or(empty_deps, |p| p.dependency_management.as_slice()),
            DependencyDecl::key,
        );
        let inherited_plugins: Vec<PluginDescriptor> = parent
            .map_or(empty_plugins, |p| p.plugins.as_slice())
            .iter()
            .filter(|p| p.inherited)
            .cloned()
            .collect();
        let plugin_management = child_first(
            &raw.plugin_management,
            parent.map_or(empty_plugins, |p| p.plugin_management.as_slice()),
            PluginDescriptor::key,
        );
        let plugins = child_first(&raw.plugins, &inherited_plugins, PluginDescriptor::key)
            .into_iter()
            .map(|plugin| apply_plugin_management(plugin, &plugin_management))
            .collect();

        let build = match parent {
            Some(p) => raw.build.over(&p.build),
            None => raw.build.clone(),
        };

        Ok(Self {
            group_id,
            artifact_id,
            version,
            packaging: raw.packaging.clone().unwrap_or_else(|| "jar".to_string()),
            name: raw.name.clone(),
            description: raw.description.clone(),
            url: raw.url.clone().or_else(|| parent.and_then(|p| p.url.clone())),
            parent: raw.parent.clone(),
            properties,
            dependencies,
            dependency_management,
            plugins,
            plugin_management,
            build,
            modules: raw.modules.clone(),
            active_profiles: activated,
            unresolved_placeholders: Vec::new(),
        })
    }

    pub fn gav(&self) -> Gav {
        Gav::new(&self.group_id, &self.artifact_id, &self.version)
    }

    pub fn managed(&self, key: &ArtifactKey) -> Option<&DependencyDecl> {
        self.dependency_management
            .iter()
            .find(|d| d.group_id == key.group_id && d.artifact_id == key.artifact_id)
    }

    pub fn plugin(&self, group_id: &str, artifact_id: &str) -> Option<&PluginDescriptor> {
        self.plugins
            .iter()
            .find(|p| p.group_id == group_id && p.artifact_id == artifact_id)
    }

    /// The table placeholders are resolved against: declared properties,
    /// then the `project.*` built-ins, then `overrides`.
    pub fn property_layers(&self, overrides: &PropertyTable) -> PropertyTable {
        let mut table = self.properties.clone();
        for prefix in ["project", "pom"] {
            table.insert(format!("{prefix}.groupId"), &self.group_id);
            table.insert(format!("{prefix}.artifactId"), &self.artifact_id);
            table.insert(format!("{prefix}.version"), &self.version);
            table.insert(format!("{prefix}.packaging"), &self.packaging);
        }
        if let Some(parent) = &self.parent {
            table.insert("project.parent.groupId", &parent.group_id);
            table.insert("project.parent.artifactId", &parent.artifact_id);
            table.insert("project.parent.version", &parent.version);
        }
        table.overlay(overrides);
        table
    }

    /// Substitutes every placeholder in the model.
    ///
    /// The `properties` of the result hold the resolved declared properties
    /// with `overrides` applied; built-ins are not listed.
    pub fn interpolate(&self, overrides: &PropertyTable) -> Result<Self> {
        let layers = self.property_layers(overrides);
        let mut r = PropertyResolver::new(&layers);

        let mut properties = PropertyTable::new();
        for name in self.properties.keys().chain(overrides.keys()) {
            if let Some(value) = r.resolve_property(name)? {
                properties.insert(name, value);
            }
        }

        let model = Self {
            group_id: r.resolve(&self.group_id)?,
            artifact_id: r.resolve(&self.artifact_id)?,
            version: r.resolve(&self.version)?,
            packaging: r.resolve(&self.packaging)?,
            name: r.resolve_opt(self.name.as_deref())?,
            description: r.resolve_opt(self.description.as_deref())?,
            url: r.resolve_opt(self.url.as_deref())?,
            parent: self.parent.clone(),
            properties,
            dependencies: interpolate_deps(&mut r, &self.dependencies)?,
            dependency_management: interpolate_deps(&mut r, &self.dependency_management)?,
            plugins: interpolate_plugins(&mut r, &self.plugins)?,
            plugin_management: interpolate_plugins(&mut r, &self.plugin_management)?,
            build: BuildSettings {
                source_directory: r.resolve_opt(self.build.source_directory.as_deref())?,
                test_source_directory: r
                    .resolve_opt(self.build.test_source_directory.as_deref())?,
                output_directory: r.resolve_opt(self.build.output_directory.as_deref())?,
                test_output_directory: r
                    .resolve_opt(self.build.test_output_directory.as_deref())?,
                final_name: r.resolve_opt(self.build.final_name.as_deref())?,
                directory: r.resolve_opt(self.build.directory.as_deref())?,
            },
            modules: self.modules.clone(),
            active_profiles: self.active_profiles.clone(),
            unresolved_placeholders: Vec::new(),
        };

        Ok(Self {
            unresolved_placeholders: r.into_unresolved().into_iter().collect(),
            ..model
        })
    }
}

fn child_first<T: Clone, K: Eq + Hash>(child: &[T], parent: &[T], key: impl Fn(&T) -> K) -> Vec<T> {
    let mut seen = HashSet::new();
    child
        .iter()
        .chain(parent)
        .filter(|item| seen.insert(key(*item)))
        .cloned()
        .collect()
}

fn apply_plugin_management(
    mut plugin: PluginDescriptor,
    management: &[PluginDescriptor],
) -> PluginDescriptor {
    if let Some(managed) = management
        .iter()
        .find(|m| m.group_id == plugin.group_id && m.artifact_id == plugin.artifact_id)
    {
        if plugin.version.is_none() {
            plugin.version.clone_from(&managed.version);
        }
        if plugin.configuration.is_empty() {
            plugin.configuration.clone_from(&managed.configuration);
        }
    }
    plugin
}

fn interpolate_deps(
    r: &mut PropertyResolver<'_>,
    deps: &[DependencyDecl],
) -> Result<Vec<DependencyDecl>> {
    let resolved = deps
        .iter()
        .map(|d| {
            Ok(DependencyDecl {
                group_id: r.resolve(&d.group_id)?,
                artifact_id: r.resolve(&d.artifact_id)?,
                version: r.resolve_opt(d.version.as_deref())?,
                scope: r.resolve_opt(d.scope.as_deref())?,
                dep_type: r.resolve_opt(d.dep_type.as_deref())?,
                classifier: r.resolve_opt(d.classifier.as_deref())?,
                optional: d.optional,
                exclusions: d.exclusions.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    // Placeholders can make a child entry and an inherited one name the same
    // artifact; the earlier (child) entry wins.
    Ok(child_first(&resolved, &[], DependencyDecl::key))
}

fn interpolate_plugins(
    r: &mut PropertyResolver<'_>,
    plugins: &[PluginDescriptor],
) -> Result<Vec<PluginDescriptor>> {
    plugins
        .iter()
        .map(|p| {
            Ok(PluginDescriptor {
                group_id: r.resolve(&p.group_id)?,
                artifact_id: r.resolve(&p.artifact_id)?,
                version: r.resolve_opt(p.version.as_deref())?,
                extensions: p.extensions,
                inherited: p.inherited,
                configuration: interpolate_config(r, &p.configuration)?,
                executions: p
                    .executions
                    .iter()
                    .map(|e| {
                        Ok(PluginExecution {
                            id: e.id.clone(),
                            phase: r.resolve_opt(e.phase.as_deref())?,
                            goals: e.goals.clone(),
                            configuration: interpolate_config(r, &e.configuration)?,
                        })
                    })
                    .collect::<Result<_>>()?,
            })
        })
        .collect()
}

fn interpolate_config(
    r: &mut PropertyResolver<'_>,
    entries: &[ConfigEntry],
) -> Result<Vec<ConfigEntry>> {
    entries
        .iter()
        .map(|e| {
            let value = match &e.value {
                ConfigValue::Text(t) => ConfigValue::Text(r.resolve(t)?),
                ConfigValue::Children(children) => {
                    ConfigValue::Children(interpolate_config(r, children)?)
                }
                ConfigValue::Empty => ConfigValue::Empty,
            };
            Ok(ConfigEntry {
                key: e.key.clone(),
                value,
            })
        })
        .collect()
}
