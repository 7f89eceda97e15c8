//! Analysis entry points and read-only views over a finished resolution.
//!
//! [`Analyzer`] runs the whole pipeline for one request: build the raw model,
//! resolve inheritance, interpolate, then resolve the dependency graph. The
//! resulting [`Analysis`] only hands out projections; nothing in it can be
//! mutated.

use crate::config::ResolverConfig;
use crate::error::{PomError, Result};
use crate::graph::{DependencyGraph, DependencyNode, GraphResolver, ResolvedDependency};
use crate::inheritance::InheritanceResolver;
use crate::model::EffectiveModel;
use crate::properties::PropertyTable;
use crate::supplier::PomSupplier;
use crate::types::{BuildSettings, Gav, PluginDescriptor, config_text};
use crate::version::{compare_versions, is_prerelease, is_range, is_snapshot};
use crate::xml::{Element, parse_document};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

const COMPILER_PLUGIN_GROUP: &str = "org.apache.maven.plugins";
const COMPILER_PLUGIN: &str = "maven-compiler-plugin";

/// Runs analyses against one supplier and configuration.
///
/// Every request gets its own inheritance cache; nothing is shared between
/// requests.
pub struct Analyzer<S: ?Sized> {
    supplier: Arc<S>,
    config: ResolverConfig,
}

impl<S: PomSupplier + ?Sized> Analyzer<S> {
    pub const fn new(supplier: Arc<S>, config: ResolverConfig) -> Self {
        Self { supplier, config }
    }

    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub async fn analyze_str(&self, xml: &str) -> Result<Analysis> {
        let document = parse_document(xml)?;
        self.analyze_document(&document).await
    }

    pub async fn analyze_document(&self, document: &Element) -> Result<Analysis> {
        self.config.validate()?;
        let inheritance = self.inheritance();
        let effective = inheritance.resolve_document(document).await?;
        self.finish(&inheritance, &effective).await
    }

    /// Analyzes a project whose own POM comes from the supplier.
    pub async fn analyze_coordinates(&self, gav: &Gav) -> Result<Analysis> {
        self.config.validate()?;
        let inheritance = self.inheritance();
        let effective = inheritance
            .resolve_coordinates(gav)
            .await?
            .ok_or_else(|| PomError::UnresolvedArtifact {
                coordinates: gav.to_string(),
                requested_by: "analysis request".into(),
            })?;
        self.finish(&inheritance, &effective).await
    }

    fn inheritance(&self) -> InheritanceResolver<S> {
        InheritanceResolver::new(
            Arc::clone(&self.supplier),
            self.config.active_profiles.clone(),
        )
    }

    async fn finish(
        &self,
        inheritance: &InheritanceResolver<S>,
        effective: &EffectiveModel,
    ) -> Result<Analysis> {
        tracing::info!("analyzing {}", effective.gav());
        let model = Arc::new(effective.interpolate(&self.config.overrides())?);
        if !model.unresolved_placeholders.is_empty() {
            tracing::warn!(
                "{} references undefined properties: {}",
                model.gav(),
                model.unresolved_placeholders.join(", ")
            );
        }
        let graph = GraphResolver::new(inheritance, &self.config)
            .resolve(Arc::clone(&model))
            .await?;
        tracing::info!(
            "analysis of {} finished ({} POMs resolved)",
            model.gav(),
            inheritance.cached()
        );
        Ok(Analysis { model, graph })
    }
}

/// Result of one analysis request.
#[derive(Debug, Clone)]
pub struct Analysis {
    model: Arc<EffectiveModel>,
    graph: DependencyGraph,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectInfo {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub packaging: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub parent: Option<String>,
    pub modules: Vec<String>,
    pub active_profiles: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencySummary {
    pub total: usize,
    pub direct: usize,
    pub transitive: usize,
    pub by_scope: BTreeMap<String, usize>,
    pub by_group: BTreeMap<String, usize>,
    pub optional: usize,
    pub snapshots: usize,
    pub prereleases: usize,
    pub version_ranges: usize,
    pub unresolved: usize,
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PluginSummary {
    pub total: usize,
    pub by_group: BTreeMap<String, usize>,
    pub with_version: usize,
    pub without_version: usize,
    pub with_configuration: usize,
    pub with_executions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictCandidate {
    pub version: String,
    pub depth: usize,
    pub path: Vec<String>,
    pub selected: bool,
}

/// A coordinate discovered with more than one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub group_id: String,
    pub artifact_id: String,
    pub selected_version: String,
    /// Distinct versions, newest first.
    pub versions: Vec<String>,
    pub candidates: Vec<ConflictCandidate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JavaVersionInfo {
    pub java_version: Option<String>,
    pub maven_compiler_source: Option<String>,
    pub maven_compiler_target: Option<String>,
    pub maven_compiler_release: Option<String>,
    pub compiler_plugin_source: Option<String>,
    pub compiler_plugin_target: Option<String>,
    pub compiler_plugin_release: Option<String>,
}

impl JavaVersionInfo {
    /// The setting the compiler would actually use: plugin configuration
    /// over properties, `release` over `target`.
    pub fn effective(&self) -> Option<&str> {
        [
            &self.compiler_plugin_release,
            &self.compiler_plugin_target,
            &self.maven_compiler_release,
            &self.maven_compiler_target,
            &self.java_version,
        ]
        .into_iter()
        .find_map(|v| v.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    #[serde(flatten)]
    pub settings: BuildSettings,
    pub plugins: usize,
    pub plugin_management: usize,
}

/// Everything at once, for export.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport<'a> {
    pub project: ProjectInfo,
    pub properties: &'a PropertyTable,
    pub unresolved_placeholders: &'a [String],
    pub dependency_summary: DependencySummary,
    pub dependencies: &'a [ResolvedDependency],
    pub dependency_tree: &'a [DependencyNode],
    pub conflicts: Vec<Conflict>,
    pub plugin_summary: PluginSummary,
    pub plugins: &'a [PluginDescriptor],
    pub java_version: JavaVersionInfo,
    pub build: BuildInfo,
    pub complete: bool,
}

impl Analysis {
    pub fn model(&self) -> &EffectiveModel {
        &self.model
    }

    pub const fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Resolved declared properties plus external overrides.
    pub fn properties(&self) -> &PropertyTable {
        &self.model.properties
    }

    pub fn dependency_tree(&self) -> &[DependencyNode] {
        self.graph.tree()
    }

    pub fn flattened_dependencies(&self) -> &[ResolvedDependency] {
        self.graph.flattened()
    }

    pub fn plugins(&self) -> &[PluginDescriptor] {
        &self.model.plugins
    }

    pub fn unresolved_placeholders(&self) -> &[String] {
        &self.model.unresolved_placeholders
    }

    pub fn is_complete(&self) -> bool {
        self.graph.is_complete()
    }

    pub fn project(&self) -> ProjectInfo {
        let m = &self.model;
        ProjectInfo {
            group_id: m.group_id.clone(),
            artifact_id: m.artifact_id.clone(),
            version: m.version.clone(),
            packaging: m.packaging.clone(),
            name: m.name.clone(),
            description: m.description.clone(),
            url: m.url.clone(),
            parent: m.parent.as_ref().map(|p| p.gav().to_string()),
            modules: m.modules.clone(),
            active_profiles: m.active_profiles.clone(),
        }
    }

    pub fn dependency_summary(&self) -> DependencySummary {
        let deps = self.graph.flattened();
        let mut summary = DependencySummary {
            total: deps.len(),
            unresolved: self.graph.unresolved().len(),
            max_depth: self.graph.max_depth(),
            ..DependencySummary::default()
        };

        for dep in deps {
            if dep.depth == 0 {
                summary.direct += 1;
            } else {
                summary.transitive += 1;
            }
            *summary.by_scope.entry(dep.scope.to_string()).or_default() += 1;
            *summary.by_group.entry(dep.group_id.clone()).or_default() += 1;
            if dep.optional {
                summary.optional += 1;
            }
            if is_snapshot(&dep.version) {
                summary.snapshots += 1;
            }
            if is_prerelease(&dep.version) {
                summary.prereleases += 1;
            }
            if is_range(&dep.version) {
                summary.version_ranges += 1;
            }
        }
        summary
    }

    pub fn plugin_summary(&self) -> PluginSummary {
        let plugins = self.plugins();
        let mut summary = PluginSummary {
            total: plugins.len(),
            ..PluginSummary::default()
        };
        for plugin in plugins {
            *summary.by_group.entry(plugin.group_id.clone()).or_default() += 1;
            if plugin.version.is_some() {
                summary.with_version += 1;
            } else {
                summary.without_version += 1;
            }
            if !plugin.configuration.is_empty() {
                summary.with_configuration += 1;
            }
            if !plugin.executions.is_empty() {
                summary.with_executions += 1;
            }
        }
        summary
    }

    /// Coordinates seen with more than one version anywhere in the tree.
    pub fn conflicts(&self) -> Vec<Conflict> {
        let mut by_key: BTreeMap<_, Vec<_>> = BTreeMap::new();
        for candidate in self.graph.candidates() {
            by_key.entry(candidate.key()).or_default().push(candidate);
        }

        by_key
            .into_iter()
            .filter_map(|(key, candidates)| {
                let mut versions: Vec<String> =
                    candidates.iter().map(|c| c.version.clone()).collect();
                versions.sort_by(|a, b| compare_versions(b, a));
                versions.dedup();
                if versions.len() < 2 {
                    return None;
                }
                let selected_version = self.graph.get(&key)?.version.clone();
                Some(Conflict {
                    group_id: key.group_id,
                    artifact_id: key.artifact_id,
                    selected_version,
                    versions,
                    candidates: candidates
                        .into_iter()
                        .map(|c| ConflictCandidate {
                            version: c.version.clone(),
                            depth: c.depth,
                            path: c.path.clone(),
                            selected: c.selected,
                        })
                        .collect(),
                })
            })
            .collect()
    }

    pub fn java_version(&self) -> JavaVersionInfo {
        let prop = |name: &str| self.properties().get(name).map(str::to_string);
        let plugin = self.model.plugin(COMPILER_PLUGIN_GROUP, COMPILER_PLUGIN);
        let plugin_setting = |key: &str| {
            plugin
                .and_then(|p| config_text(&p.configuration, key))
                .map(str::to_string)
        };
        JavaVersionInfo {
            java_version: prop("java.version"),
            maven_compiler_source: prop("maven.compiler.source"),
            maven_compiler_target: prop("maven.compiler.target"),
            maven_compiler_release: prop("maven.compiler.release"),
            compiler_plugin_source: plugin_setting("source"),
            compiler_plugin_target: plugin_setting("target"),
            compiler_plugin_release: plugin_setting("release"),
        }
    }

    pub fn build_info(&self) -> BuildInfo {
        BuildInfo {
            settings: self.model.build.clone(),
            plugins: self.model.plugins.len(),
            plugin_management: self.model.plugin_management.len(),
        }
    }

    pub fn report(&self) -> AnalysisReport<'_> {
        AnalysisReport {
            project: self.project(),
            properties: self.properties(),
            unresolved_placeholders: self.unresolved_placeholders(),
            dependency_summary: self.dependency_summary(),
            dependencies: self.flattened_dependencies(),
            dependency_tree: self.dependency_tree(),
            conflicts: self.conflicts(),
            plugin_summary: self.plugin_summary(),
            plugins: self.plugins(),
            java_version: self.java_version(),
            build: self.build_info(),
            complete: self.is_complete(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supplier::InMemorySupplier;

    const PROJECT: &str = r"<project>
  <groupId>com.acme</groupId>
  <artifactId>app</artifactId>
  <version>1.0</version>
  <name>Acme App</name>
  <properties>
    <java.version>17</java.version>
    <maven.compiler.source>${java.version}</maven.compiler.source>
    <guava.version>33.0-jre</guava.version>
  </properties>
  <dependencies>
    <dependency><groupId>com.google.guava</groupId><artifactId>guava</artifactId><version>${guava.version}</version></dependency>
    <dependency><groupId>com.acme</groupId><artifactId>lib</artifactId><version>2.0-SNAPSHOT</version></dependency>
    <dependency><groupId>junit</groupId><artifactId>junit</artifactId><version>4.13.2</version><scope>test</scope><optional>true</optional></dependency>
  </dependencies>
  <build>
    <finalName>acme</finalName>
    <plugins>
      <plugin>
        <artifactId>maven-compiler-plugin</artifactId>
        <version>3.11.0</version>
        <configuration><release>21</release></configuration>
      </plugin>
      <plugin>
        <groupId>org.springframework.boot</groupId>
        <artifactId>spring-boot-maven-plugin</artifactId>
        <executions><execution><goals><goal>repackage</goal></goals></execution></executions>
      </plugin>
    </plugins>
  </build>
</project>";

    fn supplier() -> Arc<InMemorySupplier> {
        let supplier = InMemorySupplier::new();
        for pom in [
            "<project><groupId>com.google.guava</groupId><artifactId>guava</artifactId><version>33.0-jre</version>\
             <dependencies><dependency><groupId>com.google.code.findbugs</groupId><artifactId>jsr305</artifactId><version>3.0.2</version></dependency></dependencies></project>",
            "<project><groupId>com.acme</groupId><artifactId>lib</artifactId><version>2.0-SNAPSHOT</version>\
             <dependencies><dependency><groupId>com.google.guava</groupId><artifactId>guava</artifactId><version>31.1-jre</version></dependency></dependencies></project>",
            "<project><groupId>com.google.guava</groupId><artifactId>guava</artifactId><version>31.1-jre</version></project>",
            "<project><groupId>com.google.code.findbugs</groupId><artifactId>jsr305</artifactId><version>3.0.2</version></project>",
        ] {
            supplier.register_xml(pom).unwrap();
        }
        Arc::new(supplier)
    }

    async fn analysis() -> Analysis {
        Analyzer::new(supplier(), ResolverConfig::default())
            .analyze_str(PROJECT)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_project_and_properties() {
        let analysis = analysis().await;
        let project = analysis.project();
        assert_eq!(project.artifact_id, "app");
        assert_eq!(project.name.as_deref(), Some("Acme App"));
        assert!(project.parent.is_none());
        assert_eq!(
            analysis.properties().get("maven.compiler.source"),
            Some("17")
        );
        assert!(analysis.unresolved_placeholders().is_empty());
        assert!(analysis.is_complete());
    }

    #[tokio::test]
    async fn test_dependency_summary() {
        let summary = analysis().await.dependency_summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.direct, 3);
        assert_eq!(summary.transitive, 1);
        assert_eq!(summary.by_scope.get("compile"), Some(&3));
        assert_eq!(summary.by_scope.get("test"), Some(&1));
        assert_eq!(summary.optional, 1);
        assert_eq!(summary.snapshots, 1);
        assert_eq!(summary.prereleases, 1);
        assert_eq!(summary.max_depth, Some(1));
    }

    #[tokio::test]
    async fn test_conflicts() {
        let conflicts = analysis().await.conflicts();
        assert_eq!(conflicts.len(), 1);
        let guava = &conflicts[0];
        assert_eq!(guava.artifact_id, "guava");
        assert_eq!(guava.selected_version, "33.0-jre");
        assert_eq!(guava.versions, vec!["33.0-jre", "31.1-jre"]);
        assert_eq!(guava.candidates.len(), 2);
        assert!(guava.candidates[0].selected);
        assert_eq!(guava.candidates[1].path, vec!["com.acme:app:1.0", "com.acme:lib:2.0-SNAPSHOT"]);
    }

    #[tokio::test]
    async fn test_plugins_and_java_version() {
        let analysis = analysis().await;
        let summary = analysis.plugin_summary();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.with_version, 1);
        assert_eq!(summary.with_configuration, 1);
        assert_eq!(summary.with_executions, 1);

        let java = analysis.java_version();
        assert_eq!(java.java_version.as_deref(), Some("17"));
        assert_eq!(java.compiler_plugin_release.as_deref(), Some("21"));
        assert_eq!(java.effective(), Some("21"));

        let build = analysis.build_info();
        assert_eq!(build.settings.final_name.as_deref(), Some("acme"));
        assert_eq!(build.plugins, 2);
    }

    #[tokio::test]
    async fn test_report_serializes() {
        let analysis = analysis().await;
        let json = serde_json::to_value(analysis.report()).unwrap();
        assert_eq!(json["project"]["artifact_id"], "app");
        assert_eq!(json["dependencies"][0]["artifact_id"], "guava");
        assert_eq!(json["dependencies"][0]["version_source"]["kind"], "declared");
        assert_eq!(json["dependencies"][0]["status"], "resolved");
        assert_eq!(json["properties"]["guava.version"], "33.0-jre");
        assert_eq!(json["complete"], true);
    }

    #[tokio::test]
    async fn test_system_properties_override() {
        let mut config = ResolverConfig::default();
        config
            .system_properties
            .insert("java.version".into(), "11".into());
        let analysis = Analyzer::new(supplier(), config)
            .analyze_str(PROJECT)
            .await
            .unwrap();
        assert_eq!(analysis.properties().get("maven.compiler.source"), Some("11"));
    }

    #[tokio::test]
    async fn test_analyze_coordinates() {
        let analyzer = Analyzer::new(supplier(), ResolverConfig::default());
        let analysis = analyzer
            .analyze_coordinates(&Gav::new("com.acme", "lib", "2.0-SNAPSHOT"))
            .await
            .unwrap();
        let coordinates: Vec<String> = analysis
            .flattened_dependencies()
            .iter()
            .map(|d| format!("{}:{}:{}", d.group_id, d.artifact_id, d.version))
            .collect();
        assert_eq!(coordinates, vec!["com.google.guava:guava:31.1-jre"]);

        assert!(matches!(
            analyzer.analyze_coordinates(&Gav::new("no", "such", "1")).await,
            Err(PomError::UnresolvedArtifact { .. })
        ));
    }

    #[tokio::test]
    async fn test_requested_profiles_apply_to_project_only() {
        let supplier = InMemorySupplier::new();
        supplier
            .register_xml(
                "<project><groupId>x</groupId><artifactId>lib</artifactId><version>1</version>\
                 <profiles><profile><id>ci</id><dependencies>\
                 <dependency><groupId>x</groupId><artifactId>lib-ci</artifactId><version>1</version></dependency>\
                 </dependencies></profile></profiles></project>",
            )
            .unwrap();
        let project = "<project><groupId>g</groupId><artifactId>app</artifactId><version>1</version>\
             <dependencies><dependency><groupId>x</groupId><artifactId>lib</artifactId><version>1</version></dependency></dependencies>\
             <profiles><profile><id>ci</id><properties><mode>ci</mode></properties></profile></profiles></project>";
        let config = ResolverConfig {
            active_profiles: vec!["ci".into()],
            ..ResolverConfig::default()
        };

        let analysis = Analyzer::new(Arc::new(supplier), config)
            .analyze_str(project)
            .await
            .unwrap();
        assert_eq!(analysis.properties().get("mode"), Some("ci"));
        let ids: Vec<&str> = analysis
            .flattened_dependencies()
            .iter()
            .map(|d| d.artifact_id.as_str())
            .collect();
        assert_eq!(ids, vec!["lib"]);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let config = ResolverConfig {
            concurrency: 0,
            ..ResolverConfig::default()
        };
        assert!(matches!(
            Analyzer::new(supplier(), config).analyze_str(PROJECT).await,
            Err(PomError::Config { .. })
        ));
    }
}
