//! Domain types shared by the model, the resolvers and the analysis views.

use serde::Serialize;
use std::fmt;

/// Version-less identity of an artifact: `{groupId}:{artifactId}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ArtifactKey {
    pub group_id: String,
    pub artifact_id: String,
}

impl ArtifactKey {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

/// Fully qualified coordinates: `{groupId}:{artifactId}:{version}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Gav {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl Gav {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }

    pub fn key(&self) -> ArtifactKey {
        ArtifactKey::new(&self.group_id, &self.artifact_id)
    }
}

impl fmt::Display for Gav {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Compile,
    Runtime,
    Test,
    Provided,
    System,
    Import,
}

impl Scope {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Runtime => "runtime",
            Self::Test => "test",
            Self::Provided => "provided",
            Self::System => "system",
            Self::Import => "import",
        }
    }

    /// Scopes Maven carries over to dependants of the declaring artifact.
    pub const fn is_transitive(self) -> bool {
        matches!(self, Self::Compile | Self::Runtime)
    }

    /// Strict lookup, `None` for names Maven does not know.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "compile" => Some(Self::Compile),
            "runtime" => Some(Self::Runtime),
            "test" => Some(Self::Test),
            "provided" => Some(Self::Provided),
            "system" => Some(Self::System),
            "import" => Some(Self::Import),
            _ => None,
        }
    }
}

/// Lenient parse: unknown names fall back to `compile`.
impl std::str::FromStr for Scope {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from_name(s).unwrap_or_default())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `<exclusion>` entry. Either part may be the `*` wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
}

impl Exclusion {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    pub fn matches(&self, key: &ArtifactKey) -> bool {
        (self.group_id == "*" || self.group_id == key.group_id)
            && (self.artifact_id == "*" || self.artifact_id == key.artifact_id)
    }
}

/// A `<dependency>` as written, in `<dependencies>` or `<dependencyManagement>`.
///
/// Version, scope and classifier are kept as raw strings because they may
/// still hold `${...}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyDecl {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub scope: Option<String>,
    /// `<type>`, `jar` when absent.
    pub dep_type: Option<String>,
    pub classifier: Option<String>,
    pub optional: bool,
    pub exclusions: Vec<Exclusion>,
}

impl DependencyDecl {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: None,
            scope: None,
            dep_type: None,
            classifier: None,
            optional: false,
            exclusions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn key(&self) -> ArtifactKey {
        ArtifactKey::new(&self.group_id, &self.artifact_id)
    }

    /// Parsed scope; `None` when the declaration leaves it to management.
    pub fn declared_scope(&self) -> Option<Scope> {
        self.scope
            .as_deref()
            .map(|s| s.parse::<Scope>().unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentRef {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub relative_path: Option<String>,
}

impl ParentRef {
    pub fn gav(&self) -> Gav {
        Gav::new(&self.group_id, &self.artifact_id, &self.version)
    }
}

/// Plugin configuration node. Plugin schemas are plugin-specific, so the
/// raw XML shape is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Text(String),
    Children(Vec<ConfigEntry>),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: ConfigValue,
}

impl ConfigEntry {
    pub fn text(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: ConfigValue::Text(value.into()),
        }
    }
}

/// Looks up the text of the first top-level entry named `key`.
pub fn config_text<'a>(entries: &'a [ConfigEntry], key: &str) -> Option<&'a str> {
    entries
        .iter()
        .find(|e| e.key == key)
        .and_then(|e| match &e.value {
            ConfigValue::Text(t) => Some(t.as_str()),
            _ => None,
        })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PluginExecution {
    pub id: Option<String>,
    pub phase: Option<String>,
    pub goals: Vec<String>,
    pub configuration: Vec<ConfigEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginDescriptor {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub extensions: bool,
    /// `false` keeps the plugin out of child POMs.
    pub inherited: bool,
    pub configuration: Vec<ConfigEntry>,
    pub executions: Vec<PluginExecution>,
}

impl PluginDescriptor {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: None,
            extensions: false,
            inherited: true,
            configuration: Vec::new(),
            executions: Vec::new(),
        }
    }

    pub fn key(&self) -> ArtifactKey {
        ArtifactKey::new(&self.group_id, &self.artifact_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildSettings {
    pub source_directory: Option<String>,
    pub test_source_directory: Option<String>,
    pub output_directory: Option<String>,
    pub test_output_directory: Option<String>,
    pub final_name: Option<String>,
    pub directory: Option<String>,
}

impl BuildSettings {
    /// Field-by-field merge, `self` wins.
    #[must_use]
    pub fn over(&self, parent: &Self) -> Self {
        let pick = |child: &Option<String>, parent: &Option<String>| {
            child.clone().or_else(|| parent.clone())
        };
        Self {
            source_directory: pick(&self.source_directory, &parent.source_directory),
            test_source_directory: pick(&self.test_source_directory, &parent.test_source_directory),
            output_directory: pick(&self.output_directory, &parent.output_directory),
            test_output_directory: pick(&self.test_output_directory, &parent.test_output_directory),
            final_name: pick(&self.final_name, &parent.final_name),
            directory: pick(&self.directory, &parent.directory),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_variants() {
        assert_eq!("test".parse::<Scope>().unwrap(), Scope::Test);
        assert_eq!("runtime".parse::<Scope>().unwrap(), Scope::Runtime);
        assert_eq!("provided".parse::<Scope>().unwrap(), Scope::Provided);
        assert_eq!("system".parse::<Scope>().unwrap(), Scope::System);
        assert_eq!("import".parse::<Scope>().unwrap(), Scope::Import);
        assert_eq!("COMPILE".parse::<Scope>().unwrap(), Scope::Compile);
        assert_eq!("unknown".parse::<Scope>().unwrap(), Scope::Compile);
        assert_eq!(Scope::from_name("unknown"), None);
        assert_eq!(Scope::from_name("Test"), Some(Scope::Test));
    }

    #[test]
    fn test_scope_default_and_transitivity() {
        assert_eq!(Scope::default(), Scope::Compile);
        assert!(Scope::Compile.is_transitive());
        assert!(Scope::Runtime.is_transitive());
        assert!(!Scope::Test.is_transitive());
        assert!(!Scope::Provided.is_transitive());
    }

    #[test]
    fn test_coordinates_display() {
        let gav = Gav::new("org.apache.commons", "commons-lang3", "3.14.0");
        assert_eq!(gav.to_string(), "org.apache.commons:commons-lang3:3.14.0");
        assert_eq!(gav.key().to_string(), "org.apache.commons:commons-lang3");
    }

    #[test]
    fn test_exclusion_wildcards() {
        let key = ArtifactKey::new("org.slf4j", "slf4j-api");
        assert!(Exclusion::new("org.slf4j", "slf4j-api").matches(&key));
        assert!(Exclusion::new("org.slf4j", "*").matches(&key));
        assert!(Exclusion::new("*", "*").matches(&key));
        assert!(!Exclusion::new("org.slf4j", "slf4j-simple").matches(&key));
        assert!(!Exclusion::new("*", "log4j").matches(&key));
    }

    #[test]
    fn test_declared_scope() {
        let dep = DependencyDecl::new("junit", "junit");
        assert!(dep.declared_scope().is_none());
        let dep = dep.with_scope("test");
        assert_eq!(dep.declared_scope(), Some(Scope::Test));
    }

    #[test]
    fn test_build_settings_merge() {
        let parent = BuildSettings {
            final_name: Some("parent".into()),
            directory: Some("target".into()),
            ..BuildSettings::default()
        };
        let child = BuildSettings {
            final_name: Some("child".into()),
            ..BuildSettings::default()
        };
        let merged = child.over(&parent);
        assert_eq!(merged.final_name.as_deref(), Some("child"));
        assert_eq!(merged.directory.as_deref(), Some("target"));
    }

    #[test]
    fn test_config_text_lookup() {
        let entries = vec![
            ConfigEntry::text("source", "17"),
            ConfigEntry {
                key: "compilerArgs".into(),
                value: ConfigValue::Children(vec![ConfigEntry::text("arg", "-Xlint")]),
            },
        ];
        assert_eq!(config_text(&entries, "source"), Some("17"));
        assert_eq!(config_text(&entries, "compilerArgs"), None);
        assert_eq!(config_text(&entries, "target"), None);
    }
}
