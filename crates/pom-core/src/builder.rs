//! Builds a [`RawModel`] from a parsed POM element tree.
//!
//! Elements the model does not cover are skipped. Coordinate values must be
//! non-empty text; anything else is reported as `MalformedModel` with the
//! path of the offending element.

use crate::error::{PomError, Result};
use crate::model::{Profile, RawModel};
use crate::types::{
    BuildSettings, ConfigEntry, ConfigValue, DependencyDecl, Exclusion, ParentRef,
    PluginDescriptor, PluginExecution,
};
use crate::xml::{Element, parse_document};

const DEFAULT_PLUGIN_GROUP: &str = "org.apache.maven.plugins";

/// Parses XML text and builds its raw model.
pub fn parse_raw_model(content: &str) -> Result<RawModel> {
    build_raw_model(&parse_document(content)?)
}

pub fn build_raw_model(root: &Element) -> Result<RawModel> {
    if root.name != "project" {
        return Err(PomError::malformed(
            "project",
            format!("root element is <{}>, expected <project>", root.name),
        ));
    }
    let path = "project";

    let parent = root
        .child("parent")
        .map(|p| build_parent(p, "project.parent"))
        .transpose()?;

    let model = RawModel {
        group_id: coordinate(root, "groupId", path)?,
        artifact_id: coordinate(root, "artifactId", path)?,
        version: coordinate(root, "version", path)?,
        packaging: text_field(root, "packaging"),
        name: text_field(root, "name"),
        description: text_field(root, "description"),
        url: text_field(root, "url"),
        parent,
        properties: build_properties(root),
        dependencies: build_dependencies(root.child("dependencies"), "project.dependencies")?,
        dependency_management: build_dependencies(
            root.descendant("dependencyManagement/dependencies"),
            "project.dependencyManagement.dependencies",
        )?,
        plugins: build_plugins(
            root.descendant("build/plugins"),
            "project.build.plugins",
        )?,
        plugin_management: build_plugins(
            root.descendant("build/pluginManagement/plugins"),
            "project.build.pluginManagement.plugins",
        )?,
        build: root.child("build").map(build_settings).unwrap_or_default(),
        modules: root
            .child("modules")
            .map(|m| {
                m.children_named("module")
                    .filter_map(Element::text)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        profiles: build_profiles(root)?,
    };

    tracing::debug!(
        "built raw model {} ({} dependencies, {} managed, {} plugins, {} properties)",
        model.label(),
        model.dependencies.len(),
        model.dependency_management.len(),
        model.plugins.len(),
        model.properties.len()
    );

    Ok(model)
}

/// Reads a coordinate element. Absent is fine; present-but-empty or
/// element-valued is malformed.
fn coordinate(node: &Element, name: &str, path: &str) -> Result<Option<String>> {
    let Some(el) = node.child(name) else {
        return Ok(None);
    };
    let field = format!("{path}.{name}");
    if !el.children.is_empty() {
        return Err(PomError::malformed(
            field,
            "expected a text value, found nested elements",
        ));
    }
    match el.text() {
        Some(text) => Ok(Some(text.to_string())),
        None => Err(PomError::malformed(field, "value is empty")),
    }
}

fn required_coordinate(node: &Element, name: &str, path: &str) -> Result<String> {
    coordinate(node, name, path)?
        .ok_or_else(|| PomError::malformed(format!("{path}.{name}"), "required element is missing"))
}

fn text_field(node: &Element, name: &str) -> Option<String> {
    node.child_text(name).map(str::to_string)
}

fn flag(node: &Element, name: &str, default: bool) -> bool {
    node.child_text(name)
        .map_or(default, |t| t.eq_ignore_ascii_case("true"))
}

fn build_parent(node: &Element, path: &str) -> Result<ParentRef> {
    Ok(ParentRef {
        group_id: required_coordinate(node, "groupId", path)?,
        artifact_id: required_coordinate(node, "artifactId", path)?,
        version: required_coordinate(node, "version", path)?,
        // `<relativePath/>` is meaningful: it disables the local lookup.
        relative_path: node
            .child("relativePath")
            .map(|rp| rp.text().unwrap_or_default().to_string()),
    })
}

fn build_properties(node: &Element) -> Vec<(String, String)> {
    node.child("properties")
        .map(|props| {
            props
                .children
                .iter()
                .map(|p| (p.name.clone(), p.text().unwrap_or_default().to_string()))
                .collect()
        })
        .unwrap_or_default()
}

fn build_dependencies(node: Option<&Element>, path: &str) -> Result<Vec<DependencyDecl>> {
    let Some(node) = node else {
        return Ok(Vec::new());
    };
    node.children_named("dependency")
        .enumerate()
        .map(|(i, dep)| build_dependency(dep, &format!("{path}.dependency[{i}]")))
        .collect()
}

fn build_dependency(node: &Element, path: &str) -> Result<DependencyDecl> {
    let exclusions = match node.child("exclusions") {
        Some(ex) => ex
            .children_named("exclusion")
            .enumerate()
            .map(|(i, e)| {
                let path = format!("{path}.exclusions.exclusion[{i}]");
                Ok(Exclusion::new(
                    required_coordinate(e, "groupId", &path)?,
                    required_coordinate(e, "artifactId", &path)?,
                ))
            })
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    Ok(DependencyDecl {
        group_id: required_coordinate(node, "groupId", path)?,
        artifact_id: required_coordinate(node, "artifactId", path)?,
        version: coordinate(node, "version", path)?,
        scope: text_field(node, "scope"),
        dep_type: text_field(node, "type"),
        classifier: text_field(node, "classifier"),
        optional: flag(node, "optional", false),
        exclusions,
    })
}

fn build_plugins(node: Option<&Element>, path: &str) -> Result<Vec<PluginDescriptor>> {
    let Some(node) = node else {
        return Ok(Vec::new());
    };
    node.children_named("plugin")
        .enumerate()
        .map(|(i, plugin)| build_plugin(plugin, &format!("{path}.plugin[{i}]")))
        .collect()
}

fn build_plugin(node: &Element, path: &str) -> Result<PluginDescriptor> {
    let executions = node
        .descendant("executions")
        .map(|ex| {
            ex.children_named("execution")
                .map(|e| PluginExecution {
                    id: text_field(e, "id"),
                    phase: text_field(e, "phase"),
                    goals: e
                        .child("goals")
                        .map(|g| {
                            g.children_named("goal")
                                .filter_map(Element::text)
                                .map(str::to_string)
                                .collect()
                        })
                        .unwrap_or_default(),
                    configuration: e.child("configuration").map(config_entries).unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(PluginDescriptor {
        group_id: coordinate(node, "groupId", path)?
            .unwrap_or_else(|| DEFAULT_PLUGIN_GROUP.to_string()),
        artifact_id: required_coordinate(node, "artifactId", path)?,
        version: coordinate(node, "version", path)?,
        extensions: flag(node, "extensions", false),
        inherited: flag(node, "inherited", true),
        configuration: node
            .child("configuration")
            .map(config_entries)
            .unwrap_or_default(),
        executions,
    })
}

fn config_entries(node: &Element) -> Vec<ConfigEntry> {
    node.children
        .iter()
        .map(|child| ConfigEntry {
            key: child.name.clone(),
            value: config_value(child),
        })
        .collect()
}

fn config_value(node: &Element) -> ConfigValue {
    if !node.children.is_empty() {
        ConfigValue::Children(config_entries(node))
    } else if let Some(text) = node.text() {
        ConfigValue::Text(text.to_string())
    } else {
        ConfigValue::Empty
    }
}

fn build_settings(node: &Element) -> BuildSettings {
    BuildSettings {
        source_directory: text_field(node, "sourceDirectory"),
        test_source_directory: text_field(node, "testSourceDirectory"),
        output_directory: text_field(node, "outputDirectory"),
        test_output_directory: text_field(node, "testOutputDirectory"),
        final_name: text_field(node, "finalName"),
        directory: text_field(node, "directory"),
    }
}

fn build_profiles(root: &Element) -> Result<Vec<Profile>> {
    let Some(profiles) = root.child("profiles") else {
        return Ok(Vec::new());
    };
    profiles
        .children_named("profile")
        .enumerate()
        .map(|(i, p)| {
            let path = format!("project.profiles.profile[{i}]");
            Ok(Profile {
                id: required_coordinate(p, "id", &path)?,
                active_by_default: p
                    .child("activation")
                    .is_some_and(|a| flag(a, "activeByDefault", false)),
                properties: build_properties(p),
                dependencies: build_dependencies(
                    p.child("dependencies"),
                    &format!("{path}.dependencies"),
                )?,
                dependency_management: build_dependencies(
                    p.descendant("dependencyManagement/dependencies"),
                    &format!("{path}.dependencyManagement.dependencies"),
                )?,
                plugins: build_plugins(
                    p.descendant("build/plugins"),
                    &format!("{path}.build.plugins"),
                )?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_simple_pom() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <groupId>org.example</groupId>
  <artifactId>demo</artifactId>
  <version>1.0.0</version>
  <dependencies>
    <dependency>
      <groupId>org.apache.commons</groupId>
      <artifactId>commons-lang3</artifactId>
      <version>3.14.0</version>
    </dependency>
  </dependencies>
</project>"#;

        let model = parse_raw_model(xml).unwrap();
        assert_eq!(model.group_id.as_deref(), Some("org.example"));
        assert_eq!(model.artifact_id.as_deref(), Some("demo"));
        assert_eq!(model.version.as_deref(), Some("1.0.0"));
        assert!(model.parent.is_none());
        assert_eq!(model.dependencies.len(), 1);
        let dep = &model.dependencies[0];
        assert_eq!(dep.key().to_string(), "org.apache.commons:commons-lang3");
        assert_eq!(dep.version.as_deref(), Some("3.14.0"));
        assert!(dep.scope.is_none());
    }

    #[test]
    fn test_build_parent_and_inherited_coordinates() {
        let xml = r"<project>
  <parent>
    <groupId>org.example</groupId>
    <artifactId>parent</artifactId>
    <version>2.0</version>
    <relativePath/>
  </parent>
  <artifactId>child</artifactId>
</project>";

        let model = parse_raw_model(xml).unwrap();
        assert!(model.group_id.is_none());
        let parent = model.parent.as_ref().unwrap();
        assert_eq!(parent.artifact_id, "parent");
        assert_eq!(parent.relative_path.as_deref(), Some(""));
        assert_eq!(
            model.declared_gav().unwrap().to_string(),
            "org.example:child:2.0"
        );
    }

    #[test]
    fn test_dependency_details() {
        let xml = r"<project>
  <groupId>g</groupId><artifactId>a</artifactId><version>1</version>
  <dependencies>
    <dependency>
      <groupId>org.springframework</groupId>
      <artifactId>spring-core</artifactId>
      <version>${spring.version}</version>
      <scope>runtime</scope>
      <type>test-jar</type>
      <classifier>tests</classifier>
      <optional>TRUE</optional>
      <exclusions>
        <exclusion><groupId>commons-logging</groupId><artifactId>commons-logging</artifactId></exclusion>
        <exclusion><groupId>org.slf4j</groupId><artifactId>*</artifactId></exclusion>
      </exclusions>
    </dependency>
  </dependencies>
</project>";

        let model = parse_raw_model(xml).unwrap();
        let dep = &model.dependencies[0];
        assert_eq!(dep.version.as_deref(), Some("${spring.version}"));
        assert_eq!(dep.scope.as_deref(), Some("runtime"));
        assert_eq!(dep.dep_type.as_deref(), Some("test-jar"));
        assert_eq!(dep.classifier.as_deref(), Some("tests"));
        assert!(dep.optional);
        assert_eq!(
            dep.exclusions,
            vec![
                Exclusion::new("commons-logging", "commons-logging"),
                Exclusion::new("org.slf4j", "*"),
            ]
        );
    }

    #[test]
    fn test_dependency_management_and_properties() {
        let xml = r"<project>
  <groupId>g</groupId><artifactId>a</artifactId><version>1</version>
  <properties>
    <java.version>17</java.version>
    <skipTests/>
  </properties>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>com.acme</groupId>
        <artifactId>lib</artifactId>
        <version>2.5</version>
      </dependency>
    </dependencies>
  </dependencyManagement>
</project>";

        let model = parse_raw_model(xml).unwrap();
        assert!(model.dependencies.is_empty());
        assert_eq!(model.dependency_management.len(), 1);
        assert_eq!(
            model.properties,
            vec![
                ("java.version".to_string(), "17".to_string()),
                ("skipTests".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_plugins_with_configuration_tree() {
        let xml = r"<project>
  <groupId>g</groupId><artifactId>a</artifactId><version>1</version>
  <build>
    <finalName>app</finalName>
    <pluginManagement>
      <plugins>
        <plugin><artifactId>maven-surefire-plugin</artifactId><version>3.2.5</version></plugin>
      </plugins>
    </pluginManagement>
    <plugins>
      <plugin>
        <artifactId>maven-compiler-plugin</artifactId>
        <version>3.11.0</version>
        <inherited>false</inherited>
        <configuration>
          <release>17</release>
          <compilerArgs>
            <arg>-Xlint:all</arg>
            <arg>-parameters</arg>
          </compilerArgs>
          <fork/>
        </configuration>
        <executions>
          <execution>
            <id>default-compile</id>
            <phase>compile</phase>
            <goals><goal>compile</goal></goals>
          </execution>
        </executions>
      </plugin>
    </plugins>
  </build>
</project>";

        let model = parse_raw_model(xml).unwrap();
        assert_eq!(model.build.final_name.as_deref(), Some("app"));
        assert_eq!(model.plugin_management.len(), 1);
        let plugin = &model.plugins[0];
        assert_eq!(plugin.group_id, "org.apache.maven.plugins");
        assert!(!plugin.inherited);
        assert_eq!(plugin.configuration.len(), 3);
        assert_eq!(plugin.configuration[0], ConfigEntry::text("release", "17"));
        match &plugin.configuration[1].value {
            ConfigValue::Children(args) => {
                assert_eq!(args.len(), 2);
                assert_eq!(args[1], ConfigEntry::text("arg", "-parameters"));
            }
            other => panic!("expected nested config, got {other:?}"),
        }
        assert_eq!(plugin.configuration[2].value, ConfigValue::Empty);
        assert_eq!(plugin.executions[0].goals, vec!["compile"]);
        assert_eq!(plugin.executions[0].phase.as_deref(), Some("compile"));
    }

    #[test]
    fn test_profiles_and_modules() {
        let xml = r"<project>
  <groupId>g</groupId><artifactId>a</artifactId><version>1</version>
  <packaging>pom</packaging>
  <modules><module>core</module><module>web</module></modules>
  <profiles>
    <profile>
      <id>dev</id>
      <activation><activeByDefault>true</activeByDefault></activation>
      <properties><env>dev</env></properties>
      <dependencies>
        <dependency><groupId>h2</groupId><artifactId>h2</artifactId></dependency>
      </dependencies>
    </profile>
  </profiles>
</project>";

        let model = parse_raw_model(xml).unwrap();
        assert_eq!(model.packaging.as_deref(), Some("pom"));
        assert_eq!(model.modules, vec!["core", "web"]);
        let profile = &model.profiles[0];
        assert_eq!(profile.id, "dev");
        assert!(profile.active_by_default);
        assert_eq!(profile.dependencies.len(), 1);
    }

    #[test]
    fn test_unknown_elements_ignored() {
        let xml = r"<project>
  <groupId>g</groupId><artifactId>a</artifactId><version>1</version>
  <futureFeature><nested>x</nested></futureFeature>
  <licenses><license><name>MIT</name></license></licenses>
</project>";
        assert!(parse_raw_model(xml).is_ok());
    }

    #[test]
    fn test_malformed_coordinates() {
        let empty = r"<project><groupId></groupId><artifactId>a</artifactId></project>";
        match parse_raw_model(empty) {
            Err(PomError::MalformedModel { path, .. }) => assert_eq!(path, "project.groupId"),
            other => panic!("expected malformed model, got {other:?}"),
        }

        let nested = r"<project><groupId>g</groupId><artifactId><x/></artifactId></project>";
        match parse_raw_model(nested) {
            Err(PomError::MalformedModel { path, .. }) => assert_eq!(path, "project.artifactId"),
            other => panic!("expected malformed model, got {other:?}"),
        }

        let missing = r"<project>
  <dependencies>
    <dependency><groupId>a</groupId><artifactId>b</artifactId></dependency>
    <dependency><groupId>c</groupId></dependency>
  </dependencies>
</project>";
        match parse_raw_model(missing) {
            Err(PomError::MalformedModel { path, .. }) => {
                assert_eq!(path, "project.dependencies.dependency[1].artifactId");
            }
            other => panic!("expected malformed model, got {other:?}"),
        }
    }

    #[test]
    fn test_wrong_root_element() {
        assert!(matches!(
            parse_raw_model("<settings/>"),
            Err(PomError::MalformedModel { .. })
        ));
    }

    #[test]
    fn test_invalid_xml() {
        assert!(matches!(
            parse_raw_model(r#"<project attr="unclosed></project>"#),
            Err(PomError::XmlParse { .. })
        ));
    }
}
