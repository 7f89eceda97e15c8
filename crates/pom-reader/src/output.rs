//! Plain-text and JSON rendering of analysis results.

use anyhow::Result;
use pom_core::{
    Analysis, DependencyNode, NodeStatus, PluginDescriptor, ResolvedDependency, Scope, SkipReason,
    VersionSource,
};
use serde::Serialize;
use std::io::Write;

/// Narrows dependency listings by scope and groupId prefix.
#[derive(Debug, Default)]
pub(crate) struct DependencyFilter {
    pub(crate) scope: Option<Scope>,
    pub(crate) group: Option<String>,
}

impl DependencyFilter {
    fn accepts(&self, group_id: &str, scope: Scope) -> bool {
        self.scope.is_none_or(|s| s == scope)
            && self
                .group
                .as_deref()
                .is_none_or(|prefix| group_id.starts_with(prefix))
    }

    pub(crate) fn flattened<'a>(&self, analysis: &'a Analysis) -> Vec<&'a ResolvedDependency> {
        analysis
            .flattened_dependencies()
            .iter()
            .filter(|d| self.accepts(&d.group_id, d.scope))
            .collect()
    }

    /// Keeps nodes that match, plus the ancestors needed to reach them.
    pub(crate) fn tree(&self, nodes: &[DependencyNode]) -> Vec<DependencyNode> {
        nodes.iter().filter_map(|node| self.prune(node)).collect()
    }

    fn prune(&self, node: &DependencyNode) -> Option<DependencyNode> {
        let children = self.tree(&node.children);
        if children.is_empty() && !self.accepts(&node.group_id, node.scope) {
            return None;
        }
        Some(DependencyNode {
            children,
            ..node.clone()
        })
    }
}

pub(crate) fn write_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

pub(crate) fn print_summary(out: &mut impl Write, analysis: &Analysis) -> Result<()> {
    let project = analysis.project();
    writeln!(
        out,
        "Project:      {}:{}:{}",
        project.group_id, project.artifact_id, project.version
    )?;
    if let Some(name) = &project.name {
        writeln!(out, "Name:         {name}")?;
    }
    writeln!(out, "Packaging:    {}", project.packaging)?;
    if let Some(parent) = &project.parent {
        writeln!(out, "Parent:       {parent}")?;
    }
    if let Some(java) = analysis.java_version().effective() {
        writeln!(out, "Java:         {java}")?;
    }
    if !project.active_profiles.is_empty() {
        writeln!(out, "Profiles:     {}", project.active_profiles.join(", "))?;
    }
    if !project.modules.is_empty() {
        writeln!(out, "Modules:      {}", project.modules.join(", "))?;
    }

    let deps = analysis.dependency_summary();
    write!(
        out,
        "Dependencies: {} ({} direct, {} transitive",
        deps.total, deps.direct, deps.transitive
    )?;
    if let Some(depth) = deps.max_depth {
        write!(out, ", max depth {depth}")?;
    }
    writeln!(out, ")")?;
    for (scope, count) in &deps.by_scope {
        writeln!(out, "  {scope}: {count}")?;
    }
    for (label, count) in [
        ("optional", deps.optional),
        ("snapshots", deps.snapshots),
        ("pre-releases", deps.prereleases),
        ("version ranges", deps.version_ranges),
    ] {
        if count > 0 {
            writeln!(out, "  {label}: {count}")?;
        }
    }

    let plugins = analysis.plugin_summary();
    writeln!(
        out,
        "Plugins:      {} ({} without version)",
        plugins.total, plugins.without_version
    )?;

    let conflicts = analysis.conflicts();
    if !conflicts.is_empty() {
        writeln!(out, "Conflicts:")?;
        for conflict in &conflicts {
            writeln!(
                out,
                "  {}:{} -> {} (seen: {})",
                conflict.group_id,
                conflict.artifact_id,
                conflict.selected_version,
                conflict.versions.join(", ")
            )?;
        }
    }

    if !analysis.unresolved_placeholders().is_empty() {
        writeln!(
            out,
            "Undefined properties: {}",
            analysis.unresolved_placeholders().join(", ")
        )?;
    }
    let unresolved = analysis.graph().unresolved();
    if !unresolved.is_empty() {
        writeln!(out, "Unresolved:")?;
        for dep in unresolved {
            writeln!(out, "  {} ({})", dep.coordinates, dep.reason)?;
        }
    }
    writeln!(
        out,
        "Status:       {}",
        if analysis.is_complete() {
            "complete"
        } else {
            "incomplete"
        }
    )?;
    Ok(())
}

pub(crate) fn print_dependency_list(
    out: &mut impl Write,
    deps: &[&ResolvedDependency],
) -> Result<()> {
    let rows: Vec<Vec<String>> = deps
        .iter()
        .map(|d| {
            vec![
                d.gav().to_string(),
                d.scope.to_string(),
                d.depth.to_string(),
                source_label(&d.version_source),
                status_label(&d.status),
            ]
        })
        .collect();
    print_table(
        out,
        &["DEPENDENCY", "SCOPE", "DEPTH", "VERSION", "STATUS"],
        &rows,
    )
}

pub(crate) fn print_dependency_tree(
    out: &mut impl Write,
    root: &str,
    nodes: &[DependencyNode],
) -> Result<()> {
    writeln!(out, "{root}")?;
    print_children(out, nodes, "")
}

fn print_children(out: &mut impl Write, nodes: &[DependencyNode], prefix: &str) -> Result<()> {
    for (i, node) in nodes.iter().enumerate() {
        let last = i + 1 == nodes.len();
        let (branch, indent) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        write!(out, "{prefix}{branch}{} [{}]", node.gav(), node.scope)?;
        match &node.status {
            NodeStatus::Resolved => {}
            NodeStatus::Omitted { selected_version } => {
                write!(out, " (omitted for conflict with {selected_version})")?;
            }
            NodeStatus::Skipped { reason } => write!(out, " ({})", skip_label(*reason))?,
            NodeStatus::Unresolved { reason } => write!(out, " (unresolved: {reason})")?,
        }
        if let VersionSource::Managed { by } = &node.version_source {
            write!(out, " (managed by {by})")?;
        }
        writeln!(out)?;
        print_children(out, &node.children, &format!("{prefix}{indent}"))?;
    }
    Ok(())
}

pub(crate) fn print_plugins(out: &mut impl Write, plugins: &[&PluginDescriptor]) -> Result<()> {
    let rows: Vec<Vec<String>> = plugins
        .iter()
        .map(|p| {
            let goals: Vec<&str> = p
                .executions
                .iter()
                .flat_map(|e| e.goals.iter().map(String::as_str))
                .collect();
            vec![
                format!("{}:{}", p.group_id, p.artifact_id),
                p.version.clone().unwrap_or_else(|| "-".into()),
                if goals.is_empty() {
                    "-".into()
                } else {
                    goals.join(",")
                },
                p.configuration.len().to_string(),
            ]
        })
        .collect();
    print_table(out, &["PLUGIN", "VERSION", "GOALS", "CONFIG"], &rows)
}

pub(crate) fn print_properties(out: &mut impl Write, analysis: &Analysis) -> Result<()> {
    for (name, value) in analysis.properties().iter() {
        writeln!(out, "{name} = {value}")?;
    }
    for name in analysis.unresolved_placeholders() {
        writeln!(out, "# undefined: {name}")?;
    }
    Ok(())
}

fn source_label(source: &VersionSource) -> String {
    match source {
        VersionSource::Declared => "declared".into(),
        VersionSource::Managed { by } => format!("managed by {by}"),
    }
}

fn status_label(status: &NodeStatus) -> String {
    match status {
        NodeStatus::Resolved => "resolved".into(),
        NodeStatus::Omitted { selected_version } => format!("omitted for {selected_version}"),
        NodeStatus::Skipped { reason } => skip_label(*reason).into(),
        NodeStatus::Unresolved { .. } => "unresolved".into(),
    }
}

const fn skip_label(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::Optional => "optional, not expanded",
        SkipReason::SystemScope => "system scope, not expanded",
    }
}

fn print_table(out: &mut impl Write, headers: &[&str], rows: &[Vec<String>]) -> Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header: Vec<String> = headers.iter().map(|h| (*h).to_string()).collect();
    for row in std::iter::once(&header).chain(rows) {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        writeln!(out, "{}", line.join("  ").trim_end())?;
    }
    Ok(())
}
