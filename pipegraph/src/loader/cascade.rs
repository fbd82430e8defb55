//! Conditional cascading over templates.
//!
//! A scope yields its flat entries first, then the entries of each
//! conditional branch whose conditions all hold, depth first. A failing
//! condition stops evaluation of that branch immediately.

use crate::config::{
    ComparisonOperator, ConditionSpec, Conditional, PortBody, PortMap, PortTemplate, StageBody,
    WorkspaceTemplate,
};
use crate::errors::{ConfigurationError, PipegraphError};
use crate::expression::{evaluate, Keywords};
use crate::model::Direction;
use tracing::debug;

/// A template scope that may carry conditional branches of its own shape.
pub trait Cascade: Sized {
    /// Returns the conditional branches of this scope.
    fn branches(&self) -> &[Conditional<Self>];
}

/// A cascading scope that declares ports.
pub trait PortScope: Cascade {
    /// Returns the flat port templates of this scope.
    fn port_map(&self) -> &PortMap;
}

impl Cascade for StageBody {
    fn branches(&self) -> &[Conditional<Self>] {
        &self.conditional
    }
}

impl PortScope for StageBody {
    fn port_map(&self) -> &PortMap {
        &self.ports
    }
}

impl Cascade for PortBody {
    fn branches(&self) -> &[Conditional<Self>] {
        &self.conditional
    }
}

impl PortScope for PortBody {
    fn port_map(&self) -> &PortMap {
        &self.ports
    }
}

/// A port template yielded by cascading.
#[derive(Debug, Clone, Copy)]
pub struct PortEntry<'c> {
    /// Port direction.
    pub direction: Direction,
    /// Port name.
    pub name: &'c str,
    /// The template.
    pub template: &'c PortTemplate,
}

/// Evaluates a single condition.
pub fn condition_holds(
    condition: &ConditionSpec,
    keywords: &Keywords<'_>,
) -> Result<bool, PipegraphError> {
    match condition {
        ConditionSpec::Boolean { source, invert } => {
            let value = evaluate(source, keywords)?.is_truthy();
            Ok(value != *invert)
        }
        ConditionSpec::Comparison {
            source,
            target,
            comparison: ComparisonOperator::In,
        } => {
            let needle = evaluate(source, keywords)?;
            let haystack = evaluate(target, keywords)?;
            haystack
                .contains(&needle, keywords.tree())
                .ok_or_else(|| {
                    ConfigurationError::coded(
                        "CONFIG-NOT-A-CONTAINER",
                        format!(
                            "Comparison target '{target}' resolved to {}, which does not support 'in'",
                            haystack.type_name()
                        ),
                    )
                    .into()
                })
        }
    }
}

/// Returns true if every condition holds, stopping at the first that does not.
pub fn all_conditions(
    conditions: &[ConditionSpec],
    keywords: &Keywords<'_>,
) -> Result<bool, PipegraphError> {
    for condition in conditions {
        if !condition_holds(condition, keywords)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn cascade<'c, S, T, F>(
    scope: &'c S,
    keywords: &Keywords<'_>,
    flat: &F,
    out: &mut Vec<T>,
) -> Result<(), PipegraphError>
where
    S: Cascade,
    F: Fn(&'c S, &mut Vec<T>),
{
    flat(scope, out);
    for (index, branch) in scope.branches().iter().enumerate() {
        if all_conditions(&branch.conditions, keywords)? {
            debug!(branch = index, keywords = %keywords, "Conditional branch taken");
            cascade(&branch.body, keywords, flat, out)?;
        } else {
            debug!(branch = index, keywords = %keywords, "Conditional branch skipped");
        }
    }
    Ok(())
}

/// Collects the workspace templates of a stage, including active branches.
pub fn workspace_entries<'c>(
    body: &'c StageBody,
    keywords: &Keywords<'_>,
) -> Result<Vec<(&'c str, &'c WorkspaceTemplate)>, PipegraphError> {
    let mut out = Vec::new();
    cascade(
        body,
        keywords,
        &|scope: &'c StageBody, out: &mut Vec<(&'c str, &'c WorkspaceTemplate)>| {
            out.extend(scope.workspaces.iter().map(|(k, v)| (k.as_str(), v)));
        },
        &mut out,
    )?;
    Ok(out)
}

/// Collects the port templates of a scope, including active branches.
pub fn port_entries<'c, S: PortScope>(
    scope: &'c S,
    keywords: &Keywords<'_>,
) -> Result<Vec<PortEntry<'c>>, PipegraphError> {
    let mut out = Vec::new();
    cascade(
        scope,
        keywords,
        &|scope: &'c S, out: &mut Vec<PortEntry<'c>>| {
            for (direction, ports) in scope.port_map() {
                out.extend(ports.iter().map(|(name, template)| PortEntry {
                    direction: *direction,
                    name: name.as_str(),
                    template,
                }));
            }
        },
        &mut out,
    )?;
    Ok(out)
}
