//! Copy-producing plan construction.

use std::collections::BTreeMap;

use chrono::Utc;

use crate::plan::model::{PackageAction, Plan, PlanOptions, RepoProvider, Step, PLAN_VERSION};

/// New plan stamped with the current time.
///
/// Actions for the same package are merged in order.
pub fn create_plan(actions: Vec<PackageAction>, actor: impl Into<String>, options: PlanOptions) -> Plan {
    let plan = Plan {
        version: PLAN_VERSION,
        generated_at: Utc::now(),
        actor: actor.into(),
        options,
        actions: Vec::new(),
    };
    actions.into_iter().fold(plan, |plan, action| add_action(&plan, action))
}

/// Copy of `plan` with `action` added. Steps for a package already in the
/// plan are appended to its existing action.
pub fn add_action(plan: &Plan, action: PackageAction) -> Plan {
    let mut next = plan.clone();
    match next.actions.iter_mut().find(|a| a.package == action.package) {
        Some(existing) => existing.steps.extend(action.steps),
        None => next.actions.push(action),
    }
    next
}

/// Copy of `plan` without the action for `package`.
pub fn remove_action(plan: &Plan, package: &str) -> Plan {
    let mut next = plan.clone();
    next.actions.retain(|a| a.package != package);
    next
}

impl PackageAction {
    pub fn new(package: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            package: package.into(),
            steps,
        }
    }

    pub fn deprecate(package: impl Into<String>, range: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            package,
            vec![Step::Deprecate {
                range: range.into(),
                message: message.into(),
            }],
        )
    }

    pub fn undeprecate(package: impl Into<String>, range: impl Into<String>) -> Self {
        Self::new(package, vec![Step::Undeprecate { range: range.into() }])
    }

    pub fn unpublish(package: impl Into<String>, version: Option<String>, force: bool) -> Self {
        Self::new(package, vec![Step::Unpublish { version, force }])
    }

    pub fn tombstone(
        package: impl Into<String>,
        target_version: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            package,
            vec![Step::Tombstone {
                target_version: target_version.into(),
                message: message.into(),
            }],
        )
    }

    pub fn owner_add(package: impl Into<String>, user: impl Into<String>) -> Self {
        Self::new(package, vec![Step::OwnerAdd { user: user.into() }])
    }

    pub fn owner_remove(package: impl Into<String>, user: impl Into<String>) -> Self {
        Self::new(package, vec![Step::OwnerRemove { user: user.into() }])
    }

    pub fn archive_repo(
        package: impl Into<String>,
        provider: RepoProvider,
        repo: impl Into<String>,
        add_banner: bool,
    ) -> Self {
        Self::new(
            package,
            vec![Step::ArchiveRepo {
                provider,
                repo: repo.into(),
                add_banner,
            }],
        )
    }

    /// Append a step, builder style.
    pub fn then(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepCounts {
    pub total: usize,
    pub by_type: BTreeMap<&'static str, usize>,
}

pub fn count_steps(plan: &Plan) -> StepCounts {
    let mut counts = StepCounts::default();
    for step in plan.actions.iter().flat_map(|a| &a.steps) {
        counts.total += 1;
        *counts.by_type.entry(step.type_name()).or_default() += 1;
    }
    counts
}

pub fn has_destructive_actions(plan: &Plan) -> bool {
    plan.actions
        .iter()
        .flat_map(|a| &a.steps)
        .any(Step::is_destructive)
}

/// `(package, step)` pairs that need explicit confirmation.
pub fn destructive_steps(plan: &Plan) -> Vec<(&str, &Step)> {
    plan.actions
        .iter()
        .flat_map(|a| a.steps.iter().map(move |s| (a.package.as_str(), s)))
        .filter(|(_, s)| s.is_destructive())
        .collect()
}

/// Phrase the user types to apply a destructive plan, e.g. `APPLY 4`.
pub fn confirmation_phrase(plan: &Plan) -> String {
    format!("APPLY {}", count_steps(plan).total)
}
