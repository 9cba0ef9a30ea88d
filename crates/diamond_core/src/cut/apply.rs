//! Ordered application of a validated cut to staged state.

use super::plan::{CutPlan, PlannedDelegate, PlannedReplacement};
use super::{CutEvent, FacetAddition};
use crate::context::InitContext;
use crate::error::{CoreError, CoreResult};
use crate::registry::DispatchRegistry;
use crate::state::StateStore;
use diamond_codec::FacetAddress;
use std::collections::HashSet;
use tracing::debug;

/// Applies `plan` to the staged registry and state.
///
/// Returns the events in application order. On error the staged copies are
/// left half-mutated; the caller discards them.
pub(crate) fn apply(
    plan: CutPlan,
    registry: &mut DispatchRegistry,
    state: &mut StateStore,
) -> CoreResult<Vec<CutEvent>> {
    let mut events = Vec::new();

    for addition in &plan.additions {
        apply_addition(registry, addition, &mut events)?;
    }
    for replacement in &plan.replacements {
        apply_replacement(registry, replacement, &mut events)?;
    }
    for facet in &plan.removals {
        apply_removal(registry, *facet, &mut events)?;
    }
    if let Some(delegate) = plan.delegate {
        run_delegate(registry, state, delegate, &mut events)?;
    }
    if let Some((tag, metadata)) = plan.metadata {
        events.push(CutEvent::Metadata { tag, metadata });
    }

    Ok(events)
}

fn apply_addition(
    registry: &mut DispatchRegistry,
    addition: &FacetAddition,
    events: &mut Vec<CutEvent>,
) -> CoreResult<()> {
    for &selector in &addition.selectors {
        registry.add(selector, addition.facet)?;
        events.push(CutEvent::Added {
            selector,
            facet: addition.facet,
        });
    }
    debug!(facet = %addition.facet, selectors = addition.selectors.len(), "added facet");
    Ok(())
}

fn apply_replacement(
    registry: &mut DispatchRegistry,
    replacement: &PlannedReplacement,
    events: &mut Vec<CutEvent>,
) -> CoreResult<()> {
    let PlannedReplacement { old, new, claimed } = replacement;
    let owned = registry.selectors_of(*old);
    if owned.is_empty() {
        return Err(CoreError::FacetNotFound { facet: *old });
    }

    let claimed_set: HashSet<_> = claimed.iter().copied().collect();
    let owned_set: HashSet<_> = owned.iter().copied().collect();

    for &selector in owned.iter().filter(|s| claimed_set.contains(s)) {
        registry.replace(selector, *new)?;
        events.push(CutEvent::Replaced {
            selector,
            old: *old,
            new: *new,
        });
    }

    for &selector in claimed.iter().filter(|s| !owned_set.contains(s)) {
        match registry.facet_address(selector) {
            None => {
                registry.add(selector, *new)?;
                events.push(CutEvent::Added {
                    selector,
                    facet: *new,
                });
            }
            Some(owner) if owner == *new => {}
            Some(owner) => {
                return Err(CoreError::ReplacementConflict { selector, owner });
            }
        }
    }

    for &selector in owned.iter().filter(|s| !claimed_set.contains(s)) {
        registry.remove(selector)?;
        events.push(CutEvent::Removed {
            selector,
            facet: *old,
        });
    }

    debug!(old = %old, new = %new, "replaced facet");
    Ok(())
}

fn apply_removal(
    registry: &mut DispatchRegistry,
    facet: FacetAddress,
    events: &mut Vec<CutEvent>,
) -> CoreResult<()> {
    let owned = registry.selectors_of(facet);
    if owned.is_empty() {
        return Err(CoreError::FacetNotFound { facet });
    }

    for selector in owned {
        registry.remove(selector)?;
        events.push(CutEvent::Removed { selector, facet });
    }
    debug!(facet = %facet, "removed facet");
    Ok(())
}

fn run_delegate(
    registry: &DispatchRegistry,
    state: &mut StateStore,
    delegate: PlannedDelegate,
    events: &mut Vec<CutEvent>,
) -> CoreResult<()> {
    let PlannedDelegate {
        target,
        facet,
        payload,
    } = delegate;

    let mut ctx = InitContext::new(target, registry, state);
    let outcome = facet.initialize(&mut ctx, &payload);
    if let Some(violation) = ctx.into_violation() {
        return Err(violation);
    }
    outcome.map_err(|revert| CoreError::DelegateFailed {
        target,
        reason: revert.into_reason(),
    })?;

    debug!(target = %target, payload = payload.len(), "delegate initialized");
    events.push(CutEvent::DelegateCalled { target, payload });
    Ok(())
}
