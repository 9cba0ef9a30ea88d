//! Input validation.
//!
//! Checks everything that does not depend on registry state: capability
//! claims, deployment, identical replacements and delegate wiring. The
//! result carries the discovered selector lists so application never asks
//! a facet twice.

use super::{FacetAddition, FacetCut};
use crate::error::{CoreError, CoreResult};
use crate::facet::{Facet, FacetCatalog};
use diamond_codec::{FacetAddress, Selector};
use std::collections::HashSet;
use std::sync::Arc;

/// A replacement with the selectors the new facet claims.
pub(crate) struct PlannedReplacement {
    pub old: FacetAddress,
    pub new: FacetAddress,
    pub claimed: Vec<Selector>,
}

/// A resolved delegate call.
pub(crate) struct PlannedDelegate {
    pub target: FacetAddress,
    pub facet: Arc<dyn Facet>,
    pub payload: Vec<u8>,
}

/// A validated cut, ready to apply.
pub(crate) struct CutPlan {
    pub additions: Vec<FacetAddition>,
    pub replacements: Vec<PlannedReplacement>,
    pub removals: Vec<FacetAddress>,
    pub delegate: Option<PlannedDelegate>,
    pub metadata: Option<(String, Vec<u8>)>,
}

/// Validates `cut` against the deployed facets.
pub(crate) fn validate(cut: FacetCut, catalog: &FacetCatalog) -> CoreResult<CutPlan> {
    for addition in &cut.additions {
        validate_addition(addition, catalog)?;
    }

    let mut replacements = Vec::with_capacity(cut.replacements.len());
    for replacement in &cut.replacements {
        if replacement.old == replacement.new {
            return Err(CoreError::IdenticalReplacement {
                facet: replacement.old,
            });
        }
        let claimed = catalog.discover(replacement.new)?;
        if claimed.is_empty() {
            return Err(CoreError::NoSelectors {
                facet: replacement.new,
            });
        }
        replacements.push(PlannedReplacement {
            old: replacement.old,
            new: replacement.new,
            claimed,
        });
    }

    let delegate = match (cut.delegate_target, cut.delegate_payload) {
        (None, None) => None,
        (None, Some(_)) => {
            return Err(CoreError::invalid_operation(
                "delegate payload given without a delegate target",
            ))
        }
        (Some(target), payload) => Some(PlannedDelegate {
            target,
            facet: catalog.resolve(target)?,
            payload: payload.unwrap_or_default(),
        }),
    };

    let metadata = (!cut.tag.is_empty() || !cut.metadata.is_empty())
        .then_some((cut.tag, cut.metadata));

    Ok(CutPlan {
        additions: cut.additions,
        replacements,
        removals: cut.removals,
        delegate,
        metadata,
    })
}

fn validate_addition(addition: &FacetAddition, catalog: &FacetCatalog) -> CoreResult<()> {
    if addition.selectors.is_empty() {
        return Err(CoreError::NoSelectors {
            facet: addition.facet,
        });
    }

    let claimed: HashSet<Selector> = catalog.discover(addition.facet)?.into_iter().collect();
    if let Some(selector) = addition
        .selectors
        .iter()
        .find(|selector| !claimed.contains(selector))
    {
        return Err(CoreError::UnclaimedSelector {
            facet: addition.facet,
            selector: *selector,
        });
    }
    Ok(())
}
