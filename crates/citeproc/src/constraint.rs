//! Evaluation of `if` / `else-if` conditions.
//!
//! Each test attribute may list several values. Every (test, value) pair
//! yields one boolean and the branch's `match` combines all of them.

use crate::context::{ItemScratch, RenderContext, RenderMode};
use crate::number::to_decimal;
use crate::reference::Item;
use crate::render::variable_text;
use citeproc_style::{ChooseBranch, Condition, MatchType};
use once_cell::sync::Lazy;
use regex::Regex;

/// A number with optional letter affixes, possibly a list or range of them.
static NUMERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]?[0-9]+[A-Za-z]*(?:\s*(?:[,&\-–]|and)\s*[A-Za-z]?[0-9]+[A-Za-z]*)*$")
        .unwrap()
});

/// Whether the branch's conditions hold. An `else` branch always holds.
pub fn branch_matches(
    ctx: &RenderContext,
    item: &Item,
    scratch: &ItemScratch,
    branch: &ChooseBranch,
) -> bool {
    if branch.conditions.is_empty() {
        return true;
    }

    let results: Vec<bool> = branch
        .conditions
        .iter()
        .flat_map(|condition| evaluate_condition(ctx, item, scratch, condition))
        .collect();

    match branch.match_type {
        MatchType::All => results.iter().all(|r| *r),
        MatchType::Any => results.iter().any(|r| *r),
        MatchType::None => !results.iter().any(|r| *r),
    }
}

/// One boolean per listed value.
fn evaluate_condition(
    ctx: &RenderContext,
    item: &Item,
    scratch: &ItemScratch,
    condition: &Condition,
) -> Vec<bool> {
    match condition {
        Condition::Type(types) => types.iter().map(|t| *t == item.item_type).collect(),
        Condition::Variable(vars) => vars
            .iter()
            .map(|v| has_variable(ctx, item, scratch, v))
            .collect(),
        Condition::IsNumeric(vars) => vars
            .iter()
            .map(|v| variable_text(ctx, item, v).is_some_and(|s| is_numeric(&to_decimal(&s))))
            .collect(),
        Condition::IsUncertainDate(vars) => vars
            .iter()
            .map(|v| item.get_date(v).is_some_and(|d| d.circa))
            .collect(),
        Condition::Locator(labels) => {
            let label = ctx
                .citation_item
                .filter(|c| c.locator.is_some())
                .map(|c| c.label());
            labels.iter().map(|l| label == Some(l.as_str())).collect()
        }
        Condition::Position(positions) => {
            if ctx.mode == RenderMode::Bibliography {
                return vec![false; positions.len()];
            }
            let current = ctx.positions(item);
            positions.iter().map(|p| current.matches(*p)).collect()
        }
        // Disambiguation is not performed.
        Condition::Disambiguate(_) => vec![false],
    }
}

/// True when the item, or the current citation item, has the variable and
/// no substitute has consumed it.
fn has_variable(ctx: &RenderContext, item: &Item, scratch: &ItemScratch, variable: &str) -> bool {
    if scratch.is_consumed(variable) {
        return false;
    }
    match variable {
        "locator" => ctx
            .citation_item
            .is_some_and(|c| c.locator.as_deref().is_some_and(|l| !l.is_empty())),
        "citation-number" => ctx.citation_number > 0,
        _ => item.has_variable(variable),
    }
}

/// Numbers, optionally with letter affixes, alone or joined by `,` `&`
/// `-` or "and".
pub fn is_numeric(value: &str) -> bool {
    NUMERIC.is_match(value.trim())
}
