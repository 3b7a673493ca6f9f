//! Members of one character class that denote overlapping characters.

use std::collections::BTreeSet;

use crate::ast::{CharacterClass, NodeKind};
use crate::class::{self, CodePointSet};
use crate::flags::FlagSet;

use super::{AnalysisContext, RegexIssue, Rule};

const MESSAGE: &str = "Remove duplicates in this character class.";
const SECONDARY: &str = "Additional duplicate";

pub fn check(ctx: &AnalysisContext<'_>) -> Vec<RegexIssue> {
    let mut issues = Vec::new();
    ctx.tree.root.walk(&mut |node| {
        if let NodeKind::CharacterClass(class) = &node.kind {
            issues.extend(check_class(class, node.flags));
        }
    });
    issues
}

fn check_class(class: &CharacterClass, flags: FlagSet) -> Option<RegexIssue> {
    if class::resolve(class, flags).opaque {
        return None;
    }
    let sets: Vec<CodePointSet> = class
        .members
        .iter()
        .map(|member| class::member_set(member, flags))
        .collect::<Option<_>>()?;

    let mut involved = BTreeSet::new();
    for (j, later) in sets.iter().enumerate() {
        if let Some(i) = sets[..j].iter().position(|earlier| earlier.intersects(later)) {
            involved.insert(i);
            involved.insert(j);
        }
    }

    let mut involved = involved.into_iter().map(|i| class.members[i].span);
    let primary = involved.next()?;
    Some(involved.fold(
        RegexIssue::new(Rule::DuplicateInClass, MESSAGE, primary),
        |issue, span| issue.with_secondary(span, Some(SECONDARY)),
    ))
}
