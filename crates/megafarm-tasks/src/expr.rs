//! Task-list expressions and the plan resolver.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::name::TaskName;

/// One node of a declarative task plan.
///
/// Deserializes untagged, so the TOML shapes map directly:
/// a bare string is an atomic task (or preset reference), an array is
/// an ordered sequence, `{ group = [...] }` runs all children in
/// random relative order, `{ one_of = [...] }` runs exactly one child
/// chosen at random. Nodes nest arbitrarily.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TaskExpr {
    Atomic(String),
    Group { group: Vec<TaskExpr> },
    Choice { one_of: Vec<TaskExpr> },
    Sequence(Vec<TaskExpr>),
}

impl TaskExpr {
    /// Expand this expression into a flat, ordered list of atomic task
    /// names. All structure is resolved here, once, at plan time:
    /// groups get a random permutation, choices pick one child.
    ///
    /// Pure in (self, rng) — a seeded rng reproduces the plan.
    pub fn resolve(&self, rng: &mut impl Rng) -> Vec<TaskName> {
        let mut plan = Vec::new();
        self.resolve_into(rng, &mut plan);
        plan
    }

    fn resolve_into(&self, rng: &mut impl Rng, plan: &mut Vec<TaskName>) {
        match self {
            TaskExpr::Atomic(name) => plan.push(TaskName::new(name)),
            TaskExpr::Sequence(children) => {
                for child in children {
                    child.resolve_into(rng, plan);
                }
            }
            TaskExpr::Group { group } => {
                let mut order: Vec<usize> = (0..group.len()).collect();
                order.shuffle(rng);
                for i in order {
                    group[i].resolve_into(rng, plan);
                }
            }
            TaskExpr::Choice { one_of } => {
                if let Some(child) = one_of.choose(rng) {
                    child.resolve_into(rng, plan);
                }
            }
        }
    }
}
