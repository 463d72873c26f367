//! Preset catalog: named, reusable task-list expressions.
//!
//! Config entries reference presets by their exact (conventionally
//! upper-case) name; anything that is not a preset name is an atomic
//! task. Lookup is deliberately exact-match: `FAUCET` is the preset,
//! `faucet` is the atomic task inside it.

use rand::Rng;
use std::collections::HashMap;

use crate::expr::TaskExpr;
use crate::name::TaskName;

const MAX_EXPANSION_DEPTH: usize = 8;

/// Registry of preset names to expressions.
pub struct Catalog {
    presets: HashMap<String, TaskExpr>,
}

fn seq(names: &[&str]) -> TaskExpr {
    TaskExpr::Sequence(names.iter().map(|n| TaskExpr::Atomic(n.to_string())).collect())
}

impl Catalog {
    /// Empty catalog; presets registered by the caller.
    pub fn new() -> Self {
        Self { presets: HashMap::new() }
    }

    /// The built-in presets: one multi-step preset per campaign plus a
    /// singleton preset per module, so configs can mix either level.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register("FAUCET", seq(&["faucet", "teko_faucet"]));
        catalog.register("CRUSTY_SWAP", seq(&["crusty_refuel"]));
        catalog.register("TEKO_FINANCE", seq(&["teko_faucet", "teko_finance"]));
        for name in [
            "cap_app", "bebop", "gte_swaps", "onchain_gm", "xl_meme", "omnihub",
            "mintair", "easynode", "hopnetwork", "owlto", "rainmakr", "rarible",
            "superboard", "conft_app", "zkcodex", "nerzo_megaeth", "morkie_mega",
            "nerzo_fluffle",
        ] {
            catalog.register(&name.to_uppercase(), seq(&[name]));
        }
        catalog
    }

    /// Register (or replace) a preset.
    pub fn register(&mut self, name: &str, expr: TaskExpr) {
        self.presets.insert(name.to_string(), expr);
    }

    /// Replace preset references inside an expression with their
    /// bodies. Expansion is bounded; a self-referential preset stops
    /// expanding past the depth limit and falls through as an atomic
    /// name (which then fails at dispatch, not here).
    pub fn expand(&self, expr: &TaskExpr) -> TaskExpr {
        self.expand_at(expr, 0)
    }

    fn expand_at(&self, expr: &TaskExpr, depth: usize) -> TaskExpr {
        match expr {
            TaskExpr::Atomic(name) => match self.presets.get(name) {
                Some(body) if depth < MAX_EXPANSION_DEPTH => self.expand_at(body, depth + 1),
                Some(_) => {
                    tracing::warn!(
                        "Preset '{}' exceeds expansion depth {}, treating as atomic",
                        name,
                        MAX_EXPANSION_DEPTH
                    );
                    expr.clone()
                }
                None => expr.clone(),
            },
            TaskExpr::Sequence(children) => TaskExpr::Sequence(
                children.iter().map(|c| self.expand_at(c, depth)).collect(),
            ),
            TaskExpr::Group { group } => TaskExpr::Group {
                group: group.iter().map(|c| self.expand_at(c, depth)).collect(),
            },
            TaskExpr::Choice { one_of } => TaskExpr::Choice {
                one_of: one_of.iter().map(|c| self.expand_at(c, depth)).collect(),
            },
        }
    }

    /// Expand presets in the configured top-level task list and resolve
    /// it into one concrete plan.
    pub fn resolve_plan(&self, tasks: &[TaskExpr], rng: &mut impl Rng) -> Vec<TaskName> {
        let expanded = self.expand(&TaskExpr::Sequence(tasks.to_vec()));
        expanded.resolve(rng)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_builtin_preset_expands() {
        let catalog = Catalog::builtin();
        let mut rng = StdRng::seed_from_u64(0);
        let plan = catalog.resolve_plan(&[TaskExpr::Atomic("CRUSTY_SWAP".into())], &mut rng);
        assert_eq!(plan, vec![TaskName::new("crusty_refuel")]);
    }

    #[test]
    fn test_preset_lookup_is_exact_match() {
        let catalog = Catalog::builtin();
        let mut rng = StdRng::seed_from_u64(0);
        // Upper-case FAUCET is the two-step preset...
        let preset = catalog.resolve_plan(&[TaskExpr::Atomic("FAUCET".into())], &mut rng);
        assert_eq!(preset.len(), 2);
        // ...lower-case faucet is the single atomic task.
        let atomic = catalog.resolve_plan(&[TaskExpr::Atomic("faucet".into())], &mut rng);
        assert_eq!(atomic, vec![TaskName::new("faucet")]);
    }

    #[test]
    fn test_presets_expand_inside_groups() {
        let catalog = Catalog::builtin();
        let mut rng = StdRng::seed_from_u64(3);
        let tasks = vec![TaskExpr::Group {
            group: vec![
                TaskExpr::Atomic("CRUSTY_SWAP".into()),
                TaskExpr::Atomic("onchain_gm".into()),
            ],
        }];
        let plan = catalog.resolve_plan(&tasks, &mut rng);
        assert_eq!(plan.len(), 2);
        assert!(plan.contains(&TaskName::new("crusty_refuel")));
        assert!(plan.contains(&TaskName::new("onchain_gm")));
    }

    #[test]
    fn test_self_referential_preset_is_bounded() {
        let mut catalog = Catalog::new();
        catalog.register("LOOP", TaskExpr::Atomic("LOOP".into()));
        let mut rng = StdRng::seed_from_u64(0);
        let plan = catalog.resolve_plan(&[TaskExpr::Atomic("LOOP".into())], &mut rng);
        // Terminates, yielding the unexpandable name itself.
        assert_eq!(plan, vec![TaskName::new("loop")]);
    }

    #[test]
    fn test_unknown_name_passes_through() {
        let catalog = Catalog::builtin();
        let mut rng = StdRng::seed_from_u64(0);
        let plan = catalog.resolve_plan(&[TaskExpr::Atomic("no_such_module".into())], &mut rng);
        assert_eq!(plan, vec![TaskName::new("no_such_module")]);
    }
}
