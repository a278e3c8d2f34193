//! Import resolution: which modules a generated file pulls helpers from.

use crate::ir::Import;
use crate::symbols::{Helper, HelperGroup, SymbolUsage};
use serde::{Deserialize, Serialize};

/// Module specifier for each helper group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportPaths {
    pub core: String,
    pub random: String,
    pub helpers: String,
}

impl Default for ImportPaths {
    fn default() -> Self {
        Self {
            core: "../sp_lev.js".to_string(),
            random: "../rng.js".to_string(),
            helpers: "./levgen_helpers.js".to_string(),
        }
    }
}

impl ImportPaths {
    pub fn path_for(&self, group: HelperGroup) -> &str {
        match group {
            HelperGroup::Core => &self.core,
            HelperGroup::Random => &self.random,
            HelperGroup::Misc => &self.helpers,
        }
    }
}

const GROUP_ORDER: [HelperGroup; 3] = [HelperGroup::Core, HelperGroup::Random, HelperGroup::Misc];

/// One import declaration per group with at least one referenced helper,
/// groups and names in table order.
pub fn resolve_imports(usage: &SymbolUsage, paths: &ImportPaths) -> Vec<Import> {
    GROUP_ORDER
        .iter()
        .filter_map(|&group| {
            let names: Vec<String> = usage
                .used()
                .filter(|helper: &Helper| helper.group() == group)
                .map(|helper| helper.name().to_string())
                .collect();
            (!names.is_empty()).then(|| Import {
                names,
                from: paths.path_for(group).to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_in_priority_order() {
        let mut usage = SymbolUsage::new();
        usage.mark(Helper::Ipairs);
        usage.mark(Helper::Rn2);
        usage.mark(Helper::FinalizeLevel);
        usage.mark(Helper::Des);
        usage.mark(Helper::D);

        let imports = resolve_imports(&usage, &ImportPaths::default());
        assert_eq!(
            imports,
            vec![
                Import {
                    names: vec!["des".into(), "finalize_level".into()],
                    from: "../sp_lev.js".into(),
                },
                Import {
                    names: vec!["rn2".into(), "d".into()],
                    from: "../rng.js".into(),
                },
                Import {
                    names: vec!["ipairs".into()],
                    from: "./levgen_helpers.js".into(),
                },
            ]
        );
    }

    #[test]
    fn test_empty_groups_are_skipped() {
        let mut usage = SymbolUsage::new();
        usage.mark(Helper::FinalizeLevel);
        let imports = resolve_imports(&usage, &ImportPaths::default());
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].names, vec!["finalize_level"]);
    }

    #[test]
    fn test_resolution_is_stable() {
        let mut usage = SymbolUsage::new();
        usage.mark(Helper::Shuffle);
        usage.mark(Helper::Percent);
        let paths = ImportPaths {
            helpers: "lib/helpers.mjs".into(),
            ..ImportPaths::default()
        };
        let first = resolve_imports(&usage, &paths);
        let second = resolve_imports(&usage, &paths);
        assert_eq!(first, second);
        assert_eq!(first[0].names, vec!["percent", "shuffle"]);
        assert_eq!(first[0].from, "lib/helpers.mjs");
    }
}
