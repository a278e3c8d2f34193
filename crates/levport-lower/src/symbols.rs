//! External helpers a generated module may import, and the per-file record
//! of which ones it actually references.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Import group. Groups are emitted in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HelperGroup {
    /// The level-building API.
    Core,
    /// Random primitives.
    Random,
    /// Utility functions shipped next to the generated levels.
    Misc,
}

/// A known external helper.
///
/// Variant order is import order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Helper {
    Des,
    Selection,
    Nh,
    Obj,
    FinalizeLevel,
    Rn2,
    Rnd,
    D,
    Percent,
    Shuffle,
    Align,
    Ipairs,
    Pairs,
    Sprintf,
}

impl Helper {
    pub const ALL: [Helper; 14] = [
        Helper::Des,
        Helper::Selection,
        Helper::Nh,
        Helper::Obj,
        Helper::FinalizeLevel,
        Helper::Rn2,
        Helper::Rnd,
        Helper::D,
        Helper::Percent,
        Helper::Shuffle,
        Helper::Align,
        Helper::Ipairs,
        Helper::Pairs,
        Helper::Sprintf,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Helper::Des => "des",
            Helper::Selection => "selection",
            Helper::Nh => "nh",
            Helper::Obj => "obj",
            Helper::FinalizeLevel => "finalize_level",
            Helper::Rn2 => "rn2",
            Helper::Rnd => "rnd",
            Helper::D => "d",
            Helper::Percent => "percent",
            Helper::Shuffle => "shuffle",
            Helper::Align => "align",
            Helper::Ipairs => "ipairs",
            Helper::Pairs => "pairs",
            Helper::Sprintf => "sprintf",
        }
    }

    pub fn group(self) -> HelperGroup {
        match self {
            Helper::Des
            | Helper::Selection
            | Helper::Nh
            | Helper::Obj
            | Helper::FinalizeLevel => HelperGroup::Core,
            Helper::Rn2 | Helper::Rnd | Helper::D => HelperGroup::Random,
            Helper::Percent
            | Helper::Shuffle
            | Helper::Align
            | Helper::Ipairs
            | Helper::Pairs
            | Helper::Sprintf => HelperGroup::Misc,
        }
    }

    pub fn from_name(name: &str) -> Option<Helper> {
        Helper::ALL.into_iter().find(|h| h.name() == name)
    }

    /// Whether calling this helper consumes random numbers.
    pub fn draws_random(self) -> bool {
        matches!(
            self,
            Helper::Rn2 | Helper::Rnd | Helper::D | Helper::Percent
        )
    }
}

impl fmt::Display for Helper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which helpers one file references.
///
/// Built during lowering and handed to the import resolver afterwards;
/// nothing mutates it once lowering returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolUsage {
    referenced: BTreeMap<Helper, bool>,
}

impl SymbolUsage {
    pub fn new() -> Self {
        Self {
            referenced: Helper::ALL.into_iter().map(|h| (h, false)).collect(),
        }
    }

    pub(crate) fn mark(&mut self, helper: Helper) {
        self.referenced.insert(helper, true);
    }

    pub fn is_used(&self, helper: Helper) -> bool {
        self.referenced.get(&helper).copied().unwrap_or(false)
    }

    /// Referenced helpers in import order.
    pub fn used(&self) -> impl Iterator<Item = Helper> + '_ {
        self.referenced
            .iter()
            .filter(|(_, used)| **used)
            .map(|(helper, _)| *helper)
    }
}

impl Default for SymbolUsage {
    fn default() -> Self {
        Self::new()
    }
}
