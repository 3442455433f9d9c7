//! Attribute selection on read

use std::str::FromStr;

use super::errors::{TreeError, TreeResult};

/// Prefix of structural attributes the reader never surfaces
pub const RESERVED_PREFIX: &str = "treestore.";

/// Which attributes the reader attaches
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AttrPolicy {
    #[default]
    All,
    None,
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl AttrPolicy {
    /// Build a policy from a name list; `-name` excludes.
    ///
    /// An empty list is `None`. Mixing plain and `-` names is `MixedAttrPolicy`.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> TreeResult<Self> {
        if names.is_empty() {
            return Ok(AttrPolicy::None);
        }
        let excluded: Vec<String> = names
            .iter()
            .filter_map(|n| n.as_ref().strip_prefix('-'))
            .map(str::to_string)
            .collect();
        if excluded.is_empty() {
            Ok(AttrPolicy::Include(
                names.iter().map(|n| n.as_ref().to_string()).collect(),
            ))
        } else if excluded.len() == names.len() {
            Ok(AttrPolicy::Exclude(excluded))
        } else {
            Err(TreeError::MixedAttrPolicy)
        }
    }

    /// Whether the attribute `name` is attached.
    pub fn allows(&self, name: &str) -> bool {
        if name.starts_with(RESERVED_PREFIX) {
            return false;
        }
        match self {
            AttrPolicy::All => true,
            AttrPolicy::None => false,
            AttrPolicy::Include(names) => names.iter().any(|n| n == name),
            AttrPolicy::Exclude(names) => !names.iter().any(|n| n == name),
        }
    }

    /// The subset of `available` to attach, in `available` order.
    ///
    /// Requested names that are not available are ignored.
    pub fn select<'a>(&self, available: &'a [String]) -> Vec<&'a str> {
        available
            .iter()
            .map(String::as_str)
            .filter(|n| self.allows(n))
            .collect()
    }
}

impl FromStr for AttrPolicy {
    type Err = TreeError;

    /// `all`, `none`, `a,b` or `-a,-b`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(AttrPolicy::All),
            "none" | "" => Ok(AttrPolicy::None),
            list => {
                let names: Vec<&str> = list
                    .split(',')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .collect();
                AttrPolicy::from_names(&names)
            }
        }
    }
}
