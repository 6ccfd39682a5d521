//! Loading rule groups from many files with error aggregation.

use std::path::Path;

use tracing::{info, warn};

use promgraph_error::CompoundError;

use crate::loader::{RuleFileLoader, YamlRuleLoader};
use crate::rule::RuleGroup;

/// Loads rule files through a [`RuleFileLoader`].
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog<L = YamlRuleLoader> {
    loader: L,
}

impl<L: RuleFileLoader> RuleCatalog<L> {
    pub fn new(loader: L) -> Self {
        Self { loader }
    }

    /// Load every path in order.
    ///
    /// A failing file does not stop the others from being read; all errors
    /// are returned together and no groups are returned in that case.
    pub fn load_all<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<RuleGroup>, CompoundError> {
        let mut groups = Vec::new();
        let mut errors = CompoundError::new();

        for path in paths {
            let path = path.as_ref();
            match self.loader.load(path) {
                Ok(loaded) => {
                    info!(path = %path.display(), groups = loaded.len(), "loaded rule file");
                    groups.extend(loaded);
                }
                Err(errs) => {
                    warn!(path = %path.display(), errors = errs.len(), "failed to load rule file");
                    errors.accumulate(errs);
                }
            }
        }

        errors.into_result(groups)
    }
}

/// Load `paths` with the YAML loader.
pub fn load_all<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<RuleGroup>, CompoundError> {
    RuleCatalog::new(YamlRuleLoader::new()).load_all(paths)
}
