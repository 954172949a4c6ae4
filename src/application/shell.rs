//! Environment for commands that should see the stage's linked resources

use crate::domain::ports::LinkMap;
use crate::domain::value_objects::StageKey;

pub const RESOURCE_ENV_PREFIX: &str = "STAGEHAND_RESOURCE_";

/// Program used by `shell` when none is given
pub const DEFAULT_SHELL: &str = "sh";

/// One `STAGEHAND_RESOURCE_<name>=<json>` pair per linked resource
pub fn resource_env(links: &LinkMap) -> Vec<(String, String)> {
    links
        .iter()
        .map(|(name, value)| (format!("{}{}", RESOURCE_ENV_PREFIX, name), value.to_string()))
        .collect()
}

/// `PS1` for an interactive shell scoped to `key`
pub fn shell_prompt(key: &StageKey) -> String {
    format!("{}/{}> ", key.app(), key.stage())
}
