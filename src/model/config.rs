use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::util::calendar::TRANSITION_HOUR;

/// Settings from config.toml. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Where tasks are stored. Default: `~/.tltd/tasks.json`
    #[serde(default)]
    pub data_file: Option<PathBuf>,
    /// Local hour at which Monday starts the new week
    #[serde(default = "default_transition_hour")]
    pub transition_hour: u32,
    /// Number of undo steps kept in memory
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Maximum number of task levels, roots included
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_file: None,
            transition_hour: default_transition_hour(),
            history_limit: default_history_limit(),
            max_nesting_depth: default_max_nesting_depth(),
        }
    }
}

fn default_transition_hour() -> u32 {
    TRANSITION_HOUR
}

fn default_history_limit() -> usize {
    50
}

fn default_max_nesting_depth() -> usize {
    8
}
