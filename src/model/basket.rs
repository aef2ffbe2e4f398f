use std::sync::LazyLock;

use regex::Regex;

use crate::util::calendar::DAY_NAMES;

pub const INBOX: &str = "Inbox";
pub const LATER: &str = "Later";

/// Baskets that exist regardless of the week.
pub const FIXED_BASKETS: [&str; 2] = [INBOX, LATER];

/// Top-level keys of the old weekday-named file format.
pub const LEGACY_DAY_BASKETS: [&str; 7] = DAY_NAMES;

static DATE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date key pattern is valid"));

/// True for keys shaped like `YYYY-MM-DD`. Only the shape is checked, so
/// `2024-13-40` passes.
pub fn is_date_basket(key: &str) -> bool {
    DATE_KEY_RE.is_match(key)
}

pub fn is_fixed_basket(key: &str) -> bool {
    FIXED_BASKETS.contains(&key)
}

/// Whether tasks may be added to or moved into `key`.
pub fn is_valid_basket(key: &str) -> bool {
    is_fixed_basket(key) || is_date_basket(key)
}

pub fn is_legacy_day_basket(key: &str) -> bool {
    LEGACY_DAY_BASKETS.contains(&key)
}
