use regex::Regex;
use std::sync::LazyLock;

static EVENT_NOTICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?P<owner>.*)/)?on/(?P<kind>[a-zA-Z_]+)\[(?P<seq>\d+)\]$")
        .expect("valid regex")
});

// Anchored at the start only: a bag name may itself contain brackets.
static STORED_STATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?P<owner>.*)/)?(?P<data_type>\D+)\[(?P<name>.*)\]").expect("valid regex")
});

///
/// HandlePath
///
/// What a snapshot key in the unit store addresses.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HandlePath {
    EventNotice {
        owner_path: Option<String>,
        kind: String,
        /// `None` when the sequence number does not fit in a `u64`.
        seq: Option<u64>,
    },

    StoredStateEntry {
        owner_path: Option<String>,
        data_type_name: String,
        name: String,
    },

    Unrecognized(String),
}

impl HandlePath {
    #[must_use]
    pub fn parse(path: &str) -> Self {
        if let Some(caps) = EVENT_NOTICE.captures(path) {
            return Self::EventNotice {
                owner_path: non_empty(caps.name("owner").map(|m| m.as_str())),
                kind: caps["kind"].to_string(),
                seq: caps["seq"].parse().ok(),
            };
        }

        if let Some(caps) = STORED_STATE.captures(path) {
            return Self::StoredStateEntry {
                owner_path: non_empty(caps.name("owner").map(|m| m.as_str())),
                data_type_name: caps["data_type"].to_string(),
                name: caps["name"].to_string(),
            };
        }

        Self::Unrecognized(path.to_string())
    }

    #[must_use]
    pub const fn is_event_notice(&self) -> bool {
        matches!(self, Self::EventNotice { .. })
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.filter(|s| !s.is_empty()).map(str::to_string)
}

///
/// TESTS
///
