use thiserror::Error;

// Exit codes reported to the scheduler / monitoring system. Anything not
// covered below (stray I/O, logfile setup) exits 1.
pub const EXIT_CONFIG: i32 = 3;
pub const EXIT_TAG_LIST: i32 = 4;
pub const EXIT_NO_MATCHING_TAGS: i32 = 5;
pub const EXIT_AUTH: i32 = 6;
pub const EXIT_REGEN: i32 = 7;

#[derive(Debug, Error)]
pub enum RegencronError {
    #[error("config error: {0}")]
    Config(String),

    #[error("cannot get the tag list from the hub: {0}")]
    TagList(String),

    #[error("no tags on the hub match the configured patterns (patterns: {})", .patterns.join(" "))]
    NoMatchingTags { patterns: Vec<String> },

    #[error("cannot authenticate to the hub: {0}")]
    Auth(String),

    /// A regeneration failed and continue-on-failure was off. `remaining`
    /// holds the tags that were never attempted, for operator visibility.
    #[error("regen-repo failed for tag '{tag}' (remaining tags: {})", .remaining.join(" "))]
    RegenAborted { tag: String, remaining: Vec<String> },

    /// Continue-on-failure was on and one or more tags ultimately failed.
    #[error("the following tag(s) failed to regen: {}", .failed.join(" "))]
    RegenFailed { failed: Vec<String> },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RegencronError {
    pub fn exit_code(&self) -> i32 {
        match self {
            RegencronError::Config(_) => EXIT_CONFIG,
            RegencronError::TagList(_) => EXIT_TAG_LIST,
            RegencronError::NoMatchingTags { .. } => EXIT_NO_MATCHING_TAGS,
            RegencronError::Auth(_) => EXIT_AUTH,
            RegencronError::RegenAborted { .. } | RegencronError::RegenFailed { .. } => EXIT_REGEN,
            RegencronError::Io(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, RegencronError>;
