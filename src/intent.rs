// Rule-based query intent classification

use once_cell::sync::Lazy;
use regex::Regex;

// Argument extraction patterns
static GROUP_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)(?:members of|group)\s+['"]?([^'"]+)['"]?"#).unwrap());

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9_.-]+@[A-Za-z0-9_.-]+\.[A-Za-z0-9_]+").unwrap());

static SEARCH_TERM_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)(?:contain|with)\s+['"]?([^'"]+)['"]?"#).unwrap());

/// Page size for plain user/group listings
pub const LIST_TOP: u32 = 50;

/// Page size for listings enriched with memberships
pub const ENRICHED_TOP: u32 = 20;

/// Page size for each half of the fallback overview
pub const FALLBACK_TOP: u32 = 5;

/// Classified purpose of a free-text query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    ListUsers,
    ListUsersWithGroups,
    ListGroups,
    GroupMembers { group_name: String },
    UserLookup { email: String },
    GroupSearch { term: String },
    MembershipLookup,
    Fallback,
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::ListUsers => "list_users",
            Intent::ListUsersWithGroups => "list_users_with_groups",
            Intent::ListGroups => "list_groups",
            Intent::GroupMembers { .. } => "group_members",
            Intent::UserLookup { .. } => "user_lookup",
            Intent::GroupSearch { .. } => "group_search",
            Intent::MembershipLookup => "membership_lookup",
            Intent::Fallback => "fallback",
        }
    }
}

/// One classification rule
///
/// `trigger` sees the lowercased text; `build` sees the raw text and returns
/// `None` when a required argument cannot be extracted.
struct Rule {
    trigger: fn(&str) -> bool,
    build: fn(&str) -> Option<Intent>,
}

/// Evaluated top to bottom; the first rule whose trigger matches decides
static RULES: &[Rule] = &[
    Rule {
        trigger: |t| mentions_user_listing(t) && (t.contains("group") || t.contains("member")),
        build: |_| Some(Intent::ListUsersWithGroups),
    },
    Rule {
        trigger: mentions_user_listing,
        build: |_| Some(Intent::ListUsers),
    },
    Rule {
        trigger: |t| t.contains("all groups") || t.contains("list groups"),
        build: |_| Some(Intent::ListGroups),
    },
    Rule {
        trigger: |t| t.contains("members of") || t.contains("group members"),
        build: |text| {
            capture_argument(&GROUP_NAME_PATTERN, text)
                .map(|group_name| Intent::GroupMembers { group_name })
        },
    },
    Rule {
        trigger: |t| t.contains("user") && (t.contains("exist") || t.contains('@')),
        build: |text| {
            EMAIL_PATTERN.find(text).map(|m| Intent::UserLookup {
                email: m.as_str().to_string(),
            })
        },
    },
    Rule {
        trigger: |t| t.contains("environment") || t.contains("contain"),
        build: |text| {
            capture_argument(&SEARCH_TERM_PATTERN, text).map(|term| Intent::GroupSearch { term })
        },
    },
    Rule {
        trigger: |t| t.contains("belongs to") || t.contains("member of") || t.contains("in group"),
        build: |_| Some(Intent::MembershipLookup),
    },
];

fn mentions_user_listing(lower: &str) -> bool {
    lower.contains("all users") || lower.contains("list users")
}

/// First capture group, trimmed; blank captures count as no match
fn capture_argument(pattern: &Regex, text: &str) -> Option<String> {
    let caps = pattern.captures(text)?;
    let arg = caps
        .get(1)?
        .as_str()
        .trim()
        .trim_end_matches('?')
        .trim_end();
    (!arg.is_empty()).then(|| arg.to_string())
}

/// Classify free text into an intent
///
/// A matched trigger whose argument cannot be extracted yields `Fallback`
/// rather than continuing to later rules.
pub fn classify(text: &str) -> Intent {
    let lower = text.to_lowercase();

    match RULES.iter().find(|rule| (rule.trigger)(&lower)) {
        Some(rule) => (rule.build)(text).unwrap_or(Intent::Fallback),
        None => Intent::Fallback,
    }
}
