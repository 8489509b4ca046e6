//! Ordered rule table turning free text into classified intents.
//!
//! Each rule is a (name, matcher) pair tried in declaration order; the
//! first rule producing an intent wins and everything after it is skipped.
//! Matching is case-insensitive phrase containment plus anchored numeric
//! extraction. This is a heuristic, not a grammar: input carrying several
//! numbers resolves to the anchor-proximate one, best-effort.

use super::{ClassifiedIntent, FollowUpForm};
use crate::chat::intents::fields::FieldMapper;
use crate::models::{OrderStatus, Role};

type RuleFn = fn(&str, &str) -> Option<ClassifiedIntent>;

/// One entry of the priority table.
pub struct IntentRule {
    pub name: &'static str,
    matcher: RuleFn,
}

const RULES: &[IntentRule] = &[
    IntentRule {
        name: "roles.switch",
        matcher: match_switch_role,
    },
    IntentRule {
        name: "profiles.publish",
        matcher: match_profile_publish,
    },
    IntentRule {
        name: "profiles.update_fields",
        matcher: match_field_updates,
    },
    IntentRule {
        name: "orders.list",
        matcher: match_list_orders,
    },
    IntentRule {
        name: "orders.update_status",
        matcher: match_order_status,
    },
    IntentRule {
        name: "orders.release_escrow",
        matcher: match_release_escrow,
    },
    IntentRule {
        name: "orders.submit_rating",
        matcher: match_submit_rating,
    },
    IntentRule {
        name: "notifications",
        matcher: match_notifications,
    },
    IntentRule {
        name: "reports.create",
        matcher: match_report,
    },
    IntentRule {
        name: "support.create_ticket",
        matcher: match_support_ticket,
    },
    IntentRule {
        name: "documents.request_upload",
        matcher: match_document_upload,
    },
    IntentRule {
        name: "search.gigs",
        matcher: match_search_gigs,
    },
    IntentRule {
        name: "search.jobs",
        matcher: match_search_jobs,
    },
    IntentRule {
        name: "groups.discover",
        matcher: match_discover_groups,
    },
    IntentRule {
        name: "groups.join",
        matcher: match_join_group,
    },
    IntentRule {
        name: "groups.create",
        matcher: match_create_group,
    },
    IntentRule {
        name: "users.search",
        matcher: match_search_users,
    },
    IntentRule {
        name: "conversations.start_direct",
        matcher: match_start_direct,
    },
];

/// First-match classifier over the fixed rule table.
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, input: &str) -> ClassifiedIntent {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return ClassifiedIntent::Unhandled;
        }
        let lower = trimmed.to_ascii_lowercase();
        for rule in RULES {
            if let Some(intent) = (rule.matcher)(trimmed, &lower) {
                return intent;
            }
        }
        ClassifiedIntent::Unhandled
    }

    /// Rule names in priority order, for coverage auditing.
    pub fn rule_names(&self) -> Vec<&'static str> {
        RULES.iter().map(|rule| rule.name).collect()
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

// ---- rule matchers, in priority order ----

fn match_switch_role(_original: &str, lower: &str) -> Option<ClassifiedIntent> {
    let wants_switch = lower.contains("switch")
        || lower.contains("become a")
        || lower.contains("act as")
        || (lower.contains("change") && lower.contains("role"));
    if !wants_switch {
        return None;
    }
    let role = detect_role(lower);
    if !lower.contains("role") && role.is_none() {
        return None;
    }
    Some(match role {
        Some(role) => ClassifiedIntent::SwitchRole { role },
        None => ClassifiedIntent::Clarify {
            form: FollowUpForm::RolePicker,
        },
    })
}

fn match_profile_publish(_original: &str, lower: &str) -> Option<ClassifiedIntent> {
    if !lower.contains("profile") {
        return None;
    }
    // Negatives first: "unpublish" contains "publish".
    let published = if lower.contains("unpublish")
        || lower.contains("unlist")
        || lower.contains("hide")
        || lower.contains("offline")
        || lower.contains("deactivate")
    {
        false
    } else if lower.contains("publish") || lower.contains("go live") || lower.contains("activate")
    {
        true
    } else {
        return None;
    };
    let entity = if lower.contains("client") {
        crate::models::ProfileEntity::ClientProfile
    } else {
        crate::models::ProfileEntity::FreelancerProfile
    };
    Some(ClassifiedIntent::SetProfilePublished { entity, published })
}

fn match_field_updates(original: &str, lower: &str) -> Option<ClassifiedIntent> {
    let updates = FieldMapper::map_line(original);
    if !updates.is_empty() {
        return Some(ClassifiedIntent::UpdateFields { updates });
    }
    // Update-shaped but no recognizable field: ask instead of guessing.
    let update_shaped = lower.contains("update")
        || lower.contains("change")
        || lower.contains("set ")
        || lower.contains("edit");
    if update_shaped && lower.contains("profile") {
        return Some(ClassifiedIntent::Clarify {
            form: FollowUpForm::ProfileFields,
        });
    }
    None
}

fn match_list_orders(_original: &str, lower: &str) -> Option<ClassifiedIntent> {
    if !lower.contains("orders") {
        return None;
    }
    let list_verb = lower.contains("show")
        || lower.contains("list")
        || lower.contains("view")
        || lower.contains("see")
        || lower.contains("what");
    if list_verb {
        Some(ClassifiedIntent::ListOrders)
    } else {
        None
    }
}

fn match_order_status(_original: &str, lower: &str) -> Option<ClassifiedIntent> {
    if !lower.contains("order") {
        return None;
    }
    let status = detect_status(lower)?;
    Some(match anchored_number(lower, "order") {
        Some(order_id) => ClassifiedIntent::UpdateOrderStatus { order_id, status },
        None => ClassifiedIntent::Clarify {
            form: FollowUpForm::OrderStatus,
        },
    })
}

fn match_release_escrow(_original: &str, lower: &str) -> Option<ClassifiedIntent> {
    let relevant = lower.contains("escrow")
        || (lower.contains("release") && (lower.contains("payment") || lower.contains("funds")));
    if !relevant {
        return None;
    }
    Some(match anchored_number(lower, "order") {
        Some(order_id) => ClassifiedIntent::ReleaseEscrow { order_id },
        None => ClassifiedIntent::Clarify {
            form: FollowUpForm::EscrowRelease,
        },
    })
}

fn match_submit_rating(_original: &str, lower: &str) -> Option<ClassifiedIntent> {
    let relevant = lower.contains("star")
        || lower.contains("review")
        || lower.contains("rating")
        || (lower.contains("rate") && lower.contains("order"));
    if !relevant {
        return None;
    }
    match (anchored_number(lower, "order"), star_rating(lower)) {
        (Some(order_id), Some(rating)) => {
            Some(ClassifiedIntent::SubmitRating { order_id, rating })
        }
        _ => Some(ClassifiedIntent::Clarify {
            form: FollowUpForm::Rating,
        }),
    }
}

fn match_notifications(_original: &str, lower: &str) -> Option<ClassifiedIntent> {
    if !lower.contains("notification") {
        return None;
    }
    // "unmute" contains "mute"; check it first.
    if lower.contains("unmute") || lower.contains("resume") || lower.contains("enable") {
        return Some(ClassifiedIntent::SetNotificationsMuted { muted: false });
    }
    if lower.contains("mute")
        || lower.contains("silence")
        || lower.contains("pause")
        || lower.contains("stop")
    {
        return Some(ClassifiedIntent::SetNotificationsMuted { muted: true });
    }
    Some(ClassifiedIntent::ListNotifications)
}

fn match_report(original: &str, lower: &str) -> Option<ClassifiedIntent> {
    // "report" as a command, not as a noun inside a search query.
    let relevant = lower.starts_with("report")
        || lower.contains("file a report")
        || lower.contains("report user")
        || lower.contains("report @")
        || lower.contains("scam")
        || lower.contains("abuse")
        || lower.contains("fraud");
    if !relevant {
        return None;
    }
    let pos = lower.find("report")?;
    let subject = original[pos + "report".len()..]
        .trim()
        .trim_start_matches(|c: char| !c.is_ascii_alphanumeric() && c != '@')
        .to_string();
    Some(if subject.is_empty() {
        ClassifiedIntent::Clarify {
            form: FollowUpForm::Report,
        }
    } else {
        ClassifiedIntent::FileReport { subject }
    })
}

fn match_support_ticket(original: &str, lower: &str) -> Option<ClassifiedIntent> {
    let relevant =
        lower.contains("support") || lower.contains("ticket") || lower.contains("help with");
    if !relevant {
        return None;
    }
    Some(ClassifiedIntent::OpenSupportTicket {
        subject: original.trim().to_string(),
    })
}

fn match_document_upload(_original: &str, lower: &str) -> Option<ClassifiedIntent> {
    let relevant = (lower.contains("upload")
        && (lower.contains("document") || lower.contains("verification")))
        || lower.contains("verify my identity");
    if relevant {
        Some(ClassifiedIntent::RequestDocumentUpload)
    } else {
        None
    }
}

fn match_search_gigs(original: &str, lower: &str) -> Option<ClassifiedIntent> {
    match_listing_search(original, lower, "gig").map(|query| {
        if query.is_empty() {
            ClassifiedIntent::Clarify {
                form: FollowUpForm::Search,
            }
        } else {
            ClassifiedIntent::SearchGigs { query }
        }
    })
}

fn match_search_jobs(original: &str, lower: &str) -> Option<ClassifiedIntent> {
    match_listing_search(original, lower, "job").map(|query| {
        if query.is_empty() {
            ClassifiedIntent::Clarify {
                form: FollowUpForm::Search,
            }
        } else {
            ClassifiedIntent::SearchJobs { query }
        }
    })
}

fn match_listing_search(original: &str, lower: &str, noun: &str) -> Option<String> {
    if !lower.contains(noun) {
        return None;
    }
    let search_verb = lower.contains("find")
        || lower.contains("search")
        || lower.contains("browse")
        || lower.contains("look")
        || lower.contains("need");
    if !search_verb {
        return None;
    }
    Some(search_query(original, SEARCH_STOPWORDS))
}

fn match_discover_groups(_original: &str, lower: &str) -> Option<ClassifiedIntent> {
    if !lower.contains("group") {
        return None;
    }
    let discover_verb = lower.contains("find")
        || lower.contains("discover")
        || lower.contains("browse")
        || lower.contains("list")
        || lower.contains("show")
        || lower.contains("suggest")
        || lower.contains("what");
    if discover_verb {
        Some(ClassifiedIntent::DiscoverGroups)
    } else {
        None
    }
}

fn match_join_group(_original: &str, lower: &str) -> Option<ClassifiedIntent> {
    if !(lower.contains("join") && lower.contains("group")) {
        return None;
    }
    Some(match anchored_number(lower, "group") {
        Some(group_id) => ClassifiedIntent::JoinGroup { group_id },
        None => ClassifiedIntent::Clarify {
            form: FollowUpForm::GroupJoin,
        },
    })
}

fn match_create_group(original: &str, lower: &str) -> Option<ClassifiedIntent> {
    let create_verb = lower.contains("create")
        || lower.contains("start")
        || lower.contains("make")
        || lower.contains("new group");
    if !(create_verb && lower.contains("group")) {
        return None;
    }
    Some(match group_name(original, lower) {
        Some(name) => ClassifiedIntent::CreateGroup { name },
        None => ClassifiedIntent::Clarify {
            form: FollowUpForm::GroupCreate,
        },
    })
}

fn match_search_users(original: &str, lower: &str) -> Option<ClassifiedIntent> {
    let noun = lower.contains("user")
        || lower.contains("people")
        || lower.contains("someone")
        || lower.contains("freelancers")
        || lower.contains("members");
    let verb = lower.contains("find")
        || lower.contains("search")
        || lower.contains("look")
        || lower.contains("who");
    if !(noun && verb) {
        return None;
    }
    let query = search_query(original, USER_SEARCH_STOPWORDS);
    Some(if query.is_empty() {
        ClassifiedIntent::Clarify {
            form: FollowUpForm::Search,
        }
    } else {
        ClassifiedIntent::SearchUsers { query }
    })
}

fn match_start_direct(original: &str, lower: &str) -> Option<ClassifiedIntent> {
    let relevant = lower.contains("message ")
        || lower.starts_with("dm ")
        || lower.contains(" dm ")
        || lower.contains("chat with")
        || lower.contains("talk to")
        || lower.contains("start a conversation");
    if !relevant {
        return None;
    }
    Some(match direct_handle(original, lower) {
        Some(handle) => ClassifiedIntent::StartDirectConversation { handle },
        None => ClassifiedIntent::Clarify {
            form: FollowUpForm::DirectMessage,
        },
    })
}

// ---- extraction helpers ----

/// Digits glued to the anchor keyword win; otherwise the first token with
/// two or more digits. Documented best-effort: unrelated numbers in the
/// line can misfire.
fn anchored_number(lower: &str, anchor: &str) -> Option<u64> {
    let tokens: Vec<&str> = lower.split_whitespace().collect();
    for (idx, token) in tokens.iter().enumerate() {
        let bare = token.trim_matches(|c: char| !c.is_ascii_alphanumeric());
        if bare == anchor || bare.trim_end_matches('s') == anchor {
            if let Some(value) = tokens.get(idx + 1).and_then(|next| parse_digits(next)) {
                return Some(value);
            }
        }
        // "order#482" glued form.
        if let Some(rest) = bare.strip_prefix(anchor) {
            if !rest.is_empty() {
                if let Some(value) = parse_digits(rest) {
                    return Some(value);
                }
            }
        }
    }
    first_long_number(lower)
}

fn parse_digits(token: &str) -> Option<u64> {
    let trimmed = token.trim_matches(|c: char| !c.is_ascii_digit());
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}

fn first_long_number(lower: &str) -> Option<u64> {
    for token in lower.split_whitespace() {
        let trimmed = token.trim_matches(|c: char| !c.is_ascii_digit());
        if trimmed.len() >= 2 && trimmed.chars().all(|c| c.is_ascii_digit()) {
            return trimmed.parse().ok();
        }
    }
    None
}

/// "<N> star(s)" or the glued "<N>-star" form.
fn star_rating(lower: &str) -> Option<u8> {
    let tokens: Vec<&str> = lower.split_whitespace().collect();
    for (idx, token) in tokens.iter().enumerate() {
        if token.trim_matches(|c: char| !c.is_ascii_alphanumeric()).starts_with("star") && idx > 0
        {
            if let Some(value) = parse_digits(tokens[idx - 1]) {
                return u8::try_from(value).ok();
            }
        }
        if let Some(pos) = token.find("star") {
            if let Some(value) = parse_digits(&token[..pos]) {
                return u8::try_from(value).ok();
            }
        }
    }
    None
}

fn detect_role(lower: &str) -> Option<Role> {
    if lower.contains("freelancer") || lower.contains("seller") {
        Some(Role::Freelancer)
    } else if lower.contains("client") || lower.contains("buyer") {
        Some(Role::Client)
    } else {
        None
    }
}

fn detect_status(lower: &str) -> Option<OrderStatus> {
    if lower.contains("deliver") {
        Some(OrderStatus::Delivered)
    } else if lower.contains("complete") || lower.contains("finish") || lower.contains("done") {
        Some(OrderStatus::Completed)
    } else if lower.contains("cancel") {
        Some(OrderStatus::Cancelled)
    } else if lower.contains("progress") || lower.contains("active") || lower.contains("begin") {
        Some(OrderStatus::InProgress)
    } else if lower.contains("pending") || lower.contains("hold") {
        Some(OrderStatus::Pending)
    } else {
        None
    }
}

const SEARCH_STOPWORDS: &[&str] = &[
    "find", "search", "browse", "look", "looking", "for", "show", "me", "a", "an", "the", "some",
    "please", "can", "you", "i", "need", "gig", "gigs", "job", "jobs",
];

const USER_SEARCH_STOPWORDS: &[&str] = &[
    "find", "search", "look", "looking", "for", "who", "is", "are", "me", "a", "an", "the",
    "some", "please", "user", "users", "people", "someone", "freelancers", "members", "on",
];

/// Keeps the non-stopword tokens, original casing intact.
fn search_query(original: &str, stopwords: &[&str]) -> String {
    original
        .split_whitespace()
        .filter(|token| {
            let bare = token
                .trim_matches(|c: char| !c.is_ascii_alphanumeric())
                .to_ascii_lowercase();
            !bare.is_empty() && !stopwords.contains(&bare.as_str())
        })
        .collect::<Vec<&str>>()
        .join(" ")
}

fn group_name(original: &str, lower: &str) -> Option<String> {
    for marker in [" called ", " named "] {
        if let Some(pos) = lower.find(marker) {
            let name = original[pos + marker.len()..]
                .trim()
                .trim_matches(|c| c == '"' || c == '\'')
                .to_string();
            if !name.is_empty() {
                return Some(name);
            }
        }
    }
    // Fallback: a quoted run anywhere in the line.
    let mut parts = original.split('"');
    let _before = parts.next();
    if let Some(quoted) = parts.next() {
        let name = quoted.trim().to_string();
        if !name.is_empty() {
            return Some(name);
        }
    }
    None
}

fn direct_handle(original: &str, lower: &str) -> Option<String> {
    for token in original.split_whitespace() {
        if let Some(handle) = token.strip_prefix('@') {
            let handle = handle
                .trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '_' && c != '-');
            if !handle.is_empty() {
                return Some(handle.to_string());
            }
        }
    }
    let tokens: Vec<&str> = lower.split_whitespace().collect();
    let originals: Vec<&str> = original.split_whitespace().collect();
    for (idx, token) in tokens.iter().enumerate() {
        if matches!(*token, "message" | "dm" | "with" | "to") {
            if let Some(next) = originals.get(idx + 1) {
                let bare = next.trim_matches(|c: char| !c.is_ascii_alphanumeric());
                if bare.is_empty() {
                    continue;
                }
                if matches!(
                    bare.to_ascii_lowercase().as_str(),
                    "a" | "the" | "me" | "my" | "to" | "with" | "new"
                ) {
                    continue;
                }
                return Some(bare.to_string());
            }
        }
    }
    None
}
