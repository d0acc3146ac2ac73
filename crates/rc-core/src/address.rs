//! Canonical WhatsApp addresses (JIDs)
//!
//! Users are addressed as `<digits>@s.whatsapp.net`, groups as `<id>@g.us`.
//! Input coming from the UI is loose: phone numbers with `+`, spaces or
//! dashes, or already-complete JIDs.

use crate::types::TargetType;

/// Server part of a user address
pub const USER_SERVER: &str = "s.whatsapp.net";

/// Server part of a group address
pub const GROUP_SERVER: &str = "g.us";

/// Legacy user server still produced by some exports
const LEGACY_USER_SERVER: &str = "c.us";

/// Normalize a user reference into `<digits>@s.whatsapp.net`.
///
/// Complete JIDs lose any device suffix (`123:4@s.whatsapp.net`) and legacy
/// `c.us` servers are rewritten. Returns `None` when no digits remain.
pub fn normalize_user(raw: &str) -> Option<String> {
    let trimmed = raw.trim();

    if let Some((user, server)) = trimmed.split_once('@') {
        let user = user.split(':').next().unwrap_or(user);
        if user.is_empty() {
            return None;
        }
        let server = if server == LEGACY_USER_SERVER {
            USER_SERVER
        } else {
            server
        };
        return Some(format!("{}@{}", user, server));
    }

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    Some(format!("{}@{}", digits, USER_SERVER))
}

/// Normalize a broadcast target according to its type.
///
/// Anything that already contains `@` is passed through unchanged, as is a
/// user target that does not look like a phone number. Blank input is `None`.
pub fn normalize_target(raw: &str, target_type: TargetType) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.contains('@') {
        return Some(trimmed.to_string());
    }

    match target_type {
        TargetType::User if looks_like_phone(trimmed) => normalize_user(trimmed),
        TargetType::User => Some(trimmed.to_string()),
        TargetType::Group => Some(format!("{}@{}", trimmed, GROUP_SERVER)),
    }
}

fn looks_like_phone(raw: &str) -> bool {
    raw.chars().any(|c| c.is_ascii_digit())
        && raw
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')' | '.'))
}

/// Render a mention as it appears in message text: `@<user part>`
pub fn mention_tag(address: &str) -> String {
    let user = address.split('@').next().unwrap_or(address);
    format!("@{}", user)
}
