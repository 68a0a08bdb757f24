//! Identity attributes carried alongside gateway events.

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Account-level names of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Base account name.
    pub username: String,
    /// Global display name, if the user set one.
    #[serde(default)]
    pub global_name: Option<String>,
}

/// A guild member as reported by the gateway: account names plus the
/// per-guild nickname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberProfile {
    /// The member's user ID.
    pub user_id: UserId,
    /// Account-level names.
    pub identity: UserIdentity,
    /// Per-guild nickname.
    #[serde(default)]
    pub nick: Option<String>,
}

impl MemberProfile {
    /// Build a profile with no nickname or global name.
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            identity: UserIdentity {
                username: username.into(),
                global_name: None,
            },
            nick: None,
        }
    }

    /// The name shown for this member inside its guild.
    pub fn display_name(&self) -> &str {
        resolve_display_name(
            self.nick.as_deref(),
            self.identity.global_name.as_deref(),
            &self.identity.username,
        )
    }
}

/// Resolve the name a member is shown under: the per-guild nickname, else
/// the global display name, else the base account name. Empty strings count
/// as absent.
pub fn resolve_display_name<'a>(
    nick: Option<&'a str>,
    global_name: Option<&'a str>,
    username: &'a str,
) -> &'a str {
    nick.filter(|n| !n.is_empty())
        .or_else(|| global_name.filter(|g| !g.is_empty()))
        .unwrap_or(username)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nickname_wins() {
        assert_eq!(resolve_display_name(Some("nick"), Some("Global"), "user"), "nick");
    }

    #[test]
    fn test_falls_back_to_global_then_username() {
        assert_eq!(resolve_display_name(None, Some("Global"), "user"), "Global");
        assert_eq!(resolve_display_name(None, None, "user"), "user");
        assert_eq!(resolve_display_name(Some(""), Some(""), "user"), "user");
    }

    #[test]
    fn test_member_profile_display_name() {
        let mut member = MemberProfile::new(UserId::new(1), "alice");
        assert_eq!(member.display_name(), "alice");
        member.identity.global_name = Some("Alice".into());
        assert_eq!(member.display_name(), "Alice");
        member.nick = Some("Al".into());
        assert_eq!(member.display_name(), "Al");
    }
}
