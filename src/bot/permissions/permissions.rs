use core::fmt;
use std::fmt::Display;

use crate::bot::{chat_event::{badges::{Badge, BadgeSet}, chat_event::ChatUser}, commands::{commands::BotResult, registry::RegisteredCommand}, state::def::BotError};

/// Ordered from least to most privileged, so `>=` reads as "at least".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub enum PermissionLevel {
    #[default]
    Viewer,
    Subscriber,
    Vip,
    Moderator,
    Broadcaster,
}

impl Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PermissionLevel::Broadcaster => "broadcaster",
            PermissionLevel::Moderator => "moderator",
            PermissionLevel::Vip => "vip",
            PermissionLevel::Subscriber => "subscriber",
            PermissionLevel::Viewer => "viewer",
        };
        write!(f, "{}", s)
    }
}

impl PermissionLevel {
    pub fn from_badge(badge: &Badge) -> PermissionLevel {
        match badge {
            Badge::Broadcaster => PermissionLevel::Broadcaster,
            Badge::LeadModerator | Badge::Moderator => PermissionLevel::Moderator,
            Badge::Vip => PermissionLevel::Vip,
            Badge::Subscriber | Badge::Founder => PermissionLevel::Subscriber,
            Badge::Other(_) => PermissionLevel::Viewer,
        }
    }

    /// Highest level granted by any badge in the set.
    pub fn from_badges(badges: &BadgeSet) -> PermissionLevel {
        badges.iter().map(PermissionLevel::from_badge).max().unwrap_or_default()
    }
}

pub fn has_permission(user: &ChatUser, required: PermissionLevel) -> bool {
    user.permission >= required
}

pub fn check_permission(command: &RegisteredCommand, user: &ChatUser) -> BotResult<()> {
    if has_permission(user, command.permission) {
        Ok(())
    } else {
        Err(BotError::PermissionDenied(command.permission))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered() {
        assert!(PermissionLevel::Viewer < PermissionLevel::Subscriber);
        assert!(PermissionLevel::Subscriber < PermissionLevel::Vip);
        assert!(PermissionLevel::Vip < PermissionLevel::Moderator);
        assert!(PermissionLevel::Moderator < PermissionLevel::Broadcaster);
    }

    #[test]
    fn broadcaster_dominates_other_badges() {
        let badges = BadgeSet::from_names(["subscriber", "vip", "broadcaster"]);
        assert_eq!(PermissionLevel::from_badges(&badges), PermissionLevel::Broadcaster);
    }

    #[test]
    fn unknown_badges_are_viewers() {
        assert_eq!(PermissionLevel::from_badges(&BadgeSet::new()), PermissionLevel::Viewer);
        assert_eq!(PermissionLevel::from_badges(&BadgeSet::from_names(["premium"])), PermissionLevel::Viewer);
        assert_eq!(PermissionLevel::from_badges(&BadgeSet::from_names(["founder"])), PermissionLevel::Subscriber);
    }

    #[test]
    fn callers_need_at_least_the_required_level() {
        let vip = ChatUser::new("1", "vippy", "Vippy", BadgeSet::from_names(["vip"]));
        assert!(has_permission(&vip, PermissionLevel::Viewer));
        assert!(has_permission(&vip, PermissionLevel::Vip));
        assert!(!has_permission(&vip, PermissionLevel::Moderator));
    }
}
