use std::collections::BTreeSet;

/// Role/status tag reported by the platform for a chat participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Badge {
    Broadcaster,
    LeadModerator,
    Moderator,
    Vip,
    Subscriber,
    Founder,
    Other(String),
}

impl Badge {
    pub fn from_name(name: &str) -> Badge {
        match name.to_ascii_lowercase().as_str() {
            "broadcaster" => Badge::Broadcaster,
            "lead_moderator" => Badge::LeadModerator,
            "moderator" => Badge::Moderator,
            "vip" => Badge::Vip,
            "subscriber" => Badge::Subscriber,
            // Founders lose the subscriber badge while the founder badge is shown
            "founder" => Badge::Founder,
            other => Badge::Other(other.to_string()),
        }
    }

    /// Whether holding this badge lifts the unprivileged outbound rate cap.
    pub fn grants_bypass(&self) -> bool {
        matches!(self, Badge::Broadcaster | Badge::LeadModerator | Badge::Moderator | Badge::Vip)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BadgeSet(BTreeSet<Badge>);

impl BadgeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().map(|n| Badge::from_name(n.as_ref())).collect()
    }

    pub fn with(mut self, badge: Badge) -> Self {
        self.0.insert(badge);
        self
    }

    pub fn contains(&self, badge: &Badge) -> bool {
        self.0.contains(badge)
    }

    pub fn grants_bypass(&self) -> bool {
        self.0.iter().any(Badge::grants_bypass)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Badge> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Badge> for BadgeSet {
    fn from_iter<T: IntoIterator<Item = Badge>>(iter: T) -> Self {
        BadgeSet(iter.into_iter().collect())
    }
}
