use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored as an integer in `subscription_info.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Trial = 1,
    Subscribed = 2,
}

impl SubscriptionStatus {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Trial),
            2 => Some(Self::Subscribed),
            _ => None,
        }
    }

    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

/// A user's paid/trial state gating notification eligibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub status: SubscriptionStatus,
    /// Trial end; `None` means open-ended
    pub until: Option<DateTime<Utc>>,
}

impl Entitlement {
    /// Subscribed users are always entitled; trials until they expire.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            SubscriptionStatus::Subscribed => true,
            SubscriptionStatus::Trial => self.until.map_or(true, |until| until > now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_entitlement_is_active() {
        let now = Utc::now();
        let trial = |until| Entitlement {
            status: SubscriptionStatus::Trial,
            until,
        };

        assert!(trial(None).is_active(now));
        assert!(trial(Some(now + Duration::days(1))).is_active(now));
        assert!(!trial(Some(now - Duration::days(1))).is_active(now));

        let subscribed = Entitlement {
            status: SubscriptionStatus::Subscribed,
            until: Some(now - Duration::days(1)),
        };
        assert!(subscribed.is_active(now));
    }
}
