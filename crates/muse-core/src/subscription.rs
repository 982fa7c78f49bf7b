//! Paid-entitlement lookup
//!
//! Callers holding a subscription bypass the quota gate entirely.

use crate::error::Result;
use std::collections::HashSet;

/// Source of truth for paid entitlements
#[async_trait::async_trait]
pub trait SubscriptionChecker: Send + Sync {
    /// Whether the caller currently holds a paid entitlement
    async fn is_pro(&self, caller_id: &str) -> Result<bool>;
}

/// Fixed set of paid callers (from configuration)
#[derive(Debug, Clone, Default)]
pub struct StaticSubscriptions {
    pro_callers: HashSet<String>,
}

impl StaticSubscriptions {
    /// Create from a list of caller ids
    pub fn new<I, S>(pro_callers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pro_callers: pro_callers.into_iter().map(Into::into).collect(),
        }
    }

    /// Nobody is subscribed
    pub fn none() -> Self {
        Self::default()
    }

    /// Number of paid callers
    pub fn len(&self) -> usize {
        self.pro_callers.len()
    }

    /// Whether no caller is subscribed
    pub fn is_empty(&self) -> bool {
        self.pro_callers.is_empty()
    }
}

#[async_trait::async_trait]
impl SubscriptionChecker for StaticSubscriptions {
    async fn is_pro(&self, caller_id: &str) -> Result<bool> {
        Ok(!caller_id.is_empty() && self.pro_callers.contains(caller_id))
    }
}
