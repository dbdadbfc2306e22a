//! The client's current subscription state.

use propwatch_shared::{PropertyRecord, SubscriptionFilterSpec};

/// Whether the caller has opted in to notifications, and with which filter.
///
/// `NoActiveFilter` drops everything. It is deliberately distinct from an
/// open filter, which accepts everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ActiveFilter {
    #[default]
    NoActiveFilter,
    Active(SubscriptionFilterSpec),
}

impl ActiveFilter {
    pub fn matches(&self, entity: &PropertyRecord) -> bool {
        match self {
            ActiveFilter::NoActiveFilter => false,
            ActiveFilter::Active(spec) => spec.matches(entity),
        }
    }

    pub fn spec(&self) -> Option<&SubscriptionFilterSpec> {
        match self {
            ActiveFilter::NoActiveFilter => None,
            ActiveFilter::Active(spec) => Some(spec),
        }
    }
}
