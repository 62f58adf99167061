use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{ActorId, Direction, RequestStatus};

/// Search criteria for payout requests. Empty fields do not constrain the search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestQueryFilter {
    pub owner_id: Option<ActorId>,
    pub statuses: Option<Vec<RequestStatus>>,
    pub direction: Option<Direction>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl RequestQueryFilter {
    pub fn with_owner(mut self, owner_id: ActorId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub fn with_status(mut self, status: RequestStatus) -> Self {
        self.statuses.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.owner_id.is_none() &&
            self.statuses.as_ref().map(|s| s.is_empty()).unwrap_or(true) &&
            self.direction.is_none() &&
            self.since.is_none() &&
            self.until.is_none()
    }
}

impl Display for RequestQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "All requests");
        }
        let mut parts = vec![];
        if let Some(owner) = self.owner_id {
            parts.push(format!("owner: {owner}"));
        }
        if let Some(statuses) = &self.statuses {
            let s = statuses.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(",");
            parts.push(format!("statuses: {s}"));
        }
        if let Some(direction) = self.direction {
            parts.push(format!("direction: {direction}"));
        }
        if let Some(since) = self.since {
            parts.push(format!("since: {since}"));
        }
        if let Some(until) = self.until {
            parts.push(format!("until: {until}"));
        }
        write!(f, "{}", parts.join(", "))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_filter() {
        let filter = RequestQueryFilter::default();
        assert!(filter.is_empty());
        assert_eq!(filter.to_string(), "All requests");
        let filter = RequestQueryFilter { statuses: Some(vec![]), ..Default::default() };
        assert!(filter.is_empty());
    }

    #[test]
    fn builder() {
        let filter = RequestQueryFilter::default()
            .with_owner(ActorId(5))
            .with_status(RequestStatus::Paid)
            .with_status(RequestStatus::Rejected)
            .with_direction(Direction::Nicegram);
        assert!(!filter.is_empty());
        assert_eq!(filter.to_string(), "owner: 5, statuses: Paid,Rejected, direction: Nicegram");
    }
}
