// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! Sidebar search and region filtering over the friend list.
//!
//! Everything here is a pure function of its inputs. Debouncing of the query
//! lives in [`crate::debounce`]; by the time a query reaches [`filter`] it is
//! the latest settled value.

use crate::Friend;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum RegionSelector {
    #[default]
    All,
    Province(String),
}

impl RegionSelector {
    pub fn matches(&self, friend: &Friend) -> bool {
        match self {
            RegionSelector::All => true,
            RegionSelector::Province(p) => friend.province == *p,
        }
    }
}

impl fmt::Display for RegionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionSelector::All => write!(f, "all"),
            RegionSelector::Province(p) => write!(f, "{}", p),
        }
    }
}

impl FromStr for RegionSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(RegionSelector::All)
        } else {
            Ok(RegionSelector::Province(s.to_string()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    pub search_query: String,
    pub selected_region: RegionSelector,
}

impl FilterCriteria {
    pub fn new(search_query: impl Into<String>, selected_region: RegionSelector) -> Self {
        Self {
            search_query: search_query.into(),
            selected_region,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.search_query.trim().is_empty() && self.selected_region == RegionSelector::All
    }
}

fn matches_query(friend: &Friend, query: &str) -> bool {
    friend.name.to_lowercase().contains(query)
        || friend.city.to_lowercase().contains(query)
        || friend.province.to_lowercase().contains(query)
        || friend
            .address
            .as_ref()
            .is_some_and(|a| a.to_lowercase().contains(query))
}

/// Region filter, then search. Order of `friends` is preserved.
pub fn filter(friends: &[Friend], criteria: &FilterCriteria) -> Vec<Friend> {
    if criteria.is_noop() {
        return friends.to_vec();
    }
    let query = criteria.search_query.trim().to_lowercase();

    friends
        .iter()
        .filter(|f| criteria.selected_region.matches(f))
        .filter(|f| query.is_empty() || matches_query(f, &query))
        .cloned()
        .collect()
}

/// Distinct provinces, ascending.
pub fn regions(friends: &[Friend]) -> Vec<String> {
    friends
        .iter()
        .map(|f| f.province.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Counts against the unfiltered list.
pub fn region_counts(friends: &[Friend]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for friend in friends {
        *counts.entry(friend.province.clone()).or_insert(0) += 1;
    }
    counts
}

pub fn count_in_region(friends: &[Friend], region: &str) -> usize {
    friends.iter().filter(|f| f.province == region).count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterStats {
    pub total_count: usize,
    pub filtered_count: usize,
    pub region_count: usize,
}

impl FilterStats {
    pub fn compute(friends: &[Friend], filtered: &[Friend]) -> Self {
        Self {
            total_count: friends.len(),
            filtered_count: filtered.len(),
            region_count: regions(friends).len(),
        }
    }
}
