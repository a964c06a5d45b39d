// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::filter::{self, FilterCriteria, FilterStats, RegionSelector};
use crate::{Friend, FriendStore, MapKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetSearch(String),
    ClearSearch,
    SelectRegion(RegionSelector),
    SetActiveMap(MapKind),
    ToggleMap,
    SelectFriend(String),
    ClearSelection,
}

/// Follow-up work an action asks of the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    MapChanged(MapKind),
    FlyTo(Friend),
}

/// Owned state of the friends map. Every transition goes through [`AppState::apply`].
#[derive(Debug, Clone)]
pub struct AppState {
    store: FriendStore,
    criteria: FilterCriteria,
    filtered: Vec<Friend>,
    regions: Vec<String>,
    active_map: MapKind,
    selected: Option<String>,
}

impl AppState {
    pub fn new(store: FriendStore, active_map: MapKind) -> Self {
        let regions = filter::regions(store.friends());
        let filtered = store.friends().to_vec();
        Self {
            store,
            criteria: FilterCriteria::default(),
            filtered,
            regions,
            active_map,
            selected: None,
        }
    }

    pub fn apply(&mut self, action: Action) -> Option<Effect> {
        match action {
            Action::SetSearch(query) => {
                if query != self.criteria.search_query {
                    self.criteria.search_query = query;
                    self.refilter();
                }
                None
            }
            Action::ClearSearch => {
                if !self.criteria.search_query.is_empty() {
                    self.criteria.search_query.clear();
                    self.refilter();
                }
                None
            }
            Action::SelectRegion(region) => {
                if region != self.criteria.selected_region {
                    self.criteria.selected_region = region;
                    self.refilter();
                }
                None
            }
            Action::SetActiveMap(map) => self.switch_map(map),
            Action::ToggleMap => self.switch_map(self.active_map.toggle()),
            Action::SelectFriend(id) => match self.store.get(&id) {
                Some(friend) => {
                    let friend = friend.clone();
                    self.selected = Some(id);
                    Some(Effect::FlyTo(friend))
                }
                None => {
                    log::warn!("[State] Unknown friend id '{}'", id);
                    None
                }
            },
            Action::ClearSelection => {
                self.selected = None;
                None
            }
        }
    }

    fn switch_map(&mut self, map: MapKind) -> Option<Effect> {
        if map == self.active_map {
            return None;
        }
        self.active_map = map;
        Some(Effect::MapChanged(map))
    }

    fn refilter(&mut self) {
        self.filtered = filter::filter(self.store.friends(), &self.criteria);
        log::debug!(
            "[State] {} of {} friends match {:?}",
            self.filtered.len(),
            self.store.len(),
            self.criteria
        );
    }

    pub fn store(&self) -> &FriendStore {
        &self.store
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn filtered(&self) -> &[Friend] {
        &self.filtered
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn stats(&self) -> FilterStats {
        FilterStats::compute(self.store.friends(), &self.filtered)
    }

    pub fn active_map(&self) -> MapKind {
        self.active_map
    }

    pub fn selected_friend(&self) -> Option<&Friend> {
        self.selected.as_deref().and_then(|id| self.store.get(id))
    }

    /// Filtered friends the active map plots.
    pub fn markers(&self) -> impl Iterator<Item = &Friend> + '_ {
        let map = self.active_map;
        self.filtered.iter().filter(move |f| map.shows(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> FriendStore {
        let json = r#"[
            {"id":"1","name":"Alice","province":"Beijing","city":"Beijing","latitude":39.9,"longitude":116.4},
            {"id":"2","name":"Bob","province":"California","city":"LA","latitude":34.0,"longitude":-118.2}
        ]"#;
        FriendStore::from_json(json).unwrap()
    }

    fn ids<'a>(friends: impl IntoIterator<Item = &'a Friend>) -> Vec<&'a str> {
        friends.into_iter().map(|f| f.id.as_str()).collect()
    }

    #[test]
    fn test_initial_state_shows_everyone() {
        let state = AppState::new(store(), MapKind::World);
        assert_eq!(ids(state.filtered()), vec!["1", "2"]);
        assert_eq!(state.regions(), ["Beijing", "California"]);
        assert_eq!(state.stats().total_count, 2);
    }

    #[test]
    fn test_search_and_region_reduce() {
        let mut state = AppState::new(store(), MapKind::World);
        state.apply(Action::SetSearch("bob".to_string()));
        assert_eq!(ids(state.filtered()), vec!["2"]);

        state.apply(Action::SelectRegion(RegionSelector::Province("Beijing".into())));
        assert!(state.filtered().is_empty());
        assert_eq!(state.stats().filtered_count, 0);

        state.apply(Action::ClearSearch);
        assert_eq!(ids(state.filtered()), vec!["1"]);
    }

    #[test]
    fn test_markers_follow_active_map() {
        let mut state = AppState::new(store(), MapKind::World);
        assert_eq!(ids(state.markers()), vec!["1", "2"]);

        let effect = state.apply(Action::ToggleMap);
        assert_eq!(effect, Some(Effect::MapChanged(MapKind::China)));
        assert_eq!(ids(state.markers()), vec!["1"]);
        // Sidebar list is independent of the map.
        assert_eq!(ids(state.filtered()), vec!["1", "2"]);

        assert_eq!(state.apply(Action::SetActiveMap(MapKind::China)), None);
    }

    #[test]
    fn test_select_friend_requests_fly_to() {
        let mut state = AppState::new(store(), MapKind::World);
        match state.apply(Action::SelectFriend("2".to_string())) {
            Some(Effect::FlyTo(friend)) => assert_eq!(friend.name, "Bob"),
            other => panic!("unexpected effect {:?}", other),
        }
        assert_eq!(state.selected_friend().map(|f| f.id.as_str()), Some("2"));

        assert_eq!(state.apply(Action::SelectFriend("nobody".to_string())), None);
        state.apply(Action::ClearSelection);
        assert!(state.selected_friend().is_none());
    }
}
