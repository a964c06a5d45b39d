// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use friends_map_core::filter::{filter, region_counts, regions, FilterCriteria, RegionSelector};
use friends_map_core::geo::{get_china_friends, get_world_friends, is_in_china};
use friends_map_core::{FriendStore, MapKind};

fn scenario_store() -> FriendStore {
    let json = r#"[
        {"id":"1","name":"Alice","province":"Beijing","city":"Beijing","latitude":39.9,"longitude":116.4},
        {"id":"2","name":"Bob","province":"California","city":"LA","latitude":34.0,"longitude":-118.2}
    ]"#;
    FriendStore::from_json(json).expect("scenario data is valid")
}

#[test]
fn test_two_friend_scenario() {
    let store = scenario_store();
    let friends = store.friends();

    let china: Vec<_> = get_china_friends(friends)
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(china, vec!["Alice"]);

    let searched: Vec<_> = filter(friends, &FilterCriteria::new("a", RegionSelector::All))
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(searched, vec!["Alice", "Bob"]);

    assert_eq!(regions(friends), vec!["Beijing", "California"]);
}

#[test]
fn test_bundled_data_invariants() {
    let store = FriendStore::bundled().expect("bundled data must load");
    let friends = store.friends();

    assert_eq!(get_world_friends(friends), friends.to_vec());
    assert_eq!(filter(friends, &FilterCriteria::default()), friends.to_vec());

    let all_regions = regions(friends);
    let mut sorted = all_regions.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(all_regions, sorted);

    for region in &all_regions {
        let criteria = FilterCriteria::new("", RegionSelector::Province(region.clone()));
        let in_region = filter(friends, &criteria);
        let expected: Vec<_> = friends
            .iter()
            .filter(|f| &f.province == region)
            .cloned()
            .collect();
        assert_eq!(in_region, expected, "region {}", region);
        assert_eq!(region_counts(friends)[region], expected.len());
    }

    // The China view is exactly the classified subset, in order.
    let china = MapKind::China.friends_for(friends);
    assert!(china.iter().all(|f| is_in_china(f.latitude, f.longitude)));
    assert!(china.len() < friends.len());
}

#[test]
fn test_bundled_search_by_city() {
    let store = FriendStore::bundled().unwrap();
    let hits = filter(
        store.friends(),
        &FilterCriteria::new("SHENZ", RegionSelector::All),
    );
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].city, "Shenzhen");
}
