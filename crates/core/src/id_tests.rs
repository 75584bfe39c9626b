// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn generated_ids_carry_prefix_and_fit_inline() {
    let id = WatcherId::new();
    assert!(id.as_str().starts_with(WatcherId::PREFIX));
    assert_eq!(id.as_str().len(), ID_MAX_LEN);
}

#[test]
fn generated_ids_are_unique() {
    let a = WatcherId::new();
    let b = WatcherId::new();
    assert_ne!(a, b);
}

#[test]
fn from_string_round_trips() {
    let id = WatcherId::from_string("wat-abc");
    assert_eq!(id.as_str(), "wat-abc");
    assert_eq!(id, "wat-abc");
}

#[test]
fn suffix_strips_prefix() {
    let id = WatcherId::from_string("wat-abcdef");
    assert_eq!(id.suffix(), "abcdef");
    assert_eq!(id.short(3), "abc");
}

#[test]
fn short_clamps_to_suffix_length() {
    let id = WatcherId::from_string("wat-ab");
    assert_eq!(id.short(10), "ab");
}

#[test]
fn serde_is_transparent() {
    let id = WatcherId::from_string("wat-xyz");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"wat-xyz\"");
    let back: WatcherId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn idbuf_hash_matches_str() {
    use std::collections::HashMap;
    let mut map: HashMap<IdBuf, u32> = HashMap::new();
    map.insert(IdBuf::new("wat-a"), 1);
    assert_eq!(map.get(&IdBuf::new("wat-a")), Some(&1));
}
