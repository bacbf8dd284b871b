// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn generated_ids_carry_prefix_and_are_unique() {
    let a = InstanceId::generate();
    let b = InstanceId::generate();
    assert!(a.as_str().starts_with(InstanceId::PREFIX));
    assert_ne!(a, b);
}

#[test]
fn external_identities_pass_through_unchanged() {
    let id = InstanceId::from_string("6a3f9e2c-instance-01");
    assert_eq!(id.as_str(), "6a3f9e2c-instance-01");
    assert_eq!(id, "6a3f9e2c-instance-01");
}

#[test]
fn short_truncates_long_identities() {
    let id = InstanceId::from_string("0123456789abcdef");
    assert_eq!(id.short(8), "01234567");
    assert_eq!(short("abc", 8), "abc");
}

#[test]
fn serializes_as_plain_string() {
    let id = InstanceId::from_string("vm-42");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"vm-42\"");
}
