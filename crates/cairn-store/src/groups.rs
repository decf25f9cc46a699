//! Principals and access groups.
//!
//! Groups are map objects tagged `type = "group"`. Membership is stored as
//! `member:<id>` → role, and delegation to a parent group as
//! `parent:<id>` → `extend` | `revoked`. A member's effective role is its
//! direct role, or else the best role it holds in any extended parent.

use std::collections::{BTreeMap, HashSet};

use serde_json::json;

use cairn_types::{ObjectId, ObjectKind, Role};

use crate::content::Content;
use crate::error::{StoreError, StoreResult};
use crate::header::{meta, object_type, TYPE_KEY};
use crate::traits::CoStore;

const MEMBER_PREFIX: &str = "member:";
const PARENT_PREFIX: &str = "parent:";
const EXTEND: &str = "extend";
const REVOKED: &str = "revoked";

/// Create a principal (account) object.
pub fn create_account(store: &dyn CoStore, name: &str) -> StoreResult<ObjectId> {
    let init = Content::from_json(ObjectKind::Map, json!({ "name": name }))?;
    let handle = store.create_object(
        ObjectKind::Map,
        None,
        Some(init),
        meta([(TYPE_KEY, json!(object_type::ACCOUNT))]),
    )?;
    Ok(handle.id)
}

/// Create a group with `owner` as its admin.
pub fn create_group(store: &dyn CoStore, owner: &ObjectId) -> StoreResult<ObjectId> {
    let mut members = BTreeMap::new();
    members.insert(member_key(owner), json!(Role::Admin.as_str()));
    let init = Content::Map(members);
    let handle = store.create_object(
        ObjectKind::Map,
        None,
        Some(init),
        meta([(TYPE_KEY, json!(object_type::GROUP))]),
    )?;
    Ok(handle.id)
}

/// Add or change a member's role.
pub fn add_member(
    store: &dyn CoStore,
    group: &ObjectId,
    member: &ObjectId,
    role: Role,
) -> StoreResult<()> {
    ensure_group(store, group)?;
    store.map_set(group, &member_key(member), json!(role.as_str()))
}

/// Remove a member. Returns `true` if the member was present.
pub fn remove_member(store: &dyn CoStore, group: &ObjectId, member: &ObjectId) -> StoreResult<bool> {
    let content = ensure_group(store, group)?;
    let key = member_key(member);
    if content.get(&key).is_none() {
        return Ok(false);
    }
    store.map_delete(group, &key)?;
    Ok(true)
}

/// Effective role of `member` in `group`, following parent extensions.
pub fn member_role(
    store: &dyn CoStore,
    group: &ObjectId,
    member: &ObjectId,
) -> StoreResult<Option<Role>> {
    let mut visited = HashSet::new();
    effective_role(store, group, member, &mut visited)
}

/// Let members of `parent` act on `child` with their parent roles.
pub fn extend_group(store: &dyn CoStore, child: &ObjectId, parent: &ObjectId) -> StoreResult<()> {
    ensure_group(store, child)?;
    ensure_group(store, parent)?;
    store.map_set(child, &parent_key(parent), json!(EXTEND))
}

/// Revoke a parent extension. Returns `true` if it was active.
pub fn revoke_extension(
    store: &dyn CoStore,
    child: &ObjectId,
    parent: &ObjectId,
) -> StoreResult<bool> {
    let content = ensure_group(store, child)?;
    let key = parent_key(parent);
    if content.get_str(&key) != Some(EXTEND) {
        return Ok(false);
    }
    store.map_set(child, &key, json!(REVOKED))?;
    Ok(true)
}

fn effective_role(
    store: &dyn CoStore,
    group: &ObjectId,
    member: &ObjectId,
    visited: &mut HashSet<ObjectId>,
) -> StoreResult<Option<Role>> {
    if !visited.insert(*group) {
        return Ok(None);
    }
    let content = ensure_group(store, group)?;
    if let Some(role) = content.get_str(&member_key(member)) {
        return Ok(Some(role.parse()?));
    }

    let mut best: Option<Role> = None;
    for (key, value) in content.as_map().into_iter().flatten() {
        let Some(parent) = key.strip_prefix(PARENT_PREFIX) else {
            continue;
        };
        if value.as_str() != Some(EXTEND) {
            continue;
        }
        let parent = ObjectId::parse(parent)?;
        if !store.is_available(&parent) {
            continue;
        }
        if let Some(role) = effective_role(store, &parent, member, visited)? {
            best = best.max(Some(role));
        }
    }
    Ok(best)
}

fn ensure_group(store: &dyn CoStore, id: &ObjectId) -> StoreResult<Content> {
    let header = store.header(id)?.ok_or(StoreError::NotFound(*id))?;
    if header.object_type() != Some(object_type::GROUP) {
        return Err(StoreError::NotAGroup(*id));
    }
    store.content(id)?.ok_or(StoreError::NotFound(*id))
}

fn member_key(member: &ObjectId) -> String {
    format!("{MEMBER_PREFIX}{member}")
}

fn parent_key(parent: &ObjectId) -> String {
    format!("{PARENT_PREFIX}{parent}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCoStore;

    #[test]
    fn owner_is_admin() {
        let store = InMemoryCoStore::new();
        let account = create_account(&store, "alice").unwrap();
        let group = create_group(&store, &account).unwrap();
        assert_eq!(member_role(&store, &group, &account).unwrap(), Some(Role::Admin));
    }

    #[test]
    fn add_and_remove_member() {
        let store = InMemoryCoStore::new();
        let owner = create_account(&store, "owner").unwrap();
        let bob = create_account(&store, "bob").unwrap();
        let group = create_group(&store, &owner).unwrap();

        add_member(&store, &group, &bob, Role::Reader).unwrap();
        assert_eq!(member_role(&store, &group, &bob).unwrap(), Some(Role::Reader));
        assert!(remove_member(&store, &group, &bob).unwrap());
        assert!(!remove_member(&store, &group, &bob).unwrap());
        assert_eq!(member_role(&store, &group, &bob).unwrap(), None);
    }

    #[test]
    fn extension_delegates_until_revoked() {
        let store = InMemoryCoStore::new();
        let owner = create_account(&store, "owner").unwrap();
        let carol = create_account(&store, "carol").unwrap();
        let parent = create_group(&store, &owner).unwrap();
        let child = create_group(&store, &owner).unwrap();
        add_member(&store, &parent, &carol, Role::Writer).unwrap();

        assert_eq!(member_role(&store, &child, &carol).unwrap(), None);
        extend_group(&store, &child, &parent).unwrap();
        assert_eq!(member_role(&store, &child, &carol).unwrap(), Some(Role::Writer));

        assert!(revoke_extension(&store, &child, &parent).unwrap());
        assert!(!revoke_extension(&store, &child, &parent).unwrap());
        assert_eq!(member_role(&store, &child, &carol).unwrap(), None);
    }

    #[test]
    fn extension_cycles_terminate() {
        let store = InMemoryCoStore::new();
        let owner = create_account(&store, "owner").unwrap();
        let dave = create_account(&store, "dave").unwrap();
        let a = create_group(&store, &owner).unwrap();
        let b = create_group(&store, &owner).unwrap();
        extend_group(&store, &a, &b).unwrap();
        extend_group(&store, &b, &a).unwrap();
        assert_eq!(member_role(&store, &a, &dave).unwrap(), None);
    }

    #[test]
    fn non_group_is_rejected() {
        let store = InMemoryCoStore::new();
        let account = create_account(&store, "eve").unwrap();
        let err = add_member(&store, &account, &account, Role::Reader).unwrap_err();
        assert!(matches!(err, StoreError::NotAGroup(_)));
    }
}
