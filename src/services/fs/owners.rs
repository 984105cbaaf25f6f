//! uid/gid to name resolution with process wide caches.

use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};

static OWNER_CACHE: LazyLock<RwLock<HashMap<u32, String>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));
static GROUP_CACHE: LazyLock<RwLock<HashMap<u32, String>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

fn cached(cache: &RwLock<HashMap<u32, String>>, id: u32, resolve: fn(u32) -> Option<String>) -> String {
    if let Ok(cache) = cache.read() {
        if let Some(name) = cache.get(&id) {
            return name.clone();
        }
    }
    let name = resolve(id).unwrap_or_else(|| id.to_string());
    if let Ok(mut cache) = cache.write() {
        cache.insert(id, name.clone());
    }
    name
}

#[cfg(unix)]
fn lookup_user(uid: u32) -> Option<String> {
    uzers::get_user_by_uid(uid).map(|u| u.name().to_string_lossy().into_owned())
}

#[cfg(unix)]
fn lookup_group(gid: u32) -> Option<String> {
    uzers::get_group_by_gid(gid).map(|g| g.name().to_string_lossy().into_owned())
}

#[cfg(not(unix))]
fn lookup_user(_uid: u32) -> Option<String> {
    None
}

#[cfg(not(unix))]
fn lookup_group(_gid: u32) -> Option<String> {
    None
}

/// User name for `uid`, or the number itself when unknown.
pub fn owner_name(uid: u32) -> String {
    cached(&OWNER_CACHE, uid, lookup_user)
}

pub fn group_name(gid: u32) -> String {
    cached(&GROUP_CACHE, gid, lookup_group)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ids_fall_back_to_numbers() {
        assert_eq!(owner_name(4_000_000_001), "4000000001");
        assert_eq!(group_name(4_000_000_002), "4000000002");
    }

    #[cfg(unix)]
    #[test]
    fn root_resolves_by_name() {
        assert_eq!(owner_name(0), "root");
    }
}
