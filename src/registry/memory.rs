//! In-memory stand-in for the native registry, backing the installer tests.
//!
//! Keys live in a path → value-set map; handles are plain counters tracked in
//! a side table so tests can assert that every open handle was released.

use std::cell::RefCell;
use std::collections::BTreeMap;

use super::{
    Disposition, KeyHandle, KeyLocator, NativeRegistryApi, NtStatus, RegValue, SERVICES_KEY_PATH,
};

#[derive(Default)]
struct State {
    keys: BTreeMap<String, BTreeMap<String, RegValue>>,
    handles: BTreeMap<isize, String>,
    next_handle: isize,
    fail_value_write: Option<(String, NtStatus)>,
    deny_open: BTreeMap<String, NtStatus>,
}

pub(crate) struct MemoryRegistry {
    state: RefCell<State>,
}

impl MemoryRegistry {
    pub(crate) fn new() -> Self {
        Self { state: RefCell::new(State { next_handle: 1, ..State::default() }) }
    }

    /// A registry whose services root already exists, as on a real system.
    pub(crate) fn with_services_root() -> Self {
        let registry = Self::new();
        registry
            .state
            .borrow_mut()
            .keys
            .insert(SERVICES_KEY_PATH.to_string(), BTreeMap::new());
        registry
    }

    pub(crate) fn insert_key(&self, path: &str) {
        self.state.borrow_mut().keys.insert(path.to_string(), BTreeMap::new());
    }

    pub(crate) fn key_exists(&self, path: &str) -> bool {
        let state = self.state.borrow();
        find_key(&state, path, true).is_some()
    }

    pub(crate) fn values(&self, path: &str) -> Option<BTreeMap<String, RegValue>> {
        let state = self.state.borrow();
        let canonical = find_key(&state, path, true)?;
        state.keys.get(&canonical).cloned()
    }

    /// Handles currently open; zero means every path released what it took.
    pub(crate) fn open_handles(&self) -> usize {
        self.state.borrow().handles.len()
    }

    /// Makes the next write of the named value fail with `status`.
    pub(crate) fn fail_value_write(&self, name: &str, status: NtStatus) {
        self.state.borrow_mut().fail_value_write = Some((name.to_string(), status));
    }

    /// Makes any open or create of `path` fail with `status`.
    pub(crate) fn deny_open(&self, path: &str, status: NtStatus) {
        self.state.borrow_mut().deny_open.insert(path.to_string(), status);
    }
}

fn resolve_path(state: &State, locator: &KeyLocator<'_>) -> Result<String, NtStatus> {
    match locator.parent {
        None => Ok(locator.path.to_string()),
        Some(parent) => {
            let base = state.handles.get(&parent.raw()).ok_or(NtStatus::INVALID_HANDLE)?;
            Ok(format!("{}\\{}", base, locator.path))
        }
    }
}

fn find_key(state: &State, path: &str, case_insensitive: bool) -> Option<String> {
    if state.keys.contains_key(path) {
        return Some(path.to_string());
    }
    if case_insensitive {
        return state.keys.keys().find(|key| key.eq_ignore_ascii_case(path)).cloned();
    }
    None
}

fn denied(state: &State, path: &str) -> Option<NtStatus> {
    state
        .deny_open
        .iter()
        .find(|(denied, _)| denied.eq_ignore_ascii_case(path))
        .map(|(_, status)| *status)
}

fn alloc_handle(state: &mut State, path: String) -> KeyHandle {
    let raw = state.next_handle;
    state.next_handle += 1;
    state.handles.insert(raw, path);
    KeyHandle::from_raw(raw)
}

fn backing_path(state: &State, key: KeyHandle) -> Result<String, NtStatus> {
    state.handles.get(&key.raw()).cloned().ok_or(NtStatus::INVALID_HANDLE)
}

impl NativeRegistryApi for MemoryRegistry {
    fn open_key(&self, locator: &KeyLocator<'_>, _access: u32) -> Result<KeyHandle, NtStatus> {
        let mut state = self.state.borrow_mut();
        let path = resolve_path(&state, locator)?;
        if let Some(status) = denied(&state, &path) {
            return Err(status);
        }
        let canonical = find_key(&state, &path, locator.case_insensitive)
            .ok_or(NtStatus::OBJECT_NAME_NOT_FOUND)?;
        Ok(alloc_handle(&mut state, canonical))
    }

    fn create_key(
        &self,
        locator: &KeyLocator<'_>,
        _access: u32,
        _options: u32,
    ) -> Result<(KeyHandle, Disposition), NtStatus> {
        let mut state = self.state.borrow_mut();
        let path = resolve_path(&state, locator)?;
        if let Some(status) = denied(&state, &path) {
            return Err(status);
        }
        match find_key(&state, &path, locator.case_insensitive) {
            Some(canonical) => {
                let handle = alloc_handle(&mut state, canonical);
                Ok((handle, Disposition::OpenedExisting))
            }
            None => {
                state.keys.insert(path.clone(), BTreeMap::new());
                let handle = alloc_handle(&mut state, path);
                Ok((handle, Disposition::CreatedNew))
            }
        }
    }

    fn set_value(&self, key: KeyHandle, name: &str, value: &RegValue) -> Result<(), NtStatus> {
        let mut state = self.state.borrow_mut();
        match state.fail_value_write.take() {
            Some((failing, status)) if failing == name => return Err(status),
            other => state.fail_value_write = other,
        }
        let path = backing_path(&state, key)?;
        let values = state.keys.get_mut(&path).ok_or(NtStatus::KEY_DELETED)?;
        values.insert(name.to_string(), value.clone());
        Ok(())
    }

    fn query_value(&self, key: KeyHandle, name: &str) -> Result<RegValue, NtStatus> {
        let state = self.state.borrow();
        let path = backing_path(&state, key)?;
        let values = state.keys.get(&path).ok_or(NtStatus::KEY_DELETED)?;
        values.get(name).cloned().ok_or(NtStatus::OBJECT_NAME_NOT_FOUND)
    }

    fn delete_key(&self, key: KeyHandle) -> Result<(), NtStatus> {
        let mut state = self.state.borrow_mut();
        let path = backing_path(&state, key)?;
        let prefix = format!("{path}\\");
        if state.keys.keys().any(|other| other.starts_with(&prefix)) {
            return Err(NtStatus::CANNOT_DELETE);
        }
        state.keys.remove(&path).ok_or(NtStatus::KEY_DELETED)?;
        Ok(())
    }

    fn delete_value(&self, key: KeyHandle, name: &str) -> Result<(), NtStatus> {
        let mut state = self.state.borrow_mut();
        let path = backing_path(&state, key)?;
        let values = state.keys.get_mut(&path).ok_or(NtStatus::KEY_DELETED)?;
        values.remove(name).map(|_| ()).ok_or(NtStatus::OBJECT_NAME_NOT_FOUND)
    }

    fn close_key(&self, key: KeyHandle) -> Result<(), NtStatus> {
        let mut state = self.state.borrow_mut();
        state.handles.remove(&key.raw()).map(|_| ()).ok_or(NtStatus::INVALID_HANDLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{DELETE, KEY_ALL_ACCESS, KEY_CREATE_SUB_KEY};

    #[test]
    fn create_reports_dispositions() {
        let registry = MemoryRegistry::with_services_root();
        let root = registry
            .open_key(&KeyLocator::absolute(SERVICES_KEY_PATH), KEY_CREATE_SUB_KEY)
            .expect("root open");

        let (first, disposition) = registry
            .create_key(&KeyLocator::relative(root, "Demo"), KEY_ALL_ACCESS, 0)
            .expect("create");
        assert_eq!(disposition, Disposition::CreatedNew);
        registry.close_key(first).expect("close");

        let (second, disposition) = registry
            .create_key(&KeyLocator::relative(root, "demo"), KEY_ALL_ACCESS, 0)
            .expect("reopen");
        assert_eq!(disposition, Disposition::OpenedExisting);
        registry.close_key(second).expect("close");
        registry.close_key(root).expect("close");
        assert_eq!(registry.open_handles(), 0);
    }

    #[test]
    fn values_survive_until_deleted() {
        let registry = MemoryRegistry::with_services_root();
        let root = registry
            .open_key(&KeyLocator::absolute(SERVICES_KEY_PATH), KEY_CREATE_SUB_KEY)
            .expect("root open");
        let (key, _) = registry
            .create_key(&KeyLocator::relative(root, "Demo"), KEY_ALL_ACCESS, 0)
            .expect("create");

        registry.set_value(key, "Start", &RegValue::Dword(2)).expect("write");
        assert_eq!(registry.query_value(key, "Start"), Ok(RegValue::Dword(2)));

        registry.delete_value(key, "Start").expect("delete value");
        assert_eq!(registry.query_value(key, "Start"), Err(NtStatus::OBJECT_NAME_NOT_FOUND));

        registry.delete_key(key).expect("delete key");
        assert!(!registry.key_exists(&format!("{SERVICES_KEY_PATH}\\Demo")));
        registry.close_key(key).expect("close");
        registry.close_key(root).expect("close");
    }

    #[test]
    fn delete_refuses_keys_with_children() {
        let registry = MemoryRegistry::with_services_root();
        registry.insert_key(&format!("{SERVICES_KEY_PATH}\\Demo"));
        registry.insert_key(&format!("{SERVICES_KEY_PATH}\\Demo\\Parameters"));

        let demo_path = format!("{SERVICES_KEY_PATH}\\Demo");
        let key = registry
            .open_key(&KeyLocator::absolute(&demo_path), DELETE)
            .expect("open");
        assert_eq!(registry.delete_key(key), Err(NtStatus::CANNOT_DELETE));
        registry.close_key(key).expect("close");
    }
}
