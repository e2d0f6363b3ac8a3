//! Direct access to the service configuration store.
//!
//! Everything in this module works against [`NativeRegistryApi`], a narrow
//! capability interface over the low-level registry routines. The production
//! binding ([`nt`], Windows only) resolves the routines out of the loaded
//! `ntdll` module at runtime; the test binding simulates the store in memory
//! so the installer's sequencing and handle discipline can be verified on any
//! host.

pub mod installer;
#[cfg(test)]
pub(crate) mod memory;
#[cfg(windows)]
pub mod nt;
pub mod wire;

use std::fmt;

use thiserror::Error;

/// Registry path of the services root consulted by the control manager.
pub const SERVICES_KEY_PATH: &str = r"\Registry\Machine\SYSTEM\CurrentControlSet\Services";

// Key access rights.
pub const KEY_QUERY_VALUE: u32 = 0x0001;
pub const KEY_SET_VALUE: u32 = 0x0002;
pub const KEY_CREATE_SUB_KEY: u32 = 0x0004;
pub const KEY_ENUMERATE_SUB_KEYS: u32 = 0x0008;
pub const KEY_ALL_ACCESS: u32 = 0xF003F;
/// Standard delete right, shared by kernel objects and SCM services.
pub const DELETE: u32 = 0x0001_0000;

/// Create option for keys that survive reboot.
pub const REG_OPTION_NON_VOLATILE: u32 = 0x0000_0000;

// Value kinds.
pub const REG_SZ: u32 = 1;
pub const REG_DWORD: u32 = 4;

/// Status code returned by the native registry routines.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct NtStatus(pub u32);

impl NtStatus {
    pub const SUCCESS: NtStatus = NtStatus(0x0000_0000);
    pub const BUFFER_OVERFLOW: NtStatus = NtStatus(0x8000_0005);
    pub const INVALID_HANDLE: NtStatus = NtStatus(0xC000_0008);
    pub const INVALID_PARAMETER: NtStatus = NtStatus(0xC000_000D);
    pub const ACCESS_DENIED: NtStatus = NtStatus(0xC000_0022);
    pub const BUFFER_TOO_SMALL: NtStatus = NtStatus(0xC000_0023);
    pub const OBJECT_NAME_NOT_FOUND: NtStatus = NtStatus(0xC000_0034);
    pub const PROCEDURE_NOT_FOUND: NtStatus = NtStatus(0xC000_007A);
    pub const NOT_SUPPORTED: NtStatus = NtStatus(0xC000_00BB);
    pub const CANNOT_DELETE: NtStatus = NtStatus(0xC000_0121);
    pub const KEY_DELETED: NtStatus = NtStatus(0xC000_017C);

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    pub fn check(self) -> Result<(), NtStatus> {
        if self.is_success() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for NtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl fmt::Debug for NtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NtStatus(0x{:08X})", self.0)
    }
}

/// Opaque handle to an open key. Whoever opened it owns the single release.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct KeyHandle(isize);

impl KeyHandle {
    pub const fn from_raw(raw: isize) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> isize {
        self.0
    }
}

/// Create-or-open outcome reported by the create call.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Disposition {
    CreatedNew,
    OpenedExisting,
}

impl Disposition {
    pub fn from_raw(raw: u32) -> Option<Disposition> {
        match raw {
            1 => Some(Disposition::CreatedNew),
            2 => Some(Disposition::OpenedExisting),
            _ => None,
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::CreatedNew => f.write_str("created new"),
            Disposition::OpenedExisting => f.write_str("opened existing"),
        }
    }
}

/// A typed value as it is written to or read from a key.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum RegValue {
    Dword(u32),
    Sz(String),
}

impl RegValue {
    pub fn kind(&self) -> u32 {
        match self {
            RegValue::Dword(_) => REG_DWORD,
            RegValue::Sz(_) => REG_SZ,
        }
    }
}

/// Addresses a key by absolute path or by name relative to an open parent.
///
/// Whether the parent handle is open or the path well-formed is not checked
/// here; the native call that consumes the locator validates it.
#[derive(Clone, Debug)]
pub struct KeyLocator<'a> {
    pub path: &'a str,
    pub parent: Option<KeyHandle>,
    pub case_insensitive: bool,
}

impl<'a> KeyLocator<'a> {
    pub fn absolute(path: &'a str) -> Self {
        Self { path, parent: None, case_insensitive: true }
    }

    pub fn relative(parent: KeyHandle, name: &'a str) -> Self {
        Self { path: name, parent: Some(parent), case_insensitive: true }
    }
}

/// The low-level registry operations the installer depends on.
///
/// Mirrors the native call surface one-to-one so the production binding stays
/// a thin shim and the fake can be an exact stand-in.
pub trait NativeRegistryApi {
    fn open_key(&self, locator: &KeyLocator<'_>, access: u32) -> Result<KeyHandle, NtStatus>;

    fn create_key(
        &self,
        locator: &KeyLocator<'_>,
        access: u32,
        options: u32,
    ) -> Result<(KeyHandle, Disposition), NtStatus>;

    fn set_value(&self, key: KeyHandle, name: &str, value: &RegValue) -> Result<(), NtStatus>;

    fn query_value(&self, key: KeyHandle, name: &str) -> Result<RegValue, NtStatus>;

    fn delete_key(&self, key: KeyHandle) -> Result<(), NtStatus>;

    fn delete_value(&self, key: KeyHandle, name: &str) -> Result<(), NtStatus>;

    fn close_key(&self, key: KeyHandle) -> Result<(), NtStatus>;
}

/// Scoped release for an open key: dropping the guard closes the handle, so
/// every exit path of an operation releases exactly once.
pub struct KeyGuard<'a, A: NativeRegistryApi + ?Sized> {
    api: &'a A,
    handle: KeyHandle,
}

impl<'a, A: NativeRegistryApi + ?Sized> KeyGuard<'a, A> {
    pub fn new(api: &'a A, handle: KeyHandle) -> Self {
        Self { api, handle }
    }

    pub fn handle(&self) -> KeyHandle {
        self.handle
    }
}

impl<A: NativeRegistryApi + ?Sized> Drop for KeyGuard<'_, A> {
    fn drop(&mut self) {
        let _ = self.api.close_key(self.handle);
    }
}

/// Why the native routine table could not be produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("native support module '{0}' is not loaded")]
    ModuleNotFound(&'static str),
    #[error("native routine '{0}' was not found")]
    MissingRoutine(&'static str),
    #[error("the native registry interface is not available on this platform")]
    UnsupportedPlatform,
}
