//! Production binding of the native registry routines.
//!
//! Symbols are looked up in the already-loaded `ntdll` module on first use
//! and kept for the process lifetime. Nothing here goes through the Win32
//! registry API.

use std::ffi::c_void;
use std::ptr;

use once_cell::sync::OnceCell;
use windows::Win32::Foundation::HMODULE;
use windows::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress};
use windows::core::{PCSTR, s, w};

use super::wire::{ObjectAttributes, UnicodeString, WideString};
use super::{
    Disposition, KeyHandle, KeyLocator, NativeRegistryApi, NtStatus, REG_DWORD, REG_SZ, RegValue,
    ResolutionError,
};

const SUPPORT_MODULE: &str = "ntdll.dll";

type NtCreateKeyFn = unsafe extern "system" fn(
    *mut isize,
    u32,
    *const ObjectAttributes,
    u32,
    *const c_void,
    u32,
    *mut u32,
) -> u32;
type NtOpenKeyFn = unsafe extern "system" fn(*mut isize, u32, *const ObjectAttributes) -> u32;
type NtSetValueKeyFn =
    unsafe extern "system" fn(isize, *const UnicodeString, u32, u32, *const c_void, u32) -> u32;
type NtQueryValueKeyFn =
    unsafe extern "system" fn(isize, *const UnicodeString, u32, *mut c_void, u32, *mut u32) -> u32;
type NtDeleteKeyFn = unsafe extern "system" fn(isize) -> u32;
type NtDeleteValueKeyFn = unsafe extern "system" fn(isize, *const UnicodeString) -> u32;
type NtCloseFn = unsafe extern "system" fn(isize) -> u32;

/// `KeyValuePartialInformation` information class and its fixed header
/// (TitleIndex, Type, DataLength) ahead of the data bytes.
const KEY_VALUE_PARTIAL_INFORMATION: u32 = 2;
const PARTIAL_INFORMATION_HEADER: usize = 12;

struct RoutineTable {
    nt_create_key: NtCreateKeyFn,
    nt_open_key: NtOpenKeyFn,
    nt_set_value_key: NtSetValueKeyFn,
    nt_query_value_key: Option<NtQueryValueKeyFn>,
    nt_delete_key: Option<NtDeleteKeyFn>,
    nt_delete_value_key: Option<NtDeleteValueKeyFn>,
    nt_close: NtCloseFn,
}

static ROUTINES: OnceCell<RoutineTable> = OnceCell::new();

fn optional<T>(module: HMODULE, symbol: PCSTR) -> Option<T> {
    let address = unsafe { GetProcAddress(module, symbol) }?;
    // A resolved proc and any of the routine signatures are both plain
    // function pointers; the name alone decides which one this is.
    Some(unsafe { std::mem::transmute_copy(&address) })
}

fn required<T>(module: HMODULE, symbol: PCSTR, name: &'static str) -> Result<T, ResolutionError> {
    optional(module, symbol).ok_or(ResolutionError::MissingRoutine(name))
}

fn probe(module: HMODULE, symbol: PCSTR, name: &'static str) -> Result<(), ResolutionError> {
    if unsafe { GetProcAddress(module, symbol) }.is_none() {
        return Err(ResolutionError::MissingRoutine(name));
    }
    Ok(())
}

fn bind() -> Result<RoutineTable, ResolutionError> {
    let module = unsafe { GetModuleHandleW(w!("ntdll.dll")) }
        .map_err(|_| ResolutionError::ModuleNotFound(SUPPORT_MODULE))?;

    // The descriptor initializer must be present for the environment to
    // count as usable, even though descriptors are built in-process.
    probe(module, s!("RtlInitUnicodeString"), "RtlInitUnicodeString")?;

    Ok(RoutineTable {
        nt_create_key: required(module, s!("NtCreateKey"), "NtCreateKey")?,
        nt_open_key: required(module, s!("NtOpenKey"), "NtOpenKey")?,
        nt_set_value_key: required(module, s!("NtSetValueKey"), "NtSetValueKey")?,
        nt_query_value_key: optional(module, s!("NtQueryValueKey")),
        nt_delete_key: optional(module, s!("NtDeleteKey")),
        nt_delete_value_key: optional(module, s!("NtDeleteValueKey")),
        nt_close: required(module, s!("NtClose"), "NtClose")?,
    })
}

/// The resolved native registry interface.
///
/// Resolution happens at most once per process; every later call observes
/// the same table.
#[derive(Clone, Copy)]
pub struct NtRegistry {
    routines: &'static RoutineTable,
}

impl NtRegistry {
    pub fn resolve() -> Result<Self, ResolutionError> {
        let routines = ROUTINES.get_or_try_init(bind)?;
        Ok(Self { routines })
    }
}

fn encode_value(value: &RegValue) -> (u32, Vec<u8>) {
    match value {
        RegValue::Dword(value) => (REG_DWORD, value.to_le_bytes().to_vec()),
        RegValue::Sz(text) => {
            // REG_SZ data carries its own terminator and the size counts it.
            let mut data = Vec::with_capacity((text.len() + 1) * 2);
            for unit in text.encode_utf16().chain(Some(0)) {
                data.extend_from_slice(&unit.to_le_bytes());
            }
            (REG_SZ, data)
        }
    }
}

fn read_u32(buffer: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buffer[at], buffer[at + 1], buffer[at + 2], buffer[at + 3]])
}

fn decode_partial(buffer: &[u8]) -> Result<RegValue, NtStatus> {
    if buffer.len() < PARTIAL_INFORMATION_HEADER {
        return Err(NtStatus::INVALID_PARAMETER);
    }
    let kind = read_u32(buffer, 4);
    let data_length = read_u32(buffer, 8) as usize;
    let data = buffer
        .get(PARTIAL_INFORMATION_HEADER..PARTIAL_INFORMATION_HEADER + data_length)
        .ok_or(NtStatus::INVALID_PARAMETER)?;
    match kind {
        REG_DWORD if data.len() == 4 => Ok(RegValue::Dword(read_u32(data, 0))),
        REG_SZ => {
            let mut units: Vec<u16> = data
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            while units.last() == Some(&0) {
                units.pop();
            }
            Ok(RegValue::Sz(String::from_utf16_lossy(&units)))
        }
        _ => Err(NtStatus::NOT_SUPPORTED),
    }
}

impl NativeRegistryApi for NtRegistry {
    fn open_key(&self, locator: &KeyLocator<'_>, access: u32) -> Result<KeyHandle, NtStatus> {
        let path = WideString::new(locator.path);
        let name = UnicodeString::counted(Some(&path));
        let attributes = ObjectAttributes::locate(&name, locator.case_insensitive, locator.parent);

        let mut handle: isize = 0;
        let status = unsafe { (self.routines.nt_open_key)(&mut handle, access, &attributes) };
        NtStatus(status).check()?;
        Ok(KeyHandle::from_raw(handle))
    }

    fn create_key(
        &self,
        locator: &KeyLocator<'_>,
        access: u32,
        options: u32,
    ) -> Result<(KeyHandle, Disposition), NtStatus> {
        let path = WideString::new(locator.path);
        let name = UnicodeString::counted(Some(&path));
        let attributes = ObjectAttributes::locate(&name, locator.case_insensitive, locator.parent);

        let mut handle: isize = 0;
        let mut disposition = 0u32;
        let status = unsafe {
            (self.routines.nt_create_key)(
                &mut handle,
                access,
                &attributes,
                0,
                ptr::null(),
                options,
                &mut disposition,
            )
        };
        NtStatus(status).check()?;
        // A disposition outside the documented pair is treated as an
        // existing key; value writes proceed either way.
        let disposition =
            Disposition::from_raw(disposition).unwrap_or(Disposition::OpenedExisting);
        Ok((KeyHandle::from_raw(handle), disposition))
    }

    fn set_value(&self, key: KeyHandle, name: &str, value: &RegValue) -> Result<(), NtStatus> {
        let name_storage = WideString::new(name);
        let value_name = UnicodeString::counted(Some(&name_storage));
        let (kind, data) = encode_value(value);

        let status = unsafe {
            (self.routines.nt_set_value_key)(
                key.raw(),
                &value_name,
                0,
                kind,
                data.as_ptr() as *const c_void,
                data.len() as u32,
            )
        };
        NtStatus(status).check()
    }

    fn query_value(&self, key: KeyHandle, name: &str) -> Result<RegValue, NtStatus> {
        let Some(query) = self.routines.nt_query_value_key else {
            return Err(NtStatus::PROCEDURE_NOT_FOUND);
        };
        let name_storage = WideString::new(name);
        let value_name = UnicodeString::counted(Some(&name_storage));

        let mut needed = 0u32;
        let status = NtStatus(unsafe {
            query(
                key.raw(),
                &value_name,
                KEY_VALUE_PARTIAL_INFORMATION,
                ptr::null_mut(),
                0,
                &mut needed,
            )
        });
        if status != NtStatus::BUFFER_TOO_SMALL && status != NtStatus::BUFFER_OVERFLOW {
            status.check()?;
        }
        let mut buffer = vec![0u8; needed as usize];
        let status = NtStatus(unsafe {
            query(
                key.raw(),
                &value_name,
                KEY_VALUE_PARTIAL_INFORMATION,
                buffer.as_mut_ptr() as *mut c_void,
                needed,
                &mut needed,
            )
        });
        status.check()?;
        decode_partial(&buffer)
    }

    fn delete_key(&self, key: KeyHandle) -> Result<(), NtStatus> {
        let Some(delete) = self.routines.nt_delete_key else {
            return Err(NtStatus::PROCEDURE_NOT_FOUND);
        };
        NtStatus(unsafe { delete(key.raw()) }).check()
    }

    fn delete_value(&self, key: KeyHandle, name: &str) -> Result<(), NtStatus> {
        let Some(delete) = self.routines.nt_delete_value_key else {
            return Err(NtStatus::PROCEDURE_NOT_FOUND);
        };
        let name_storage = WideString::new(name);
        let value_name = UnicodeString::counted(Some(&name_storage));
        NtStatus(unsafe { delete(key.raw(), &value_name) }).check()
    }

    fn close_key(&self, key: KeyHandle) -> Result<(), NtStatus> {
        NtStatus(unsafe { (self.routines.nt_close)(key.raw()) }).check()
    }
}
