//! Counted-string and object-locator records handed to the native routines.
//!
//! The layouts mirror the kernel's own. Lengths are measured in bytes of
//! UTF-16 storage, not in characters, and the descriptor only borrows its
//! buffer: it never owns it and never writes a terminator. Callers must keep
//! the backing storage alive for as long as the descriptor is in use.

use std::ffi::c_void;
use std::ptr;

use super::KeyHandle;

/// Name lookups ignore case when this attribute is set.
pub const OBJ_CASE_INSENSITIVE: u32 = 0x0000_0040;

const CHAR_SIZE: usize = std::mem::size_of::<u16>();

/// Owned UTF-16 storage backing a counted descriptor.
///
/// A trailing NUL is kept so the capacity the descriptor advertises is real.
pub struct WideString {
    units: Vec<u16>,
}

impl WideString {
    pub fn new(text: &str) -> Self {
        let mut units: Vec<u16> = text.encode_utf16().collect();
        units.push(0);
        Self { units }
    }

    /// Number of UTF-16 units excluding the trailing NUL.
    pub fn char_len(&self) -> usize {
        self.units.len() - 1
    }

    pub fn as_ptr(&self) -> *const u16 {
        self.units.as_ptr()
    }
}

/// Counted-length string descriptor (`UNICODE_STRING` layout).
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct UnicodeString {
    /// Bytes of character data, terminator not counted.
    pub length: u16,
    /// Bytes of backing storage, terminator slot counted.
    pub maximum_length: u16,
    pub buffer: *const u16,
}

impl UnicodeString {
    /// Builds the descriptor for `text`, or the empty descriptor when no text
    /// is given. Total for well-formed input; nothing is validated or copied.
    pub fn counted(text: Option<&WideString>) -> Self {
        match text {
            Some(text) => {
                let chars = text.char_len();
                Self {
                    length: (chars * CHAR_SIZE) as u16,
                    maximum_length: ((chars + 1) * CHAR_SIZE) as u16,
                    buffer: text.as_ptr(),
                }
            }
            None => Self { length: 0, maximum_length: 0, buffer: ptr::null() },
        }
    }
}

/// Attribute record addressing a kernel object by name (`OBJECT_ATTRIBUTES`
/// layout), absolute or relative to an open parent handle.
#[repr(C)]
#[derive(Debug)]
pub struct ObjectAttributes {
    pub length: u32,
    pub root_directory: isize,
    pub object_name: *const UnicodeString,
    pub attributes: u32,
    pub security_descriptor: *const c_void,
    pub security_quality_of_service: *const c_void,
}

impl ObjectAttributes {
    /// Pure aggregation; the consuming native call validates the parts.
    /// `name` must stay alive for the record's entire use.
    pub fn locate(
        name: &UnicodeString,
        case_insensitive: bool,
        parent: Option<KeyHandle>,
    ) -> Self {
        Self {
            length: std::mem::size_of::<ObjectAttributes>() as u32,
            root_directory: parent.map_or(0, KeyHandle::raw),
            object_name: name,
            attributes: if case_insensitive { OBJ_CASE_INSENSITIVE } else { 0 },
            security_descriptor: ptr::null(),
            security_quality_of_service: ptr::null(),
        }
    }
}
