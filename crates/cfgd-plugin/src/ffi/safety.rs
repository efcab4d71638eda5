//! FFI safety wrappers — converts Rust values for C callers.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};

/// Converts arguments into owned C strings.
///
/// Returns `None` if any argument contains a NUL byte.
pub fn to_c_strings(args: &[String]) -> Option<Vec<CString>> {
    args.iter().map(|arg| CString::new(arg.as_str()).ok()).collect()
}

/// Borrows a NUL-terminated UTF-8 string from a C caller.
///
/// Returns `None` for a null pointer or invalid UTF-8.
///
/// # Safety
///
/// A non-null `ptr` must point to a NUL-terminated string that outlives `'a`.
pub unsafe fn borrow_c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// Copies `value` into a caller buffer, `snprintf`-style.
///
/// At most `buf_len - 1` bytes are copied and the buffer is always
/// NUL-terminated when `buf_len > 0`. Returns the full length of `value`,
/// so a caller can detect truncation, or -1 if it does not fit a `c_int`.
///
/// # Safety
///
/// A non-null `buf` must be valid for writes of `buf_len` bytes.
pub unsafe fn copy_to_buffer(value: &str, buf: *mut c_char, buf_len: usize) -> c_int {
    let Ok(len) = c_int::try_from(value.len()) else {
        return -1;
    };
    if !buf.is_null() && buf_len > 0 {
        let n = value.len().min(buf_len - 1);
        unsafe {
            std::ptr::copy_nonoverlapping(value.as_ptr().cast::<c_char>(), buf, n);
            *buf.add(n) = 0;
        }
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_c_strings() {
        let args = vec!["-f".to_string(), "cfgd.toml".to_string()];
        let owned = to_c_strings(&args).expect("no NUL bytes");
        assert_eq!(owned[1].to_str(), Ok("cfgd.toml"));
    }

    #[test]
    fn test_copy_truncates_and_terminates() {
        let mut buf = [0x7f as c_char; 5];
        let len = unsafe { copy_to_buffer("running_db", buf.as_mut_ptr(), buf.len()) };
        assert_eq!(len, 10);
        let copied = unsafe { CStr::from_ptr(buf.as_ptr()) };
        assert_eq!(copied.to_str(), Ok("runn"));

        let len = unsafe { copy_to_buffer("db", std::ptr::null_mut(), 0) };
        assert_eq!(len, 2);
    }

    #[test]
    fn test_borrow_rejects_null() {
        assert!(unsafe { borrow_c_str(std::ptr::null()) }.is_none());
        let owned = CString::new("system*").expect("no NUL");
        assert_eq!(unsafe { borrow_c_str(owned.as_ptr()) }, Some("system*"));
    }

    #[test]
    fn test_interior_nul_rejected() {
        let args = vec!["bad\0arg".to_string()];
        assert!(to_c_strings(&args).is_none());
    }
}
