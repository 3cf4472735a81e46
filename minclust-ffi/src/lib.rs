//! FFI bindings for the Minclust clustering engine
//!
//! This module provides a C-compatible interface to the size-constrained
//! clustering engine. All functions are panic-safe and use thread-local
//! error reporting.
//!
//! # Safety Guarantees
//!
//! - No panic may cross the FFI boundary (enforced by `ffi_guard`)
//! - Null pointer checks on all pointer arguments
//! - ABI stability via `#[repr(C)]` and `extern "C"`
//!
//! # Error Handling
//!
//! Errors are reported through:
//! - Return values: `NULL` for create, `-1` for the clustering calls
//! - Thread-local error message: `minclust_last_error_message()` copies the
//!   formatted `kind (file:line): message` record into a caller buffer
//!
//! # Thread Safety
//!
//! - A data set handle may be shared between threads for concurrent
//!   clustering calls only if the caller serializes them
//! - Each thread has its own error message storage

use libc::{c_char, c_double, c_int, size_t};
use minclust_core::{
    BruteForceOracle, SeedMethod, UnassignedMode, nng_clustering, nng_clustering_batches,
};
use std::cell::RefCell;
use std::ffi::CString;
use std::ptr;
use std::slice;

/// Internal state holder (not exposed to C)
struct MinclustDataSetState {
    points: Vec<f64>,
    dims: usize,
}

/// Opaque handle to a Minclust data set (C-compatible)
///
/// C code only sees pointers to this type, never the actual struct. The
/// real data is stored in `MinclustDataSetState`.
#[repr(C)]
pub struct MinclustDataSet {
    _private: [u8; 0],
}

thread_local! {
    /// Thread-local storage for error messages
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Record `err` as the current thread's last error.
///
/// The stored string has to be a valid C string, so interior NUL bytes are
/// stripped before conversion; reporting a failure must never itself fail.
fn set_last_error(err: impl std::fmt::Display) {
    let mut message = err.to_string();
    message.retain(|c| c != '\0');
    LAST_ERROR.with(|cell| {
        *cell.borrow_mut() = CString::new(message).ok();
    });
}

/// Drop the current thread's error record.
fn clear_last_error() {
    LAST_ERROR.with(|cell| {
        let _ = cell.borrow_mut().take();
    });
}

/// Run `f` behind a panic barrier.
///
/// C callers cannot unwind, so a panic has to stop here: it becomes a
/// thread-local error record and the caller gets `None`, which each export
/// maps to its own sentinel return value. The `AssertUnwindSafe` wrapper is
/// sound for this use: a panicking call is abandoned wholesale, so no
/// half-updated state is ever observable afterwards - the only thing that
/// survives the unwind is the error record itself.
fn ffi_guard<F, R>(f: F) -> Option<R>
where
    F: FnOnce() -> R,
{
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(f))
        .map_err(|payload| {
            // Panic payloads are almost always &str or String; anything
            // else is reported without a cause.
            let reason = payload
                .downcast_ref::<&str>()
                .copied()
                .map(String::from)
                .or_else(|| payload.downcast_ref::<String>().cloned());
            match reason {
                Some(reason) => set_last_error(format_args!("panic: {reason}")),
                None => set_last_error("panic with non-string payload"),
            }
        })
        .ok()
}

fn seed_method_from(code: c_int) -> Option<SeedMethod> {
    match code {
        0 => Some(SeedMethod::Lexical),
        1 => Some(SeedMethod::InwardsOrder),
        2 => Some(SeedMethod::InwardsUpdating),
        3 => Some(SeedMethod::InwardsAltUpdating),
        4 => Some(SeedMethod::ExclusionOrder),
        5 => Some(SeedMethod::ExclusionUpdating),
        _ => None,
    }
}

fn unassigned_mode_from(code: c_int) -> Option<UnassignedMode> {
    match code {
        0 => Some(UnassignedMode::Ignore),
        1 => Some(UnassignedMode::AnyNeighbor),
        _ => None,
    }
}

//
// === LIFECYCLE MANAGEMENT ===
//

/// Create a data set handle over a row-major point array
///
/// # Arguments
///
/// - `points`: `num_points * dims` doubles, row-major (must not be NULL)
/// - `num_points`: number of data points (must be > 0)
/// - `dims`: coordinates per point (must be > 0)
///
/// The array is copied; the caller keeps ownership of `points`.
///
/// # Returns
///
/// - Non-NULL handle on success
/// - NULL on failure (check `minclust_last_error_message()`)
///
/// # Safety
///
/// - `points` must point to `num_points * dims` valid doubles
/// - Caller must free the returned pointer with `minclust_dataset_free()`
#[unsafe(no_mangle)]
pub unsafe extern "C" fn minclust_dataset_create(
    points: *const c_double,
    num_points: size_t,
    dims: size_t,
) -> *mut MinclustDataSet {
    ffi_guard(|| {
        if points.is_null() {
            set_last_error("Points cannot be NULL");
            return ptr::null_mut();
        }
        if num_points == 0 || dims == 0 {
            set_last_error("num_points and dims must be > 0");
            return ptr::null_mut();
        }
        let Some(len) = num_points.checked_mul(dims) else {
            set_last_error("num_points * dims overflows");
            return ptr::null_mut();
        };

        // SAFETY: Caller guarantees points holds num_points * dims doubles
        let data = unsafe { slice::from_raw_parts(points, len) };

        clear_last_error();
        let state = Box::new(MinclustDataSetState { points: data.to_vec(), dims });
        Box::into_raw(state) as *mut MinclustDataSet
    })
    .unwrap_or(ptr::null_mut())
}

/// Free a data set handle
///
/// # Safety
///
/// - `ptr` must be NULL or a valid pointer from `minclust_dataset_create()`
/// - After this call, `ptr` is invalid and must not be used
/// - Safe to call with NULL (no-op)
#[unsafe(no_mangle)]
pub unsafe extern "C" fn minclust_dataset_free(ptr: *mut MinclustDataSet) {
    if !ptr.is_null() {
        ffi_guard(|| {
            // SAFETY: Caller guarantees ptr came from minclust_dataset_create
            let _ = unsafe { Box::from_raw(ptr as *mut MinclustDataSetState) };
        });
    }
}

/// Number of points in the data set, or 0 when `ptr` is NULL
///
/// # Safety
///
/// - `ptr` must be NULL or a valid data set handle
#[unsafe(no_mangle)]
pub unsafe extern "C" fn minclust_dataset_len(ptr: *const MinclustDataSet) -> size_t {
    ffi_guard(|| {
        // SAFETY: Caller guarantees ptr validity (shared access)
        let state = unsafe { (ptr as *const MinclustDataSetState).as_ref() };
        match state {
            Some(s) => s.points.len() / s.dims,
            None => 0,
        }
    })
    .unwrap_or(0)
}

//
// === CLUSTERING ===
//

#[allow(clippy::too_many_arguments)]
fn run_clustering(
    state: &MinclustDataSetState,
    size_constraint: u32,
    seed_method: Option<c_int>,
    unassigned: c_int,
    radius: c_double,
    batch_size: Option<size_t>,
    out_labels: *mut u32,
    labels_len: size_t,
    out_num_clusters: *mut u32,
) -> c_int {
    if out_labels.is_null() || out_num_clusters.is_null() {
        set_last_error("Null output pointers");
        return -1;
    }
    let num_points = state.points.len() / state.dims;
    if labels_len < num_points {
        set_last_error("Label buffer shorter than the data set");
        return -1;
    }
    let Some(unassigned) = unassigned_mode_from(unassigned) else {
        set_last_error("Unknown unassigned method");
        return -1;
    };
    let radius = (radius > 0.0).then_some(radius);

    let mut oracle = match BruteForceOracle::new(&state.points, state.dims) {
        Ok(oracle) => oracle,
        Err(e) => {
            set_last_error(e);
            return -1;
        }
    };

    let result = match (seed_method, batch_size) {
        (Some(code), None) => {
            let Some(method) = seed_method_from(code) else {
                set_last_error("Unknown seed method");
                return -1;
            };
            nng_clustering(&mut oracle, size_constraint, method, unassigned, radius, None)
        }
        (None, Some(batch)) => {
            nng_clustering_batches(&mut oracle, size_constraint, unassigned, radius, None, batch)
        }
        _ => unreachable!("exactly one entry point selected"),
    };

    match result {
        Ok(clustering) => {
            // SAFETY: labels_len >= num_points was checked above
            for (i, &label) in clustering.labels().iter().enumerate() {
                unsafe {
                    *out_labels.add(i) = label;
                }
            }
            unsafe {
                *out_num_clusters = clustering.num_clusters();
            }
            clear_last_error();
            0
        }
        Err(e) => {
            set_last_error(e);
            -1
        }
    }
}

/// Cluster the data set through the materialized nearest-neighbor digraph
///
/// # Arguments
///
/// - `ptr`: Non-NULL data set handle
/// - `size_constraint`: minimum cluster size, >= 2
/// - `seed_method`: 0 lexical, 1 inwards order, 2 inwards updating,
///   3 inwards alt updating, 4 exclusion order, 5 exclusion updating
/// - `unassigned`: 0 ignore, 1 any neighbor
/// - `radius`: maximum seed-to-member distance; <= 0 means unconstrained
/// - `out_labels`: buffer for per-point labels (>= point count entries);
///   unassigned points get `UINT32_MAX`
/// - `labels_len`: capacity of `out_labels` in entries
/// - `out_num_clusters`: receives the produced cluster count
///
/// # Returns
///
/// - 0 on success
/// - -1 on failure (check `minclust_last_error_message()`)
///
/// # Safety
///
/// - `ptr` must be a valid data set handle
/// - `out_labels` must have space for `labels_len` u32 values
/// - `out_num_clusters` must be a valid u32 pointer
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn minclust_nng_clustering(
    ptr: *const MinclustDataSet,
    size_constraint: u32,
    seed_method: c_int,
    unassigned: c_int,
    radius: c_double,
    out_labels: *mut u32,
    labels_len: size_t,
    out_num_clusters: *mut u32,
) -> c_int {
    ffi_guard(|| {
        // SAFETY: Caller guarantees ptr validity (shared access)
        let state = unsafe { (ptr as *const MinclustDataSetState).as_ref() };
        let Some(state) = state else {
            set_last_error("Null data set pointer");
            return -1;
        };
        run_clustering(
            state,
            size_constraint,
            Some(seed_method),
            unassigned,
            radius,
            None,
            out_labels,
            labels_len,
            out_num_clusters,
        )
    })
    .unwrap_or(-1)
}

/// Cluster the data set in batches, without materializing the digraph
///
/// As `minclust_nng_clustering`, but streams the search oracle batch by
/// batch; `batch_size` of 0 means "as large as possible". No seed method is
/// taken: the batch walk itself fixes the candidate order.
///
/// # Safety
///
/// Same requirements as `minclust_nng_clustering`.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn minclust_nng_clustering_batches(
    ptr: *const MinclustDataSet,
    size_constraint: u32,
    unassigned: c_int,
    radius: c_double,
    batch_size: size_t,
    out_labels: *mut u32,
    labels_len: size_t,
    out_num_clusters: *mut u32,
) -> c_int {
    ffi_guard(|| {
        // SAFETY: Caller guarantees ptr validity (shared access)
        let state = unsafe { (ptr as *const MinclustDataSetState).as_ref() };
        let Some(state) = state else {
            set_last_error("Null data set pointer");
            return -1;
        };
        run_clustering(
            state,
            size_constraint,
            None,
            unassigned,
            radius,
            Some(batch_size),
            out_labels,
            labels_len,
            out_num_clusters,
        )
    })
    .unwrap_or(-1)
}

//
// === ERROR HANDLING ===
//

/// Copy the current thread's last error message into a caller buffer
///
/// The message is NUL-terminated. When no error is recorded the buffer
/// receives an empty string.
///
/// # Returns
///
/// - 1 when the whole message (with terminator) fit in the buffer
/// - 0 when the message was truncated, or the buffer is NULL or empty
///
/// # Safety
///
/// - `buffer` must have space for `buffer_len` bytes
#[unsafe(no_mangle)]
pub unsafe extern "C" fn minclust_last_error_message(
    buffer: *mut c_char,
    buffer_len: size_t,
) -> c_int {
    if buffer.is_null() || buffer_len == 0 {
        return 0;
    }

    LAST_ERROR.with(|cell| {
        let borrowed = cell.borrow();
        let message = borrowed.as_ref().map_or(&[] as &[u8], |s| s.as_bytes());

        let copy_len = message.len().min(buffer_len - 1);
        // SAFETY: Caller guarantees buffer holds buffer_len bytes and
        // copy_len + 1 <= buffer_len.
        unsafe {
            ptr::copy_nonoverlapping(message.as_ptr(), buffer as *mut u8, copy_len);
            *buffer.add(copy_len) = 0;
        }

        if copy_len == message.len() { 1 } else { 0 }
    })
}

//
// === VERSIONING ===
//

/// Get the Minclust library version
///
/// # Returns
///
/// Pointer to a NUL-terminated version string, valid for the lifetime of
/// the program. **Do NOT** free the returned pointer.
#[unsafe(no_mangle)]
pub extern "C" fn minclust_version() -> *const c_char {
    // concat! appends the null terminator required by C.
    static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");

    VERSION.as_ptr() as *const c_char
}

//
// === TESTS ===
//
