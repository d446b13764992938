//! Internal helper macros.

/// Early-returns with an error when a condition is not met.
///
/// Similar to `assert!`, but returns an error instead of panicking, which
/// keeps protocol validation checks on the `Result` path.
///
/// # Example
///
/// ```ignore
/// ensure!(size <= MAX_HEADER_BYTES, ParseError::too_large_header(size, MAX_HEADER_BYTES));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
