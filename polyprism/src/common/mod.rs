//! Supporting utility macros.

/// Trace when `verbose` feature enabled.
macro_rules! verbose {
    ($($tt:tt)*) => {
        #[cfg(feature = "verbose")]
        tracing::trace!($($tt)*)
    };
}

/// Report a suppressed teardown failure when `log` feature enabled.
macro_rules! suppressed {
    ($($tt:tt)*) => {
        #[cfg(feature = "log")]
        log::warn!($($tt)*)
    };
}

/// Match a response variant, or fail with unexpected response error.
macro_rules! expect_response {
    ($response:expr, $expect:literal, $pat:pat => $body:expr) => {
        match $response {
            $pat => $body,
            other => {
                return Err(crate::prism::ProtocolError::unexpected($expect, other.name()).into())
            }
        }
    };
}

pub(crate) use verbose;
pub(crate) use suppressed;
pub(crate) use expect_response;
