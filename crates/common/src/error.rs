use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Message(String),

    #[error("unit '{unit}' is already registered")]
    DuplicateUnit { unit: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    #[must_use]
    pub fn duplicate_unit(unit: impl Into<String>) -> Self {
        Self::DuplicateUnit { unit: unit.into() }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

// ── Context helpers ─────────────────────────────────────────────────────────

/// Error types that can be built from a bare message.
///
/// Crates implement this for their own `Error` and then call
/// [`impl_context!`](crate::impl_context) inside their error module.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

/// Expands to a crate-local `Context` trait adding `.context()` and
/// `.with_context()` to `Result` and `Option`.
///
/// The invoking module must define `Error: FromMessage` and a
/// `Result<T>` alias.
///
/// ```ignore
/// // crates/plugins/src/error.rs
/// svcplug_common::impl_context!();
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T> {
            fn context(self, context: impl Into<String>) -> Result<T>;

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C;
        }

        impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                self.with_context(|| context)
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.map_err(|source| {
                    let prefix: String = f().into();
                    <Error as $crate::FromMessage>::from_message(format!("{prefix}: {source}"))
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                self.with_context(|| context)
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(f().into()))
            }
        }
    };
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    crate::impl_context!();

    #[test]
    fn context_prefixes_source_error() {
        let parsed: std::result::Result<u8, _> = "nope".parse::<u8>();
        let err = parsed.context("reading port").unwrap_err();
        assert!(err.to_string().starts_with("reading port: "));
    }

    #[test]
    fn option_context_uses_message() {
        let missing: Option<u8> = None;
        let err = missing.with_context(|| format!("unit {} missing", "echo")).unwrap_err();
        assert_eq!(err.to_string(), "unit echo missing");
    }
}
