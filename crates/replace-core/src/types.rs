//! Strong domain types for sandboxed replacement.
//!
//! The three request fields all arrive from untrusted callers and all end up
//! as strings on the wire. Newtypes keep them from being swapped by accident
//! on the way there.
//!
//! # Examples
//!
//! ```
//! use regexp_replace_core::ReplaceRequest;
//!
//! let request = ReplaceRequest::new("a+", "aaa bbb aaa", "X");
//! assert_eq!(request.pattern.as_str(), "a+");
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! untrusted_string {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps an untrusted string.
            #[inline]
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the value as a string slice.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the wrapper and returns the inner `String`.
            #[inline]
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

untrusted_string!(
    /// Regular expression supplied by the caller. Compiled only inside the sandbox.
    UntrustedPattern
);

untrusted_string!(
    /// Text the pattern is applied to.
    UntrustedText
);

untrusted_string!(
    /// Replacement template substituted for every match.
    UntrustedReplacement
);

/// One replacement request, as it crosses into the sandbox.
///
/// Field names are part of the guest protocol and must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceRequest {
    /// Pattern to search for
    pub pattern: UntrustedPattern,
    /// Text to search in
    pub text: UntrustedText,
    /// Replacement for each match
    pub replacement: UntrustedReplacement,
}

impl ReplaceRequest {
    /// Creates a request from its three parts.
    ///
    /// # Examples
    ///
    /// ```
    /// use regexp_replace_core::ReplaceRequest;
    ///
    /// let request = ReplaceRequest::new("(", "text", "");
    /// assert_eq!(request.text.as_str(), "text");
    /// ```
    #[must_use]
    pub fn new(
        pattern: impl Into<UntrustedPattern>,
        text: impl Into<UntrustedText>,
        replacement: impl Into<UntrustedReplacement>,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            text: text.into(),
            replacement: replacement.into(),
        }
    }
}

/// Identifier of one sandbox instance.
///
/// Backed by a UUID version 7, so identifiers are unique across concurrent
/// calls and sort by creation time in logs.
///
/// # Examples
///
/// ```
/// use regexp_replace_core::InstanceId;
///
/// let first = InstanceId::generate();
/// let second = InstanceId::generate();
/// assert_ne!(first, second);
/// assert!(first.to_string().starts_with("instance-"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Generates a fresh time-ordered identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wraps an existing UUID.
    #[inline]
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance-{}", self.0)
    }
}

/// Linear memory limit expressed in 64 KiB WebAssembly pages.
///
/// # Examples
///
/// ```
/// use regexp_replace_core::MemoryPages;
///
/// let limit = MemoryPages::from_mib(64).unwrap();
/// assert_eq!(limit.get(), 1024);
/// assert_eq!(limit.bytes(), 64 * 1024 * 1024);
///
/// assert!(MemoryPages::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct MemoryPages(u32);

impl MemoryPages {
    /// Size of one WebAssembly page in bytes.
    pub const PAGE_SIZE: u64 = 64 * 1024;

    /// Number of pages in one MiB.
    pub const PAGES_PER_MIB: u32 = 16;

    /// Largest page count a 32-bit linear memory can address (4 GiB).
    pub const MAX: u32 = 65_536;

    /// Default limit: 64 MiB.
    pub const DEFAULT: Self = Self(1024);

    /// Creates a page limit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InitializationFault`] if `pages` is zero or exceeds
    /// [`Self::MAX`].
    pub fn new(pages: u32) -> Result<Self> {
        if pages == 0 {
            return Err(Error::InitializationFault {
                message: "memory limit must be at least one page".to_string(),
                source: None,
            });
        }
        if pages > Self::MAX {
            return Err(Error::InitializationFault {
                message: format!("memory limit of {pages} pages exceeds {}", Self::MAX),
                source: None,
            });
        }
        Ok(Self(pages))
    }

    /// Creates a page limit from a size in MiB.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InitializationFault`] if the result is zero pages or
    /// too large.
    pub fn from_mib(mib: u32) -> Result<Self> {
        let pages = mib
            .checked_mul(Self::PAGES_PER_MIB)
            .ok_or_else(|| Error::InitializationFault {
                message: format!("memory limit of {mib} MiB is too large"),
                source: None,
            })?;
        Self::new(pages)
    }

    /// Returns the number of pages.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns the limit in bytes.
    #[inline]
    #[must_use]
    pub fn bytes(self) -> u64 {
        u64::from(self.0) * Self::PAGE_SIZE
    }
}

impl Default for MemoryPages {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for MemoryPages {
    type Error = Error;

    fn try_from(pages: u32) -> Result<Self> {
        Self::new(pages)
    }
}

impl From<MemoryPages> for u32 {
    fn from(pages: MemoryPages) -> Self {
        pages.0
    }
}

impl fmt::Display for MemoryPages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} pages", self.0)
    }
}
