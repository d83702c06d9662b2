//! Credential value type

use std::fmt;

/// Opaque credentials presented to the remote site
///
/// Currently a cookie header; the feed machinery never looks inside it.
/// The `Debug` impl deliberately redacts the value so credentials cannot
/// leak through logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    cookies: String,
}

impl Credentials {
    /// Create credentials from a cookie header
    pub fn new(cookies: impl Into<String>) -> Self {
        Self {
            cookies: cookies.into(),
        }
    }

    /// The cookie header to send with requests
    pub fn cookies(&self) -> &str {
        &self.cookies
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("cookies", &format!("[{} bytes]", self.cookies.len()))
            .finish()
    }
}
