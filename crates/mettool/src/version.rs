//! Version information.

#[must_use]
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Name and version, as logged at startup.
#[must_use]
pub fn full_version() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), version())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_not_empty() {
        assert!(!version().is_empty());
        assert!(full_version().starts_with("mettool "));
    }
}
