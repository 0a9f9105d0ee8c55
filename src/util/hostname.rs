use tracing::warn;

const FALLBACK_HOSTNAME: &str = "localhost";

/// Returns the kernel hostname, or `localhost` when it cannot be read.
pub fn hostname() -> String {
    match nix::unistd::gethostname() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            warn!(error = %e, fallback = FALLBACK_HOSTNAME, "failed to resolve hostname");
            FALLBACK_HOSTNAME.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostname_not_empty() {
        assert!(!hostname().is_empty());
    }
}
