//! Privilege checks

/// True when running with an effective UID of root
#[cfg(unix)]
pub fn is_elevated() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
pub fn is_elevated() -> bool {
    false
}
