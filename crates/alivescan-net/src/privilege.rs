//! Privilege checks for raw socket / capture access, and privilege dropping
//! once sockets and the capture handle are already open.

use alivescan_core::{Error, Result};

/// Check if the current process has raw socket capabilities.
///
/// # Platform-specific behavior
///
/// - **Linux**: root (UID 0). A full implementation would also accept
///   `CAP_NET_RAW` via `/proc/self/status` or libcap; this checks root only.
/// - **macOS**: root (UID 0), since BPF device access otherwise requires
///   ChmodBPF.
pub fn has_raw_socket_capability() -> Result<bool> {
    #[cfg(target_os = "linux")]
    {
        linux_has_capability()
    }

    #[cfg(target_os = "macos")]
    {
        macos_has_capability()
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        Err(Error::Privilege(
            "Unsupported platform for privilege checking".to_string(),
        ))
    }
}

/// Check if we have necessary privileges for raw packet access.
pub fn check_privileges() -> Result<()> {
    if !has_raw_socket_capability()? {
        #[cfg(target_os = "linux")]
        let msg = "Insufficient privileges for raw socket access. \
                   Run with sudo or grant CAP_NET_RAW capability with: \
                   sudo setcap cap_net_raw+eip /path/to/alivescan";

        #[cfg(target_os = "macos")]
        let msg = "Insufficient privileges for raw socket access. \
                   Run with sudo or install ChmodBPF.";

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        let msg = "Insufficient privileges for raw socket access.";

        return Err(Error::Privilege(msg.to_string()));
    }

    Ok(())
}

/// Drop elevated privileges to a specific user and group once raw sockets
/// and the capture handle are already open.
///
/// # Safety
///
/// This operation is **irreversible**. After dropping privileges, the process
/// cannot regain elevated privileges.
pub fn drop_privileges(user: &str, group: &str) -> Result<()> {
    unix_drop_privileges(user, group)
}

#[cfg(target_os = "linux")]
fn linux_has_capability() -> Result<bool> {
    use nix::unistd::Uid;

    if Uid::effective().is_root() {
        tracing::debug!("Running as root (UID 0)");
        return Ok(true);
    }

    tracing::debug!("Not running as root, and CAP_NET_RAW detection is not implemented");
    Ok(false)
}

fn unix_drop_privileges(user: &str, group: &str) -> Result<()> {
    use nix::unistd::{setgid, setuid, Group, Uid, User};

    tracing::info!("Attempting to drop privileges to {}:{}", user, group);

    // Get user info
    let user_info = User::from_name(user)
        .map_err(|e| Error::Privilege(format!("Failed to get user info: {}", e)))?
        .ok_or_else(|| Error::Privilege(format!("User not found: {}", user)))?;

    // Get group info
    let group_info = Group::from_name(group)
        .map_err(|e| Error::Privilege(format!("Failed to get group info: {}", e)))?
        .ok_or_else(|| Error::Privilege(format!("Group not found: {}", group)))?;

    // Drop group privileges first
    setgid(group_info.gid).map_err(|e| Error::Privilege(format!("Failed to setgid: {}", e)))?;

    // Drop user privileges
    setuid(user_info.uid).map_err(|e| Error::Privilege(format!("Failed to setuid: {}", e)))?;

    // Verify we cannot regain root privileges
    if setuid(Uid::from_raw(0)).is_ok() {
        return Err(Error::Privilege(
            "Failed to drop privileges securely: can still setuid(0)".to_string(),
        ));
    }

    tracing::info!("Successfully dropped privileges to {}:{}", user, group);
    Ok(())
}

#[cfg(target_os = "macos")]
fn macos_has_capability() -> Result<bool> {
    use nix::unistd::Uid;

    // macOS requires root for BPF access (unless ChmodBPF is installed)
    if Uid::effective().is_root() {
        tracing::debug!("Running as root (UID 0)");
        return Ok(true);
    }

    tracing::debug!("Not running as root");
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_raw_socket_capability_does_not_error() {
        assert!(has_raw_socket_capability().is_ok());
    }

    #[test]
    fn check_privileges_is_consistent_with_capability_check() {
        let has_cap = has_raw_socket_capability().unwrap();
        assert_eq!(check_privileges().is_ok(), has_cap);
    }

    #[test]
    fn drop_privileges_to_unknown_user_fails() {
        if has_raw_socket_capability().unwrap_or(false) {
            let result = drop_privileges("nonexistent_user_12345", "nonexistent_group_12345");
            assert!(result.is_err());
            if let Err(Error::Privilege(msg)) = result {
                assert!(msg.contains("not found") || msg.contains("Failed to get"));
            }
        }
    }
}
