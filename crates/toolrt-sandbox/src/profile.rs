//! Security profiles and the representative per-backend policy they imply.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityProfile {
    Dev,
    Standard,
    Hardened,
}

impl fmt::Display for SecurityProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SecurityProfile::Dev => "dev",
            SecurityProfile::Standard => "standard",
            SecurityProfile::Hardened => "hardened",
        };
        write!(f, "{s}")
    }
}

/// The representative policy a profile implies, consulted by drivers that
/// honor network/rootfs/seccomp knobs. Drivers that cannot express a given
/// dimension (e.g. the unsafe-host driver has no rootfs concept) ignore it.
#[derive(Debug, Clone, Default)]
pub struct ProfilePolicy {
    pub network_enabled: bool,
    pub readonly_rootfs: bool,
    pub seccomp_profile: Option<String>,
    pub host_functions_disabled: bool,
    pub clock_disabled: bool,
}

impl SecurityProfile {
    pub fn policy(self) -> ProfilePolicy {
        match self {
            SecurityProfile::Dev => ProfilePolicy {
                network_enabled: true,
                readonly_rootfs: false,
                seccomp_profile: None,
                host_functions_disabled: false,
                clock_disabled: false,
            },
            SecurityProfile::Standard => ProfilePolicy {
                network_enabled: false,
                readonly_rootfs: true,
                seccomp_profile: None,
                host_functions_disabled: false,
                clock_disabled: false,
            },
            SecurityProfile::Hardened => ProfilePolicy {
                network_enabled: false,
                readonly_rootfs: true,
                seccomp_profile: Some("default".to_string()),
                host_functions_disabled: true,
                clock_disabled: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardened_disables_network_and_host_functions() {
        let policy = SecurityProfile::Hardened.policy();
        assert!(!policy.network_enabled);
        assert!(policy.readonly_rootfs);
        assert!(policy.host_functions_disabled);
        assert!(policy.clock_disabled);
    }

    #[test]
    fn dev_allows_network_and_writable_rootfs() {
        let policy = SecurityProfile::Dev.policy();
        assert!(policy.network_enabled);
        assert!(!policy.readonly_rootfs);
    }
}
