// crates/keel-kernel/src/lib.rs
//
// keel-kernel: the permission kernel for the Keel Protocol.
//
// Maintains the registry of installed modules (keyed by five-character
// keycodes) and active policies; grants and revokes per-function permission
// entries so that only authorized policies can call privileged module
// functions. The root of trust for every other component.

pub mod kernel;
pub mod permissions;
pub mod roles;

// Re-export key types for ergonomic access from downstream crates.

// Kernel and policy lifecycle
pub use kernel::{Kernel, PolicyManifest};

// Permissions and capabilities
pub use permissions::{Capability, Permission, PermissionTable, PolicyId};

// Roles
pub use roles::{RoleRegistry, ROLE_ADMIN, ROLE_EMERGENCY};
