//! # RBAC: Role-Based Access Control
//!
//! Manages the three-role hierarchy used by the platform:
//!
//! ```text
//! SuperAdmin
//!     ├── Admin      (templates, price feed, tokens)
//!     └── Committee  (project audits)
//! ```
//!
//! ## Storage layout
//!
//! - `RbacKey::SuperAdmin` → `Address`: the one and only super-admin.
//! - `RbacKey::Role(addr)` → `Role`: the role held by `addr`, if any.
//!
//! ## Event emissions
//!
//! | Event topic prefix | Trigger |
//! |--------------------|---------|
//! | `role_set`         | Role granted or replaced |
//! | `role_del`         | Role revoked |
//!
//! An address holds at most one role at a time; granting a new role replaces
//! the old one. `Admin` cannot escalate to `SuperAdmin`.

use soroban_sdk::{contracttype, symbol_short, Address, Env, Symbol};

use crate::Error;

/// The set of roles that can be assigned to an address.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Role {
    /// Full platform control, including role management.
    SuperAdmin,
    /// Configures templates, the price feed and the active tokens.
    Admin,
    /// Audits newly created projects.
    Committee,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RbacKey {
    /// Maps an address → its current Role (if any).
    Role(Address),
    /// The one and only SuperAdmin address.
    SuperAdmin,
}

// ─────────────────────────────────────────────────────────
// Storage helpers (private)
// ─────────────────────────────────────────────────────────

fn store_role(env: &Env, address: &Address, role: &Role) {
    env.storage()
        .persistent()
        .set(&RbacKey::Role(address.clone()), role);
}

fn clear_role(env: &Env, address: &Address) {
    env.storage()
        .persistent()
        .remove(&RbacKey::Role(address.clone()));
}

/// Read the role for `address`, returning `None` if unassigned.
pub fn get_role(env: &Env, address: &Address) -> Option<Role> {
    env.storage()
        .persistent()
        .get(&RbacKey::Role(address.clone()))
}

/// Read the SuperAdmin address, returning `None` before init.
pub fn get_super_admin(env: &Env) -> Option<Address> {
    env.storage().persistent().get(&RbacKey::SuperAdmin)
}

// ─────────────────────────────────────────────────────────
// Initialisation
// ─────────────────────────────────────────────────────────

/// Set the initial SuperAdmin. Fails with `AlreadyInitialized` on a second call.
pub fn init_super_admin(env: &Env, super_admin: &Address) -> Result<(), Error> {
    if env.storage().persistent().has(&RbacKey::SuperAdmin) {
        return Err(Error::AlreadyInitialized);
    }
    env.storage()
        .persistent()
        .set(&RbacKey::SuperAdmin, super_admin);
    store_role(env, super_admin, &Role::SuperAdmin);
    emit(env, super_admin, &Role::SuperAdmin, None);
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Role assignment
// ─────────────────────────────────────────────────────────

/// Grant `role` to `target`.
///
/// - `caller` must hold `SuperAdmin` or `Admin`.
/// - Only `SuperAdmin` may grant `SuperAdmin`.
/// - The SuperAdmin cannot be demoted through this path.
pub fn grant_role(env: &Env, caller: &Address, target: &Address, role: Role) -> Result<(), Error> {
    match role {
        Role::SuperAdmin => require_role(env, caller, &Role::SuperAdmin)?,
        _ => require_admin_or_above(env, caller)?,
    }

    if let Some(Role::SuperAdmin) = get_role(env, target) {
        if role != Role::SuperAdmin {
            return Err(Error::NotAuthorized);
        }
    }

    store_role(env, target, &role);
    emit(env, target, &role, Some(caller.clone()));
    Ok(())
}

/// Revoke any role from `target`. Revoking from an address without a role is a no-op.
pub fn revoke_role(env: &Env, caller: &Address, target: &Address) -> Result<(), Error> {
    require_admin_or_above(env, caller)?;

    if get_super_admin(env).as_ref() == Some(target) {
        return Err(Error::NotAuthorized);
    }

    if get_role(env, target).is_some() {
        clear_role(env, target);
        emit_revoke(env, target, Some(caller.clone()));
    }
    Ok(())
}

/// Hand the SuperAdmin role to `new`; the current holder loses it immediately.
pub fn transfer_super_admin(env: &Env, current: &Address, new: &Address) -> Result<(), Error> {
    require_role(env, current, &Role::SuperAdmin)?;

    clear_role(env, current);
    emit_revoke(env, current, Some(current.clone()));

    env.storage().persistent().set(&RbacKey::SuperAdmin, new);
    store_role(env, new, &Role::SuperAdmin);
    emit(env, new, &Role::SuperAdmin, Some(current.clone()));
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Access guards
// ─────────────────────────────────────────────────────────

/// Assert that `address` holds exactly `required_role`.
pub fn require_role(env: &Env, address: &Address, required_role: &Role) -> Result<(), Error> {
    match get_role(env, address) {
        Some(ref r) if r == required_role => Ok(()),
        _ => Err(Error::NotAuthorized),
    }
}

/// Assert that `address` holds one of the roles in `allowed`.
pub fn require_any_of(env: &Env, address: &Address, allowed: &[Role]) -> Result<(), Error> {
    match get_role(env, address) {
        Some(ref r) if allowed.contains(r) => Ok(()),
        _ => Err(Error::NotAuthorized),
    }
}

/// Configuration-level operations.
#[inline]
pub fn require_admin_or_above(env: &Env, address: &Address) -> Result<(), Error> {
    require_any_of(env, address, &[Role::SuperAdmin, Role::Admin])
}

/// Project audits.
#[inline]
pub fn require_committee(env: &Env, address: &Address) -> Result<(), Error> {
    require_role(env, address, &Role::Committee)
}

// ─────────────────────────────────────────────────────────
// Queries
// ─────────────────────────────────────────────────────────

pub fn has_role(env: &Env, address: &Address, role: &Role) -> bool {
    get_role(env, address).as_ref() == Some(role)
}

// ─────────────────────────────────────────────────────────
// Internal helpers
// ─────────────────────────────────────────────────────────

/// Topic: `(role_set, target_address, role_symbol)`, data: `Option<caller>`.
fn emit(env: &Env, target: &Address, role: &Role, by: Option<Address>) {
    env.events()
        .publish((symbol_short!("role_set"), target.clone(), role_to_symbol(role)), by);
}

fn emit_revoke(env: &Env, target: &Address, by: Option<Address>) {
    env.events()
        .publish((symbol_short!("role_del"), target.clone()), by);
}

fn role_to_symbol(role: &Role) -> Symbol {
    match role {
        Role::SuperAdmin => symbol_short!("supadmin"),
        Role::Admin => symbol_short!("admin"),
        Role::Committee => symbol_short!("committee"),
    }
}
