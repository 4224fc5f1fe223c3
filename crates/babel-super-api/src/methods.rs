//! Method names and their access catalog.
//!
//! The catalog is handed to the registry at construction; registration then
//! only supplies handlers. Methods absent from the catalog require
//! authentication by default.

use babel_json_rpc::MethodMetadata;

pub const SYSTEM_HEALTH: &str = "system.health";
pub const SYSTEM_INFO: &str = "system.info";

pub const AUTH_LOGIN: &str = "auth.login";
pub const AUTH_LOGOUT: &str = "auth.logout";
pub const AUTH_GET_SESSION: &str = "auth.getSession";
pub const AUTH_REFRESH_TOKEN: &str = "auth.refreshToken";
pub const AUTH_GET_ME: &str = "auth.getMe";
pub const AUTH_UPDATE_ME: &str = "auth.updateMe";
pub const AUTH_CHANGE_PASSWORD: &str = "auth.changePassword";

pub const USER_LIST: &str = "user.list";
pub const USER_GET_BY_ID: &str = "user.getById";
pub const USER_CREATE: &str = "user.create";
pub const USER_UPDATE: &str = "user.update";
pub const USER_DELETE: &str = "user.delete";
pub const USER_GET_STATS: &str = "user.getStats";
pub const USER_RESET_PASSWORD: &str = "user.resetPassword";

pub fn catalog() -> Vec<(&'static str, MethodMetadata)> {
    vec![
        (SYSTEM_HEALTH, MethodMetadata::new("Health check").public()),
        (SYSTEM_INFO, MethodMetadata::new("Server information").public()),
        (
            AUTH_LOGIN,
            MethodMetadata::new("Log in with email or phone number").public(),
        ),
        (AUTH_LOGOUT, MethodMetadata::new("Log out of the current session")),
        (AUTH_GET_SESSION, MethodMetadata::new("Current session")),
        (
            AUTH_REFRESH_TOKEN,
            MethodMetadata::new("Rotate a session token").public(),
        ),
        (AUTH_GET_ME, MethodMetadata::new("Current user profile")),
        (AUTH_UPDATE_ME, MethodMetadata::new("Update the current user profile")),
        (AUTH_CHANGE_PASSWORD, MethodMetadata::new("Change password")),
        (USER_LIST, MethodMetadata::new("List users").admin()),
        (USER_GET_BY_ID, MethodMetadata::new("User details").admin()),
        (USER_CREATE, MethodMetadata::new("Create a user").admin()),
        (USER_UPDATE, MethodMetadata::new("Update a user").admin()),
        (USER_DELETE, MethodMetadata::new("Delete a user").admin()),
        (USER_GET_STATS, MethodMetadata::new("User statistics").admin()),
        (
            USER_RESET_PASSWORD,
            MethodMetadata::new("Reset a user's password").admin(),
        ),
    ]
}
