use serde::Deserialize;
use validator::Validate;

use crate::validation::{required, DeclaredFields};

/// Request body for user registration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserRegister {
    #[validate(custom(function = "required"))]
    pub username: String,
    #[validate(custom(function = "required"), email)]
    pub email: String,
    #[validate(custom(function = "required"))]
    pub password: String,
}

impl DeclaredFields for UserRegister {
    const FIELDS: &'static [(&'static str, &'static str)] = &[
        ("username", "username"),
        ("email", "email"),
        ("password", "password"),
    ];
}

/// Request body for a password change.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdatePassword {
    #[validate(custom(function = "required"))]
    pub username: String,
    #[validate(custom(function = "required"))]
    pub new_password: String,
}

impl DeclaredFields for UserUpdatePassword {
    const FIELDS: &'static [(&'static str, &'static str)] =
        &[("username", "username"), ("new_password", "newPassword")];
}
