// ── Screen form schemas ──
//
// Field rules for every form the console shows. Lengths mirror the
// backend model constraints so most rejections are caught before a
// request is sent.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::validate::{FieldSchema, FormSchema};

/// Password the backend assigns to accounts created on someone's behalf.
/// Users must replace it on first login.
pub const DEFAULT_TEMP_PASSWORD: &str = "TempPass123!";

/// Roles an administrator can assign from the registration form.
pub const ASSIGNABLE_ROLES: [&str; 2] = ["admin", "employee"];

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9+]+$").expect("phone pattern compiles"));

static DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("digits pattern compiles"));

static RFC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9&Ññ]{12,13}$").expect("rfc pattern compiles"));

/// Lowercase, uppercase, digit and one of `@$!%*?&`, nothing else.
static STRONG_PASSWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z\d@$!%*?&]+$").expect("password pattern compiles")
});

fn is_strong(password: &str) -> bool {
    STRONG_PASSWORD.is_match(password)
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| "@$!%*?&".contains(c))
}

/// `POST accounts/auth/login/`
pub fn login() -> Arc<FormSchema> {
    Arc::new(
        FormSchema::new("login")
            .field(
                FieldSchema::email("email", "Email")
                    .required("Email is required")
                    .email_format("Enter a valid email address"),
            )
            .field(
                FieldSchema::password("password", "Password")
                    .required("Password is required")
                    .min_length(6, "Password must be at least 6 characters"),
            ),
    )
}

/// User registration (admin screen).
pub fn registration() -> Arc<FormSchema> {
    Arc::new(
        FormSchema::new("registration")
            .field(
                FieldSchema::text("username", "Username")
                    .required("Username is required")
                    .min_length(1, "Username cannot be empty"),
            )
            .field(
                FieldSchema::email("email", "Email")
                    .required("Email is required")
                    .email_format("Enter a valid email address"),
            )
            .field(FieldSchema::text("first_name", "First name"))
            .field(FieldSchema::text("last_name", "Last name"))
            .field(
                FieldSchema::choice("role", "Role", ASSIGNABLE_ROLES)
                    .required("Role is required")
                    .one_of("Role must be one of: admin, employee"),
            )
            .field(
                FieldSchema::password("password", "Password")
                    .required("Password is required")
                    .min_length(6, "Password must be at least 6 characters"),
            )
            .field(
                FieldSchema::password("password2", "Confirm password")
                    .required("Confirm the password")
                    .min_length(6, "Password must be at least 6 characters")
                    .matches("password", "Passwords do not match"),
            ),
    )
}

/// Forced password change after first login.
pub fn change_password() -> Arc<FormSchema> {
    Arc::new(
        FormSchema::new("change_password")
            .field(
                FieldSchema::password("new_password", "New password")
                    .required("Password is required")
                    .min_length(8, "Password must be at least 8 characters")
                    .custom(
                        |value, _| is_strong(&value.text()),
                        "Password needs an uppercase letter, a lowercase letter, a digit \
                         and one of @$!%*?&",
                    )
                    .not_equal(
                        DEFAULT_TEMP_PASSWORD,
                        "Choose a password different from the temporary one",
                    ),
            )
            .field(
                FieldSchema::password("confirm_password", "Confirm password")
                    .required("Confirm your new password")
                    .matches("new_password", "Passwords do not match"),
            ),
    )
}

/// Management company create/edit.
pub fn management() -> Arc<FormSchema> {
    Arc::new(
        FormSchema::new("management")
            .field(
                FieldSchema::text("name", "Name")
                    .required("Name is required")
                    .min_length(2, "Name must be at least 2 characters")
                    .max_length(255, "Name must be at most 255 characters"),
            )
            .field(
                FieldSchema::email("email", "Email")
                    .required("Email is required")
                    .email_format("Enter a valid email address"),
            )
            .field(
                FieldSchema::text("rfc", "RFC")
                    .pattern(RFC.clone(), "RFC must be 12 or 13 letters and digits"),
            )
            .field(
                FieldSchema::text("phone_number", "Phone")
                    .pattern(DIGITS.clone(), "Phone must contain digits only")
                    .max_length(15, "Phone must be at most 15 digits"),
            )
            .field(
                FieldSchema::text("phone_number_2", "Secondary phone")
                    .pattern(DIGITS.clone(), "Phone must contain digits only")
                    .max_length(15, "Phone must be at most 15 digits"),
            ),
    )
}

/// Pickup location create/edit.
pub fn location() -> Arc<FormSchema> {
    Arc::new(
        FormSchema::new("location")
            .field(
                FieldSchema::text("name", "Name")
                    .required("Name is required")
                    .min_length(3, "Name must be at least 3 characters")
                    .max_length(100, "Name must be at most 100 characters"),
            )
            .field(
                FieldSchema::text("postcode", "Postcode")
                    .required("Postcode is required")
                    .min_length(4, "Postcode must be at least 4 characters")
                    .max_length(10, "Postcode must be at most 10 characters"),
            )
            .field(
                FieldSchema::text("exterior_number", "Exterior number")
                    .required("Exterior number is required")
                    .max_length(20, "Exterior number must be at most 20 characters"),
            )
            .field(
                FieldSchema::text("interior_number", "Interior number")
                    .max_length(20, "Interior number must be at most 20 characters"),
            )
            .field(address_part("street_name", "Street", 100))
            .field(address_part("neighborhood", "Neighborhood", 100))
            .field(address_part("city", "City", 50))
            .field(address_part("state", "State", 50))
            .field(address_part("country", "Country", 50))
            .field(
                FieldSchema::text("phone_number", "Phone")
                    .required("Phone is required")
                    .min_length(7, "Phone must be at least 7 characters")
                    .max_length(20, "Phone must be at most 20 characters")
                    .pattern(PHONE.clone(), "Phone may contain digits and + only"),
            ),
    )
}

fn address_part(name: &str, label: &str, max: usize) -> FieldSchema {
    FieldSchema::text(name, label)
        .required(format!("{label} is required"))
        .min_length(3, format!("{label} must be at least 3 characters"))
        .max_length(max, format!("{label} must be at most {max} characters"))
}

/// Client create/edit. `fk_management` is pre-filled from the list scope.
pub fn client() -> Arc<FormSchema> {
    Arc::new(
        FormSchema::new("client")
            .field(
                FieldSchema::number("fk_management", "Management")
                    .required("Management is required")
                    .numeric("Management must be a number")
                    .min(1.0, "Select a management company"),
            )
            .field(
                FieldSchema::text("name", "Name")
                    .required("Name is required")
                    .min_length(2, "Name must be at least 2 characters"),
            )
            .field(
                FieldSchema::text("legal_name", "Legal name")
                    .required("Legal name is required")
                    .min_length(2, "Legal name must be at least 2 characters"),
            )
            .field(
                FieldSchema::text("rfc", "RFC")
                    .required("RFC is required")
                    .min_length(12, "RFC must be at least 12 characters")
                    .max_length(13, "RFC must be at most 13 characters"),
            )
            .field(
                FieldSchema::email("email", "Email")
                    .required("Email is required")
                    .email_format("Enter a valid email address"),
            )
            .field(
                FieldSchema::text("phone_number", "Phone")
                    .pattern(DIGITS.clone(), "Phone must contain digits only"),
            )
            .field(
                FieldSchema::text("phone_number_2", "Secondary phone")
                    .pattern(DIGITS.clone(), "Phone must contain digits only"),
            ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::FormState;
    use pretty_assertions::assert_eq;

    #[test]
    fn strong_password_rule() {
        let schema = change_password();
        let check = |pw: &str| {
            let state: FormState = [("new_password", pw), ("confirm_password", pw)]
                .into_iter()
                .collect();
            schema.validate(&state).error("new_password").map(str::to_owned)
        };

        assert_eq!(
            check("abc").as_deref(),
            Some("Password must be at least 8 characters")
        );
        assert!(check("alllowercase1!").is_some());
        assert!(check("NoSpecial123").is_some());
        assert_eq!(check("Str0ng!Pass"), None);
        assert_eq!(
            check(DEFAULT_TEMP_PASSWORD).as_deref(),
            Some("Choose a password different from the temporary one")
        );
    }

    #[test]
    fn location_optional_interior_and_phone_pattern() {
        let schema = location();
        let state: FormState = [
            ("name", "Depot"),
            ("postcode", "64000"),
            ("exterior_number", "120"),
            ("street_name", "Av. Juarez"),
            ("neighborhood", "Centro"),
            ("city", "Monterrey"),
            ("state", "Nuevo Leon"),
            ("country", "Mexico"),
            ("phone_number", "+52 81 1234"),
        ]
        .into_iter()
        .collect();

        let result = schema.validate(&state);
        assert_eq!(result.len(), 1);
        assert_eq!(
            result.error("phone_number"),
            Some("Phone may contain digits and + only")
        );
    }

    #[test]
    fn registration_requires_matching_passwords_and_known_role() {
        let schema = registration();
        let state: FormState = [
            ("username", "ana"),
            ("email", "ana@example.com"),
            ("role", "owner"),
            ("password", "secret1"),
            ("password2", "secret2"),
        ]
        .into_iter()
        .collect();

        let result = schema.validate(&state);
        assert_eq!(result.error("role"), Some("Role must be one of: admin, employee"));
        assert_eq!(result.error("password2"), Some("Passwords do not match"));
        assert!(result.error("first_name").is_none());
    }

    #[test]
    fn management_rfc_is_optional_but_checked() {
        let schema = management();
        let mut values = vec![("name", "Norte"), ("email", "norte@example.com")];
        let state: FormState = values.clone().into_iter().collect();
        assert!(schema.validate(&state).is_valid());

        values.push(("rfc", "ABC"));
        let state: FormState = values.into_iter().collect();
        assert_eq!(
            schema.validate(&state).error("rfc"),
            Some("RFC must be 12 or 13 letters and digits")
        );
    }
}
