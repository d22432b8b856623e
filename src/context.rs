//! Per-request context populated by collaborators that run before the
//! application, such as authentication.

use std::collections::HashMap;

/// Attribute key under which the authenticated user identifier is stored.
pub const USER_ID_ATTRIBUTE: &str = "UserId";

/// String-keyed attributes attached to one request.
///
/// The authenticated user identifier is kept twice: as the raw attribute
/// and as a typed `Option<i32>` resolved when the attribute is stored.
/// Readers use [`Context::user_id`] and never parse the raw value.
///
/// ```rust
/// use wiretap::{Context, USER_ID_ATTRIBUTE};
///
/// let mut ctx = Context::default();
/// ctx.insert(USER_ID_ATTRIBUTE, "42");
/// assert_eq!(ctx.user_id(), Some(42));
///
/// ctx.insert(USER_ID_ATTRIBUTE, "alice");
/// assert_eq!(ctx.user_id(), None);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Context {
    attributes: HashMap<String, String>,
    user_id: Option<i32>,
}

impl Context {
    /// Stores `value` under `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if key == USER_ID_ATTRIBUTE {
            self.user_id = parse_user_id(&value);
        }
        self.attributes.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Removes `key`. Removing the user attribute also clears the typed id.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        if key == USER_ID_ATTRIBUTE {
            self.user_id = None;
        }
        self.attributes.remove(key)
    }

    /// Records the authenticated user. Shorthand for inserting
    /// [`USER_ID_ATTRIBUTE`].
    pub fn set_user(&mut self, raw: impl Into<String>) {
        self.insert(USER_ID_ATTRIBUTE, raw);
    }

    /// The authenticated user id, if one was set and is a valid integer.
    pub fn user_id(&self) -> Option<i32> {
        self.user_id
    }
}

fn parse_user_id(raw: &str) -> Option<i32> {
    raw.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_user_attribute_resolves_typed_id() {
        let mut ctx = Context::default();
        ctx.set_user(" 7 ");
        assert_eq!(ctx.user_id(), Some(7));
        assert_eq!(ctx.get(USER_ID_ATTRIBUTE), Some(" 7 "));
    }

    #[test]
    fn malformed_or_missing_user_is_unset() {
        let mut ctx = Context::default();
        assert_eq!(ctx.user_id(), None);

        for raw in ["", "abc", "4.2", "99999999999"] {
            ctx.set_user(raw);
            assert_eq!(ctx.user_id(), None, "{raw:?}");
        }
    }

    #[test]
    fn other_attributes_leave_user_untouched() {
        let mut ctx = Context::default();
        ctx.set_user("3");
        ctx.insert("Role", "admin");
        assert_eq!(ctx.user_id(), Some(3));
        assert_eq!(ctx.get("Role"), Some("admin"));
    }

    #[test]
    fn removing_user_attribute_clears_id() {
        let mut ctx = Context::default();
        ctx.set_user("-12");
        assert_eq!(ctx.user_id(), Some(-12));
        assert_eq!(ctx.remove(USER_ID_ATTRIBUTE).as_deref(), Some("-12"));
        assert_eq!(ctx.user_id(), None);
    }
}
