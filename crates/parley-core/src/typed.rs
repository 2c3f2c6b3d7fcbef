//! Narrowing a raw [`Activity`] into a [`TypedActivity`].

use crate::activity::Activity;
use crate::error::{BotError, BotResult};
use serde::de::DeserializeOwned;
use std::ops::Deref;

/// An activity whose `value` has been deserialized into `T`.
///
/// Envelope fields stay reachable through `Deref<Target = Activity>`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedActivity<T> {
    activity: Activity,
    value: T,
}

impl<T> TypedActivity<T> {
    /// Returns the typed value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Consumes the activity and returns the typed value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Returns the raw activity this was narrowed from.
    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    /// Splits into the raw activity and the typed value.
    pub fn into_parts(self) -> (Activity, T) {
        (self.activity, self.value)
    }
}

impl<T> Deref for TypedActivity<T> {
    type Target = Activity;

    fn deref(&self) -> &Activity {
        &self.activity
    }
}

impl<T> AsRef<Activity> for TypedActivity<T> {
    fn as_ref(&self) -> &Activity {
        &self.activity
    }
}

impl AsRef<Self> for Activity {
    fn as_ref(&self) -> &Self {
        self
    }
}

impl Activity {
    /// Deserializes `value` into `T`.
    ///
    /// A missing or `null` value is an error even when `T` could be built
    /// from nothing; narrowing never falls back to a default.
    ///
    /// # Example
    ///
    /// ```
    /// use parley_core::Activity;
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct Query { text: String }
    ///
    /// let activity = Activity::invoke("composeExtension/query", serde_json::json!({ "text": "rust" }));
    /// let typed = activity.narrow::<Query>().unwrap();
    /// assert_eq!(typed.value().text, "rust");
    /// assert_eq!(typed.name.as_deref(), Some("composeExtension/query"));
    /// ```
    pub fn narrow<T: DeserializeOwned>(&self) -> BotResult<TypedActivity<T>> {
        let raw = self.value.as_ref().ok_or_else(|| BotError::MissingValue {
            name: self.route_key(),
        })?;

        let value = T::deserialize(raw).map_err(|source| BotError::Narrowing {
            name: self.route_key(),
            source,
        })?;

        Ok(TypedActivity {
            activity: self.clone(),
            value,
        })
    }
}
