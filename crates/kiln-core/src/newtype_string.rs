//! Macro for defining strongly-typed, optionally schema-qualified SQL names.
//!
//! Model and function identities share the same invariant (non-empty, dotted
//! `schema.object` form allowed) and the same set of trait impls, so both are
//! generated from one macro.

/// Define a strongly-typed, non-empty, dot-qualifiable name newtype.
///
/// Generates the struct, a `Deserialize` impl rejecting empty strings,
/// `try_new()`, `as_str()`, `into_inner()`, the qualification helpers
/// (`schema()`, `object_name()`, `is_qualified()`, `qualified_with()`), and
/// `Display`, `AsRef<str>`, `Deref<Target=str>`, `Borrow<str>`, `PartialEq<str>`.
macro_rules! define_qualified_name {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
        #[serde(transparent)]
        $vis struct $Name(String);

        impl<'de> serde::Deserialize<'de> for $Name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $Name::try_new(s).ok_or_else(|| {
                    serde::de::Error::custom(concat!(stringify!($Name), " must not be empty"))
                })
            }
        }

        impl $Name {
            /// Try to create a new name, returning `None` if it is empty or blank.
            pub fn try_new(name: impl Into<String>) -> Option<Self> {
                let s = name.into();
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else if trimmed.len() == s.len() {
                    Some(Self(s))
                } else {
                    Some(Self(trimmed.to_string()))
                }
            }

            /// Return the underlying name as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }

            /// Schema prefix (everything before the last `.`), if qualified.
            pub fn schema(&self) -> Option<&str> {
                self.0.rfind('.').map(|pos| &self.0[..pos])
            }

            /// Object name without any schema prefix.
            pub fn object_name(&self) -> &str {
                match self.0.rfind('.') {
                    Some(pos) => &self.0[pos + 1..],
                    None => &self.0,
                }
            }

            /// Whether the name carries a schema prefix.
            pub fn is_qualified(&self) -> bool {
                self.0.contains('.')
            }

            /// Prefix an unqualified name with `schema`; qualified names are returned as-is.
            pub fn qualified_with(&self, schema: &str) -> Self {
                if self.is_qualified() || schema.is_empty() {
                    self.clone()
                } else {
                    Self(format!("{}.{}", schema, self.0))
                }
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $Name {
            fn as_ref(&self) -> &str { &self.0 }
        }

        impl std::ops::Deref for $Name {
            type Target = str;
            fn deref(&self) -> &str { &self.0 }
        }

        impl std::borrow::Borrow<str> for $Name {
            fn borrow(&self) -> &str { &self.0 }
        }

        impl PartialEq<str> for $Name {
            fn eq(&self, other: &str) -> bool { self.0 == other }
        }

        impl PartialEq<&str> for $Name {
            fn eq(&self, other: &&str) -> bool { self.0 == *other }
        }

        impl PartialEq<String> for $Name {
            fn eq(&self, other: &String) -> bool { self.0 == *other }
        }
    };
}

pub(crate) use define_qualified_name;
