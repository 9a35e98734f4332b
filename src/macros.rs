//! Declarative macros shared across the crate.

/// Define a `Copy` newtype around a raw numeric identifier with `new`, `get`,
/// `From` and `Display`.
macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name($inner);

        impl $name {
            /// Wrap a raw identifier.
            #[must_use]
            pub const fn new(id: $inner) -> Self { Self(id) }

            /// Return the raw identifier.
            #[must_use]
            pub const fn get(self) -> $inner { self.0 }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self { Self(value) }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}
