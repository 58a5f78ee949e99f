//! Macro for implementing Display and FromStr for wire-named enums
//!
//! Enums that travel as path segments or query values (for example the object
//! store [`Route`](crate::Route)) share one canonical lowercase spelling. The
//! macro keeps the two directions of that mapping in a single table.
//!
//! # Example
//!
//! ```rust
//! use crucible_domain::impl_wire_name_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Outcome {
//!     Passed,
//!     Failed,
//! }
//!
//! impl_wire_name_conversions!(Outcome {
//!     Passed => "passed",
//!     Failed => "failed",
//! });
//!
//! assert_eq!(Outcome::Passed.to_string(), "passed");
//! assert_eq!("FAILED".parse::<Outcome>().unwrap(), Outcome::Failed);
//! ```

/// Implements Display, FromStr and `as_str` for wire-named enums
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their wire names
///
/// Parsing is case-insensitive; rendering always yields the table spelling.
#[macro_export]
macro_rules! impl_wire_name_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical wire name of this variant.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $(v if v == $str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
