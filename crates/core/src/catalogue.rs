//! Declarative helper for fixed hospital catalogues (departments, roles, form types).
//!
//! Each catalogue is a closed enum whose wire code is a SCREAMING_SNAKE_CASE
//! string. The macro derives the serde mapping, a dense `index()` suitable for
//! table lookups, `as_str()`, `Display`, and a forgiving `FromStr` that accepts
//! any case and `-`/space separators (`"clabsi-bundle"` parses as
//! `CLABSI_BUNDLE`).

/// Normalise a user- or URL-supplied catalogue code to its canonical form.
pub fn normalize_code(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

#[macro_export]
macro_rules! catalogue_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $code:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        $vis enum $name {
            $( $(#[$vmeta])* #[serde(rename = $code)] $variant, )+
        }

        impl $name {
            /// Every member, in declaration order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant, )+ ];

            /// Number of members.
            pub const COUNT: usize = Self::ALL.len();

            /// Dense position in `ALL`, used as a table index.
            pub fn index(self) -> usize {
                self as usize
            }

            /// Canonical wire code.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $code, )+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let code = $crate::catalogue::normalize_code(s);
                match code.as_str() {
                    $( $code => Ok($name::$variant), )+
                    _ => Err($crate::DomainError::invalid_id(format!(
                        "unknown {} '{}'",
                        stringify!($name),
                        s.trim()
                    ))),
                }
            }
        }
    };
}
