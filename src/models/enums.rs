use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Species {
    Dog => "dog",
    Cat => "cat",
    Bird => "bird",
    Reptile => "reptile",
    Rodent => "rodent",
    Horse => "horse",
    Other => "other",
});

str_enum!(Sex {
    Male => "male",
    Female => "female",
    Unknown => "unknown",
});

str_enum!(MessageRole {
    User => "user",
    Assistant => "assistant",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn species_round_trip() {
        for s in ["dog", "cat", "bird", "reptile", "rodent", "horse", "other"] {
            assert_eq!(Species::from_str(s).unwrap().as_str(), s);
        }
    }

    #[test]
    fn species_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Species::Dog).unwrap(), "\"dog\"");
        let parsed: Sex = serde_json::from_str("\"female\"").unwrap();
        assert_eq!(parsed, Sex::Female);
    }

    #[test]
    fn invalid_species_rejected() {
        let err = Species::from_str("dragon").unwrap_err();
        assert!(err.to_string().contains("dragon"));
    }

    #[test]
    fn message_role_round_trip() {
        assert_eq!(MessageRole::from_str("user").unwrap(), MessageRole::User);
        assert_eq!(
            MessageRole::from_str("assistant").unwrap(),
            MessageRole::Assistant
        );
        assert!(MessageRole::from_str("system").is_err());
    }
}
