use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumIter, EnumString, VariantNames};

/// Languages words can be translated from and to.
///
/// Parsing accepts the English name or the ISO 639-1 code, ignoring case,
/// e.g. `spanish`, `Spanish` or `es`.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    EnumString,
    VariantNames,
)]
#[strum(ascii_case_insensitive)]
pub enum Language {
    /// English
    #[default]
    #[strum(to_string = "English", serialize = "en")]
    English,
    /// Spanish
    #[strum(to_string = "Spanish", serialize = "es")]
    Spanish,
    /// French
    #[strum(to_string = "French", serialize = "fr")]
    French,
    /// German
    #[strum(to_string = "German", serialize = "de")]
    German,
    /// Italian
    #[strum(to_string = "Italian", serialize = "it")]
    Italian,
    /// Portuguese
    #[strum(to_string = "Portuguese", serialize = "pt")]
    Portuguese,
    /// Dutch
    #[strum(to_string = "Dutch", serialize = "nl")]
    Dutch,
    /// Russian
    #[strum(to_string = "Russian", serialize = "ru")]
    Russian,
}

impl Language {
    /// ISO 639-1 code of the language
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Spanish => "es",
            Self::French => "fr",
            Self::German => "de",
            Self::Italian => "it",
            Self::Portuguese => "pt",
            Self::Dutch => "nl",
            Self::Russian => "ru",
        }
    }
}

impl Serialize for Language {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.code())
    }
}

// Deserialize from the same spellings the command line accepts
impl<'de> Deserialize<'de> for Language {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Language::from_str(&s)
            .map_err(|_| serde::de::Error::custom(format!("unknown language `{s}`")))
    }
}
