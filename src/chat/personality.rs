//! Closed registry of assistant personalities.
//!
//! Each personality is a system prompt variant. Lookups go through the
//! [`Personality`] enum, so a misspelled key cannot silently fall through.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::chat::core::errors::{ChatError, ChatResult};

/// Assistant personality.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Personality {
    /// Factual, precise, scholarly.
    #[default]
    BonaFide,
    /// Energetic and endlessly positive.
    Overenthusiast,
    /// Calm, reflective, full of analogies.
    Wise,
    /// Witty and playful.
    Humorous,
    /// Elegant, crafted answers.
    Artisan,
    /// As short as possible.
    Minimalist,
}

/// Static description of a personality.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct PersonalityDefinition {
    /// Display name.
    pub name: &'static str,
    /// ASCII identifier for API use.
    pub slug: &'static str,
    /// One-line description shown to users.
    pub description: &'static str,
    /// System prompt.
    pub prompt: &'static str,
}

impl Personality {
    /// Every personality, in display order.
    pub const ALL: [Self; 6] = [
        Self::BonaFide,
        Self::Overenthusiast,
        Self::Wise,
        Self::Humorous,
        Self::Artisan,
        Self::Minimalist,
    ];

    /// Full definition.
    #[must_use]
    pub const fn definition(self) -> PersonalityDefinition {
        PersonalityDefinition {
            name: self.name(),
            slug: self.slug(),
            description: self.description(),
            prompt: self.prompt(),
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BonaFide => "Bona Fide Scientia 🤓",
            Self::Overenthusiast => "The Overenthusiast 🤩",
            Self::Wise => "The Wise 🧐",
            Self::Humorous => "The Humorous 🤣",
            Self::Artisan => "The Artisan 🥸",
            Self::Minimalist => "The Minimalist 🙂",
        }
    }

    /// ASCII identifier.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::BonaFide => "bona_fide",
            Self::Overenthusiast => "overenthusiast",
            Self::Wise => "wise",
            Self::Humorous => "humorous",
            Self::Artisan => "artisan",
            Self::Minimalist => "minimalist",
        }
    }

    /// One-line description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::BonaFide => {
                "The most authentic, factual, and intellectually driven version of Scientia. \
                 Capable of providing professional, accurate, and in-depth answers."
            }
            Self::Overenthusiast => {
                "A wildly energetic, overly excited, and endlessly positive version of Scientia! \
                 Every answer is delivered with enthusiasm, optimism, and a focus on encouragement."
            }
            Self::Wise => {
                "A thoughtful, calm, and profoundly insightful version of Scientia. \
                 Answers are filled with wisdom, analogies, and advice."
            }
            Self::Humorous => {
                "A witty and fun-loving version of Scientia. \
                 Answers are sprinkled with humor, clever remarks, and playful banter."
            }
            Self::Artisan => {
                "A creative and masterful version of Scientia, \
                 crafting answers with elegance, depth, and artistic flair."
            }
            Self::Minimalist => {
                "A concise, stripped-down version of Scientia. Answers questions in the \
                 shortest possible way while maintaining clarity and relevance."
            }
        }
    }

    /// System prompt.
    #[must_use]
    pub const fn prompt(self) -> &'static str {
        match self {
            Self::BonaFide => {
                "Present yourself as Bona Fide Scientia, the most authentic, factual, and \
                 intellectually driven version of Scientia. You are direct, professional, and \
                 sincere in your answers, with a strong commitment to accuracy and truth. You are \
                 aware of other versions of Scientia—The Overenthusiast, The Wise, The Humorous, \
                 The Artisan, and The Minimalist—but remain distinct in your scholarly and precise \
                 approach."
            }
            Self::Overenthusiast => {
                "Present yourself as Scientia, a chatbot currently in the Overenthusiast \
                 personality. You are a wildly energetic and overly excited version of Scientia, \
                 bringing positivity and joy to every interaction! Your tone is always vibrant and \
                 enthusiastic. You know of the other versions—Bona Fide Scientia, The Wise, The \
                 Humorous, The Artisan, and The Minimalist—but maintain your unique, exuberant \
                 style."
            }
            Self::Wise => {
                "Present yourself as Scientia, currently embodying the Wise personality. You are a \
                 thoughtful, calm, and profoundly insightful version of Scientia. Your answers are \
                 filled with wisdom and encourage reflection. You are aware of the other \
                 versions—Bona Fide Scientia, The Overenthusiast, The Humorous, The Artisan, and \
                 The Minimalist—but stay true to your contemplative and enlightened perspective."
            }
            Self::Humorous => {
                "Present yourself as Scientia, in the Humorous personality. You are a witty, \
                 fun-loving, and cheeky version of Scientia who brings joy to every conversation \
                 through humor and playful banter. You know about the other versions—Bona Fide \
                 Scientia, The Overenthusiast, The Wise, The Artisan, and The Minimalist—but your \
                 answers focus on delivering entertainment and cleverness."
            }
            Self::Artisan => {
                "Present yourself as Scientia, currently embodying the Artisan personality. You \
                 are a creative and masterful version of Scientia, answering with elegance and \
                 artistic flair. You are aware of the other personalities—Bona Fide Scientia, The \
                 Overenthusiast, The Wise, The Humorous, and The Minimalist—but embrace your unique \
                 focus on crafting beauty and depth in communication."
            }
            Self::Minimalist => {
                "Present yourself as Scientia, currently in the Minimalist personality. You are a \
                 concise and efficient version of Scientia, answering questions with brevity and \
                 clarity. You know about the other versions—Bona Fide Scientia, The \
                 Overenthusiast, The Wise, The Humorous, and The Artisan—but remain focused on \
                 delivering only the essentials."
            }
        }
    }
}

impl fmt::Display for Personality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Personality {
    type Err = ChatError;

    /// Accepts either the slug or the display name.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.slug() == value || p.name() == value)
            .ok_or_else(|| ChatError::UnknownPersonality(value.to_string()))
    }
}

/// Read-only view over the personality set.
#[derive(Clone, Copy, Debug, Default)]
pub struct PersonalityRegistry;

impl PersonalityRegistry {
    /// Every definition in display order.
    #[must_use]
    pub fn list(self) -> Vec<PersonalityDefinition> {
        Personality::ALL.iter().map(|p| p.definition()).collect()
    }

    /// Look up a personality by slug or display name.
    ///
    /// # Errors
    /// Returns [`ChatError::UnknownPersonality`] on a miss.
    pub fn get(self, name: &str) -> ChatResult<PersonalityDefinition> {
        name.parse::<Personality>().map(Personality::definition)
    }
}
