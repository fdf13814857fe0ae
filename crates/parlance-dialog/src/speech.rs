//! Ordered phrase builder rendered to `<speak>` markup.
//!
//! Phrases carry two flags used for re-prompting: `repeat` (spoken again when
//! the last output is repeated; unset counts as yes) and `fallback` (only
//! spoken on a repeat, never on first delivery).

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

const BREAK_PREFIX: &str = "<break time";
const REPEAT_BREAK: &str = "<break time=\"0.5s\"/>";

/// Fixed text, or a set of alternatives picked at random on every render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PhraseText {
    Fixed(String),
    Random(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phrase {
    pub output: PhraseText,
    #[serde(default)]
    pub repeat: Option<bool>,
    #[serde(default)]
    pub fallback: bool,
}

impl Phrase {
    pub fn is_random(&self) -> bool {
        matches!(self.output, PhraseText::Random(_))
    }

    fn repeatable(&self) -> bool {
        self.repeat != Some(false)
    }

    fn is_break(&self) -> bool {
        matches!(&self.output, PhraseText::Fixed(text) if text.starts_with(BREAK_PREFIX))
    }

    fn pick(&self) -> String {
        match &self.output {
            PhraseText::Fixed(text) => text.clone(),
            PhraseText::Random(choices) => choices
                .choose(&mut rand::rng())
                .cloned()
                .unwrap_or_default(),
        }
    }
}

/// Flags applied to added phrases. Unset fields keep the phrase's own value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhraseOptions {
    pub repeat: Option<bool>,
    pub fallback: Option<bool>,
}

impl PhraseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_repeat(mut self) -> Self {
        self.repeat = Some(false);
        self
    }

    pub fn fallback(mut self) -> Self {
        self.fallback = Some(true);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeechOutput {
    phrases: Vec<Phrase>,
}

impl SpeechOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_phrases(phrases: Vec<Phrase>) -> Self {
        Self { phrases }
    }

    pub fn say(&mut self, text: impl Into<String>) -> &mut Self {
        self.say_with(text, PhraseOptions::default())
    }

    pub fn say_with(&mut self, text: impl Into<String>, options: PhraseOptions) -> &mut Self {
        self.phrases.push(Phrase {
            output: PhraseText::Fixed(text.into()),
            repeat: options.repeat,
            fallback: options.fallback.unwrap_or(false),
        });
        self
    }

    /// One phrase whose text is picked from `choices` on every render.
    pub fn say_random<I, S>(&mut self, choices: I, options: PhraseOptions) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.phrases.push(Phrase {
            output: PhraseText::Random(choices.into_iter().map(Into::into).collect()),
            repeat: options.repeat,
            fallback: options.fallback.unwrap_or(false),
        });
        self
    }

    /// Replace everything said so far with `text`.
    pub fn set(&mut self, text: impl Into<String>) -> &mut Self {
        self.phrases.clear();
        self.say(text)
    }

    /// Append existing phrases. A phrase marked not-repeatable stays that
    /// way even when `options.repeat` is set.
    pub fn extend<'a, I>(&mut self, phrases: I, options: PhraseOptions) -> &mut Self
    where
        I: IntoIterator<Item = &'a Phrase>,
    {
        for phrase in phrases {
            let repeat = match options.repeat {
                Some(repeat) if phrase.repeatable() => Some(repeat),
                Some(_) => Some(false),
                None => phrase.repeat,
            };
            self.phrases.push(Phrase {
                output: phrase.output.clone(),
                repeat,
                fallback: options.fallback.unwrap_or(phrase.fallback),
            });
        }
        self
    }

    pub fn append(&mut self, other: &SpeechOutput) -> &mut Self {
        self.extend(other.phrases(), PhraseOptions::default())
    }

    pub fn pause(&mut self, seconds: f32) -> &mut Self {
        self.say(format!("<break time=\"{}s\"/>", seconds))
    }

    pub fn audio(&mut self, url: &str, fallback_text: &str) -> &mut Self {
        self.say(format!("<audio src=\"{}\">{}</audio>", url, fallback_text))
    }

    pub fn phrases(&self) -> &[Phrase] {
        &self.phrases
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// Phrases worth saying again when re-prompting. Repeatable pauses are
    /// shortened and fallback-only phrases become regular ones.
    pub fn filter_repeatable(phrases: &[Phrase]) -> Vec<Phrase> {
        phrases
            .iter()
            .filter_map(|phrase| {
                if phrase.is_break() && phrase.repeatable() {
                    Some(Phrase {
                        output: PhraseText::Fixed(REPEAT_BREAK.to_string()),
                        repeat: phrase.repeat,
                        fallback: false,
                    })
                } else if phrase.repeatable() || phrase.fallback {
                    Some(Phrase {
                        fallback: false,
                        ..phrase.clone()
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    /// `<speak>` markup of every non-fallback phrase.
    pub fn render(&self) -> String {
        let spoken: Vec<String> = self
            .phrases
            .iter()
            .filter(|p| !p.fallback)
            .map(Phrase::pick)
            .collect();
        format!("<speak>{}</speak>", spoken.join(" "))
    }

    /// Plain-text rendering for screens. Markup-only phrases are dropped.
    pub fn render_text(&self) -> String {
        self.phrases
            .iter()
            .filter(|p| !p.fallback)
            .map(Phrase::pick)
            .filter(|text| !text.starts_with('<'))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
