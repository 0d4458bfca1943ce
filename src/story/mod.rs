// Story playground: randomized prompt composition and title extraction

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::invoke::{Dispatcher, GenerationRequest, InvokeError, STORY_MODEL_ID};

pub const THEMES: &[&str] = &[
    "adventure",
    "mystery",
    "fantasy",
    "science fiction",
    "romance",
    "horror",
    "historical",
    "comedy",
    "drama",
    "fairy tale",
];

pub const GENRES: &[&str] = &[
    "action",
    "thriller",
    "dystopian",
    "utopian",
    "western",
    "cyberpunk",
    "steampunk",
    "magical realism",
    "urban fantasy",
    "space opera",
];

pub const UNTITLED: &str = "Untitled Story";
const TITLE_PREFIX: &str = "Title:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoryLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl StoryLength {
    /// Exact match on `short` or `long`; anything else is medium.
    pub fn parse(value: &str) -> Self {
        match value {
            "short" => Self::Short,
            "long" => Self::Long,
            _ => Self::Medium,
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Short => "a short story (about 500 words)",
            Self::Medium => "a medium-length story (about 1000 words)",
            Self::Long => "a longer story (about 2000 words)",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoryParams {
    pub theme: Option<String>,
    pub genre: Option<String>,
    pub characters: u32,
    pub length: StoryLength,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story {
    pub title: String,
    pub body: String,
}

/// Build the instruction sent to the model, sampling theme and genre when unset.
pub fn compose_prompt<R: Rng + ?Sized>(params: &StoryParams, rng: &mut R) -> String {
    let theme = pick(params.theme.as_deref(), THEMES, rng);
    let genre = pick(params.genre.as_deref(), GENRES, rng);
    let plural = if params.characters > 1 { "s" } else { "" };

    format!(
        "Write {} in the {} genre with a {} theme, featuring {} main character{}. \
         Include a creative title at the beginning of your response in the format 'Title: [Your Title]'.",
        params.length.description(),
        genre,
        theme,
        params.characters,
        plural
    )
}

fn pick<'a, R: Rng + ?Sized>(given: Option<&'a str>, candidates: &[&'a str], rng: &mut R) -> &'a str {
    match given.filter(|v| !v.is_empty()) {
        Some(value) => value,
        None => candidates.choose(rng).copied().unwrap_or_default(),
    }
}

/// Split generated text into title and body.
pub fn parse_story(text: &str) -> Story {
    let mut lines = text.split('\n');
    let first = lines.next().unwrap_or_default();

    if first.starts_with(TITLE_PREFIX) {
        // Every occurrence of the marker on the title line is dropped.
        Story {
            title: first.replace(TITLE_PREFIX, "").trim().to_string(),
            body: lines.collect::<Vec<_>>().join("\n").trim().to_string(),
        }
    } else {
        Story {
            title: UNTITLED.to_string(),
            body: text.to_string(),
        }
    }
}

/// Compose a prompt, run it through the story model and split the reply.
pub async fn generate_story(
    dispatcher: &Dispatcher,
    params: &StoryParams,
    temperature: f32,
    max_tokens: u32,
) -> Result<Story, InvokeError> {
    let prompt = compose_prompt(params, &mut rand::rng());
    tracing::debug!("Story prompt: {}", prompt);

    let request = GenerationRequest::new(prompt)
        .temperature(temperature)
        .max_tokens(max_tokens);
    let text = dispatcher.invoke(STORY_MODEL_ID, &request).await?.into_text()?;

    let story = parse_story(&text);
    tracing::info!("Generated story {:?} ({} chars)", story.title, story.body.len());
    Ok(story)
}
