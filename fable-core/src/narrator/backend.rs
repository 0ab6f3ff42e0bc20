//! Generation backend seam.
//!
//! The narrator talks to text and image generation through [`StoryBackend`]
//! so the orchestration logic can be exercised without network access. The
//! production implementation is [`GeminiBackend`]; tests script replies
//! through `testing::MockBackend`.

use async_trait::async_trait;
use gemini::{Gemini, Request};
use tracing::warn;

/// Default model for narrative text.
pub const TEXT_MODEL: &str = "gemini-2.5-flash";

/// Default model for illustrations.
pub const IMAGE_MODEL: &str = "gemini-2.5-flash-image";

const DEFAULT_MAX_OUTPUT_TOKENS: usize = 1024;
const DEFAULT_TEMPERATURE: f32 = 0.8;

/// An illustration produced for a chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Illustration {
    /// PNG image bytes, ready to save or attach.
    Image(Vec<u8>),
    /// Degraded result: a scene description for the child to imagine when
    /// no image data came back.
    Description(String),
}

impl Illustration {
    pub fn as_image(&self) -> Option<&[u8]> {
        match self {
            Illustration::Image(bytes) => Some(bytes),
            Illustration::Description(_) => None,
        }
    }
}

/// Opaque generative backend: prompt in, text or illustration out, fallible.
///
/// Callers own failure handling; implementations must not panic on backend
/// problems.
#[async_trait]
pub trait StoryBackend: Send + Sync {
    /// Generate narrative text for the given prompt.
    async fn generate_text(&self, prompt: &str) -> Result<String, gemini::Error>;

    /// Generate an illustration for the given prompt.
    async fn generate_illustration(&self, prompt: &str) -> Result<Illustration, gemini::Error>;
}

/// Production backend over the Gemini text and image models.
#[derive(Clone)]
pub struct GeminiBackend {
    text: Gemini,
    image: Gemini,
    max_output_tokens: usize,
    temperature: f32,
}

impl GeminiBackend {
    /// Create a backend with the default model pair.
    pub fn new(api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        Self {
            text: Gemini::new(api_key.clone()).with_model(TEXT_MODEL),
            image: Gemini::new(api_key).with_model(IMAGE_MODEL),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Create a backend from the GEMINI_API_KEY environment variable.
    pub fn from_env() -> Result<Self, gemini::Error> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| gemini::Error::NoApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Override the text model.
    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text = self.text.with_model(model);
        self
    }

    /// Override the image model.
    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image = self.image.with_model(model);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: usize) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn text_request(&self, prompt: &str) -> Request {
        Request::from_prompt(prompt)
            .with_max_output_tokens(self.max_output_tokens)
            .with_temperature(self.temperature)
    }
}

#[async_trait]
impl StoryBackend for GeminiBackend {
    async fn generate_text(&self, prompt: &str) -> Result<String, gemini::Error> {
        let response = self.text.generate(self.text_request(prompt)).await?;
        let text = response.text();
        if text.trim().is_empty() {
            return Err(gemini::Error::Parse(
                "Response contained no text".to_string(),
            ));
        }
        Ok(text)
    }

    async fn generate_illustration(&self, prompt: &str) -> Result<Illustration, gemini::Error> {
        match self.image.generate(Request::from_prompt(prompt)).await {
            Ok(response) => {
                if let Some(bytes) = response.image_bytes()? {
                    return Ok(Illustration::Image(bytes));
                }
                warn!("image model returned no image data, describing the scene instead");
            }
            Err(error) => {
                warn!(%error, "image generation failed, describing the scene instead");
            }
        }

        // Degraded path: have the text model paint the scene in words.
        let mut describe = String::from(include_str!("prompts/scene_description.txt"));
        describe.push_str("\n장면: ");
        describe.push_str(prompt);
        let description = self.text.generate(self.text_request(&describe)).await?;
        Ok(Illustration::Description(format!(
            "🎨 {}",
            description.text().trim()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_illustration_as_image() {
        let image = Illustration::Image(vec![1, 2, 3]);
        assert_eq!(image.as_image(), Some(&[1u8, 2, 3][..]));

        let description = Illustration::Description("🎨 상상해보세요".to_string());
        assert!(description.as_image().is_none());
    }

    #[test]
    fn test_backend_from_key() {
        let backend = GeminiBackend::new("test-key")
            .with_max_output_tokens(256)
            .with_temperature(0.5);
        assert_eq!(backend.max_output_tokens, 256);
        assert_eq!(backend.temperature, 0.5);
    }
}
