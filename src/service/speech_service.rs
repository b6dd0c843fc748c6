use async_trait::async_trait;

const GROQ_TRANSCRIPTION_URL: &str = "https://api.groq.com/openai/v1/audio/transcriptions";
const OPENAI_SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";
const TTS_MODEL: &str = "gpt-4o-mini-tts";

/// Speech endpoints used by the voice pipeline. Failures here are recoverable:
/// the websocket handler degrades to a text-only reply rather than dropping
/// the turn.
#[async_trait]
pub trait SpeechClient: Send + Sync {
    async fn transcribe(
        &self,
        audio: &[u8],
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;

    async fn synthesize(
        &self,
        text: &str,
    ) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Whisper transcription via Groq plus OpenAI speech synthesis.
pub struct SpeechService {
    groq_api_key: String,
    openai_api_key: String,
    stt_model: String,
    voice: String,
}

impl SpeechService {
    pub fn new(
        groq_api_key: String,
        openai_api_key: String,
        stt_model: String,
        voice: String,
    ) -> Self {
        Self {
            groq_api_key,
            openai_api_key,
            stt_model,
            voice,
        }
    }
}

#[async_trait]
impl SpeechClient for SpeechService {
    async fn transcribe(
        &self,
        audio: &[u8],
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name("audio.webm")
            .mime_str("audio/webm")?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.stt_model.clone())
            .text("response_format", "text")
            .text("temperature", "0");

        let client = reqwest::Client::new();
        let response = client
            .post(GROQ_TRANSCRIPTION_URL)
            .header("Authorization", format!("Bearer {}", self.groq_api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::error!(%status, body = %text, "transcription request failed");
            return Err(format!("Transcription failed with status {}", status).into());
        }
        Ok(text.trim().to_string())
    }

    async fn synthesize(
        &self,
        text: &str,
    ) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
        let client = reqwest::Client::new();
        let response = client
            .post(OPENAI_SPEECH_URL)
            .header("Authorization", format!("Bearer {}", self.openai_api_key))
            .json(&serde_json::json!({
                "model": TTS_MODEL,
                "voice": self.voice,
                "input": text,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body = %body, "speech synthesis request failed");
            return Err(format!("Speech synthesis failed with status {}", status).into());
        }
        Ok(response.bytes().await?.to_vec())
    }
}
