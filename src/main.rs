#![allow(non_snake_case)]

use std::env;
use std::path::PathBuf;

use calendarBot::cli;
use calendarBot::config::AppConfig;
use calendarBot::runtime::{self, RuntimeOptions};

const DEFAULT_RUN_MODE: &str = "api";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match env::var("CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    };

    let openai_api_key = config
        .prop("OPENAI_API_KEY")
        .expect("OPENAI_API_KEY environment variable not set");
    let timezone: chrono_tz::Tz = config
        .prop("TIMEZONE")
        .unwrap_or("America/Toronto".to_string())
        .parse()
        .expect("TIMEZONE must be a valid IANA timezone name");

    let options = RuntimeOptions {
        openai_api_key,
        groq_api_key: config.prop("GROQ_API_KEY"),
        openai_model: config.prop("OPENAI_MODEL").unwrap_or("gpt-4o".to_string()),
        stt_model: config
            .prop("GROQ_STT_MODEL")
            .unwrap_or("whisper-large-v3".to_string()),
        tts_voice: config.prop("TTS_VOICE").unwrap_or("alloy".to_string()),
        timezone,
        profile_root: PathBuf::from(
            config
                .prop("PROFILE_ROOT")
                .unwrap_or("./.calendar_profiles".to_string()),
        ),
        headless: config
            .prop("HEADLESS")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false),
        port: config
            .prop("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(8000),
    };

    let run_mode = config.prop("RUN_MODE").unwrap_or(DEFAULT_RUN_MODE.to_string());
    if run_mode == "api" {
        runtime::run_api(options).await;
    } else if run_mode == "cli" {
        cli::cli(options).await;
    } else {
        println!("Invalid run mode {}", run_mode);
    }
}
