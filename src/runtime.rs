use std::path::PathBuf;
use std::sync::Arc;

use chrono_tz::Tz;
use warp::Filter;

use crate::browser::chrome::ChromeBackend;
use crate::browser::session::SessionManager;
use crate::handlers::ws::{self, WsDeps};
use crate::service::agent_service::AgentService;
use crate::service::calendar_service::CalendarService;
use crate::service::openai_service::OpenAIService;
use crate::service::speech_service::{SpeechClient, SpeechService};

pub struct RuntimeOptions {
    pub openai_api_key: String,
    /// Enables the voice pipeline; without it connections run text-only.
    pub groq_api_key: Option<String>,
    pub openai_model: String,
    pub stt_model: String,
    pub tts_voice: String,
    pub timezone: Tz,
    pub profile_root: PathBuf,
    pub headless: bool,
    pub port: u16,
}

pub struct Wiring {
    pub agent: Arc<AgentService>,
    pub sessions: Arc<SessionManager>,
    pub speech: Option<Arc<dyn SpeechClient>>,
}

/// Builds the dependency graph once at startup; everything downstream takes
/// its collaborators as constructor arguments.
pub fn build(options: &RuntimeOptions) -> Wiring {
    let backend = Arc::new(ChromeBackend::new(options.headless));
    let sessions = Arc::new(SessionManager::new(backend, options.profile_root.clone()));
    let calendar = Arc::new(CalendarService::new(sessions.clone(), options.timezone));
    let chat = Arc::new(OpenAIService::new(
        options.openai_api_key.clone(),
        options.openai_model.clone(),
    ));
    let agent = Arc::new(AgentService::new(chat, calendar));
    let speech = options.groq_api_key.clone().map(|groq| {
        Arc::new(SpeechService::new(
            groq,
            options.openai_api_key.clone(),
            options.stt_model.clone(),
            options.tts_voice.clone(),
        )) as Arc<dyn SpeechClient>
    });
    Wiring {
        agent,
        sessions,
        speech,
    }
}

pub async fn run_api(options: RuntimeOptions) {
    let port = options.port;
    let wiring = build(&options);
    let deps = Arc::new(WsDeps {
        agent: wiring.agent,
        speech: wiring.speech,
        sessions: wiring.sessions,
    });

    // One conversation per connection; the path segment is the profile id
    // whose browser session the conversation drives.
    let ws_route = warp::path!("ws" / String).and(warp::ws()).map(
        move |profile_id: String, ws: warp::ws::Ws| {
            let deps = deps.clone();
            ws.on_upgrade(move |socket| ws::handle_connection(socket, profile_id, deps))
        },
    );
    let health = warp::path("health").map(|| "ok");

    tracing::info!(port, "starting websocket server");
    warp::serve(ws_route.or(health)).run(([0, 0, 0, 0], port)).await;
}
