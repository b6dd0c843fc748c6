use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::clients::openai_client::{ChatMessage, ToolCall, ToolSpec};
use crate::models::event::EventDetails;
use crate::service::calendar_service::CalendarService;
use crate::service::openai_service::ChatClient;

const SYSTEM_PROMPT: &str = "You are a calendar assistant. \
Operate the calendar only through the provided tools; never guess or invent results. \
Open your first reply of a conversation with: \"Hello, I am your calendar assistant. What would you like to schedule?\" \
Before creating any event you must call check_availability and confirm the slot is free. \
If the user's time is ambiguous, ask them to clarify instead of assuming.";

/// Upper bound on tool rounds within one turn; past this the model is looping
/// and the turn is abandoned with an apology instead of hanging.
const MAX_TOOL_ROUNDS: usize = 6;

/// Orchestrates one conversation turn: forwards the history to the model,
/// dispatches any tool calls through the registry, and returns the first
/// assistant message that carries no further calls.
///
/// Dependencies are injected at construction and the tool registry is built
/// here, so there is no global agent state and the browsing backend can be a
/// test double all the way up.
pub struct AgentService {
    chat: Arc<dyn ChatClient>,
    calendar: Arc<CalendarService>,
    tools: Vec<ToolSpec>,
}

#[derive(Debug, Deserialize)]
struct AvailabilityArgs {
    date: String,
    start_time: String,
    end_time: String,
}

impl AgentService {
    pub fn new(chat: Arc<dyn ChatClient>, calendar: Arc<CalendarService>) -> Self {
        Self {
            chat,
            calendar,
            tools: build_tool_specs(),
        }
    }

    /// Fresh conversation history for a new connection.
    pub fn new_history(&self) -> Vec<ChatMessage> {
        vec![ChatMessage::system(SYSTEM_PROMPT)]
    }

    pub async fn run_turn(
        &self,
        profile_id: &str,
        history: &mut Vec<ChatMessage>,
        user_text: &str,
    ) -> String {
        history.push(ChatMessage::user(user_text));

        for _ in 0..MAX_TOOL_ROUNDS {
            let reply = match self.chat.chat(history, &self.tools).await {
                Ok(reply) => reply,
                Err(err) => {
                    tracing::error!(%err, "chat completion failed");
                    return format!("I hit a problem reaching the language model: {}", err);
                }
            };
            let tool_calls = reply.tool_calls.clone().unwrap_or_default();
            history.push(reply.clone());

            if tool_calls.is_empty() {
                return reply.content.unwrap_or_default();
            }

            for call in &tool_calls {
                let result = self.dispatch(profile_id, call).await;
                tracing::info!(tool = %call.function.name, result = %result, "tool call finished");
                history.push(ChatMessage::tool_result(&call.id, &result));
            }
        }

        "I could not finish that request. Please try rephrasing it.".to_string()
    }

    /// Maps a tool call to a calendar operation. Bad arguments come back as a
    /// result string for the model to react to, never as a fault.
    async fn dispatch(&self, profile_id: &str, call: &ToolCall) -> String {
        match call.function.name.as_str() {
            "get_today_date" => self.calendar.today(),
            "check_availability" => {
                match serde_json::from_str::<AvailabilityArgs>(&call.function.arguments) {
                    Ok(args) => {
                        self.calendar
                            .check_availability(
                                profile_id,
                                &args.date,
                                &args.start_time,
                                &args.end_time,
                            )
                            .await
                    }
                    Err(err) => format!("Invalid check_availability arguments: {}", err),
                }
            }
            "create_event" => match serde_json::from_str::<EventDetails>(&call.function.arguments)
            {
                Ok(details) => self.calendar.create_event(profile_id, &details).await,
                Err(err) => format!("Invalid create_event arguments: {}", err),
            },
            other => format!("Unknown tool: {}", other),
        }
    }
}

fn build_tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec::function(
            "get_today_date",
            "Get today's date in the user's timezone, formatted YYYY-MM-DD.",
            json!({ "type": "object", "properties": {}, "required": [] }),
        ),
        ToolSpec::function(
            "check_availability",
            "Check whether a time slot on a given date conflicts with existing calendar events.",
            json!({
                "type": "object",
                "properties": {
                    "date": { "type": "string", "description": "Date, formatted YYYY-MM-DD" },
                    "start_time": { "type": "string", "description": "Start time, HH:mm (24h) or h:mm am/pm" },
                    "end_time": { "type": "string", "description": "End time, same formats as start_time" }
                },
                "required": ["date", "start_time", "end_time"]
            }),
        ),
        ToolSpec::function(
            "create_event",
            "Create a calendar event. Only call this after check_availability reported the slot free.",
            json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string", "description": "Event title" },
                    "date": { "type": "string", "description": "Date, formatted YYYY-MM-DD" },
                    "start_time": { "type": "string", "description": "Start time, HH:mm (24h)" },
                    "end_time": { "type": "string", "description": "End time, HH:mm (24h)" }
                },
                "required": ["title", "date", "start_time", "end_time"]
            }),
        ),
    ]
}
