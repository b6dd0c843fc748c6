mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use calendarBot::browser::session::SessionManager;
use calendarBot::clients::openai_client::{ChatMessage, FunctionCall, ToolCall, ToolSpec};
use calendarBot::service::agent_service::AgentService;
use calendarBot::service::calendar_service::CalendarService;
use calendarBot::service::openai_service::ChatClient;
use common::FakeBackend;

struct ScriptedChat {
    replies: Mutex<Vec<ChatMessage>>,
    seen_tools: Mutex<Vec<String>>,
}

impl ScriptedChat {
    fn new(mut replies: Vec<ChatMessage>) -> Arc<Self> {
        replies.reverse();
        Arc::new(Self {
            replies: Mutex::new(replies),
            seen_tools: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ChatClient for ScriptedChat {
    async fn chat(
        &self,
        _messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ChatMessage, Box<dyn std::error::Error + Send + Sync>> {
        let mut seen = self.seen_tools.lock().unwrap();
        for tool in tools {
            seen.push(tool.function.name.clone());
        }
        self.replies
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| "script exhausted".into())
    }
}

fn assistant_text(content: &str) -> ChatMessage {
    ChatMessage {
        role: "assistant".to_string(),
        content: Some(content.to_string()),
        tool_calls: None,
        tool_call_id: None,
    }
}

fn assistant_tool_call(id: &str, name: &str, arguments: &str) -> ChatMessage {
    ChatMessage {
        role: "assistant".to_string(),
        content: None,
        tool_calls: Some(vec![ToolCall {
            id: id.to_string(),
            kind: "function".to_string(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }]),
        tool_call_id: None,
    }
}

fn agent(chat: Arc<ScriptedChat>, backend: &Arc<FakeBackend>) -> AgentService {
    let manager = Arc::new(SessionManager::new(
        backend.clone(),
        common::scratch_profile_root(),
    ));
    let calendar = Arc::new(CalendarService::new(manager, chrono_tz::America::Toronto));
    AgentService::new(chat, calendar)
}

#[tokio::test]
async fn plain_reply_passes_through_without_tool_calls() {
    let chat = ScriptedChat::new(vec![assistant_text("Hello, I am your calendar assistant.")]);
    let backend = FakeBackend::new();
    let agent = agent(chat.clone(), &backend);

    let mut history = agent.new_history();
    let reply = agent.run_turn("alice", &mut history, "hi").await;

    assert_eq!(reply, "Hello, I am your calendar assistant.");
    // system + user + assistant
    assert_eq!(history.len(), 3);
    assert_eq!(backend.launches.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn tool_calls_are_dispatched_and_fed_back() {
    let chat = ScriptedChat::new(vec![
        assistant_tool_call("call-1", "get_today_date", "{}"),
        assistant_text("Today noted."),
    ]);
    let backend = FakeBackend::new();
    let agent = agent(chat.clone(), &backend);

    let mut history = agent.new_history();
    let reply = agent.run_turn("alice", &mut history, "what day is it?").await;

    assert_eq!(reply, "Today noted.");
    let tool_message = history
        .iter()
        .find(|m| m.role == "tool")
        .expect("tool result recorded in history");
    assert_eq!(tool_message.tool_call_id.as_deref(), Some("call-1"));
    let date = tool_message.content.clone().unwrap();
    assert!(chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_ok());

    // The registry advertised all three calendar tools to the model.
    let seen = chat.seen_tools.lock().unwrap();
    assert!(seen.contains(&"get_today_date".to_string()));
    assert!(seen.contains(&"check_availability".to_string()));
    assert!(seen.contains(&"create_event".to_string()));
}

#[tokio::test]
async fn availability_tool_runs_the_conflict_check_against_the_page() {
    let chat = ScriptedChat::new(vec![
        assistant_tool_call(
            "call-1",
            "check_availability",
            r#"{"date":"2024-06-01","start_time":"09:00","end_time":"10:00"}"#,
        ),
        assistant_text("That slot is taken."),
    ]);
    let backend = FakeBackend::new();
    backend.seed_snippet("Standup, 9:30 - 10:30");
    let agent = agent(chat, &backend);

    let mut history = agent.new_history();
    let reply = agent
        .run_turn("alice", &mut history, "am I free tomorrow morning?")
        .await;

    assert_eq!(reply, "That slot is taken.");
    let tool_message = history.iter().find(|m| m.role == "tool").unwrap();
    assert!(
        tool_message
            .content
            .as_deref()
            .unwrap()
            .contains("already has a scheduled event")
    );
}

#[tokio::test]
async fn malformed_tool_arguments_become_a_result_string() {
    let chat = ScriptedChat::new(vec![
        assistant_tool_call("call-1", "create_event", "{\"title\":"),
        assistant_text("Sorry, let me retry."),
    ]);
    let backend = FakeBackend::new();
    let agent = agent(chat, &backend);

    let mut history = agent.new_history();
    let reply = agent.run_turn("alice", &mut history, "book it").await;

    assert_eq!(reply, "Sorry, let me retry.");
    let tool_message = history.iter().find(|m| m.role == "tool").unwrap();
    assert!(
        tool_message
            .content
            .as_deref()
            .unwrap()
            .contains("Invalid create_event arguments")
    );
    // Nothing touched the browser.
    assert_eq!(backend.launches.load(std::sync::atomic::Ordering::SeqCst), 0);
}
