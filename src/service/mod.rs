pub mod agent_service;
pub mod calendar_service;
pub mod openai_service;
pub mod speech_service;
