//! Portfolio chatbot.
//!
//! Every reply comes from one of three places, in order of preference: the
//! inference API, a fixed "loading" line when the hosted model is cold (HTTP
//! 503), or a keyword-matched canned answer. Both the visitor's message and
//! the reply are stored as [`AiChatMessage`] rows.

use chrono::Utc;
use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::entities::{AiChatMessage, AiChatStore, ChatRole};
use crate::error::ServerError;
use crate::inference::schema::ChatMessage;
use crate::inference::{Completion, InferenceClient, InferenceError};
use crate::state::AppState;

pub const LOADING_REPLY: &str =
    "I'm currently loading my thinking capabilities. Please try again in a moment.";
pub const LOADING_ERROR: &str = "Model is loading";

const MAX_TOKENS: u32 = 250;
const TEMPERATURE: f32 = 0.7;
const RETRY_MAX_TOKENS: u32 = 200;
const RETRY_TEMPERATURE: f32 = 0.5;

/// Canned-answer bucket picked from keywords in the visitor's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum FallbackCategory {
    Services,
    Skills,
    Hire,
    Portfolio,
    Default,
}

/// Keyword table, checked top to bottom; the first hit wins.
const KEYWORDS: &[(&[&str], FallbackCategory)] = &[
    (&["service", "offer", "provide"], FallbackCategory::Services),
    (&["skill", "know", "expert", "good at"], FallbackCategory::Skills),
    (&["hire", "work", "employ", "job"], FallbackCategory::Hire),
    (&["contact", "reach", "email", "call"], FallbackCategory::Default),
    (&["experience", "background", "history", "worked"], FallbackCategory::Default),
    (&["portfolio", "projects"], FallbackCategory::Portfolio),
];

pub fn categorize(message: &str) -> FallbackCategory {
    let lower = message.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(words, _)| words.iter().any(|w| lower.contains(w)))
        .map(|&(_, category)| category)
        .unwrap_or(FallbackCategory::Default)
}

/// Canned answers for a category; `{owner}` is replaced with the owner name.
fn canned(category: FallbackCategory) -> &'static [&'static str] {
    match category {
        FallbackCategory::Services => &[
            "{owner} builds full-stack web applications: backend APIs, responsive front ends and the glue between them. For a specific project, use the contact form and {owner} will get back to you.",
            "{owner} offers custom web development, API design and integration, and performance work on existing systems.",
            "Services include full-stack development, custom web applications and portfolio sites, with a focus on fast, accessible interfaces.",
        ],
        FallbackCategory::Skills => &[
            "{owner} works across the stack: HTML, CSS and JavaScript on the front end, Python and Rust on the back end, and relational databases underneath.",
            "{owner}'s toolkit covers modern front-end frameworks, REST API design, containerised deployment and CI/CD pipelines.",
            "Core skills: backend services, database design, front-end frameworks and cloud deployment. The Skills section lists them in detail.",
        ],
        FallbackCategory::Hire => &[
            "To hire {owner}, send a short description of your project through the contact form. {owner} will reply to discuss scope and timing.",
            "Hiring is simple: use the contact form or the live chat to describe what you need, and {owner} will follow up directly.",
            "Start with the contact form. Include your timeline and budget if you can, and {owner} will reach out to plan next steps.",
        ],
        FallbackCategory::Portfolio => &[
            "{owner}'s portfolio includes web applications, dashboards and API services. Browse the Projects section to see them.",
            "You can see {owner}'s past work in the Projects section; each entry lists the technologies used.",
            "The Projects section showcases {owner}'s recent work across front-end and back-end development.",
        ],
        FallbackCategory::Default => &[
            "I'm the portfolio assistant. Ask me about {owner}'s skills, projects or services, or about how to get in touch.",
            "Hello! I can tell you about {owner}'s work, skills and services. There's also a live chat if you'd like to talk to {owner} directly.",
            "Welcome! I can answer questions about {owner}'s experience and projects. For anything else, the contact form reaches {owner} directly.",
        ],
    }
}

/// A random canned answer for `message`.
pub fn fallback_reply(message: &str, owner: &str) -> String {
    let options = canned(categorize(message));
    let choice = options.choose(&mut rand::thread_rng()).copied().unwrap_or(options[0]);
    choice.replace("{owner}", owner)
}

fn system_prompt(owner: &str, site_name: &str) -> String {
    format!(
        "You are the assistant on {site_name}, the portfolio website of {owner}. \
         Answer visitors' questions about {owner}'s skills, projects, services and how to \
         hire them. Be concise, friendly and professional. If you do not know something, \
         suggest the contact form or the live chat instead of guessing."
    )
}

/// Where a reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ReplySource {
    Model,
    SimplifiedModel,
    Loading,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub session_id: String,
    pub response: String,
    pub source: ReplySource,
    /// Set when the model is loading.
    pub error: Option<&'static str>,
}

/// Answer `message` in `session_id` (a fresh session when `None`).
pub async fn respond(
    state: &AppState,
    message: &str,
    session_id: Option<String>,
    user_id: Option<String>,
) -> Result<Reply, ServerError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(ServerError::BadRequest("Message is required".into()));
    }
    let session_id = session_id
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    // Only signed-in callers get prompt history, and only their own turns.
    let history = match user_id.as_deref() {
        Some(user) => {
            state
                .store
                .recent_ai_messages(&session_id, user, state.config.inference.history_limit)
                .await?
        }
        None => Vec::new(),
    };

    state
        .store
        .append_ai_message(turn(&session_id, user_id.as_deref(), ChatRole::User, message))
        .await?;

    let (response, source) = generate(state, message, &history).await;
    let error = (source == ReplySource::Loading).then_some(LOADING_ERROR);
    tracing::info!(session = %session_id, %source, "chatbot replied");

    state
        .store
        .append_ai_message(turn(&session_id, user_id.as_deref(), ChatRole::Assistant, &response))
        .await?;

    Ok(Reply { session_id, response, source, error })
}

fn turn(session_id: &str, user_id: Option<&str>, role: ChatRole, content: &str) -> AiChatMessage {
    AiChatMessage {
        id: Uuid::new_v4().to_string(),
        session_id: session_id.to_owned(),
        user_id: user_id.map(str::to_owned),
        role: role.to_string(),
        content: content.to_owned(),
        created_at: Utc::now(),
    }
}

/// Structured turn list: system prompt, prior turns, current message.
fn build_messages(state: &AppState, message: &str, history: &[AiChatMessage]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system_prompt(
        &state.config.owner_name,
        &state.config.site_name,
    )));
    messages.extend(
        history
            .iter()
            .filter(|m| m.role != ChatRole::System.as_ref())
            .map(|m| ChatMessage::new(m.role.clone(), m.content.clone())),
    );
    messages.push(ChatMessage::user(message));
    messages
}

async fn generate(state: &AppState, message: &str, history: &[AiChatMessage]) -> (String, ReplySource) {
    let owner = &state.config.owner_name;
    let client = &state.inference;
    if !client.is_configured() {
        tracing::warn!("inference api key not configured; using canned reply");
        return (fallback_reply(message, owner), ReplySource::Fallback);
    }

    let first = Completion {
        messages: build_messages(state, message, history),
        max_tokens: MAX_TOKENS,
        temperature: TEMPERATURE,
    };
    match client.complete(first).await {
        Ok(text) => (text, ReplySource::Model),
        Err(InferenceError::Loading) => {
            tracing::warn!("inference model is loading");
            (LOADING_REPLY.to_owned(), ReplySource::Loading)
        }
        Err(InferenceError::Status(status)) => {
            tracing::error!(status, "inference request failed; retrying with a simplified prompt");
            let retry = Completion {
                messages: vec![
                    ChatMessage::system(format!(
                        "You are an assistant for {owner}'s portfolio website. Answer briefly."
                    )),
                    ChatMessage::user(message),
                ],
                max_tokens: RETRY_MAX_TOKENS,
                temperature: RETRY_TEMPERATURE,
            };
            match client.complete(retry).await {
                Ok(text) => (text, ReplySource::SimplifiedModel),
                Err(e) => {
                    tracing::error!(error = %e, "simplified inference request failed");
                    (fallback_reply(message, owner), ReplySource::Fallback)
                }
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "inference request failed");
            (fallback_reply(message, owner), ReplySource::Fallback)
        }
    }
}
