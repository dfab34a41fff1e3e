//! In-memory doubles for crawler tests

use crate::crawler::shutdown::Shutdown;
use crate::crawler::transport::{HttpResponse, HttpTransport, TransportError};
use crate::parser::{PageParser, ParseError, Record};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

type Reply = Result<HttpResponse, TransportError>;

/// When a request started or finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    End,
}

#[derive(Debug, Clone)]
pub struct Event {
    pub url: String,
    pub phase: Phase,
    pub at: Instant,
}

#[derive(Default)]
struct StubState {
    replies: HashMap<String, VecDeque<Reply>>,
    counts: HashMap<String, usize>,
    events: Vec<Event>,
    triggers: HashMap<String, Shutdown>,
}

/// Scripted transport
///
/// Replies queued for a URL are served in order; the last one repeats once
/// the queue runs dry. Unscripted URLs get the default status. A URL may
/// also raise a shutdown flag once its reply has been produced, which stands
/// in for an interrupt arriving mid-request.
pub struct StubTransport {
    state: Mutex<StubState>,
    default_status: u16,
    latency: Duration,
}

impl StubTransport {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StubState::default()),
            default_status: 404,
            latency: Duration::ZERO,
        }
    }

    pub fn default_status(mut self, status: u16) -> Self {
        self.default_status = status;
        self
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn respond(self, url: &str, status: u16, body: &str) -> Self {
        self.push(
            url,
            Ok(HttpResponse {
                status,
                body: body.to_string(),
            }),
        )
    }

    pub fn fail(self, url: &str) -> Self {
        self.push(url, Err(TransportError::Connect("stub refused".to_string())))
    }

    /// Raises `shutdown` whenever `url` is served
    pub fn shutdown_after(self, url: &str, shutdown: &Shutdown) -> Self {
        self.state
            .lock()
            .unwrap()
            .triggers
            .insert(url.to_string(), shutdown.clone());
        self
    }

    fn push(self, url: &str, reply: Reply) -> Self {
        self.state
            .lock()
            .unwrap()
            .replies
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.state.lock().unwrap().counts.get(url).copied().unwrap_or(0)
    }

    pub fn total_requests(&self) -> usize {
        self.state.lock().unwrap().counts.values().sum()
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    fn record(&self, url: &str, phase: Phase) {
        self.state.lock().unwrap().events.push(Event {
            url: url.to_string(),
            phase,
            at: Instant::now(),
        });
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.record(url, Phase::Start);

        let (reply, trigger) = {
            let mut state = self.state.lock().unwrap();
            *state.counts.entry(url.to_string()).or_default() += 1;
            let reply = match state.replies.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            };
            (reply, state.triggers.get(url).cloned())
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(shutdown) = trigger {
            shutdown.trigger();
        }
        self.record(url, Phase::End);

        reply.unwrap_or_else(|| {
            Ok(HttpResponse {
                status: self.default_status,
                body: String::new(),
            })
        })
    }
}

/// Parses bodies of the form `recipe:<id> related:<id>,<id>`
pub struct StubParser;

impl PageParser for StubParser {
    fn parse(&self, id: &str, document: &str) -> Result<Record, ParseError> {
        let mut tokens = document.split_whitespace();
        match tokens.next() {
            Some(head) if head.starts_with("recipe:") => {}
            _ => return Err(ParseError::Malformed("not a stub recipe".to_string())),
        }

        let related = tokens
            .find_map(|token| token.strip_prefix("related:"))
            .map(|list| {
                list.split(',')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Record::new(id, related).with_field("title", format!("Stub {}", id)))
    }
}

/// Body the [`StubParser`] turns into a recipe with these related ids
pub fn stub_page(id: &str, related: &[&str]) -> String {
    format!("recipe:{} related:{}", id, related.join(","))
}
