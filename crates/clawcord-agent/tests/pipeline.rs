// End-to-end behavior of the mention pipeline against a scripted backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use clawcord_agent::event::parse_event_line;
use clawcord_agent::pipeline::{
    Disposition, InboundMessage, MentionPipeline, ReplyChannel, ReplyKind, ReplyPolicy,
};
use clawcord_agent::{
    AgentError, AssistantBackend, ContentBlock, EventStream, QueryOptions, ReceivedEvent,
    ResponseEvent,
};
use clawcord_core::config::MessagesConfig;

const AGENT: u64 = 1000;
const USER: u64 = 7;

/// Backend that replays a script chosen by prompt and counts queries.
struct ScriptedBackend {
    queries: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            queries: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn script(prompt: &str) -> Vec<Result<ResponseEvent, AgentError>> {
        let text = |s: &str| -> Result<ResponseEvent, AgentError> {
            Ok(ResponseEvent::assistant(vec![ContentBlock::text(s)]))
        };
        match prompt {
            "nothing" => vec![Ok(ResponseEvent::System {
                subtype: Some("init".into()),
                session_id: None,
            })],
            "huge" => vec![text(&"z".repeat(4001))],
            "tools" => vec![
                text("a"),
                Ok(ResponseEvent::assistant(vec![ContentBlock::tool_use(
                    "Bash",
                    json!({"command": "ls", "description": "list"}),
                )])),
                text("b"),
            ],
            "midstream" => vec![text("partial"), Err(AgentError::Reply("backend died".into()))],
            "double" => vec![
                Err(AgentError::Reply("first".into())),
                text("between"),
                Err(AgentError::Reply("second".into())),
            ],
            "bad tool" => vec![Ok(ResponseEvent::assistant(vec![ContentBlock::tool_use(
                "Bash",
                json!({}),
            )]))],
            other => vec![text(&format!("echo: {other}"))],
        }
    }
}

impl AssistantBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn query(&self, prompt: String, _options: Arc<QueryOptions>) -> EventStream {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.clone());
        let items = Self::script(&prompt);
        Box::pin(async_stream::stream! {
            for item in items {
                // Give other in-flight handlers a chance to run between events.
                tokio::task::yield_now().await;
                yield item.map(ReceivedEvent::from);
            }
        })
    }
}

/// Backend that decodes fixed stdout lines the way the CLI backend does.
struct LineBackend {
    lines: Vec<&'static str>,
}

impl AssistantBackend for LineBackend {
    fn name(&self) -> &str {
        "lines"
    }

    fn query(&self, _prompt: String, _options: Arc<QueryOptions>) -> EventStream {
        let items: Vec<_> = self
            .lines
            .iter()
            .filter_map(|line| parse_event_line(line).transpose())
            .collect();
        Box::pin(futures_util::stream::iter(items))
    }
}

/// In-memory sink for formatted log output.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Records replies and counts activity indicators.
#[derive(Default)]
struct RecordingChannel {
    replies: Mutex<Vec<String>>,
    activity: AtomicUsize,
    fail_replies: AtomicUsize,
}

impl RecordingChannel {
    fn failing(n: usize) -> Self {
        let channel = Self::default();
        channel.fail_replies.store(n, Ordering::SeqCst);
        channel
    }

    fn replies(&self) -> Vec<String> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplyChannel for RecordingChannel {
    type Activity = ();

    fn start_activity(&self) -> Self::Activity {
        self.activity.fetch_add(1, Ordering::SeqCst);
    }

    async fn reply(&self, text: &str) -> Result<(), AgentError> {
        let remaining = self.fail_replies.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_replies.store(remaining - 1, Ordering::SeqCst);
            return Err(AgentError::Reply("discord said no".into()));
        }
        self.replies.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

fn templates() -> MessagesConfig {
    MessagesConfig {
        empty_message: "EMPTY_MESSAGE".into(),
        long_response_warning: "LONG_RESPONSE".into(),
        empty_response: "EMPTY_RESPONSE".into(),
        general_error: "GENERAL_ERROR".into(),
    }
}

fn pipeline(backend: Arc<ScriptedBackend>) -> MentionPipeline {
    MentionPipeline::new(
        backend,
        QueryOptions::default(),
        ReplyPolicy::new(templates(), 4000),
    )
}

fn mention(text: &str) -> InboundMessage {
    InboundMessage {
        author_id: USER,
        content: format!("<@{AGENT}> {text}"),
        mentions: vec![AGENT],
    }
}

#[tokio::test]
async fn ignores_messages_without_mention() {
    let backend = ScriptedBackend::new();
    let pipeline = pipeline(Arc::clone(&backend));
    let channel = RecordingChannel::default();
    let msg = InboundMessage {
        author_id: USER,
        content: "hello everyone".into(),
        mentions: vec![USER + 1],
    };

    assert_eq!(
        pipeline.handle(AGENT, &msg, &channel).await,
        Disposition::NotMentioned
    );
    assert!(channel.replies().is_empty());
    assert_eq!(backend.queries(), 0);
}

#[tokio::test]
async fn ignores_own_messages_even_when_mentioned() {
    let backend = ScriptedBackend::new();
    let pipeline = pipeline(Arc::clone(&backend));
    let channel = RecordingChannel::default();
    let mut msg = mention("talking to myself");
    msg.author_id = AGENT;

    assert_eq!(
        pipeline.handle(AGENT, &msg, &channel).await,
        Disposition::SelfAuthored
    );
    assert!(channel.replies().is_empty());
    assert_eq!(backend.queries(), 0);
}

#[tokio::test]
async fn empty_prompt_short_circuits() {
    let backend = ScriptedBackend::new();
    let pipeline = pipeline(Arc::clone(&backend));
    let channel = RecordingChannel::default();
    let msg = InboundMessage {
        author_id: USER,
        content: format!("  <@{AGENT}>   <@!{AGENT}>\n"),
        mentions: vec![AGENT],
    };

    assert_eq!(
        pipeline.handle(AGENT, &msg, &channel).await,
        Disposition::Replied(ReplyKind::EmptyPrompt)
    );
    assert_eq!(channel.replies(), vec!["EMPTY_MESSAGE"]);
    assert_eq!(backend.queries(), 0);
    assert_eq!(channel.activity.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn successful_answer_is_sent_verbatim() {
    let backend = ScriptedBackend::new();
    let pipeline = pipeline(Arc::clone(&backend));
    let channel = RecordingChannel::default();

    let outcome = pipeline.handle(AGENT, &mention("tools"), &channel).await;

    assert_eq!(outcome, Disposition::Replied(ReplyKind::Answer));
    assert_eq!(
        channel.replies(),
        vec!["a\n**Bash**\n```\n$ ls # list\n```\nb"]
    );
    assert_eq!(backend.prompts.lock().unwrap().as_slice(), ["tools"]);
    assert_eq!(channel.activity.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn oversized_answer_is_withheld() {
    let backend = ScriptedBackend::new();
    let pipeline = pipeline(Arc::clone(&backend));
    let channel = RecordingChannel::default();

    let outcome = pipeline.handle(AGENT, &mention("huge"), &channel).await;

    assert_eq!(outcome, Disposition::Replied(ReplyKind::TooLong));
    let replies = channel.replies();
    assert_eq!(replies, vec!["LONG_RESPONSE"]);
    assert!(!replies[0].contains("zzz"));
}

#[tokio::test]
async fn no_text_yields_empty_response() {
    let backend = ScriptedBackend::new();
    let pipeline = pipeline(Arc::clone(&backend));
    let channel = RecordingChannel::default();

    let outcome = pipeline.handle(AGENT, &mention("nothing"), &channel).await;

    assert_eq!(outcome, Disposition::Replied(ReplyKind::EmptyResponse));
    assert_eq!(channel.replies(), vec!["EMPTY_RESPONSE"]);
}

#[tokio::test]
async fn midstream_failure_discards_partial_text() {
    let backend = ScriptedBackend::new();
    let pipeline = pipeline(Arc::clone(&backend));
    let channel = RecordingChannel::default();

    let outcome = pipeline.handle(AGENT, &mention("midstream"), &channel).await;

    assert_eq!(outcome, Disposition::Replied(ReplyKind::Failed));
    assert_eq!(channel.replies(), vec!["GENERAL_ERROR"]);
}

#[tokio::test]
async fn several_errors_still_produce_one_reply() {
    let backend = ScriptedBackend::new();
    let pipeline = pipeline(Arc::clone(&backend));
    let channel = RecordingChannel::default();

    let outcome = pipeline.handle(AGENT, &mention("double"), &channel).await;

    assert_eq!(outcome, Disposition::Replied(ReplyKind::Failed));
    assert_eq!(channel.replies(), vec!["GENERAL_ERROR"]);
}

#[tokio::test]
async fn flattening_error_is_contained() {
    let backend = ScriptedBackend::new();
    let pipeline = pipeline(Arc::clone(&backend));
    let channel = RecordingChannel::default();

    let outcome = pipeline.handle(AGENT, &mention("bad tool"), &channel).await;

    assert_eq!(outcome, Disposition::Replied(ReplyKind::Failed));
    assert_eq!(channel.replies(), vec!["GENERAL_ERROR"]);
}

#[tokio::test]
async fn failed_send_falls_back_to_general_error() {
    let backend = ScriptedBackend::new();
    let pipeline = pipeline(Arc::clone(&backend));
    let channel = RecordingChannel::failing(1);

    let outcome = pipeline.handle(AGENT, &mention("hi"), &channel).await;

    assert_eq!(outcome, Disposition::Replied(ReplyKind::Failed));
    assert_eq!(channel.replies(), vec!["GENERAL_ERROR"]);
}

#[tokio::test]
async fn undeliverable_fallback_does_not_panic() {
    let backend = ScriptedBackend::new();
    let pipeline = pipeline(Arc::clone(&backend));
    let channel = RecordingChannel::failing(2);

    let outcome = pipeline.handle(AGENT, &mention("hi"), &channel).await;

    assert_eq!(outcome, Disposition::Replied(ReplyKind::Failed));
    assert!(channel.replies().is_empty());
}

#[tokio::test]
async fn failing_message_does_not_disturb_concurrent_one() {
    let backend = ScriptedBackend::new();
    let pipeline = pipeline(Arc::clone(&backend));
    let failing = RecordingChannel::default();
    let healthy = RecordingChannel::default();

    let msg_a = mention("midstream");
    let msg_b = mention("tools");
    let (a, b) = tokio::join!(
        pipeline.handle(AGENT, &msg_a, &failing),
        pipeline.handle(AGENT, &msg_b, &healthy),
    );

    assert_eq!(a, Disposition::Replied(ReplyKind::Failed));
    assert_eq!(b, Disposition::Replied(ReplyKind::Answer));
    assert_eq!(failing.replies(), vec!["GENERAL_ERROR"]);
    assert_eq!(
        healthy.replies(),
        vec!["a\n**Bash**\n```\n$ ls # list\n```\nb"]
    );
    assert_eq!(backend.queries(), 2);
}

#[tokio::test]
async fn every_mention_gets_exactly_one_reply() {
    let backend = ScriptedBackend::new();
    let pipeline = pipeline(Arc::clone(&backend));

    for prompt in ["", "huge", "nothing", "hello", "midstream"] {
        let channel = RecordingChannel::default();
        let outcome = pipeline.handle(AGENT, &mention(prompt), &channel).await;
        assert!(matches!(outcome, Disposition::Replied(_)), "{prompt}");
        assert_eq!(channel.replies().len(), 1, "prompt {prompt:?}");
    }
}

#[tokio::test]
async fn logs_each_event_with_every_field() {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let backend = Arc::new(LineBackend {
        lines: vec![
            r#"{"type":"system","subtype":"init","session_id":"s-1","model":"claude-sonnet-4-5","tools":["Bash"]}"#,
            r#"{"type":"stream_event","event":{"delta":"partial"}}"#,
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"hi"}]}}"#,
            r#"{"type":"result","subtype":"success","is_error":false,"usage":{"input_tokens":12}}"#,
        ],
    });
    let pipeline = MentionPipeline::new(
        backend,
        QueryOptions::default(),
        ReplyPolicy::new(templates(), 4000),
    );
    let channel = RecordingChannel::default();

    let outcome = pipeline.handle(AGENT, &mention("hello"), &channel).await;

    assert_eq!(outcome, Disposition::Replied(ReplyKind::Answer));
    assert_eq!(channel.replies(), vec!["hi"]);

    let logs = logs.contents();
    assert!(logs.contains(r#""model":"claude-sonnet-4-5","tools":["Bash"]"#), "{logs}");
    assert!(logs.contains(r#"{"type":"stream_event","event":{"delta":"partial"}}"#), "{logs}");
    assert!(logs.contains(r#""usage":{"input_tokens":12}"#), "{logs}");
}
