//! Provider secrets never reach the logs

mod common;

use common::{ScriptedAdapter, Step};
use parking_lot::Mutex;
use quill_core::{
    AiService, CompletionOptions, Credentials, ErrorKind, Message, ProviderDescriptor,
    ProviderRegistry, QuillConfig, RawProviderError, RegisteredProvider,
};
use std::io;
use std::sync::Arc;

const SECRET: &str = "sk-ant-REDACTED";

/// In-memory log sink shared with the subscriber
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

fn provider(name: &str, priority: u32, adapter: Arc<ScriptedAdapter>) -> RegisteredProvider {
    RegisteredProvider::new(
        ProviderDescriptor::new(name, priority),
        adapter,
        Credentials::new(SECRET),
    )
}

fn http(status: u16, body: String) -> Step {
    Step::Fail(RawProviderError::Http {
        status,
        body,
        retry_after: None,
    })
}

#[tokio::test(start_paused = true)]
async fn secrets_stay_out_of_trace_output() {
    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let rejected = format!(r#"{{"error":{{"message":"invalid x-api-key {SECRET}"}}}}"#);
    let echoed = format!("Bearer {SECRET} is over quota");
    let registry = ProviderRegistry::new(vec![
        provider("claude", 0, ScriptedAdapter::always(http(401, rejected))),
        provider("openai", 1, ScriptedAdapter::always(http(503, echoed))),
        provider("local", 2, ScriptedAdapter::always(Step::Reply("a quiet harbour"))),
    ])
    .unwrap();
    let service = AiService::new(QuillConfig::default(), Arc::new(registry)).unwrap();

    let response = service
        .complete(vec![Message::user("Suggest a title")], CompletionOptions::default())
        .await
        .unwrap();
    assert_eq!(response.provider(), "local");

    let leaked = service
        .complete(
            vec![Message::user(format!("my api_key={SECRET}"))],
            CompletionOptions::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(leaked.kind(), ErrorKind::Validation);
    assert!(!leaked.message().contains(SECRET));

    tracing::debug!(service = ?service, "service state");

    let logs = capture.text();
    assert!(logs.contains("claude"), "nothing was captured: {logs}");
    assert!(logs.contains("openai"));
    assert!(!logs.contains(SECRET), "secret found in logs:\n{logs}");
}
