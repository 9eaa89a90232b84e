/// Shared test fixtures and utilities for test modules
#[allow(dead_code)]
pub mod fixtures {
    use async_trait::async_trait;
    use daily_question_notifier::Result;
    use daily_question_notifier::notifications::{DirectPushSender, PushDispatcher, PushoverClient, SmsDispatcher, TwilioClient};
    use daily_question_notifier::pipeline::Pipeline;
    use daily_question_notifier::questions::QuestionRecord;
    use daily_question_notifier::traits::{PushSender, QuestionSource, SmsSender};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use wiremock::MockServer;

    pub const QUESTION: &str = "What is a monad?";
    pub const TITLE: &str = "Daily Development Question";
    pub const USER_KEY: &str = "uQiRzpo4DXghDmr9QzzfQu27cmVRsG";
    pub const APP_TOKEN: &str = "azGDORePK8gMaC0QOYAMyEEuzJnyUi";
    pub const ACCOUNT_SID: &str = "AC00000000000000000000000000000000";
    pub const AUTH_TOKEN: &str = "twilio-auth-token";
    pub const TO_NUMBER: &str = "+447700900001";
    pub const FROM_NUMBER: &str = "+447700900002";

    /// In-memory question source that counts each simulated connection.
    #[derive(Default)]
    pub struct FakeQuestionSource {
        pub questions: Vec<String>,
        pub opened: AtomicUsize,
        pub closed: AtomicUsize,
    }

    impl FakeQuestionSource {
        pub fn with(questions: &[&str]) -> Self {
            Self {
                questions: questions.iter().map(|q| q.to_string()).collect(),
                ..Self::default()
            }
        }

        pub fn opened(&self) -> usize {
            self.opened.load(Ordering::SeqCst)
        }

        pub fn closed(&self) -> usize {
            self.closed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QuestionSource for FakeQuestionSource {
        async fn sample(&self) -> Result<Option<QuestionRecord>> {
            let n = self.opened.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            let record = if self.questions.is_empty() {
                None
            } else {
                Some(QuestionRecord::new(self.questions[n % self.questions.len()].clone()))
            };
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(record)
        }
    }

    pub fn pushover_url(server: &MockServer) -> String {
        format!("{}/1/messages.json", server.uri())
    }

    /// Push dispatcher pointed at a mock server, with or without the client fallback.
    pub fn push_dispatcher(server: &MockServer, with_fallback: bool) -> PushDispatcher {
        let direct: Arc<dyn PushSender> = Arc::new(DirectPushSender::new(
            pushover_url(server),
            Some(format!(" {USER_KEY} ")),
            Some(APP_TOKEN.to_string()),
        ));
        let fallback = with_fallback.then(|| {
            Arc::new(PushoverClient::new(pushover_url(server), Some(USER_KEY), Some(APP_TOKEN)).unwrap())
                as Arc<dyn PushSender>
        });
        PushDispatcher::new(direct, fallback)
    }

    pub fn sms_dispatcher(server: &MockServer) -> SmsDispatcher {
        let client = TwilioClient::new(server.uri(), Some(ACCOUNT_SID), Some(AUTH_TOKEN)).unwrap();
        SmsDispatcher::new(
            Some(Arc::new(client) as Arc<dyn SmsSender>),
            Some(TO_NUMBER.to_string()),
            Some(FROM_NUMBER.to_string()),
        )
    }

    pub fn pipeline(source: Arc<FakeQuestionSource>, server: &MockServer) -> Pipeline {
        Pipeline::new(
            source,
            Some(push_dispatcher(server, true)),
            Some(sms_dispatcher(server)),
            TITLE,
        )
    }

    /// Poll until the mock server has seen `count` requests or give up.
    pub async fn wait_for_requests(server: &MockServer, count: usize) {
        for _ in 0..200 {
            let seen = server.received_requests().await.map(|r| r.len()).unwrap_or(0);
            if seen >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {count} requests");
    }

    pub fn pushover_accepted() -> serde_json::Value {
        serde_json::json!({
            "status": 1,
            "request": "647d2300-702c-4b38-8b2f-d56326ae460b"
        })
    }
}
