mod common;

#[cfg(test)]
mod tests {
    use crate::common::fixtures::*;
    use assert_matches::assert_matches;
    use daily_question_notifier::Error;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn messages_path() -> String {
        format!("/2010-04-01/Accounts/{ACCOUNT_SID}/Messages.json")
    }

    #[tokio::test]
    async fn test_send_sms_creates_one_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(messages_path()))
            .and(header_exists("authorization"))
            .and(body_string_contains("To=%2B447700900001"))
            .and(body_string_contains("From=%2B447700900002"))
            .and(body_string_contains("Body=What+is+a+monad%3F"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "sid": "SM1b2c3d4e5f60718293a4b5c6d7e8f901",
                "status": "queued"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let id = sms_dispatcher(&mock_server).send_sms(QUESTION).await.unwrap();

        assert_eq!(id.to_string(), "SM1b2c3d4e5f60718293a4b5c6d7e8f901");
    }

    #[tokio::test]
    async fn test_bad_credentials_are_invalid_key() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "code": 20003,
                "message": "Authenticate",
                "more_info": "https://www.twilio.com/docs/errors/20003",
                "status": 401
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = sms_dispatcher(&mock_server).send_sms(QUESTION).await.unwrap_err();

        assert_matches!(err, Error::InvalidKey { provider: "twilio", .. });
    }

    #[tokio::test]
    async fn test_invalid_number_is_rejected_without_retry() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "code": 21211,
                "message": "The 'To' number +447700900001 is not a valid phone number.",
                "status": 400
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = sms_dispatcher(&mock_server).send_sms(QUESTION).await.unwrap_err();

        assert_matches!(err, Error::Rejected { provider: "twilio", status: 400, .. });
        assert!(!err.is_operator_attention());
    }
}
