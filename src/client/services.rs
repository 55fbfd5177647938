//! External Services Client
//!
//! HTTP client for the collaborators a session consumes but does not
//! implement: the question service (problem lookup and code execution) and
//! the coding assistant. Both answer with the envelope
//! `{ "success": bool, "data": ..., "message": ... }`.
//!
//! Failures here never touch the sync state. A failed execution becomes a
//! report in which every case failed; a failed assistant call becomes an
//! apology entry in the chat panel.

use crate::shared::language::Language;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reply shown when the assistant answers with `success: false`
pub const ASSISTANT_ERROR_REPLY: &str = "Sorry, I encountered an error. Please try again.";

/// Reply shown when the assistant cannot be reached
pub const ASSISTANT_UNAVAILABLE_REPLY: &str =
    "Unable to connect to the chatbot service. Please try again later.";

/// External service failures
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} service URL is not configured")]
    NotConfigured(&'static str),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("request failed with status {0}")]
    Status(u16),
    #[error("{0}")]
    Rejected(String),
    #[error("no test cases available")]
    NoTestCases,
}

/// Response envelope shared by both services
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// Payload of a successful response
    pub fn into_result(self, fallback: &str) -> Result<T, ServiceError> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(ServiceError::Rejected(
                self.message.unwrap_or_else(|| fallback.to_string()),
            )),
        }
    }
}

/// One input/expected-output pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub expected_output: String,
}

/// Worked example attached to a question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Example {
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Problem being solved in the session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub examples: Vec<Example>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

/// Test cases to run for `question`
///
/// Prefers the explicit test cases and falls back to the worked examples.
pub fn select_test_cases(question: &Question) -> Vec<TestCase> {
    if !question.test_cases.is_empty() {
        return question.test_cases.clone();
    }
    question
        .examples
        .iter()
        .map(|example| TestCase {
            input: example.input.clone().unwrap_or_default(),
            expected_output: example.output.clone().unwrap_or_default(),
        })
        .collect()
}

/// Outcome of one test case
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub expected_output: String,
    #[serde(default)]
    pub actual_output: String,
    pub passed: bool,
    #[serde(default)]
    pub test_case_number: usize,
}

/// Result of running the shared code against a set of test cases
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ExecutionReport {
    #[serde(default)]
    pub results: Vec<TestResult>,
    #[serde(default)]
    pub output: String,
}

impl ExecutionReport {
    /// Report in which every case failed with `reason`
    pub fn failed(test_cases: &[TestCase], reason: &str) -> Self {
        let results = test_cases
            .iter()
            .enumerate()
            .map(|(idx, case)| TestResult {
                input: case.input.clone(),
                expected_output: case.expected_output.clone(),
                actual_output: format!("Error: {}", reason),
                passed: false,
                test_case_number: idx + 1,
            })
            .collect();
        Self {
            results,
            output: format!("Error executing code: {}", reason),
        }
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn all_passed(&self) -> bool {
        !self.results.is_empty() && self.passed_count() == self.results.len()
    }

    /// Human-readable summary of the results
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Results: {}/{} test cases passed.\n\n",
            self.passed_count(),
            self.results.len()
        );
        for result in &self.results {
            out.push_str(&format!(
                "Test Case {}: {}\n  Input: {}\n  Expected: {}\n  Got: {}\n\n",
                result.test_case_number,
                if result.passed { "PASSED" } else { "FAILED" },
                result.input,
                result.expected_output,
                result.actual_output
            ));
        }
        out.push_str(if self.all_passed() {
            "All test cases passed!"
        } else {
            "Some test cases failed."
        });
        out
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteRequest<'a> {
    code: &'a str,
    language: &'a str,
    test_cases: &'a [TestCase],
}

/// Editor state sent along with an assistant question
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AssistantContext {
    pub question_id: Option<String>,
    pub question: Option<String>,
    pub code: String,
    pub language: String,
}

#[derive(Debug, Serialize)]
struct AssistantRequest<'a> {
    message: &'a str,
    mode: &'static str,
    context: &'a AssistantContext,
}

#[derive(Debug, Deserialize)]
struct AssistantReply {
    response: String,
}

/// Client for the question and assistant services
#[derive(Debug, Clone)]
pub struct ServiceClient {
    client: Client,
    questions_url: Option<String>,
    chatbot_url: Option<String>,
}

impl ServiceClient {
    pub fn new(questions_url: Option<String>, chatbot_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            questions_url: questions_url.map(|u| u.trim_end_matches('/').to_string()),
            chatbot_url: chatbot_url.map(|u| u.trim_end_matches('/').to_string()),
        }
    }

    /// Look up a question by id
    pub async fn fetch_question(&self, id: &str) -> Result<Question, ServiceError> {
        let base = self
            .questions_url
            .as_deref()
            .ok_or(ServiceError::NotConfigured("questions"))?;
        let response = self
            .client
            .get(format!("{}/api/questions/{}", base, id))
            .send()
            .await?;
        read_envelope::<Question>(response)
            .await?
            .into_result("Failed to load question")
    }

    /// Run `code` against `test_cases` on the execution service
    pub async fn execute(
        &self,
        code: &str,
        language: Language,
        test_cases: &[TestCase],
    ) -> Result<ExecutionReport, ServiceError> {
        if test_cases.is_empty() {
            return Err(ServiceError::NoTestCases);
        }
        let base = self
            .questions_url
            .as_deref()
            .ok_or(ServiceError::NotConfigured("questions"))?;
        let request = ExecuteRequest {
            code,
            language: language.as_str(),
            test_cases,
        };
        let response = self
            .client
            .post(format!("{}/api/questions/execute", base))
            .json(&request)
            .send()
            .await?;
        read_envelope::<ExecutionReport>(response)
            .await?
            .into_result("Execution failed")
    }

    /// Run code, turning any failure into an all-failed report
    pub async fn execute_or_report(
        &self,
        code: &str,
        language: Language,
        test_cases: &[TestCase],
    ) -> ExecutionReport {
        match self.execute(code, language, test_cases).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!("[Services] Execution failed: {}", e);
                ExecutionReport::failed(test_cases, &e.to_string())
            }
        }
    }

    /// Ask the coding assistant
    pub async fn ask_assistant(
        &self,
        message: &str,
        context: &AssistantContext,
    ) -> Result<String, ServiceError> {
        let base = self
            .chatbot_url
            .as_deref()
            .ok_or(ServiceError::NotConfigured("chatbot"))?;
        let request = AssistantRequest {
            message,
            mode: "coding",
            context,
        };
        let response = self
            .client
            .post(format!("{}/api/chatbot/chat", base))
            .json(&request)
            .send()
            .await?;
        let reply = read_envelope::<AssistantReply>(response)
            .await?
            .into_result(ASSISTANT_ERROR_REPLY)?;
        Ok(reply.response)
    }

    /// Assistant reply text, or the apology to show instead
    pub async fn assistant_reply(&self, message: &str, context: &AssistantContext) -> String {
        match self.ask_assistant(message, context).await {
            Ok(reply) => reply,
            Err(ServiceError::Rejected(reason)) => {
                tracing::warn!("[Services] Assistant rejected request: {}", reason);
                ASSISTANT_ERROR_REPLY.to_string()
            }
            Err(e) => {
                tracing::warn!("[Services] Assistant unavailable: {}", e);
                ASSISTANT_UNAVAILABLE_REPLY.to_string()
            }
        }
    }
}

async fn read_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<Envelope<T>, ServiceError> {
    let status = response.status();
    match response.json::<Envelope<T>>().await {
        Ok(envelope) => Ok(envelope),
        Err(_) if !status.is_success() => Err(ServiceError::Status(status.as_u16())),
        Err(e) => Err(ServiceError::Network(e)),
    }
}
