//! Scripted backends for deterministic testing.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use reedit_inference::mock::MockVisionBackend;
//!
//! let vision = MockVisionBackend::new()
//!     .with_response(r#"{"1": "There is a difference at color, ..."}"#)
//!     .with_response("oops");
//! ```
//!
//! Scripted responses are returned in order; once exhausted, the default
//! response is returned for every further call.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reedit_core::{Error, ImageEditBackend, ImageRef, Result, VisionBackend};

/// One recorded call to a mock backend.
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    /// System instruction (empty for edit calls).
    pub system: String,
    /// User prompt or edit prompt.
    pub prompt: String,
    /// Images passed to the call, in order.
    pub images: Vec<Vec<u8>>,
}

#[derive(Debug)]
enum Scripted {
    Text(String),
    Fail(String),
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<Scripted>,
    calls: Vec<MockCall>,
    health_checks: usize,
}

fn lock(state: &Mutex<MockState>) -> std::sync::MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock vision backend returning scripted text.
#[derive(Clone)]
pub struct MockVisionBackend {
    state: Arc<Mutex<MockState>>,
    default_response: String,
    model: String,
    healthy: bool,
}

impl Default for MockVisionBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockVisionBackend {
    /// Create a mock that answers `{}` unless scripted otherwise.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            default_response: "{}".to_string(),
            model: "mock-vision".to_string(),
            healthy: true,
        }
    }

    /// Queue a response for the next unanswered call.
    pub fn with_response(self, response: impl Into<String>) -> Self {
        lock(&self.state)
            .script
            .push_back(Scripted::Text(response.into()));
        self
    }

    /// Queue a transport failure for the next unanswered call.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        lock(&self.state)
            .script
            .push_back(Scripted::Fail(message.into()));
        self
    }

    /// Response used once the script is exhausted.
    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    /// Answer health checks with `healthy`.
    pub fn with_healthy(mut self, healthy: bool) -> Self {
        self.healthy = healthy;
        self
    }

    /// All calls received so far.
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.state).calls.clone()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        lock(&self.state).calls.len()
    }

    /// Number of health checks received so far.
    pub fn health_check_count(&self) -> usize {
        lock(&self.state).health_checks
    }
}

#[async_trait]
impl VisionBackend for MockVisionBackend {
    async fn analyze(
        &self,
        images: &[ImageRef<'_>],
        system: &str,
        prompt: &str,
    ) -> Result<String> {
        let mut state = lock(&self.state);
        state.calls.push(MockCall {
            system: system.to_string(),
            prompt: prompt.to_string(),
            images: images.iter().map(|i| i.data.to_vec()).collect(),
        });
        match state.script.pop_front() {
            Some(Scripted::Text(text)) => Ok(text),
            Some(Scripted::Fail(message)) => Err(Error::Request(message)),
            None => Ok(self.default_response.clone()),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        lock(&self.state).health_checks += 1;
        Ok(self.healthy)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Mock image-edit backend.
///
/// Returns the configured bytes, or by default the prompt's UTF-8 bytes
/// appended to the input image, which keeps outputs deterministic and
/// distinguishable per row.
#[derive(Clone)]
pub struct MockEditBackend {
    state: Arc<Mutex<MockState>>,
    fixed_output: Option<Vec<u8>>,
    model: String,
    healthy: bool,
}

impl Default for MockEditBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEditBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            fixed_output: None,
            model: "mock-edit".to_string(),
            healthy: true,
        }
    }

    /// Always return these bytes.
    pub fn with_output(mut self, output: Vec<u8>) -> Self {
        self.fixed_output = Some(output);
        self
    }

    /// Queue a transport failure for the next call.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        lock(&self.state)
            .script
            .push_back(Scripted::Fail(message.into()));
        self
    }

    /// Answer health checks with `healthy`.
    pub fn with_healthy(mut self, healthy: bool) -> Self {
        self.healthy = healthy;
        self
    }

    /// All calls received so far.
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.state).calls.clone()
    }

    /// Number of health checks received so far.
    pub fn health_check_count(&self) -> usize {
        lock(&self.state).health_checks
    }
}

#[async_trait]
impl ImageEditBackend for MockEditBackend {
    async fn edit(&self, image_png: &[u8], prompt: &str) -> Result<Vec<u8>> {
        let mut state = lock(&self.state);
        state.calls.push(MockCall {
            system: String::new(),
            prompt: prompt.to_string(),
            images: vec![image_png.to_vec()],
        });
        if let Some(Scripted::Fail(message)) = state.script.pop_front() {
            return Err(Error::Request(message));
        }
        Ok(match self.fixed_output {
            Some(ref output) => output.clone(),
            None => [image_png, prompt.as_bytes()].concat(),
        })
    }

    async fn health_check(&self) -> Result<bool> {
        lock(&self.state).health_checks += 1;
        Ok(self.healthy)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_vision_script_then_default() {
        let mock = MockVisionBackend::new()
            .with_response("first")
            .with_default_response("fallback");

        let image = [1u8, 2, 3];
        let a = mock
            .analyze(&[ImageRef::new(&image)], "sys", "p1")
            .await
            .unwrap();
        let b = mock.analyze(&[], "sys", "p2").await.unwrap();

        assert_eq!(a, "first");
        assert_eq!(b, "fallback");
        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.calls()[0].images, vec![vec![1, 2, 3]]);
        assert_eq!(mock.calls()[1].prompt, "p2");
    }

    #[tokio::test]
    async fn test_vision_failure() {
        let mock = MockVisionBackend::new().with_failure("connection reset");
        let err = mock.analyze(&[], "", "p").await.unwrap_err();
        assert!(matches!(err, Error::Request(_)));
    }

    #[tokio::test]
    async fn test_edit_default_output_is_deterministic() {
        let mock = MockEditBackend::new();
        let out = mock.edit(b"img", "+sky").await.unwrap();
        assert_eq!(out, b"img+sky".to_vec());
        assert_eq!(mock.calls()[0].prompt, "+sky");
    }

    #[tokio::test]
    async fn test_health_check_is_scripted_and_counted() {
        let vision = MockVisionBackend::new().with_healthy(false);
        assert!(!vision.health_check().await.unwrap());
        assert_eq!(vision.health_check_count(), 1);
        assert_eq!(vision.call_count(), 0);

        let editor = MockEditBackend::new();
        assert!(editor.health_check().await.unwrap());
        assert_eq!(editor.health_check_count(), 1);
    }

    #[tokio::test]
    async fn test_edit_fixed_output() {
        let mock = MockEditBackend::new().with_output(vec![9, 9]);
        assert_eq!(mock.edit(b"img", "x").await.unwrap(), vec![9, 9]);
    }
}
