//! Add / edit client form.
//!
//! Collects the raw connection fields, builds a candidate [`ClientConfig`]
//! and runs the connection test. Only a config that passed the test is
//! handed out by [`AddClientForm::done`].

use crate::views::custom_headers::HeaderList;

use deluge_core::client::{ConnectionValidator, ValidationStatus};
use deluge_core::ClientConfig;

use parking_lot::Mutex;
use std::sync::Arc;

/// Local validation failures, reported before any network traffic.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("Nickname cannot be left empty")]
    EmptyNickname,
    #[error("Hostname cannot be empty")]
    EmptyHostname,
    #[error("Port cannot be empty")]
    EmptyPort,
    #[error("Port must be a number between 0 and 65535")]
    InvalidPort,
    #[error("Invalid Config: unable to parse a valid URL from the config")]
    InvalidUrl,
}

/// Outcome of a connection test, sent on the form's event channel.
#[derive(Clone, Debug)]
pub enum FormEvent {
    Accepted(ClientConfig),
    Failed(String),
}

pub struct AddClientForm {
    title: &'static str,
    nickname: String,
    hostname: String,
    relative_path: String,
    port: String,
    password: String,
    ssl_enabled: bool,
    headers: HeaderList,
    status: ValidationStatus,
    /// Last config that passed the connection test
    config: Option<ClientConfig>,
    /// Bumped on every edit and every test; stale results are dropped
    attempt: u64,
    validator: Arc<dyn ConnectionValidator>,
    runtime: tokio::runtime::Handle,
    event_tx: async_channel::Sender<FormEvent>,
}

impl AddClientForm {
    pub fn new(
        validator: Arc<dyn ConnectionValidator>,
        runtime: tokio::runtime::Handle,
    ) -> (Self, async_channel::Receiver<FormEvent>) {
        let (event_tx, event_rx) = async_channel::bounded(16);
        let form = Self {
            title: "Add Client",
            nickname: String::new(),
            hostname: String::new(),
            relative_path: String::new(),
            port: String::new(),
            password: String::new(),
            ssl_enabled: false,
            headers: HeaderList::default(),
            status: ValidationStatus::Idle,
            config: None,
            attempt: 0,
            validator,
            runtime,
            event_tx,
        };
        (form, event_rx)
    }

    /// Form preloaded from a saved client. The existing config counts as
    /// accepted until something is edited.
    pub fn for_edit(
        config: ClientConfig,
        validator: Arc<dyn ConnectionValidator>,
        runtime: tokio::runtime::Handle,
    ) -> (Self, async_channel::Receiver<FormEvent>) {
        let (mut form, event_rx) = Self::new(validator, runtime);
        form.title = "Edit Client";
        form.nickname = config.nickname().to_string();
        form.hostname = config.hostname().to_string();
        form.relative_path = config.relative_path().to_string();
        form.port = config.port().to_string();
        form.password = config.password().to_string();
        form.ssl_enabled = !config.is_http();
        form.headers = HeaderList::from_headers(config.custom_headers());
        form.config = Some(config);
        (form, event_rx)
    }

    pub fn title(&self) -> &str {
        self.title
    }

    pub fn status(&self) -> &ValidationStatus {
        &self.status
    }

    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }

    pub fn ssl_enabled(&self) -> bool {
        self.ssl_enabled
    }

    /// The accepted config, if the last test succeeded.
    pub fn done(&self) -> Option<ClientConfig> {
        self.config.clone()
    }

    // ── Field edits ─────────────────────────────────────────────────────────

    pub fn set_nickname(&mut self, value: impl Into<String>) {
        self.nickname = value.into();
        self.invalidate();
    }

    pub fn set_hostname(&mut self, value: impl Into<String>) {
        self.hostname = value.into();
        self.invalidate();
    }

    pub fn set_relative_path(&mut self, value: impl Into<String>) {
        self.relative_path = value.into();
        self.invalidate();
    }

    pub fn set_port(&mut self, value: impl Into<String>) {
        self.port = value.into();
        self.invalidate();
    }

    pub fn set_password(&mut self, value: impl Into<String>) {
        self.password = value.into();
        self.invalidate();
    }

    pub fn set_ssl_enabled(&mut self, enabled: bool) {
        self.ssl_enabled = enabled;
        self.invalidate();
    }

    // ── Custom headers ──────────────────────────────────────────────────────

    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let added = self.headers.add(name, value);
        if added {
            self.invalidate();
        }
        added
    }

    pub fn edit_header(
        &mut self,
        index: usize,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> bool {
        let edited = self.headers.edit(index, name, value);
        if edited {
            self.invalidate();
        }
        edited
    }

    pub fn remove_header(&mut self, index: usize) -> Option<(String, String)> {
        let removed = self.headers.remove(index);
        if removed.is_some() {
            self.invalidate();
        }
        removed
    }

    pub fn remove_headers_named(&mut self, name: &str) -> usize {
        let removed = self.headers.remove_named(name);
        if removed > 0 {
            self.invalidate();
        }
        removed
    }

    pub fn clear_headers(&mut self) {
        if !self.headers.is_empty() {
            self.headers.clear();
            self.invalidate();
        }
    }

    fn invalidate(&mut self) {
        self.config = None;
        self.status = ValidationStatus::Idle;
        self.attempt += 1;
    }

    // ── Validation ──────────────────────────────────────────────────────────

    /// Build the candidate config from the current fields.
    pub fn validate(&self) -> Result<ClientConfig, FormError> {
        if self.nickname.is_empty() {
            return Err(FormError::EmptyNickname);
        }
        if self.hostname.is_empty() {
            return Err(FormError::EmptyHostname);
        }
        if self.port.is_empty() {
            return Err(FormError::EmptyPort);
        }
        let port: u16 = self.port.trim().parse().map_err(|_| FormError::InvalidPort)?;

        ClientConfig::new(
            self.nickname.clone(),
            self.hostname.clone(),
            self.relative_path.clone(),
            port,
            self.password.clone(),
            !self.ssl_enabled,
            self.headers.to_headers(),
        )
        .ok_or(FormError::InvalidUrl)
    }

    /// Validate the fields and start the connection test in the background.
    ///
    /// Returns right away; the outcome is applied to the form and sent as a
    /// [`FormEvent`]. The task only holds a weak handle: if the form is gone
    /// when the handshake finishes, nothing is applied or sent. A result is
    /// also dropped when the form was edited or re-tested in the meantime.
    /// A failed test leaves a previously accepted config in place.
    pub fn test_connection(this: &Arc<Mutex<Self>>) -> Result<(), FormError> {
        let (candidate, attempt, validator, runtime, event_tx) = {
            let mut form = this.lock();
            let candidate = match form.validate() {
                Ok(candidate) => candidate,
                Err(e) => {
                    form.status = ValidationStatus::Failed(e.to_string());
                    return Err(e);
                }
            };
            form.attempt += 1;
            form.status = ValidationStatus::Testing;
            (
                candidate,
                form.attempt,
                form.validator.clone(),
                form.runtime.clone(),
                form.event_tx.clone(),
            )
        };

        let weak = Arc::downgrade(this);
        runtime.spawn(async move {
            let result = validator.authenticate_and_connect(&candidate).await;

            let Some(form) = weak.upgrade() else {
                log::debug!("Client form closed before the connection test finished");
                return;
            };

            let event = {
                let mut form = form.lock();
                if form.attempt != attempt {
                    log::debug!("Discarding result of a superseded connection test");
                    return;
                }
                match result {
                    Ok(()) => {
                        log::info!("Connection test for {:?} succeeded", candidate.nickname());
                        form.status = ValidationStatus::Valid;
                        form.config = Some(candidate.clone());
                        FormEvent::Accepted(candidate)
                    }
                    Err(e) => {
                        log::warn!("Connection test for {:?} failed: {}", candidate.nickname(), e);
                        let message = e.to_string();
                        form.status = ValidationStatus::Failed(message.clone());
                        FormEvent::Failed(message)
                    }
                }
            };
            drop(form);

            let _ = event_tx.send(event).await;
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use deluge_core::client::ClientError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Validator with a fixed answer, optionally held until `release` fires.
    struct ScriptedValidator {
        accept: bool,
        release: Option<Arc<Notify>>,
        calls: AtomicUsize,
    }

    impl ScriptedValidator {
        fn accepting() -> Arc<Self> {
            Arc::new(Self {
                accept: true,
                release: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn rejecting() -> Arc<Self> {
            Arc::new(Self {
                accept: false,
                release: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn gated(accept: bool, release: Arc<Notify>) -> Arc<Self> {
            Arc::new(Self {
                accept,
                release: Some(release),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ConnectionValidator for ScriptedValidator {
        async fn authenticate_and_connect(&self, _config: &ClientConfig) -> Result<(), ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(release) = &self.release {
                release.notified().await;
            }
            if self.accept {
                Ok(())
            } else {
                Err(ClientError::AuthenticationRejected)
            }
        }
    }

    fn filled_form(
        validator: Arc<dyn ConnectionValidator>,
    ) -> (Arc<Mutex<AddClientForm>>, async_channel::Receiver<FormEvent>) {
        let (mut form, events) = AddClientForm::new(validator, tokio::runtime::Handle::current());
        form.set_nickname("Home");
        form.set_hostname("example.com");
        form.set_relative_path("deluge");
        form.set_port("8112");
        form.set_password("secret");
        form.set_ssl_enabled(true);
        (Arc::new(Mutex::new(form)), events)
    }

    #[tokio::test]
    async fn validation_errors_in_field_order() {
        let (mut form, _events) =
            AddClientForm::new(ScriptedValidator::accepting(), tokio::runtime::Handle::current());
        assert_eq!(form.validate().unwrap_err(), FormError::EmptyNickname);
        form.set_nickname("Home");
        assert_eq!(form.validate().unwrap_err(), FormError::EmptyHostname);
        form.set_hostname("bad host");
        assert_eq!(form.validate().unwrap_err(), FormError::EmptyPort);
        form.set_port("eighty");
        assert_eq!(form.validate().unwrap_err(), FormError::InvalidPort);
        form.set_port("70000");
        assert_eq!(form.validate().unwrap_err(), FormError::InvalidPort);
        form.set_port("8112");
        assert_eq!(form.validate().unwrap_err(), FormError::InvalidUrl);
        form.set_hostname("example.com");
        assert!(form.validate().is_ok());
    }

    #[tokio::test]
    async fn candidate_uses_form_fields() {
        let (form, _events) = filled_form(ScriptedValidator::accepting());
        let mut form = form.lock();
        form.add_header("A", "1");
        form.add_header("A", "3");
        let config = form.validate().unwrap();
        assert_eq!(config.url(), "https://example.com:8112/deluge/json");
        assert!(!config.is_http());
        assert_eq!(config.custom_headers()["A"], "3");
    }

    #[tokio::test]
    async fn local_validation_failure_never_calls_validator() {
        let validator = ScriptedValidator::accepting();
        let (form, _events) = filled_form(validator.clone());
        form.lock().set_port("");

        let err = AddClientForm::test_connection(&form).unwrap_err();
        assert_eq!(err, FormError::EmptyPort);
        assert_eq!(*form.lock().status(), ValidationStatus::Failed(err.to_string()));
        assert_eq!(validator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn successful_test_opens_gate() {
        let (form, events) = filled_form(ScriptedValidator::accepting());
        assert!(form.lock().done().is_none());

        AddClientForm::test_connection(&form).unwrap();
        let event = events.recv().await.unwrap();

        let FormEvent::Accepted(config) = event else {
            panic!("expected acceptance");
        };
        assert_eq!(config.nickname(), "Home");
        let form = form.lock();
        assert_eq!(*form.status(), ValidationStatus::Valid);
        assert_eq!(form.done(), Some(config));
    }

    #[tokio::test]
    async fn failed_test_reports_error_text() {
        let (form, events) = filled_form(ScriptedValidator::rejecting());
        AddClientForm::test_connection(&form).unwrap();

        match events.recv().await.unwrap() {
            FormEvent::Failed(message) => {
                assert_eq!(message, ClientError::AuthenticationRejected.to_string())
            }
            FormEvent::Accepted(_) => panic!("expected failure"),
        }
        assert!(form.lock().done().is_none());
    }

    #[tokio::test]
    async fn failed_retest_keeps_previous_acceptance() {
        let release = Arc::new(Notify::new());
        let existing =
            ClientConfig::without_headers("Home", "example.com", "deluge", 8112, "secret", false)
                .unwrap();
        let (form, events) = AddClientForm::for_edit(
            existing.clone(),
            ScriptedValidator::gated(false, release.clone()),
            tokio::runtime::Handle::current(),
        );
        let form = Arc::new(Mutex::new(form));

        AddClientForm::test_connection(&form).unwrap();
        release.notify_one();
        assert!(matches!(events.recv().await.unwrap(), FormEvent::Failed(_)));
        assert_eq!(form.lock().done(), Some(existing));
    }

    #[tokio::test]
    async fn result_is_not_applied_synchronously() {
        let release = Arc::new(Notify::new());
        let (form, events) = filled_form(ScriptedValidator::gated(true, release.clone()));

        AddClientForm::test_connection(&form).unwrap();
        assert_eq!(*form.lock().status(), ValidationStatus::Testing);
        assert!(form.lock().done().is_none());

        release.notify_one();
        assert!(matches!(events.recv().await.unwrap(), FormEvent::Accepted(_)));
    }

    #[tokio::test]
    async fn header_edit_invalidates_accepted_config() {
        let (form, events) = filled_form(ScriptedValidator::accepting());
        AddClientForm::test_connection(&form).unwrap();
        events.recv().await.unwrap();
        assert!(form.lock().done().is_some());

        form.lock().add_header("X-Proxy", "token");
        assert!(form.lock().done().is_none());
        assert_eq!(*form.lock().status(), ValidationStatus::Idle);
    }

    #[tokio::test]
    async fn edit_during_test_discards_result() {
        let release = Arc::new(Notify::new());
        let (form, events) = filled_form(ScriptedValidator::gated(true, release.clone()));

        AddClientForm::test_connection(&form).unwrap();
        form.lock().set_password("changed");
        release.notify_one();

        let outcome = tokio::time::timeout(Duration::from_millis(200), events.recv()).await;
        assert!(outcome.is_err(), "stale result must not be reported");
        assert!(form.lock().done().is_none());
        assert_eq!(*form.lock().status(), ValidationStatus::Idle);
    }

    #[tokio::test]
    async fn dropped_form_ignores_late_result() {
        let release = Arc::new(Notify::new());
        let validator = ScriptedValidator::gated(true, release.clone());
        let (form, events) = filled_form(validator.clone());

        AddClientForm::test_connection(&form).unwrap();
        drop(form);
        release.notify_one();

        // Every sender is gone once the task returns without reporting.
        assert!(events.recv().await.is_err());
        assert_eq!(validator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn edit_form_starts_accepted() {
        let mut headers = deluge_core::CustomHeaders::new();
        headers.insert("X-Proxy".to_string(), "token".to_string());
        let existing = ClientConfig::new("Box", "10.0.0.5", "", 8112, "pw", true, headers).unwrap();
        let (form, _events) = AddClientForm::for_edit(
            existing.clone(),
            ScriptedValidator::accepting(),
            tokio::runtime::Handle::current(),
        );

        assert_eq!(form.title(), "Edit Client");
        assert!(!form.ssl_enabled());
        assert_eq!(form.headers().len(), 1);
        assert_eq!(form.done(), Some(existing.clone()));
        assert_eq!(form.validate().unwrap().custom_headers(), existing.custom_headers());
    }
}
