//! Upload session state machine.
//!
//! `Idle -> Validating -> Transferring -> {Succeeded | Failed}`. A terminal
//! state goes back to `Validating` when a new file is offered. State changes
//! are published on a watch channel so a front end can render them.
//!
//! The orchestrator never holds its lock across an await point. A reset
//! advances the session epoch; any fetch or transfer that settles under an
//! older epoch leaves state untouched.

use crate::catalog::{CatalogResolution, CatalogResolver};
use crate::config::Config;
use crate::transport::{TranslationResult, UploadError, UploadTransport};
use crate::validation::{CandidateFile, FileValidator, ValidationError};
use anyhow::{Context, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("an upload is already in progress")]
    Busy,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    /// The session was reset while this submission was in flight
    #[error("session was reset before the upload finished")]
    Superseded,
}

impl SessionError {
    /// Stable tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::Busy => "busy",
            SessionError::Validation(_) => "validation",
            SessionError::Upload(e) => e.kind(),
            SessionError::Superseded => "superseded",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            SessionError::Busy => "Please wait for the current upload to finish.".to_string(),
            SessionError::Validation(e) => e.user_message(),
            SessionError::Upload(e) => e.user_message(),
            SessionError::Superseded => "The upload was discarded.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Validating,
    Transferring {
        progress: u8,
    },
    Succeeded(TranslationResult),
    Failed(SessionError),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Succeeded(_) | SessionState::Failed(_))
    }
}

struct Session {
    epoch: u64,
    next_ticket: u64,
    /// Ticket of the transfer currently holding the single upload slot
    active_transfer: Option<u64>,
    selected_language: String,
    catalog: Option<CatalogResolution>,
}

struct Shared {
    validator: FileValidator,
    resolver: CatalogResolver,
    transport: UploadTransport,
    session: Mutex<Session>,
    state: watch::Sender<SessionState>,
}

impl Shared {
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, state: SessionState) {
        self.state.send_replace(state);
    }
}

/// The single upload slot, held by one spawned transfer. Dropping it frees
/// the slot even if the transfer task unwinds.
struct TransferSlot {
    shared: Arc<Shared>,
    ticket: u64,
    epoch: u64,
}

impl TransferSlot {
    /// Publish the outcome if the session is still current, then free the slot.
    fn settle(
        self,
        outcome: std::result::Result<TranslationResult, UploadError>,
    ) -> std::result::Result<TranslationResult, SessionError> {
        let mut session = self.shared.session();
        if session.active_transfer == Some(self.ticket) {
            session.active_transfer = None;
        }

        if session.epoch != self.epoch {
            debug!("Discarding upload result for a previous session");
            return Err(SessionError::Superseded);
        }

        match outcome {
            Ok(result) => {
                self.shared.publish(SessionState::Succeeded(result.clone()));
                Ok(result)
            }
            Err(e) => {
                warn!("Upload session failed [{}]: {}", e.kind(), e);
                let error = SessionError::Upload(e);
                self.shared.publish(SessionState::Failed(error.clone()));
                Err(error)
            }
        }
    }
}

impl Drop for TransferSlot {
    fn drop(&mut self) {
        let mut session = self.shared.session();
        if session.active_transfer != Some(self.ticket) {
            return;
        }
        session.active_transfer = None;
        if session.epoch == self.epoch {
            self.shared.state.send_if_modified(|state| {
                if matches!(state, SessionState::Transferring { .. }) {
                    *state = SessionState::Idle;
                    true
                } else {
                    false
                }
            });
        }
    }
}

/// Cheaply cloneable handle to one upload session.
#[derive(Clone)]
pub struct UploadOrchestrator {
    shared: Arc<Shared>,
}

impl UploadOrchestrator {
    pub fn new(config: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: Config) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);

        Self {
            shared: Arc::new(Shared {
                validator: FileValidator::from_config(&config),
                resolver: CatalogResolver::new(client.clone(), &config),
                transport: UploadTransport::new(client, &config),
                session: Mutex::new(Session {
                    epoch: 0,
                    next_ticket: 0,
                    active_transfer: None,
                    selected_language: config.default_language.clone(),
                    catalog: None,
                }),
                state,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.shared.state.borrow().clone()
    }

    pub fn selected_language(&self) -> String {
        self.shared.session().selected_language.clone()
    }

    pub fn select_language(&self, code: impl Into<String>) {
        let code = code.into();
        debug!("Selected target language '{}'", code);
        self.shared.session().selected_language = code;
    }

    /// The cached catalog for this session, if one has been resolved.
    pub fn catalog(&self) -> Option<CatalogResolution> {
        self.shared.session().catalog.clone()
    }

    /// Resolve the catalog once per session and reuse it afterwards.
    pub async fn load_catalog(&self) -> CatalogResolution {
        if let Some(cached) = self.catalog() {
            return cached;
        }
        self.refresh_catalog().await
    }

    /// Fetch the catalog again even if one is cached.
    pub async fn refresh_catalog(&self) -> CatalogResolution {
        let epoch = self.shared.session().epoch;
        let resolution = self.shared.resolver.fetch_catalog().await;

        let mut session = self.shared.session();
        if session.epoch == epoch {
            session.catalog = Some(resolution.clone());
        } else {
            debug!("Discarding catalog fetched for a previous session");
        }
        resolution
    }

    /// Validate and upload `candidate` using the selected language.
    pub async fn submit(&self, candidate: CandidateFile) -> Result<TranslationResult, SessionError> {
        let (slot, media, language) = {
            let mut session = self.shared.session();
            if session.active_transfer.is_some() {
                info!("Rejecting {}: an upload is already in progress", candidate.name);
                return Err(SessionError::Busy);
            }

            self.shared.publish(SessionState::Validating);
            let language = session.selected_language.clone();

            let checked = self
                .shared
                .validator
                .validate(candidate, &language)
                .and_then(|media| {
                    check_catalog_membership(session.catalog.as_ref(), &language).map(|_| media)
                });

            let media = match checked {
                Ok(media) => media,
                Err(e) => {
                    info!("File rejected before upload: {}", e);
                    let error = SessionError::Validation(e);
                    self.shared.publish(SessionState::Failed(error.clone()));
                    return Err(error);
                }
            };

            session.next_ticket += 1;
            session.active_transfer = Some(session.next_ticket);
            self.shared.publish(SessionState::Transferring { progress: 0 });
            let slot = TransferSlot {
                shared: Arc::clone(&self.shared),
                ticket: session.next_ticket,
                epoch: session.epoch,
            };
            (slot, media, language)
        };

        // The transfer runs on its own task so it settles even when the
        // caller stops awaiting this future.
        let transfer = tokio::spawn(async move {
            let shared = Arc::clone(&slot.shared);
            let epoch = slot.epoch;
            let progress_target = Arc::clone(&shared);
            let outcome = shared
                .transport
                .submit(&media, &language, move |progress| {
                    let session = progress_target.session();
                    if session.epoch != epoch {
                        return;
                    }
                    progress_target.state.send_if_modified(|state| match state {
                        SessionState::Transferring { progress: current } if *current < progress => {
                            *current = progress;
                            true
                        }
                        _ => false,
                    });
                })
                .await;
            slot.settle(outcome)
        });

        match transfer.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(SessionError::Superseded),
        }
    }

    /// End the current session. Pending work from it will not touch state.
    pub fn reset(&self) {
        let mut session = self.shared.session();
        session.epoch += 1;
        session.catalog = None;
        self.shared.publish(SessionState::Idle);
        debug!("Session reset (epoch {})", session.epoch);
    }
}

/// A language must be in the catalog only when the catalog came from the
/// service. The fallback never rejects a code.
fn check_catalog_membership(
    catalog: Option<&CatalogResolution>,
    language: &str,
) -> std::result::Result<(), ValidationError> {
    match catalog {
        Some(resolution) if !resolution.degraded && !resolution.catalog.contains(language) => {
            Err(ValidationError::UnknownLanguage {
                code: language.to_string(),
            })
        }
        _ => Ok(()),
    }
}
