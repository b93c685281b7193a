pub mod catalog;
pub mod config;
pub mod orchestrator;
pub mod presenter;
pub mod service;
pub mod transport;
pub mod validation;

pub use catalog::{CatalogResolution, CatalogResolver, FetchError, LanguageCatalog};
pub use config::Config;
pub use orchestrator::{SessionError, SessionState, UploadOrchestrator};
pub use presenter::{ResultPresenter, TextView};
pub use transport::{TranslationResult, UploadError, UploadTransport};
pub use validation::{CandidateFile, FileSource, FileValidator, MediaFile, ValidationError};
