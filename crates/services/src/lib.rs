#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_sync;
pub mod config;
pub mod connectivity;
pub mod consent_service;
pub mod error;
pub mod navigator;
pub mod remote;
pub mod result_submitter;
pub mod results_feed;
pub mod session_engine;

pub use app_services::AppServices;
pub use catalog_sync::{CatalogOrigin, CatalogSnapshot, CatalogSyncManager};
pub use config::{QuizConfig, SessionTimings};
pub use connectivity::{ConnectivityCallback, ConnectivityMonitor, ManualConnectivity, Subscription};
pub use consent_service::{CONSENT_FLAG, ConsentService};
pub use error::{AppServicesError, ConfigError, NetworkError, QuizError};
pub use navigator::{ChannelNavigator, Navigator, Route};
pub use remote::{HttpQuizApi, QuizApi};
pub use result_submitter::{ResultSubmitter, SubmitOutcome};
pub use results_feed::ResultsFeed;
pub use session_engine::{EngineSnapshot, QuizSessionEngine, SessionDeps};
