#![forbid(unsafe_code)]

pub mod api;
pub mod app_services;
pub mod drill_service;
pub mod error;
pub mod evaluator;
pub mod stats_service;

pub use drill_core::Clock;

pub use api::{
    CheckAnswerRequest, CheckAnswerResponse, EndDrillRequest, StartDrillRequest,
    StartDrillResponse,
};
pub use app_services::AppServices;
pub use drill_service::{AnswerOutcome, DrillService, DrillSetup, StartedDrill};
pub use error::{AppServicesError, SessionError, StatsError};
pub use evaluator::{AnswerEvaluator, AnswerSubmission};
pub use stats_service::StatsService;
