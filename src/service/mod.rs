//! Feature services. Each owns its integration handles (HTTP client,
//! [`crate::db::SqlEngine`], git subprocess) and exposes plain async
//! methods to the command layer.

pub mod assistant;
pub mod doctor;
pub mod fonts;
pub mod git;
pub mod projects;
pub mod sql_tutor;
pub mod weather;

pub use assistant::AssistantService;
pub use fonts::FontsService;
pub use git::GitRepo;
pub use projects::ProjectService;
pub use sql_tutor::SqlTutor;
pub use weather::WeatherService;
