pub mod api_types;
pub mod client;
pub mod sources;
pub mod types;

pub use client::GithubClient;
pub use types::RepoRef;
