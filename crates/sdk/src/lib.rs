//! Backdrop SDK - Rust Client Library
//!
//! Client for the Backdrop daemon: submit videos, poll jobs, download
//! results and remove backgrounds from single images.
//!
//! # Example
//!
//! ```no_run
//! use backdrop_sdk::{BackdropClient, JobState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = BackdropClient::connect("http://127.0.0.1:9876")?;
//!     let job_id = client.submit_video("clip.mp4".as_ref(), "u2net").await?;
//!
//!     if let JobState::Processing(snapshot) = client.status(&job_id).await? {
//!         println!("{}: {:.0}%", job_id, snapshot.progress);
//!     }
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::BackdropClient;
pub use error::{Result, SdkError};
pub use types::{HealthResponse, JobSnapshot, JobState, JobStatus, SubmitResponse};
