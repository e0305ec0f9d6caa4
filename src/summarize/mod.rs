//! Summarization stage
//!
//! Produces one-sentence descriptions of methods, classes and clusters with a
//! generative model. Prompt construction lives in [`prompt`], the transport in
//! [`client`], and the ordering and fan-out of requests in [`batch`].

pub mod batch;
pub mod client;
pub mod prompt;

use std::fmt;
use std::future::Future;

use crate::error::Result;

pub use batch::{summarize_all, SummaryTargets};
pub use client::ChatSummarizer;

/// Granularity of a summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SummaryKind {
    Method,
    Class,
    Cluster,
}

impl fmt::Display for SummaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Method => write!(f, "method"),
            Self::Class => write!(f, "class"),
            Self::Cluster => write!(f, "cluster"),
        }
    }
}

/// A fully built prompt for one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest {
    pub kind: SummaryKind,
    /// Key the summary is stored under (`Class.method`, class name, `cluster_N`)
    pub key: String,
    pub prompt: String,
}

/// Prompt → cleaned summary text
pub trait Summarizer {
    fn summarize(&self, request: &SummaryRequest) -> impl Future<Output = Result<String>> + Send;
}
