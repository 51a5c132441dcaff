//! Fabric Common - Shared plumbing for Fabric MCP servers
//!
//! This crate provides the pieces every Fabric-facing MCP server needs:
//!
//! - **Initialization**: [`init_tracing`] for stderr-only logging
//! - **Results**: Helper functions for creating `CallToolResult` responses
//! - **Errors**: Traits for converting domain errors to MCP-compatible format
//! - **Embeddable**: [`EmbeddableMcp`] trait for calling tools by name in-process
//! - **Auth**: Azure AD credential chain ([`auth::default_chain`]) with per-scope caching
//!
//! # Example
//!
//! ```rust,ignore
//! use fabric_common::auth::{default_chain, TokenCredential, SQL_SCOPE};
//!
//! let credential = default_chain(&Default::default());
//! let token = credential.get_token(SQL_SCOPE).await?;
//! ```

pub mod auth;
pub mod embeddable;
pub mod error;
pub mod init;
pub mod result;

// Re-export commonly used items at crate root
pub use embeddable::{EmbeddableError, EmbeddableMcp, EmbeddableResult};
pub use error::{internal_error, invalid_params, IntoMcpError, McpResult, ResultExt};
pub use init::{init_tracing, LogFormat, TracingOptions};
pub use result::{json_success, text_success};

// Re-export rmcp types that are commonly needed
pub use rmcp::{
    model::{CallToolResult, Content, Tool},
    ErrorData as McpError,
};

// Re-export async_trait for implementing EmbeddableMcp and TokenCredential
pub use async_trait::async_trait;
