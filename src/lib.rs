//! mcp-bridge: lets a messaging agent use the tools of an MCP server.
//!
//! An incoming [`AgentMessage`](types::AgentMessage) seeds a conversation.
//! The adapter discovers the server's tools, asks an OpenAI-compatible model
//! whether to answer or call one, runs the tool, feeds the result back and
//! repeats until the model answers in text or the iteration ceiling is hit.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use mcp_bridge::prelude::*;
//!
//! # async fn example() -> mcp_bridge::error::Result<()> {
//! let server = McpClient::connect_stdio("python", vec!["weather_server.py".into()]).await?;
//! let adapter = McpServerAdapter::with_openai(Arc::new(server), AdapterConfig::from_env()?)?;
//!
//! let message = AgentMessage::new("agent1q...", "What's the weather in Paris?");
//! match adapter.handle_message(&message).await {
//!     Ok(reply) => println!("{}", reply.text),
//!     Err(failure) => eprintln!("{} after {} messages", failure.error, failure.history.len()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod codec;
pub mod config;
pub mod error;
pub mod mcp;
pub mod orchestrator;
pub mod prelude;
pub mod provider;
pub mod registry;
pub mod types;
pub mod util;

pub use adapter::McpServerAdapter;
