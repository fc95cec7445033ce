// Server front-ends: web UI/API and the agent-tool protocol

pub mod agent;
pub mod web;

pub use agent::AgentServer;
