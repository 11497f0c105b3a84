//! Mock implementations for testing.
//!
//! In-memory stand-ins for the identity provider, for use in unit tests,
//! integration tests and demos.

pub mod gateway;

pub use gateway::MockIdentityGateway;
