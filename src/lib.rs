//! Flight delay oracle publication pipeline.
//!
//! Answers end-user queries about a flight's arrival delay and durably
//! publishes the answer as a data feed on a DAG ledger, so third-party smart
//! contracts can consume it. The host wallet process supplies the ledger
//! client, chat transport and operator alerting as trait implementations and
//! feeds [`OracleEvent`]s into [`Oracle`].

pub mod alerts;
pub mod cache;
pub mod capacity;
pub mod config;
pub mod delay;
pub mod interest;
pub mod ledger;
pub mod messenger;
pub mod notify;
pub mod parse;
pub mod provider;
pub mod publication;
pub mod quota;
pub mod resolver;
pub mod service;
pub mod types;

// Re-export the surface a host process wires together.
pub use alerts::{LogAlerts, OperatorAlerts};
pub use cache::{CachedFact, FactCache};
pub use capacity::CapacityManager;
pub use config::{ConfigError, FlightstatsConfig, OracleConfig};
pub use interest::InterestIndex;
pub use ledger::{LedgerPoster, LedgerReader, PostError, StoredFact};
pub use messenger::Messenger;
pub use notify::NotificationDispatcher;
pub use provider::{FlightQuery, FlightStatusProvider, FlightstatsClient, ProviderError};
pub use publication::PublicationQueue;
pub use quota::{InMemoryRequestLog, QuotaDecision, QuotaGuard, RequestLog};
pub use resolver::FactResolver;
pub use service::{Collaborators, Oracle, OracleEvent};
pub use types::{FactPayload, FeedName, Output, PublicationStatus, QueuedPublication};
