// ABOUTME: SMPP client module for long-lived ESME sessions
// ABOUTME: Exports the session engine, bind credentials, keep-alive and error types

//! SMPP Client Module
//!
//! * **Request/response correlation** - [`Session::submit`] waits for the
//!   response carrying its sequence number while other PDUs keep flowing
//! * **Unsolicited PDUs** - deliver_sm, enquire_link and unbind from the SMSC
//!   arrive on the [`Inbound`] queue
//! * **Keep-alive support** - [`Session::enquire_link`] probes the peer and
//!   closes the session when it stops answering
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smpp_receiver::client::{BindCredentials, KeepAliveConfig, Session, SessionOptions};
//! use std::time::Duration;
//! use tokio::net::TcpStream;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = TcpStream::connect("localhost:2775").await?;
//! let (session, mut inbound) = Session::new(stream, SessionOptions::default());
//!
//! let credentials = BindCredentials::receiver("system_id", "password");
//! let response = session
//!     .submit(credentials.bind_frame(), Duration::from_secs(1))
//!     .await?;
//! credentials.accept_response(&response)?;
//!
//! let keep_alive = tokio::spawn({
//!     let session = session.clone();
//!     async move { session.enquire_link(KeepAliveConfig::default()).await }
//! });
//!
//! while let Some(frame) = inbound.recv().await {
//!     if let Some(reply) = frame.response() {
//!         session.send(&reply).await?;
//!     }
//! }
//! keep_alive.await??;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod keepalive;
pub mod sequence;
pub mod session;
pub mod types;

// Re-export the main types for easy access
pub use error::{SmppError, SmppResult};
pub use keepalive::{KeepAliveConfig, KeepAliveManager, KeepAliveStatus};
pub use sequence::{MonotonicSequence, SequenceGenerator};
pub use session::{Inbound, Session, SessionOptions};
pub use types::{BindCredentials, BindType};
