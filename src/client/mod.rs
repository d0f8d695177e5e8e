//! Client Module
//! Mission: Session tracking and API transport for embedding applications

pub mod session;
pub mod transport;

pub use session::{Session, SessionData, SessionState};
pub use transport::{AuthTransport, ClientError, HttpTransport};
