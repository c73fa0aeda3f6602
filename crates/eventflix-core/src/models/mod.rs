//! JSON payloads exchanged with the EventFlix backend.
//!
//! - `auth`: login and registration
//! - `event`: events and the organizer event form
//! - `ticket`: purchases and owned tickets
//! - `user`: profile

pub mod auth;
pub mod event;
pub mod ticket;
pub mod user;

pub use auth::{LoginRequest, LoginResponse, RegisterRequest};
pub use event::{Event, EventForm};
pub use ticket::{Ticket, TicketPurchase};
pub use user::{Profile, ProfileUpdate};
