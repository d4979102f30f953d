//! Background services
//!
//! Engine calls can block for a long time (factory load, compile, sync), so
//! the [`SessionController`](crate::session::SessionController) runs on a
//! dedicated thread and is driven through commands.
//!
//! ```text
//! ┌─────────────┐   SessionCommand   ┌───────────────┐
//! │  UI Thread  │ ─────────────────► │ EngineService │
//! │             │ ◄───────────────── │ (controller)  │
//! └─────────────┘   oneshot replies  └───────────────┘
//!       ▲                                    │
//!       │ subscribe                          │ publish
//!       │        ┌──────────────────┐        │
//!       └─────── │    Event Bus     │ ◄──────┘
//!                │ (SessionEvent)   │ ◄── engine lifecycle listeners
//!                └──────────────────┘
//! ```

pub mod engine_service;
pub mod messages;

pub use messages::{
    // Commands
    SessionCommand,
    // Events
    SessionEvent, Severity,
    // Infrastructure
    emit, EventBus, ServiceHandle,
};

pub use engine_service::{EngineService, SessionClient};
