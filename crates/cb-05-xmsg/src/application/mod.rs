//! Application layer: the xmsg state machine service.

pub mod service;

pub use service::XmsgStateMachine;
