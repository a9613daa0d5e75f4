//! Browsing session for the Habitat hierarchy.
//!
//! - [`SelectionMachine`]: the drilled-into path and candidate lists, with
//!   one generic [`SelectionMachine::clear_below`] behind every cascade
//! - [`SubscriptionManager`]: one generation-tagged live subscription per
//!   [`Slot`], cancelled before it is replaced
//! - [`Session`] / [`SessionHandle`]: the single-writer actor that ties
//!   both to a store and publishes immutable [`HierarchySnapshot`]s

mod config;
mod error;
pub mod machine;
mod session;
pub mod slots;

pub use config::{DeletePolicy, SessionConfig};
pub use error::{SessionError, SessionResult};
pub use machine::{
    HierarchySnapshot, Level, Section, Selection, SelectionEvent, SelectionMachine, Transition,
};
pub use session::{Mutation, Session, SessionEvent, SessionHandle};
pub use slots::{Delivery, Slot, SlotItem, SlotKey, SlotUpdate, SubscriptionManager};
