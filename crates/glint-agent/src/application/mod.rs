//! Application layer use cases for the agent.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure rules in `glint-core`) and the infrastructure (hooks, GDI, HTTP).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a user goal (e.g., "capture the
//!   window the user Alt+Clicked and show the model's answer").
//! - **Depend on abstractions** (traits) rather than concrete implementations,
//!   so tests can swap in fakes.
//! - **Contain no OS calls, no network I/O, no file system access**.
//!
//! # Sub-modules
//!
//! - **`dispatch_events`** – The single consumer of the agent's event queue.
//!   Runs every input event through the modifier reducer, gesture detector,
//!   and request lifecycle, and carries out the resulting effects.
//! - **`run_request`** – The per-request worker: capture, then inference.
//! - **`rotate_credentials`** – Tries each configured API key in turn until
//!   one works.
//! - **`replay_text`** – Types an answer back out with humanized timing.
//! - **`present_results`** – Serializes all presentation updates onto one
//!   consumer.

pub mod dispatch_events;
pub mod present_results;
pub mod replay_text;
pub mod rotate_credentials;
pub mod run_request;
