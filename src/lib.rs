//! Workspace package for the adhoc control server.
//!
//! The protocol lives in `shared`, the server in `server` and the control
//! client in `client`. This package only hosts the end-to-end tests that run
//! all three together.
