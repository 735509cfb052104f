//! End-to-end tests against a gateway bound to an ephemeral port.

mod health_test;
mod helpers;
mod ws_test;
