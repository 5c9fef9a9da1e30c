//! Test suites for the ticket server lifecycle and transport.

mod support;
