//! Utilities for testing
#![doc(hidden)]
