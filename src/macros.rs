//! Shipping macros with `format!`-style message arguments.
//!
//! # Examples
//!
//! ```
//! use http_input_logger::prelude::*;
//! use http_input_logger::{send_event, warning, MemoryTransport};
//!
//! let listener = HttpInputListener::builder()
//!     .uri("http://localhost:8088")
//!     .token("TOKEN")
//!     .transport(MemoryTransport::new())
//!     .build()
//!     .unwrap();
//!
//! let port = 8080;
//! send_event!(listener, Severity::Start, 1, "Server listening on port {}", port);
//! warning!(listener, "Queue depth at {}%", 85);
//! ```

/// Ship an event with an explicit severity and id.
///
/// # Examples
///
/// ```
/// # use http_input_logger::prelude::*;
/// # use http_input_logger::MemoryTransport;
/// # let listener = HttpInputListener::builder()
/// #     .uri("http://localhost:8088").token("T")
/// #     .transport(MemoryTransport::new()).build().unwrap();
/// use http_input_logger::send_event;
/// send_event!(listener, Severity::Error, 123, "Test error");
/// send_event!(listener, Severity::Error, "db-timeout", "Query took {} ms", 5000);
/// ```
#[macro_export]
macro_rules! send_event {
    ($listener:expr, $severity:expr, $id:expr, $($arg:tt)+) => {
        $listener.send($severity, $id, format!($($arg)+))
    };
}

/// Ship a `Critical` event with id 0.
#[macro_export]
macro_rules! critical {
    ($listener:expr, $($arg:tt)+) => {
        $crate::send_event!($listener, $crate::Severity::Critical, 0, $($arg)+)
    };
}

/// Ship an `Error` event with id 0.
///
/// # Examples
///
/// ```
/// # use http_input_logger::prelude::*;
/// # use http_input_logger::MemoryTransport;
/// # let listener = HttpInputListener::builder()
/// #     .uri("http://localhost:8088").token("T")
/// #     .transport(MemoryTransport::new()).build().unwrap();
/// use http_input_logger::error;
/// error!(listener, "Error code: {}, message: {}", 500, "Internal error");
/// ```
#[macro_export]
macro_rules! error {
    ($listener:expr, $($arg:tt)+) => {
        $crate::send_event!($listener, $crate::Severity::Error, 0, $($arg)+)
    };
}

/// Ship a `Warning` event with id 0.
#[macro_export]
macro_rules! warning {
    ($listener:expr, $($arg:tt)+) => {
        $crate::send_event!($listener, $crate::Severity::Warning, 0, $($arg)+)
    };
}

/// Ship an `Information` event with id 0.
#[macro_export]
macro_rules! information {
    ($listener:expr, $($arg:tt)+) => {
        $crate::send_event!($listener, $crate::Severity::Information, 0, $($arg)+)
    };
}

/// Ship a `Verbose` event with id 0.
#[macro_export]
macro_rules! verbose {
    ($listener:expr, $($arg:tt)+) => {
        $crate::send_event!($listener, $crate::Severity::Verbose, 0, $($arg)+)
    };
}
