//! Synthesized responses for offline fallback.
//!
//! These carry no network dependency: the notice page renders instead of
//! the browser's connection-error page, and the 408 response lets calling
//! code distinguish "unavailable offline" from a genuine server error.

use bivvy_core::CapturedResponse;

const NOTICE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Offline</title>
  <meta name="viewport" content="width=device-width, initial-scale=1">
</head>
<body>
  <h1>You are offline</h1>
  <p>This application is running in offline mode. Some features may be
  unavailable until the connection is restored.</p>
</body>
</html>
"#;

/// The offline notice page, served for document navigations when neither
/// cache nor network can produce one. Success status so the browser
/// renders it.
pub fn notice_page() -> CapturedResponse {
    CapturedResponse::html(200, NOTICE_PAGE)
}

/// Generic "resource unavailable offline" response.
pub fn unavailable() -> CapturedResponse {
    CapturedResponse::text(408, "Resource unavailable offline")
}
