//! Shared fixtures for storage tests.

use tempfile::TempDir;

use super::connection::JsonConnection;

/// Fresh store in a temp directory; keep the guard alive for the test's
/// lifetime.
pub fn test_connection() -> (JsonConnection, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let connection = JsonConnection::new(temp_dir.path()).unwrap();
    (connection, temp_dir)
}
