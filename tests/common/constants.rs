//! Shared constants for end-to-end tests

// ============================================================================
// Server lifecycle
// ============================================================================

/// How long to wait for a spawned server to answer `GET /`
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Delay between readiness polls
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// Per-request timeout of the test client
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Fake model
// ============================================================================

/// Model name the test server asks the fake Gemini for
pub const TEST_MODEL: &str = "fake-vision";

/// API key the fake Gemini expects
pub const TEST_API_KEY: &str = "test-api-key";

/// Image content containing this marker makes the fake Gemini fail
pub const FAILING_IMAGE_MARKER: &str = "EXPLODE";

// ============================================================================
// Test data
// ============================================================================

/// Album used by most tests
pub const ALBUM_ID: &str = "42";

pub const TITLE_PARTY: &str = "Party";
pub const TITLE_REUNION: &str = "Reunion";

/// The fake Gemini answers with the image's own text, so these land in known categories
pub const SMILE_IMAGE: &[u8] = b"a big smile at the party";
pub const CRYING_IMAGE: &[u8] = b"someone crying at the end";
pub const FUNNY_IMAGE: &[u8] = b"a funny hat";
pub const UNCLEAR_IMAGE: &[u8] = b"a blurry landscape";
pub const FAILING_IMAGE: &[u8] = b"EXPLODE please";
