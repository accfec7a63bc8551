//! Well-known store keys.

/// URL of the endpoint that last produced a completion.
pub const LAST_SUCCESSFUL_ENDPOINT: &str = "lastSuccessfulEndpoint";

/// Serialized `ConnectionHistory`.
pub const CONNECTION_HISTORY: &str = "connectionHistory";

/// Adaptive timeout factor as a JSON number.
pub const ADAPTIVE_TIMEOUT_FACTOR: &str = "adaptiveTimeoutFactor";

/// Credential list kept for rotation.
pub const ROTATED_CREDENTIALS: &str = "allAPIKeys";
