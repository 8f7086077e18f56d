/// Generation identifiers are opaque strings assigned by the server.
pub type GenerationId = String;

/// Image identifiers are opaque strings; placeholders use a synthetic id.
pub type ImageId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
