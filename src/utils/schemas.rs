// `username_key` is the lowercased username; uniqueness and lookups go
// through it and through the lowercased email.
pub const USER_SCHEMA: &str = r#"
    DEFINE TABLE IF NOT EXISTS user SCHEMAFULL;

    DEFINE FIELD IF NOT EXISTS username ON TABLE user TYPE string;
    DEFINE FIELD IF NOT EXISTS username_key ON TABLE user TYPE string;
    DEFINE FIELD IF NOT EXISTS email ON TABLE user TYPE string;
    DEFINE FIELD IF NOT EXISTS password_hash ON TABLE user TYPE string;
    DEFINE FIELD IF NOT EXISTS remember_token_hash ON TABLE user TYPE option<string>;
    DEFINE FIELD IF NOT EXISTS last_login_at ON TABLE user TYPE option<int>;
    DEFINE FIELD IF NOT EXISTS created_at ON TABLE user TYPE int;

    DEFINE INDEX IF NOT EXISTS user_username_key_unique ON TABLE user COLUMNS username_key UNIQUE;
    DEFINE INDEX IF NOT EXISTS user_email_unique ON TABLE user COLUMNS email UNIQUE;
    DEFINE INDEX IF NOT EXISTS user_remember_token_hash ON TABLE user COLUMNS remember_token_hash;
"#;

// Session data is a free-form string map, so the table stays schemaless.
pub const SESSION_SCHEMA: &str = r#"
    DEFINE TABLE IF NOT EXISTS session SCHEMALESS;

    DEFINE INDEX IF NOT EXISTS session_expires_at ON TABLE session COLUMNS expires_at;
"#;

pub const SCHEMAS: [&str; 2] = [USER_SCHEMA, SESSION_SCHEMA];
