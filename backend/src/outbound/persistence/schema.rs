//! Diesel table definitions. Must match `backend/migrations`.

diesel::table! {
    /// Registered members.
    members (id) {
        /// Server-assigned key.
        id -> Int8,
        /// Display name.
        name -> Varchar,
        /// Unique contact address (`members_email_key`).
        email -> Varchar,
        /// Opaque credential.
        password -> Varchar,
        /// Insert timestamp.
        created_at -> Timestamptz,
    }
}
