//! Database row types. These map directly to SQLite rows and stay distinct
//! from the todotag-types models to keep the DB layer independent.

#[derive(Debug, Clone)]
pub struct TodoRow {
    pub id: String,
    pub content: String,
    pub is_done: bool,
    pub owner: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct TagRow {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct TodoTagRow {
    pub id: String,
    pub todo_id: String,
    pub tag_id: String,
    pub created_at: String,
    pub updated_at: String,
}
