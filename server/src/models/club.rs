use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Club {
    pub id: Uuid,
    pub club_name: String,
    pub categories: Vec<String>,
    pub club_page: Option<String>,
    pub ig: Option<String>,
    pub discord: Option<String>,
    pub club_type: Option<String>,
}
