use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::support_tickets)]
#[serde(rename_all = "camelCase")]
pub struct SupportTicketData {
    pub title: String,
    pub description: String,
    #[serde(default = "defaults::ticket_open")]
    pub status: String,
    #[serde(default = "defaults::normal")]
    pub priority: String,
    #[serde(default)]
    pub user_id: i32,
    pub assigned_to: Option<i32>,
    pub category: String,
    pub resolution: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
}

record! {
    SupportTicket(SupportTicketData) in support_tickets as "ticket";
    SupportTicketChanges {
        title: String,
        description: String,
        status: String,
        priority: String,
        assigned_to: i32,
        category: String,
        resolution: String,
        closed_at: Option<DateTime<Utc>>,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::knowledge_articles)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeArticleData {
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Option<String>,
    pub created_by: Option<i32>,
    #[serde(default = "defaults::yes")]
    pub published: bool,
    #[serde(default)]
    pub views: i32,
}

record! {
    KnowledgeArticle(KnowledgeArticleData) in knowledge_articles as "article";
    KnowledgeArticleChanges {
        title: String,
        content: String,
        category: String,
        tags: String,
        published: bool,
        views: i32,
    }
}
