//! User search with relevance scoring.
//!
//! Each of username, first name and last name scores 100 for an exact
//! match, 75 for a prefix and 50 for a substring (case-insensitive),
//! weighted 3/2/2. Results are ordered by total score, then username.

use serde::Serialize;

use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::store::{self, Store};
use crate::user::{UserRecord, UserSummary};

const EXACT: u32 = 100;
const PREFIX: u32 = 75;
const CONTAINS: u32 = 50;

const USERNAME_WEIGHT: u32 = 3;
const FIRST_NAME_WEIGHT: u32 = 2;
const LAST_NAME_WEIGHT: u32 = 2;

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub user: UserSummary,
    pub score: u32,
    pub matched_fields: Vec<&'static str>,
}

/// Score one field; `query` is already lowercased.
pub fn score_field(value: &str, query: &str, weight: u32) -> u32 {
    if value.is_empty() || query.is_empty() {
        return 0;
    }
    let value = value.to_lowercase();
    if value == query {
        EXACT * weight
    } else if value.starts_with(query) {
        PREFIX * weight
    } else if value.contains(query) {
        CONTAINS * weight
    } else {
        0
    }
}

pub fn score_user(user: &UserRecord, query: &str) -> (u32, Vec<&'static str>) {
    let query = query.trim().to_lowercase();
    let fields = [
        ("username", user.username.as_str(), USERNAME_WEIGHT),
        ("first_name", user.first_name.as_str(), FIRST_NAME_WEIGHT),
        ("last_name", user.last_name.as_str(), LAST_NAME_WEIGHT),
    ];
    let mut total = 0;
    let mut matched = Vec::new();
    for (name, value, weight) in fields {
        let score = score_field(value, &query, weight);
        if score > 0 {
            total += score;
            matched.push(name);
        }
    }
    (total, matched)
}

/// Rank candidates by score; ties keep alphabetical username order.
pub fn rank(candidates: Vec<UserRecord>, query: &str, limit: usize) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = candidates
        .into_iter()
        .filter_map(|user| {
            let (score, matched_fields) = score_user(&user, query);
            (score > 0).then(|| SearchHit {
                user: user.summary(),
                score,
                matched_fields,
            })
        })
        .collect();
    hits.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.user.username.cmp(&b.user.username))
    });
    hits.truncate(limit);
    hits
}

/// Search other users by username or name.
pub fn search_users(
    store: &Store,
    session: &Session,
    query: &str,
    config: &SearchConfig,
) -> Result<Vec<SearchHit>> {
    let query = query.trim();
    if query.chars().count() < config.min_query_len {
        return Err(Error::InvalidArgument(format!(
            "search query must be at least {} characters",
            config.min_query_len
        )));
    }
    let candidates = {
        let conn = store.conn()?;
        store::users::search_users(&conn, query, session.user_id, config.candidate_limit)?
    };
    Ok(rank(candidates, query, config.result_limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: i64, username: &str, first: &str, last: &str) -> UserRecord {
        UserRecord {
            id,
            username: username.to_string(),
            email: format!("{username}@example.com"),
            first_name: first.to_string(),
            last_name: last.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn field_scores() {
        assert_eq!(score_field("Ann", "ann", 3), 300);
        assert_eq!(score_field("Annie", "ann", 3), 225);
        assert_eq!(score_field("Joanne", "ann", 2), 100);
        assert_eq!(score_field("Bob", "ann", 2), 0);
        assert_eq!(score_field("", "ann", 2), 0);
    }

    #[test]
    fn weights_combine_across_fields() {
        let (score, fields) = score_user(&user(1, "ann", "Ann", "Annison"), "ANN");
        assert_eq!(score, 300 + 200 + 150);
        assert_eq!(fields, vec!["username", "first_name", "last_name"]);
    }

    #[test]
    fn rank_orders_by_score_then_username() {
        let hits = rank(
            vec![
                user(1, "joanne", "Jo", "Smith"),
                user(2, "annie", "Annie", "Hall"),
                user(3, "ann", "Ann", "Lee"),
                user(4, "bob", "Bob", "Stone"),
                user(5, "hannah", "Hannah", "Ng"),
            ],
            "ann",
            3,
        );
        assert_eq!(
            hits.iter().map(|h| h.user.username.as_str()).collect::<Vec<_>>(),
            vec!["ann", "annie", "hannah"]
        );
    }

    #[test]
    fn short_query_is_rejected() {
        let store = Store::open_in_memory().expect("store");
        let session = Session {
            user_id: 1,
            username: "ann".to_string(),
            token: uuid::Uuid::new_v4(),
            started_at: Utc::now(),
        };
        let err = search_users(&store, &session, " a ", &SearchConfig::default())
            .expect_err("too short");
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
