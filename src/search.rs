use serde::Serialize;

use crate::database::Db;
use crate::models::Note;
use crate::Result;

#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub rank : usize,
    pub post : Note,
}

fn like_pattern(keyword : &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Live posts whose title or body contains `keyword`, ignoring ASCII case.
/// Ranks start at 1 and follow post id.
pub async fn search(db : &Db, keyword : &str) -> Result<Vec<SearchHit>> {
    let notes = db.search_live_notes(&like_pattern(keyword)).await?;

    tracing::debug!(keyword, hits = notes.len(), "searched posts");

    Ok(notes
        .into_iter()
        .enumerate()
        .map(|(i, post)| SearchHit {
            rank : i + 1,
            post,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{posts, test_util};

    #[test]
    fn wildcards_are_escaped() {
        assert_eq!(like_pattern("hi"), "%hi%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn matches_title_or_body_case_insensitively() {
        let (_dir, db) = test_util::db();
        let alice = test_util::user(&db, "a@x.com", "1234567", "alice").await;

        let a = posts::create_post(&db, "Rust tips", &alice, "").await.unwrap();
        posts::create_post(&db, "Cooking", &alice, "no match").await.unwrap();
        let c = posts::create_post(&db, "Misc", &alice, "learning RUST")
            .await
            .unwrap();

        let hits = search(&db, "rust").await.unwrap();
        let found : Vec<_> = hits.iter().map(|h| (h.rank, h.post.id)).collect();
        assert_eq!(found, [(1, a), (2, c)]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn deleted_and_wildcards() {
        let (_dir, db) = test_util::db();
        let alice = test_util::user(&db, "a@x.com", "1234567", "alice").await;

        let sale = posts::create_post(&db, "50% off", &alice, "").await.unwrap();
        let other = posts::create_post(&db, "500 items", &alice, "").await.unwrap();

        let hits = search(&db, "50%").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].post.id, sale);

        posts::delete_post(&db, sale).await.unwrap();
        assert!(search(&db, "50%").await.unwrap().is_empty());

        let hits = search(&db, "500").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].post.id, other);
    }
}
