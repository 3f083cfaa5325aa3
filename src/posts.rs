use crate::database::Db;
use crate::models::{Identity, Note, Time};
use crate::{Error, Result};

const TITLE_MAX : usize = 150;
const BODY_MAX : usize = 10_000;

fn check_lengths(title : &str, body : &str) -> Result<()> {
    if title.chars().count() > TITLE_MAX {
        return Err(Error::Invalid("Title should be at most 150 characters."));
    }

    if body.chars().count() > BODY_MAX {
        return Err(Error::Invalid("Body should be at most 10000 characters."));
    }

    Ok(())
}

/// Looks a note up by id, deleted or not. With a session, only the author
/// gets it back.
pub async fn get_post(
    db : &Db,
    post_id : i64,
    session : Option<&Identity>,
) -> Result<Option<Note>> {
    let note = match db.get_note(post_id).await? {
        Some(note) => note,
        None => return Ok(None),
    };

    match session {
        Some(identity) if identity.user_id != note.author_id => {
            tracing::debug!(
                post_id,
                user_id = identity.user_id,
                "post belongs to someone else"
            );
            Ok(None)
        },
        _ => Ok(Some(note)),
    }
}

pub async fn create_post(
    db : &Db,
    title : &str,
    session : &Identity,
    body : &str,
) -> Result<i64> {
    if title.is_empty() {
        return Err(Error::Invalid("Title is required"));
    }

    check_lengths(title, body)?;

    let created = Time::now().to_column()?;
    let post_id = db
        .insert_note(title, body, &created, session.user_id)
        .await?;

    tracing::info!(post_id, user_id = session.user_id, "created post");

    Ok(post_id)
}

pub async fn update_post(
    db : &Db,
    post_id : i64,
    title : &str,
    body : &str,
) -> Result<()> {
    if title.is_empty() {
        return Err(Error::Invalid("Title is required."));
    }

    check_lengths(title, body)?;

    db.update_note(post_id, title, body).await?;

    tracing::info!(post_id, "updated post");

    Ok(())
}

/// Soft delete. Ownership is the caller's job, see [`get_post`].
pub async fn delete_post(db : &Db, post_id : i64) -> Result<()> {
    db.mark_note_deleted(post_id).await?;

    tracing::info!(post_id, "deleted post");

    Ok(())
}
