use crate::database::Db;
use crate::models::{Identity, RegistrationForm};
use crate::accounts;

pub(crate) fn db() -> (tempfile::TempDir, Db) {
    let dir = tempfile::tempdir().unwrap();
    let db = Db::new(dir.path().join("test.sqlite3")).unwrap();
    (dir, db)
}

pub(crate) fn registration(
    email : &str,
    phone_number : &str,
    username : &str,
) -> RegistrationForm {
    RegistrationForm {
        email :           email.to_string(),
        phone_number :    phone_number.to_string(),
        username :        username.to_string(),
        password :        "Passw0rd".to_string(),
        password_repeat : "Passw0rd".to_string(),
    }
}

pub(crate) async fn user(
    db : &Db,
    email : &str,
    phone_number : &str,
    username : &str,
) -> Identity {
    let user_id = accounts::register(db, &registration(email, phone_number, username))
        .await
        .unwrap();

    Identity {
        user_id,
        username : username.to_string(),
    }
}
