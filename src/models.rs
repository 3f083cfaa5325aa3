use serde::{Deserialize, Serialize};

pub type Time = crate::time_utils::Time;

#[derive(Debug, Serialize)]
pub struct User {
    pub id :           i64,
    pub email :        String,
    pub phone_number : String,
    pub username :     String,
    #[serde(skip_serializing)]
    pub password :     String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Note {
    pub id :        i64,
    pub title :     String,
    pub body :      Option<String>,
    pub created :   Time,
    pub author_id : i64,
    pub deleted :   bool,
}

/// A listing row: a live note plus its author's username.
#[derive(Debug, Serialize)]
pub struct PostSummary {
    pub id :        i64,
    pub author_id : i64,
    pub title :     String,
    pub body :      Option<String>,
    pub created :   Time,
    pub creator :   String,
}

/// The principal carried by the identity cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id :  i64,
    pub username : String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub email :           String,
    pub phone_number :    String,
    pub username :        String,
    pub password :        String,
    pub password_repeat : String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email :    String,
    pub password : String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub title : String,
    pub body :  String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchForm {
    pub search_keyword : String,
}
