//! Registration and login.
//!
//! Every check returns `Err(Error::Invalid(..))` with the message shown next
//! to the form; anything else is a real failure.

use crate::database::Db;
use crate::models::{Identity, LoginForm, RegistrationForm};
use crate::{crypto, Error, Result};

const DUPLICATE_ACCOUNT : &str = "That email or phone number already exists.";
const PASSWORD_MISMATCH : &str = "Passwords in both fields should be same.";
const FAILED_LOGIN : &str =
    "User with that email not found or Incorrect password";

const EMAIL_MAX : usize = 36;
const PHONE_MAX : usize = 36;
const USERNAME_MAX : usize = 16;
const TLD_MAX : usize = 30;

type FieldValidator = fn(&str) -> Result<()>;

fn field_checks(form : &RegistrationForm) -> [(&str, FieldValidator); 4] {
    [
        (form.email.as_str(), validate_email as FieldValidator),
        (form.phone_number.as_str(), validate_phone_number),
        (form.username.as_str(), validate_username),
        (form.password.as_str(), validate_password),
    ]
}

pub async fn validate_registration(
    db : &Db,
    form : &RegistrationForm,
) -> Result<()> {
    if db.find_account(&form.email, &form.phone_number).await?.is_some() {
        return Err(Error::Invalid(DUPLICATE_ACCOUNT));
    }

    if form.password != form.password_repeat {
        return Err(Error::Invalid(PASSWORD_MISMATCH));
    }

    for (value, check) in field_checks(form) {
        check(value)?;
    }

    // the field rules are looser than the columns
    if form.email.chars().count() > EMAIL_MAX {
        return Err(Error::Invalid("Email should be at most 36 characters."));
    }

    if form.phone_number.chars().count() > PHONE_MAX {
        return Err(Error::Invalid(
            "Phone number should be at most 36 characters.",
        ));
    }

    if form.username.chars().count() > USERNAME_MAX {
        return Err(Error::Invalid("Username should be at most 16 characters."));
    }

    Ok(())
}

pub fn validate_email(email : &str) -> Result<()> {
    if is_email(email) {
        Ok(())
    } else {
        Err(Error::Invalid(
            "Invalid email format. Please use correct email format.",
        ))
    }
}

/// `local@domain.tld`, where the domain has no dots and the tld may.
fn is_email(email : &str) -> bool {
    fn all_of(s : &str, extra : &str) -> bool {
        s.chars()
            .all(|c| c.is_ascii_alphanumeric() || extra.contains(c))
    }

    let (local, rest) = match email.split_once('@') {
        Some(parts) => parts,
        None => return false,
    };

    let (domain, tld) = match rest.split_once('.') {
        Some(parts) => parts,
        None => return false,
    };

    !local.is_empty()
        && all_of(local, "_.+-")
        && !domain.is_empty()
        && all_of(domain, "-")
        && (1..=TLD_MAX).contains(&tld.len())
        && all_of(tld, "-.")
}

pub fn validate_phone_number(phone_number : &str) -> Result<()> {
    if phone_number.is_empty() {
        return Err(Error::Invalid("Phone number can't be empty."));
    }

    let cleaned : String = phone_number
        .chars()
        .filter(|c| !matches!(c, '-' | ' ' | '+'))
        .collect();

    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::Invalid(
            "You used a character that is not allowed for phone number. \
             Please use arabic digits. Only hyphen, space and plus are \
             allowed from special characters.",
        ));
    }

    if !(6..=36).contains(&cleaned.len()) {
        return Err(Error::Invalid(
            "Phone number should be longer than 6 characters and less than 37.",
        ));
    }

    Ok(())
}

pub fn validate_username(username : &str) -> Result<()> {
    if !(2..=36).contains(&username.chars().count()) {
        return Err(Error::Invalid(
            "Username should be between 2 and 36 characters long.",
        ));
    }

    let allowed = |c : char| c.is_ascii_alphanumeric() || "_-.".contains(c);

    if !username.chars().all(allowed) {
        return Err(Error::Invalid(
            "You used a character that is not allowed for username. Please \
             use latin letters and only underscore, hyphen, period are \
             allowed from special characters.",
        ));
    }

    Ok(())
}

pub fn validate_password(password : &str) -> Result<()> {
    if password.is_empty() {
        return Err(Error::Invalid("Password is required."));
    }

    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(Error::Invalid(
            "Password should contain at least 1 lowercase letters.",
        ));
    }

    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(Error::Invalid(
            "Password should contain at least 1 uppercase letters.",
        ));
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(Error::Invalid("Password should contain at least 1 digit."));
    }

    if password.chars().count() < 8 {
        return Err(Error::Invalid(
            "Password min length should be 8 characters.",
        ));
    }

    Ok(())
}

/// Stores a validated registration and returns the new user id.
pub async fn register(db : &Db, form : &RegistrationForm) -> Result<i64> {
    let password = crypto::encode_password(form.password.as_bytes())?;

    let user_id = db
        .insert_user(&form.email, &form.phone_number, &form.username, &password)
        .await?;

    tracing::info!(user_id, username = %form.username, "registered user");

    Ok(user_id)
}

pub async fn validate_login(db : &Db, form : &LoginForm) -> Result<()> {
    let hash = match db.get_password_hash(&form.email).await? {
        Some(hash) => hash,
        None => return Err(Error::Invalid(FAILED_LOGIN)),
    };

    if crypto::verify_password(&hash, form.password.as_bytes())? {
        Ok(())
    } else {
        tracing::debug!(email = %form.email, "password mismatch");
        Err(Error::Invalid(FAILED_LOGIN))
    }
}

pub async fn login_identity(db : &Db, email : &str) -> Result<Option<Identity>> {
    db.get_identity(email).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util;

    fn invalid<T : std::fmt::Debug>(res : Result<T>) -> &'static str {
        match res {
            Err(Error::Invalid(msg)) => msg,
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn email_shapes() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("first.last+tag@mail-host.co.uk").is_ok());

        for bad in &[
            "not-an-email",
            "@b.co",
            "a@.co",
            "a@b.",
            "a@b",
            "a b@c.com",
            "a@b_c.com",
            "a@b.c!m",
        ] {
            assert!(validate_email(bad).is_err(), "{} passed", bad);
        }

        assert!(validate_email(&format!("a@b.{}", "c".repeat(30))).is_ok());
        assert!(validate_email(&format!("a@b.{}", "c".repeat(31))).is_err());
    }

    #[test]
    fn phone_numbers() {
        assert_eq!(
            invalid(validate_phone_number("")),
            "Phone number can't be empty."
        );
        assert!(validate_phone_number("+1 234-567").is_ok());
        assert!(validate_phone_number("12a4567").is_err());
        assert!(validate_phone_number("+ -").is_err());
        assert!(validate_phone_number("12345").is_err());
        assert!(validate_phone_number(&"1".repeat(36)).is_ok());
        assert!(validate_phone_number(&"1".repeat(37)).is_err());
    }

    #[test]
    fn usernames() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("a.b-c_d9").is_ok());
        assert!(validate_username("al").is_ok());
        assert!(matches!(
            validate_username("a"),
            Err(Error::Invalid("Username should be between 2 and 36 characters long."))
        ));
        assert!(validate_username(&"a".repeat(37)).is_err());
        assert!(validate_username("al ice").is_err());
        assert!(validate_username("ålice").is_err());
    }

    #[test]
    fn passwords_need_every_class_and_length() {
        assert!(validate_password("Passw0rd").is_ok());

        assert_eq!(invalid(validate_password("")), "Password is required.");
        assert_eq!(
            invalid(validate_password("PASSW0RD")),
            "Password should contain at least 1 lowercase letters."
        );
        assert_eq!(
            invalid(validate_password("passw0rd")),
            "Password should contain at least 1 uppercase letters."
        );
        assert_eq!(
            invalid(validate_password("Password")),
            "Password should contain at least 1 digit."
        );
        assert_eq!(
            invalid(validate_password("Pa0")),
            "Password min length should be 8 characters."
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn registration_checks_run_in_order() {
        let (_dir, db) = test_util::db();

        let mut form = test_util::registration("a@x.com", "1234567", "alice");
        form.password_repeat = "Other0ne".to_string();
        assert_eq!(
            invalid(validate_registration(&db, &form).await),
            PASSWORD_MISMATCH
        );

        let mut form = test_util::registration("bad", "1234567", "alice");
        form.password = "weak".to_string();
        form.password_repeat = "weak".to_string();
        assert_eq!(
            invalid(validate_registration(&db, &form).await),
            "Invalid email format. Please use correct email format."
        );

        let form = test_util::registration("a@x.com", "1234567", "a-very-long-name");
        assert!(validate_registration(&db, &form).await.is_ok());

        let form =
            test_util::registration("a@x.com", "1234567", "a-much-longer-name");
        assert_eq!(
            invalid(validate_registration(&db, &form).await),
            "Username should be at most 16 characters."
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn second_registration_is_a_duplicate() {
        let (_dir, db) = test_util::db();
        let form = test_util::registration("a@x.com", "1234567", "alice");

        validate_registration(&db, &form).await.unwrap();
        register(&db, &form).await.unwrap();

        assert_eq!(
            invalid(validate_registration(&db, &form).await),
            DUPLICATE_ACCOUNT
        );

        let same_phone = test_util::registration("b@x.com", "1234567", "bob");
        assert_eq!(
            invalid(validate_registration(&db, &same_phone).await),
            DUPLICATE_ACCOUNT
        );

        assert!(matches!(
            register(&db, &form).await,
            Err(Error::Integrity(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn password_is_stored_hashed() {
        let (_dir, db) = test_util::db();
        let form = test_util::registration("a@x.com", "1234567", "alice");

        let id = register(&db, &form).await.unwrap();
        let user = db.get_user(id).await.unwrap().unwrap();

        assert_ne!(user.password, form.password);
        assert!(crypto::verify_password(&user.password, b"Passw0rd").unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn login_errors_do_not_say_which_field() {
        let (_dir, db) = test_util::db();
        register(&db, &test_util::registration("a@x.com", "1234567", "alice"))
            .await
            .unwrap();

        let unknown = LoginForm {
            email :    "b@x.com".to_string(),
            password : "Passw0rd".to_string(),
        };
        let wrong = LoginForm {
            email :    "a@x.com".to_string(),
            password : "Passw0rd!".to_string(),
        };
        let right = LoginForm {
            email :    "a@x.com".to_string(),
            password : "Passw0rd".to_string(),
        };

        assert_eq!(invalid(validate_login(&db, &unknown).await), FAILED_LOGIN);
        assert_eq!(invalid(validate_login(&db, &wrong).await), FAILED_LOGIN);
        assert!(validate_login(&db, &right).await.is_ok());

        let identity = login_identity(&db, "a@x.com").await.unwrap().unwrap();
        assert_eq!(identity.username, "alice");
        assert!(login_identity(&db, "b@x.com").await.unwrap().is_none());
    }
}
