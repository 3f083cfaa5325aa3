use note_board::models::RegistrationForm;
use note_board::*;

#[tokio::main]
async fn main() -> Result<()> {
    let args = std::env::args().collect::<Vec<_>>();

    match &args[..] {
        [_, db, email, phone_number, username, password] => {
            let db = database::Db::new(db)?;

            let form = RegistrationForm {
                email :           email.clone(),
                phone_number :    phone_number.clone(),
                username :        username.clone(),
                password :        password.clone(),
                password_repeat : password.clone(),
            };

            match accounts::validate_registration(&db, &form).await {
                Ok(()) => {},
                Err(Error::Invalid(msg)) => {
                    eprintln!("{}", msg);
                    std::process::exit(1);
                },
                Err(err) => return Err(err),
            }

            let user_id = accounts::register(&db, &form).await?;
            println!("created user {}", user_id);

            Ok(())
        },
        _ => {
            eprintln!("usage: ./add_user db email phone_number username password");
            std::process::exit(1);
        },
    }
}
