use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use cookie::{Cookie, SameSite};
use http::{header, StatusCode};
use warp::filters::method;
use warp::reject::Reject;
use warp::reply;
use warp::{filters, Filter, Rejection, Reply};

use crate::error::Error;
use crate::models::{Identity, LoginForm, PostForm, RegistrationForm, SearchForm};
use crate::{accounts, crypto, database, pages, posts, search, ui};

pub const COOKIE_NAME : &str = "note-board-token";

pub struct ServerInner {
    pub server_name :    String,
    pub token_secret :   Vec<u8>,
    pub token_lifetime : Duration,
    pub page_size :      u32,
    pub static_dir :     String,
    pub db :             database::Db,
    pub render :         ui::Renderer,
}

pub type Server = Arc<ServerInner>;

type BoxReply = Box<dyn Reply>;
type HandlerResult = Result<BoxReply, Rejection>;

fn with_server(
    server : &Server,
) -> impl Filter<Extract = (Server,), Error = Infallible> + Clone {
    let server = Arc::clone(server);
    warp::any().map(move || Arc::clone(&server))
}

/// The identity in the cookie, if it is present and still valid.
fn with_identity(
    server : &Server,
) -> impl Filter<Extract = (Option<Identity>,), Error = Infallible> + Clone {
    with_server(server)
        .and(filters::cookie::optional(COOKIE_NAME))
        .map(|server : Server, cookie : Option<String>| {
            let value = cookie?;

            let tok = crypto::Token::validate(
                &value,
                &server.token_secret,
                &server.server_name,
            )
            .map_err(|err| tracing::debug!(?err, "rejected identity token"))
            .ok()?;

            tok.identity().ok()
        })
}

fn with_authn(
    server : &Server,
) -> impl Filter<Extract = (Identity,), Error = Rejection> + Clone {
    with_identity(server).and_then(|identity : Option<Identity>| async move {
        identity.ok_or_else(|| warp::reject::custom(Error::Unauthorized))
    })
}

macro_rules! handler_or{
    ($head:expr $(, $tail:expr)*) => {
        $head
        $(
            .or($tail)
            .unify()
            .boxed()
        )*
    };
    ($head:expr $(, $tail:expr)*,) => {
        handler_or!($head $(, $tail)*)
    }
}

pub fn routes(
    server : &Server,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let index = warp::path::end()
        .and(method::get())
        .map(|| see_other("/home"));

    let home = warp::path!("home")
        .and(method::get())
        .and(with_server(server))
        .and(
            filters::query::raw()
                .or(warp::any().map(String::new))
                .unify(),
        )
        .and(with_identity(server))
        .and_then(get_home);

    let get_login = warp::path!("login")
        .and(method::get())
        .and(with_server(server))
        .and_then(get_login);

    let post_login = warp::path!("login")
        .and(method::post())
        .and(with_server(server))
        .and(filters::body::form())
        .and_then(post_login);

    let logout = warp::path!("logout")
        .and(method::get())
        .and(with_authn(server))
        .map(logout);

    let get_register = warp::path!("register")
        .and(method::get())
        .and(with_server(server))
        .and_then(get_register);

    let post_register = warp::path!("register")
        .and(method::post())
        .and(with_server(server))
        .and(filters::body::form())
        .and_then(post_register);

    let get_search = warp::path!("search")
        .and(method::get())
        .and(with_server(server))
        .and(with_identity(server))
        .and_then(get_search);

    let post_search = warp::path!("search")
        .and(method::post())
        .and(with_server(server))
        .and(with_identity(server))
        .and(filters::body::form())
        .and_then(post_search);

    let get_create = warp::path!("create_post")
        .and(method::get())
        .and(with_authn(server))
        .and(with_server(server))
        .and_then(get_create_post);

    let post_create = warp::path!("create_post")
        .and(method::post())
        .and(with_authn(server))
        .and(with_server(server))
        .and(filters::body::form())
        .and_then(post_create_post);

    let read = warp::path!("read_post" / i64)
        .and(method::get())
        .and(with_server(server))
        .and(with_identity(server))
        .and_then(read_post);

    let get_update = warp::path!("update_post" / i64)
        .and(method::get())
        .and(with_authn(server))
        .and(with_server(server))
        .and_then(get_update_post);

    let post_update = warp::path!("update_post" / i64)
        .and(method::post())
        .and(with_authn(server))
        .and(with_server(server))
        .and(filters::body::form())
        .and_then(post_update_post);

    let delete = warp::path!("delete_post" / i64)
        .and(method::post())
        .and(with_authn(server))
        .and(with_server(server))
        .and_then(delete_post);

    let statics = warp::path("static")
        .and(warp::fs::dir(server.static_dir.clone()))
        .map(|file : warp::fs::File| -> BoxReply {
            Box::new(reply::with_header(
                file,
                header::CACHE_CONTROL,
                "public, max-age=900",
            ))
        });

    handler_or!(
        index,
        home,
        get_login,
        post_login,
        logout,
        get_register,
        post_register,
        get_search,
        post_search,
        get_create,
        post_create,
        read,
        get_update,
        post_update,
        delete,
        statics,
    )
    .recover(recover)
    .unify()
    .with(warp::log::custom(|info| {
        tracing::info!(
            status = info.status().as_u16(),
            method = %info.method(),
            path = info.path(),
            elapsed = ?info.elapsed(),
            "request"
        );
    }))
}

fn see_other(location : &str) -> BoxReply {
    Box::new(reply::with_header(
        StatusCode::SEE_OTHER,
        header::LOCATION,
        location.to_string(),
    ))
}

fn html(body : String) -> BoxReply {
    Box::new(reply::html(body))
}

/// Turns a validation failure into the form re-rendered with its message.
fn rerender(
    res : crate::Result<()>,
    render : impl FnOnce(&'static str) -> crate::Result<String>,
) -> Result<Option<BoxReply>, Rejection> {
    match res {
        Ok(()) => Ok(None),
        Err(Error::Invalid(msg)) => Ok(Some(html(render(msg)?))),
        Err(err) => Err(err.into()),
    }
}

async fn get_home(
    server : Server,
    query : String,
    identity : Option<Identity>,
) -> HandlerResult {
    let page = pages::parse_page(&query);
    let listing = pages::list_page(&server.db, page, server.page_size).await?;

    if !listing.contains(page) {
        return Ok(see_other("/home?page=1"));
    }

    Ok(html(server.render.home(&listing, page, identity.as_ref())?))
}

async fn get_login(server : Server) -> HandlerResult {
    Ok(html(server.render.form("login", None, None)?))
}

async fn post_login(server : Server, form : LoginForm) -> HandlerResult {
    let res = accounts::validate_login(&server.db, &form).await;
    if let Some(reply) =
        rerender(res, |msg| server.render.form("login", Some(msg), None))?
    {
        return Ok(reply);
    }

    let identity = match accounts::login_identity(&server.db, &form.email).await? {
        Some(identity) => identity,
        None => return Ok(html(server.render.form("login", None, None)?)),
    };

    let token = crypto::Token::for_identity(&identity, &server.server_name)
        .issue(&server.token_secret, server.token_lifetime)?;

    let cookie = Cookie::build(COOKIE_NAME, token)
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::seconds(
            server.token_lifetime.as_secs() as i64,
        ))
        .finish()
        .to_string();

    tracing::info!(user_id = identity.user_id, "logged in");

    Ok(Box::new(reply::with_header(
        see_other("/home"),
        header::SET_COOKIE,
        cookie,
    )))
}

fn logout(identity : Identity) -> BoxReply {
    let cookie = Cookie::build(COOKIE_NAME, "")
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::ZERO)
        .finish()
        .to_string();

    tracing::info!(user_id = identity.user_id, "logged out");

    Box::new(reply::with_header(
        see_other("/home"),
        header::SET_COOKIE,
        cookie,
    ))
}

async fn get_register(server : Server) -> HandlerResult {
    Ok(html(server.render.form("register", None, None)?))
}

async fn post_register(server : Server, form : RegistrationForm) -> HandlerResult {
    let res = accounts::validate_registration(&server.db, &form).await;
    if let Some(reply) =
        rerender(res, |msg| server.render.form("register", Some(msg), None))?
    {
        return Ok(reply);
    }

    accounts::register(&server.db, &form).await?;

    Ok(see_other("/login"))
}

async fn get_search(server : Server, identity : Option<Identity>) -> HandlerResult {
    Ok(html(server.render.search("", None, identity.as_ref())?))
}

async fn post_search(
    server : Server,
    identity : Option<Identity>,
    form : SearchForm,
) -> HandlerResult {
    let hits = search::search(&server.db, &form.search_keyword).await?;

    Ok(html(server.render.search(
        &form.search_keyword,
        Some(hits.as_slice()),
        identity.as_ref(),
    )?))
}

async fn get_create_post(identity : Identity, server : Server) -> HandlerResult {
    Ok(html(server.render.form("create", None, Some(&identity))?))
}

async fn post_create_post(
    identity : Identity,
    server : Server,
    form : PostForm,
) -> HandlerResult {
    let res = posts::create_post(&server.db, &form.title, &identity, &form.body)
        .await
        .map(|_| ());
    if let Some(reply) = rerender(res, |msg| {
        server.render.form("create", Some(msg), Some(&identity))
    })? {
        return Ok(reply);
    }

    Ok(see_other("/home"))
}

async fn read_post(
    post_id : i64,
    server : Server,
    identity : Option<Identity>,
) -> HandlerResult {
    let post = match posts::get_post(&server.db, post_id, None).await? {
        Some(post) if !post.deleted => post,
        _ => return Ok(see_other("/home")),
    };

    let author = match server.db.get_user(post.author_id).await? {
        Some(user) => user.username,
        None => return Ok(see_other("/home")),
    };

    Ok(html(server.render.read_post(&post, &author, identity.as_ref())?))
}

async fn get_update_post(
    post_id : i64,
    identity : Identity,
    server : Server,
) -> HandlerResult {
    match posts::get_post(&server.db, post_id, Some(&identity)).await? {
        Some(post) if !post.deleted => {
            Ok(html(server.render.update(&post, None, &identity)?))
        },
        _ => Ok(see_other("/home")),
    }
}

async fn post_update_post(
    post_id : i64,
    identity : Identity,
    server : Server,
    form : PostForm,
) -> HandlerResult {
    let post = match posts::get_post(&server.db, post_id, Some(&identity)).await? {
        Some(post) if !post.deleted => post,
        _ => return Ok(see_other("/home")),
    };

    let res = posts::update_post(&server.db, post_id, &form.title, &form.body).await;
    if let Some(reply) = rerender(res, |msg| {
        server.render.update(&post, Some(msg), &identity)
    })? {
        return Ok(reply);
    }

    Ok(see_other("/home"))
}

async fn delete_post(
    post_id : i64,
    identity : Identity,
    server : Server,
) -> HandlerResult {
    if let Some(post) = posts::get_post(&server.db, post_id, Some(&identity)).await? {
        if !post.deleted {
            posts::delete_post(&server.db, post_id).await?;
        }
    }

    Ok(see_other("/home"))
}

async fn recover(err : Rejection) -> Result<BoxReply, Infallible> {
    if err.is_not_found() {
        return Ok(Error::RouteNotFound.reply());
    }

    if let Some(err) = err.find::<Error>() {
        return Ok(err.reply());
    }

    let status = if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        StatusCode::METHOD_NOT_ALLOWED
    } else if err.find::<warp::filters::body::BodyDeserializeError>().is_some()
        || err.find::<warp::reject::InvalidQuery>().is_some()
    {
        StatusCode::BAD_REQUEST
    } else {
        tracing::error!(?err, "unhandled rejection");
        StatusCode::INTERNAL_SERVER_ERROR
    };

    Ok(Box::new(reply::with_status(
        status.canonical_reason().unwrap_or("error"),
        status,
    )))
}

impl Reject for Error {}

impl Error {
    fn reply(&self) -> BoxReply {
        use Error::*;

        match self {
            Unauthorized => see_other("/login"),
            RouteNotFound => Box::new(reply::with_status(
                reply::html(include_str!("../ui/not-found.html")),
                StatusCode::NOT_FOUND,
            )),
            Invalid(msg) => Box::new(reply::with_status(
                msg.to_string(),
                StatusCode::BAD_REQUEST,
            )),
            err => {
                tracing::error!(?err, "request failed");
                Box::new(reply::with_status(
                    "internal server error",
                    StatusCode::INTERNAL_SERVER_ERROR,
                ))
            },
        }
    }
}
