use handlebars::Handlebars;
use serde::Serialize;
use serde_json::json;

use crate::models::{Identity, Note};
use crate::pages::Page;
use crate::search::SearchHit;
use crate::Result;

pub struct Renderer(Handlebars<'static>);

impl Renderer {
    pub fn new() -> Result<Self> {
        let mut t = Handlebars::new();
        t.set_strict_mode(true);

        t.register_partial("header", include_str!("../ui/header.html"))?;

        macro_rules! register {
            ($(($name:expr, $path:expr))*) => {
                $(
                    t.register_template_string(
                        $name,
                        include_str!($path),
                    )?;
                )*
            };
        }

        register! {
            ("home", "../ui/home.html")
            ("login", "../ui/login.html")
            ("register", "../ui/register.html")
            ("create", "../ui/create.html")
            ("update", "../ui/update.html")
            ("read-post", "../ui/read-post.html")
            ("search", "../ui/search.html")
        }

        Ok(Self(t))
    }

    pub fn home(
        &self,
        page : &Page,
        current : u32,
        identity : Option<&Identity>,
    ) -> Result<String> {
        #[derive(Serialize)]
        struct Ctx<'a> {
            items :       &'a [crate::models::PostSummary],
            page :        u32,
            total_pages : u32,
            prev :        Option<u32>,
            next :        Option<u32>,
            owner :       Option<i64>,
            identity :    Option<&'a Identity>,
        }

        Ok(self.0.render("home", &Ctx {
            items : &page.items,
            page : current,
            total_pages : page.total_pages,
            prev : current.checked_sub(1).filter(|p| *p >= 1),
            next : Some(current + 1).filter(|p| *p <= page.total_pages),
            owner : identity.map(|i| i.user_id),
            identity,
        })?)
    }

    /// The login, register and create forms only differ by their error.
    pub fn form(
        &self,
        name : &str,
        error : Option<&str>,
        identity : Option<&Identity>,
    ) -> Result<String> {
        Ok(self.0.render(name, &json!({
            "error": error,
            "identity": identity,
        }))?)
    }

    pub fn update(
        &self,
        post : &Note,
        error : Option<&str>,
        identity : &Identity,
    ) -> Result<String> {
        Ok(self.0.render("update", &json!({
            "post": post,
            "error": error,
            "identity": identity,
        }))?)
    }

    pub fn read_post(
        &self,
        post : &Note,
        author : &str,
        identity : Option<&Identity>,
    ) -> Result<String> {
        Ok(self.0.render("read-post", &json!({
            "post": post,
            "author": author,
            "identity": identity,
        }))?)
    }

    pub fn search(
        &self,
        keyword : &str,
        hits : Option<&[SearchHit]>,
        identity : Option<&Identity>,
    ) -> Result<String> {
        Ok(self.0.render("search", &json!({
            "keyword": keyword,
            "hits": hits,
            "searched": hits.is_some(),
            "identity": identity,
        }))?)
    }
}
