//! One-shot notices carried across a redirect in a cookie.

use std::future::{Ready, ready};

use actix_web::cookie::{Cookie, SameSite, time::Duration};
use actix_web::{FromRequest, HttpRequest, dev::Payload};

pub const FLASH_COOKIE: &str = "blog_flash";

/// Notices a redirect can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    PostCreated,
    PostUpdated,
}

impl Notice {
    fn code(self) -> &'static str {
        match self {
            Notice::PostCreated => "post-created",
            Notice::PostUpdated => "post-updated",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "post-created" => Some(Notice::PostCreated),
            "post-updated" => Some(Notice::PostUpdated),
            _ => None,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Notice::PostCreated => "L'article a bien été sauvegardé",
            Notice::PostUpdated => "L'article a bien été modifié",
        }
    }
}

/// Cookie that makes the next page show `notice`.
pub fn flash_cookie(notice: Notice) -> Cookie<'static> {
    Cookie::build(FLASH_COOKIE, notice.code())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

/// Cookie that clears a displayed notice.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(FLASH_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(0))
        .finish()
}

/// Notice pending for this request, if any.
#[derive(Debug, Default)]
pub struct Flash(pub Option<Notice>);

impl Flash {
    pub fn message(&self) -> Option<&'static str> {
        self.0.map(Notice::message)
    }
}

impl FromRequest for Flash {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let notice = req
            .cookie(FLASH_COOKIE)
            .and_then(|cookie| Notice::from_code(cookie.value()));

        ready(Ok(Flash(notice)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[actix_web::test]
    async fn test_reads_notice_from_cookie() {
        let req = TestRequest::default()
            .cookie(flash_cookie(Notice::PostUpdated))
            .to_http_request();

        let flash = Flash::extract(&req).await.unwrap();
        assert_eq!(flash.message(), Some("L'article a bien été modifié"));
    }

    #[actix_web::test]
    async fn test_ignores_unknown_codes() {
        let req = TestRequest::default()
            .cookie(Cookie::new(FLASH_COOKIE, "<b>hi</b>"))
            .to_http_request();

        let flash = Flash::extract(&req).await.unwrap();
        assert!(flash.0.is_none());
    }
}
