use rocket::request::{self, FromRequest, Request, Outcome};
use rocket::http::Status;

use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use rocket_okapi::r#gen::OpenApiGenerator;

use crate::config::Config;

/// Shared-key guard for the scheduler-facing admin endpoints. Requests must
/// carry the configured key in `X-Admin-Key`; with no key configured, the
/// endpoints are disabled.
pub struct AdminGuard;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let configured = match Config::admin_key() {
            Some(key) => key,
            None => return Outcome::Error((Status::Unauthorized, ())),
        };

        match req.headers().get_one("X-Admin-Key") {
            Some(key) if key == configured => Outcome::Success(AdminGuard),
            _ => Outcome::Error((Status::Unauthorized, ())),
        }
    }
}

impl<'a> OpenApiFromRequest<'a> for AdminGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}
