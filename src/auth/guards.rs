use rocket::Request;
use rocket::request::{FromRequest, Outcome};
use rocket_okapi::request::OpenApiFromRequest;

/// Raw token taken from the `Authorization` header, if any.
///
/// The guard never fails; deciding whether the token is acceptable is the
/// service's job, so a missing header and a bad token end up in the same
/// place.
#[derive(Debug, Clone, OpenApiFromRequest)]
pub struct BearerToken(pub Option<String>);

impl BearerToken {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for BearerToken {
    type Error = std::convert::Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let token = request
            .headers()
            .get_one("Authorization")
            .and_then(token_from_header)
            .map(str::to_string);
        Outcome::Success(BearerToken(token))
    }
}

/// Accepts `Bearer <token>` (scheme case-insensitive) or a bare token.
fn token_from_header(header: &str) -> Option<&str> {
    let header = header.trim();
    let token = match header.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("Bearer") => rest.trim(),
        Some(_) => return None,
        None if header.eq_ignore_ascii_case("Bearer") => return None,
        None => header,
    };
    if token.is_empty() { None } else { Some(token) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_authorization_headers() {
        assert_eq!(token_from_header("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(token_from_header("bearer   abc"), Some("abc"));
        assert_eq!(token_from_header("abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(token_from_header("Bearer "), None);
        assert_eq!(token_from_header(""), None);
        assert_eq!(token_from_header("Basic dXNlcjpwYXNz"), None);
    }
}
