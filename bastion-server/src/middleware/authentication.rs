use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use bastion::{DatabaseClaims, DirectoryPrincipal, Identity, Principal};

/// Account name forwarded by the authenticating reverse proxy.
pub const REMOTE_USER: &str = "x-remote-user";
/// Stable account id (SID or object id).
pub const REMOTE_SID: &str = "x-remote-sid";
/// Comma separated role markers.
pub const REMOTE_ROLES: &str = "x-remote-roles";
/// Comma separated databases the token grants admin rights over.
pub const REMOTE_ADMIN_DATABASES: &str = "x-remote-admin-databases";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn split_header(headers: &HeaderMap, name: &str) -> Vec<String> {
    header(headers, name)
        .map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Build the principal from the headers the proxy set
pub fn principal_from_headers(headers: &HeaderMap) -> Principal {
    let user = header(headers, REMOTE_USER);

    if headers.contains_key(REMOTE_ADMIN_DATABASES) {
        let name = user.unwrap_or("token");
        return Principal::DatabaseScoped(DatabaseClaims::new(
            name,
            split_header(headers, REMOTE_ADMIN_DATABASES),
        ));
    }

    match user {
        Some(name) => Principal::Directory(
            DirectoryPrincipal::new(name, header(headers, REMOTE_SID).map(Identity::from))
                .with_roles(split_header(headers, REMOTE_ROLES)),
        ),
        None => Principal::Anonymous,
    }
}

/// Attach the caller's principal to the request
pub async fn principal_middleware(mut request: Request, next: Next) -> Response {
    let principal = principal_from_headers(request.headers());
    request.extensions_mut().insert(principal);
    next.run(request).await
}

/// Principal attached by [`principal_middleware`]; anonymous when missing
pub fn get_principal(request: &Request) -> Principal {
    request
        .extensions()
        .get::<Principal>()
        .cloned()
        .unwrap_or(Principal::Anonymous)
}
