use axum::{extract::Request, middleware::Next, response::Response};

use crate::error::ApiError;
use crate::services::PermissionService;

use super::auth::AuthUser;

/// Permission guard applied per route group. Runs after the access-token
/// middleware: resolves the principal's role and permission codes from the
/// database (never from a cache), checks strict membership of the required
/// code, and injects the resolved context for the handler. On denial the
/// wrapped handler never executes.
pub async fn permission_guard(
    required: &'static str,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Authentication required before permission checks"))?;

    let permissions = PermissionService::new().await?;

    let context = permissions
        .resolve(auth_user.user_id)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    if !context.has(required) {
        // An unknown code denies exactly like an ungranted one, but a code
        // absent from the catalog is almost certainly a typo in the route
        // declaration - surface it in logs instead of locking users out
        // silently forever.
        match permissions.code_exists(required).await {
            Ok(false) => {
                tracing::warn!(
                    "Route requires permission code '{}' which exists in no permissions row",
                    required
                );
            }
            Ok(true) => {}
            Err(e) => tracing::debug!("Could not check permission catalog: {}", e),
        }

        tracing::debug!(
            "User {} denied: missing permission '{}'",
            auth_user.user_id,
            required
        );
        return Err(ApiError::forbidden(format!(
            "Missing required permission '{}'",
            required
        )));
    }

    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}
