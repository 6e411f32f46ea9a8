// Application state for HTTP handlers
use crate::application::refresh_service::SessionHandle;

#[derive(Clone)]
pub struct AppState {
    pub session: SessionHandle,
}
