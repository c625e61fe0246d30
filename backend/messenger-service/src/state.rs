use crate::services::MessageService;

#[derive(Clone)]
pub struct AppState {
    pub messages: MessageService,
}
