use std::cell::RefCell;
use std::rc::Rc;

use super::state::{AppState, BackendEvent};
use crate::inference::OllamaClient;

/// Check in the background that the server is up and has the configured model.
pub fn check_endpoint(state: &Rc<RefCell<AppState>>) {
    let s = state.borrow();
    let client = OllamaClient::new(&s.config);
    let sender = s.backend_sender.clone();

    s.tokio_rt.spawn(async move {
        let problem = match client.list_models().await {
            Ok(models) => missing_model_warning(client.model(), &models),
            Err(e) => Some(format!("LLM server unavailable: {e}")),
        };
        let _ = sender.send(BackendEvent::EndpointChecked(problem)).await;
    });
}

/// `None` if `model` is among the pulled models. A bare name matches its `:latest` tag.
fn missing_model_warning(model: &str, available: &[String]) -> Option<String> {
    let found = available
        .iter()
        .any(|name| name == model || name.strip_suffix(":latest") == Some(model));
    (!found).then(|| format!("Model {model} not pulled (try: ollama pull {model})"))
}
