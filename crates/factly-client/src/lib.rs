use factly_core::{CategoryFilter, Fact, FactDraft, FactId, MAX_CONTENT_CHARS};
use serde_json::Value;

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum ClientError {
    /// The service answered with a non-2xx status; the message is the
    /// server-provided error body when present, else a generic fallback.
    #[error("{0}")]
    Api(String),
    #[error("network error: {0}")]
    Network(String),
}

/// Seam between the controllers and the wire. The HTTP transport implements
/// it in production; tests drive the controllers through an in-memory stand-in.
pub trait FactsBackend {
    /// Fetch all facts, newest first.
    ///
    /// # Errors
    /// Returns [`ClientError`] on transport failure or a non-2xx response.
    fn list_facts(&self) -> Result<Vec<Fact>, ClientError>;

    /// Create one fact.
    ///
    /// # Errors
    /// Returns [`ClientError`] on transport failure or a non-2xx response.
    fn create_fact(&self, draft: &FactDraft) -> Result<Fact, ClientError>;

    /// Rewrite content, category, and source of an existing fact.
    ///
    /// # Errors
    /// Returns [`ClientError`] on transport failure or a non-2xx response.
    fn update_fact(&self, id: FactId, draft: &FactDraft) -> Result<Fact, ClientError>;

    /// Permanently delete one fact.
    ///
    /// # Errors
    /// Returns [`ClientError`] on transport failure or a non-2xx response.
    fn delete_fact(&self, id: FactId) -> Result<(), ClientError>;
}

pub struct HttpBackend {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpBackend {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl FactsBackend for HttpBackend {
    fn list_facts(&self) -> Result<Vec<Fact>, ClientError> {
        self.agent
            .get(&self.url("/facts"))
            .call()
            .map_err(|err| map_http_error(err, "Failed to fetch facts"))?
            .into_json::<Vec<Fact>>()
            .map_err(|err| ClientError::Network(err.to_string()))
    }

    fn create_fact(&self, draft: &FactDraft) -> Result<Fact, ClientError> {
        self.agent
            .post(&self.url("/facts"))
            .send_json(draft)
            .map_err(|err| map_http_error(err, "Failed to add fact"))?
            .into_json::<Fact>()
            .map_err(|err| ClientError::Network(err.to_string()))
    }

    fn update_fact(&self, id: FactId, draft: &FactDraft) -> Result<Fact, ClientError> {
        self.agent
            .request("PUT", &self.url(&format!("/facts/{id}")))
            .send_json(draft)
            .map_err(|err| map_http_error(err, "Failed to update fact"))?
            .into_json::<Fact>()
            .map_err(|err| ClientError::Network(err.to_string()))
    }

    fn delete_fact(&self, id: FactId) -> Result<(), ClientError> {
        self.agent
            .delete(&self.url(&format!("/facts/{id}")))
            .call()
            .map_err(|err| map_http_error(err, "Failed to delete fact"))?;
        Ok(())
    }
}

fn map_http_error(err: ureq::Error, fallback: &str) -> ClientError {
    match err {
        ureq::Error::Status(_, response) => {
            let message = response
                .into_json::<Value>()
                .ok()
                .and_then(|body| {
                    body.get("error").and_then(Value::as_str).map(ToString::to_string)
                })
                .unwrap_or_else(|| fallback.to_string());
            ClientError::Api(message)
        }
        ureq::Error::Transport(transport) => ClientError::Network(transport.to_string()),
    }
}

/// Client-held copy of the fact list. Refreshed by a full refetch after every
/// successful mutation; filtering is a local projection and never touches the
/// network.
#[derive(Debug)]
pub struct ListState {
    facts: Vec<Fact>,
    pub loading: bool,
    pub error: Option<String>,
    filter: CategoryFilter,
}

impl Default for ListState {
    fn default() -> Self {
        Self { facts: Vec::new(), loading: false, error: None, filter: CategoryFilter::All }
    }
}

impl ListState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial fetch. On failure the sequence stays empty and the message is
    /// kept for the error banner.
    pub fn load(&mut self, backend: &impl FactsBackend) {
        self.loading = true;
        self.error = None;
        match backend.list_facts() {
            Ok(facts) => self.facts = facts,
            Err(err) => {
                self.facts.clear();
                self.error = Some(err.to_string());
            }
        }
        self.loading = false;
    }

    /// Refetch after a successful mutation: full replace, never a local patch
    /// from the mutation response. On failure the current facts are kept.
    pub fn refresh(&mut self, backend: &impl FactsBackend) {
        match backend.list_facts() {
            Ok(facts) => {
                self.facts = facts;
                self.error = None;
            }
            Err(err) => self.error = Some(err.to_string()),
        }
    }

    pub fn set_filter(&mut self, filter: CategoryFilter) {
        self.filter = filter;
    }

    #[must_use]
    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    /// Facts visible under the current filter, original order preserved.
    #[must_use]
    pub fn visible(&self) -> Vec<&Fact> {
        factly_core::filter_facts(&self.facts, &self.filter)
    }

    fn merge(&mut self, updated: &Fact) {
        for fact in &mut self.facts {
            if fact.id == updated.id {
                *fact = updated.clone();
            }
        }
    }

    fn remove(&mut self, id: FactId) {
        self.facts.retain(|fact| fact.id != id);
    }
}

/// Create-form controller: scoped input state, local trim validation, and
/// list refresh on success.
#[derive(Debug, Default)]
pub struct CreateForm {
    content: String,
    source: String,
    category: String,
    pub submitting: bool,
    pub error: Option<String>,
    pub success: bool,
}

impl CreateForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Input control caps content at the client-side maximum.
    pub fn set_content(&mut self, value: &str) {
        self.content = value.chars().take(MAX_CONTENT_CHARS).collect();
    }

    pub fn set_source(&mut self, value: &str) {
        self.source = value.to_string();
    }

    pub fn set_category(&mut self, value: &str) {
        self.category = value.to_string();
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Submit the form. On success all inputs are cleared, the transient
    /// success flag is set, and the list is refetched; on failure the inputs
    /// stay intact and the endpoint's message is kept.
    pub fn submit(&mut self, backend: &impl FactsBackend, list: &mut ListState) -> Option<Fact> {
        self.error = None;
        self.success = false;
        if self.submitting {
            return None;
        }

        let content = self.content.trim().to_string();
        if content.is_empty() {
            self.error = Some("Please enter a fact or quote".to_string());
            return None;
        }

        let draft = FactDraft {
            content,
            category: Some(self.category.clone()),
            source: Some(self.source.clone()),
        }
        .normalized();

        self.submitting = true;
        let result = backend.create_fact(&draft);
        self.submitting = false;

        match result {
            Ok(fact) => {
                self.content.clear();
                self.source.clear();
                self.category.clear();
                self.success = true;
                list.refresh(backend);
                Some(fact)
            }
            Err(err) => {
                self.error = Some(err.to_string());
                None
            }
        }
    }

    /// Clear the transient success indicator (the UI does this on a timer).
    pub fn clear_success(&mut self) {
        self.success = false;
    }
}

#[derive(Debug, Clone)]
struct EditDraft {
    id: FactId,
    content: String,
    category: String,
    source: String,
}

/// Inline-edit controller. At most one fact is in edit mode at a time;
/// beginning an edit displaces any other open one.
#[derive(Debug, Default)]
pub struct EditSession {
    editing: Option<EditDraft>,
    pub submitting: bool,
    pub error: Option<String>,
}

impl EditSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter edit mode, seeding local copies from the selected fact.
    pub fn begin(&mut self, fact: &Fact) {
        self.editing = Some(EditDraft {
            id: fact.id,
            content: fact.content.clone(),
            category: fact.category.clone().unwrap_or_default(),
            source: fact.source.clone().unwrap_or_default(),
        });
        self.error = None;
    }

    pub fn cancel(&mut self) {
        self.editing = None;
        self.error = None;
    }

    #[must_use]
    pub fn editing_id(&self) -> Option<FactId> {
        self.editing.as_ref().map(|draft| draft.id)
    }

    pub fn set_content(&mut self, value: &str) {
        if let Some(draft) = &mut self.editing {
            draft.content = value.chars().take(MAX_CONTENT_CHARS).collect();
        }
    }

    pub fn set_category(&mut self, value: &str) {
        if let Some(draft) = &mut self.editing {
            draft.category = value.to_string();
        }
    }

    pub fn set_source(&mut self, value: &str) {
        if let Some(draft) = &mut self.editing {
            draft.source = value.to_string();
        }
    }

    /// Save the open edit. On success the updated record is merged into the
    /// client-held list directly, edit mode is exited, and the list is
    /// refetched; on failure the session stays open with the error recorded.
    pub fn save(&mut self, backend: &impl FactsBackend, list: &mut ListState) -> Option<Fact> {
        self.error = None;
        let Some(draft) = self.editing.clone() else {
            return None;
        };

        if draft.content.trim().is_empty() {
            self.error = Some("Content cannot be empty".to_string());
            return None;
        }

        let request = FactDraft {
            content: draft.content.trim().to_string(),
            category: Some(draft.category),
            source: Some(draft.source),
        }
        .normalized();

        self.submitting = true;
        let result = backend.update_fact(draft.id, &request);
        self.submitting = false;

        match result {
            Ok(updated) => {
                list.merge(&updated);
                list.refresh(backend);
                self.editing = None;
                Some(updated)
            }
            Err(err) => {
                self.error = Some(err.to_string());
                None
            }
        }
    }
}

/// Delete one fact after explicit confirmation. Returns `Ok(false)` when
/// confirmation was withheld and the request was never sent; on success the
/// fact is removed from the client-held sequence directly, without waiting
/// for a refetch.
///
/// # Errors
/// Returns [`ClientError`] when the delete request fails; the message is also
/// recorded on the list state for the error banner.
pub fn delete_fact(
    backend: &impl FactsBackend,
    list: &mut ListState,
    id: FactId,
    confirmed: bool,
) -> Result<bool, ClientError> {
    if !confirmed {
        return Ok(false);
    }

    match backend.delete_fact(id) {
        Ok(()) => {
            list.remove(id);
            Ok(true)
        }
        Err(err) => {
            list.error = Some(err.to_string());
            Err(err)
        }
    }
}
