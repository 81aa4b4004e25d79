//! Question/answer chat over an indexed document.
//!
//! A separate, simpler contract than the analysis flow: the document is
//! indexed with `POST /api/upload` and questions go to `POST /api/query`.
//! There is no job and no polling.

use crate::api::Backend;
use crate::error::{ApiError, ScarfError};
use crate::upload;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

pub const GREETING: &str = "Hello! Upload a document and I can answer any questions about it.";

/// Shown in place of an answer whenever the query fails.
pub const ANSWER_ERROR: &str = "Sorry, I encountered an error answering that. Please try again.";

/// Fallback when a failed upload carries no `detail`.
pub const UPLOAD_ERROR: &str = "Upload failed";

/// File types the chat index accepts.
pub const CHAT_ACCEPT: [&str; 4] = [".pdf", ".docx", ".txt", ".md"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Unique and increasing within one session.
    pub id: u64,
    pub role: Role,
    pub content: String,
    pub citations: Vec<String>,
}

/// State of the chat document upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DocumentUploadStatus {
    #[default]
    Idle,
    Uploading,
    Success { filename: String },
    Error { message: String },
}

#[derive(Debug)]
struct ChatState {
    messages: Vec<ChatMessage>,
    loading: bool,
    next_id: u64,
    upload: DocumentUploadStatus,
}

impl ChatState {
    fn push(&mut self, role: Role, content: String, citations: Vec<String>) -> ChatMessage {
        self.next_id += 1;
        let msg = ChatMessage {
            id: self.next_id,
            role,
            content,
            citations,
        };
        self.messages.push(msg.clone());
        msg
    }
}

/// A chat conversation. `&self` methods, so one session can be shared
/// behind an `Arc` between an input task and a renderer.
pub struct ChatSession {
    backend: Arc<dyn Backend>,
    state: Mutex<ChatState>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("state", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl ChatSession {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let mut state = ChatState {
            messages: Vec::new(),
            loading: false,
            next_id: 0,
            upload: DocumentUploadStatus::Idle,
        };
        state.push(Role::Assistant, GREETING.to_string(), Vec::new());
        Self {
            backend,
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.lock().messages.clone()
    }

    /// A question is waiting for its answer.
    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn upload_status(&self) -> DocumentUploadStatus {
        self.lock().upload.clone()
    }

    /// Ask a question about the indexed document.
    ///
    /// Returns the assistant's reply, or `None` when the question was ignored
    /// (blank, or another question is still loading). A failed query is not
    /// an error: the reply is the fixed apology message.
    pub async fn ask(&self, question: &str) -> Option<ChatMessage> {
        {
            let mut state = self.lock();
            if question.trim().is_empty() || state.loading {
                return None;
            }
            state.push(Role::User, question.to_string(), Vec::new());
            state.loading = true;
        }

        let loading = LoadingGuard(self);
        let reply = self.backend.query(question).await;
        drop(loading);

        let mut state = self.lock();
        Some(match reply {
            Ok(answer) => {
                info!("Answer received ({} citations)", answer.citations.len());
                state.push(Role::Assistant, answer.answer, answer.citations)
            }
            Err(e) => {
                warn!("Query failed: {e}");
                state.push(Role::Assistant, ANSWER_ERROR.to_string(), Vec::new())
            }
        })
    }

    /// Index the first of `files` for chatting; returns the stored filename.
    pub async fn upload_document(&self, files: &[PathBuf]) -> Result<String, ScarfError> {
        let accept: Vec<String> = CHAT_ACCEPT.iter().map(|s| s.to_string()).collect();
        {
            let mut state = self.lock();
            if state.upload == DocumentUploadStatus::Uploading {
                return Err(ScarfError::Busy);
            }
            state.upload = DocumentUploadStatus::Uploading;
        }

        let file = match upload::prepare(files, &accept).await {
            Ok(f) => f,
            Err(e) => {
                self.lock().upload = DocumentUploadStatus::Error {
                    message: e.to_string(),
                };
                return Err(e);
            }
        };

        info!("Indexing '{}' for chat", file.file_name);
        match self.backend.upload_document(&file).await {
            Ok(response) => {
                info!("Indexed '{}'", response.filename);
                self.lock().upload = DocumentUploadStatus::Success {
                    filename: response.filename.clone(),
                };
                Ok(response.filename)
            }
            Err(source) => {
                let message = match &source {
                    ApiError::Status {
                        detail: Some(d), ..
                    } => d.clone(),
                    _ => UPLOAD_ERROR.to_string(),
                };
                warn!("Document upload failed: {source}");
                self.lock().upload = DocumentUploadStatus::Error { message };
                Err(ScarfError::UploadFailed { source })
            }
        }
    }
}

/// Clears `loading` when the query finishes or its future is dropped.
struct LoadingGuard<'a>(&'a ChatSession);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().loading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{DocumentUploadResponse, HealthResponse, QueryAnswer, StatusResponse, UploadResponse};
    use crate::upload::UploadFile;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    struct FakeChat {
        answer: Result<QueryAnswer, ApiError>,
        ingest: Result<DocumentUploadResponse, ApiError>,
        gate: Option<Arc<Notify>>,
    }

    impl FakeChat {
        fn answering(answer: &str, citations: &[&str]) -> Self {
            Self {
                answer: Ok(QueryAnswer {
                    answer: answer.to_string(),
                    citations: citations.iter().map(|s| s.to_string()).collect(),
                }),
                ingest: Ok(DocumentUploadResponse {
                    filename: "paper.pdf".into(),
                    status: Some("success".into()),
                    chunks_processed: Some(12),
                    message: None,
                }),
                gate: None,
            }
        }
    }

    #[async_trait]
    impl Backend for FakeChat {
        async fn upload(&self, _file: &UploadFile) -> Result<UploadResponse, ApiError> {
            unreachable!()
        }

        async fn status(&self, _job_id: &str) -> Result<StatusResponse, ApiError> {
            unreachable!()
        }

        async fn query(&self, _question: &str) -> Result<QueryAnswer, ApiError> {
            if let Some(ref gate) = self.gate {
                gate.notified().await;
            }
            self.answer.clone()
        }

        async fn upload_document(&self, _file: &UploadFile) -> Result<DocumentUploadResponse, ApiError> {
            self.ingest.clone()
        }

        async fn health(&self) -> Result<HealthResponse, ApiError> {
            unreachable!()
        }
    }

    #[test]
    fn new_session_greets() {
        let chat = ChatSession::new(Arc::new(FakeChat::answering("", &[])));
        let msgs = chat.messages();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].role, Role::Assistant);
        assert_eq!(msgs[0].content, GREETING);
    }

    #[test]
    fn answer_is_appended_with_citations() {
        let chat = ChatSession::new(Arc::new(FakeChat::answering("42", &["p. 3", "p. 9"])));
        let reply = tokio_test::block_on(chat.ask("What is the answer?")).unwrap();

        assert_eq!(reply.content, "42");
        assert_eq!(reply.citations, vec!["p. 3".to_string(), "p. 9".to_string()]);

        let msgs = chat.messages();
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[1].role, Role::User);
        assert_eq!(msgs[1].content, "What is the answer?");
        assert!(msgs[1].id < msgs[2].id);
        assert!(!chat.is_loading());
    }

    #[tokio::test]
    async fn blank_question_is_ignored() {
        let chat = ChatSession::new(Arc::new(FakeChat::answering("x", &[])));
        assert!(chat.ask("   \n").await.is_none());
        assert_eq!(chat.messages().len(), 1);
    }

    #[tokio::test]
    async fn failed_query_appends_apology() {
        let mut backend = FakeChat::answering("", &[]);
        backend.answer = Err(ApiError::Status { status: 500, detail: None });
        let chat = ChatSession::new(Arc::new(backend));

        let reply = chat.ask("Why?").await.unwrap();
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content, ANSWER_ERROR);
        assert_eq!(chat.messages().len(), 3);
    }

    #[tokio::test]
    async fn question_while_loading_is_ignored() {
        let gate = Arc::new(Notify::new());
        let mut backend = FakeChat::answering("first", &[]);
        backend.gate = Some(Arc::clone(&gate));
        let chat = Arc::new(ChatSession::new(Arc::new(backend)));

        let pending = {
            let chat = Arc::clone(&chat);
            tokio::spawn(async move { chat.ask("one").await })
        };
        while !chat.is_loading() {
            tokio::task::yield_now().await;
        }

        assert!(chat.ask("two").await.is_none());
        gate.notify_one();
        assert_eq!(pending.await.unwrap().unwrap().content, "first");

        let contents: Vec<_> = chat.messages().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec![GREETING, "one", "first"]);
    }

    #[tokio::test]
    async fn abandoned_question_does_not_block_the_next() {
        let gate = Arc::new(Notify::new());
        let mut backend = FakeChat::answering("late", &[]);
        backend.gate = Some(Arc::clone(&gate));
        let chat = ChatSession::new(Arc::new(backend));

        let abandoned = tokio::time::timeout(std::time::Duration::from_millis(10), chat.ask("one")).await;
        assert!(abandoned.is_err());
        assert!(!chat.is_loading());

        gate.notify_one();
        let reply = chat.ask("two").await.unwrap();
        assert_eq!(reply.content, "late");
    }

    #[tokio::test]
    async fn upload_document_records_filename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.pdf");
        std::fs::write(&path, b"%PDF").unwrap();
        let chat = ChatSession::new(Arc::new(FakeChat::answering("", &[])));

        let name = chat.upload_document(&[path]).await.unwrap();
        assert_eq!(name, "paper.pdf");
        assert_eq!(
            chat.upload_status(),
            DocumentUploadStatus::Success {
                filename: "paper.pdf".into()
            }
        );
    }

    #[tokio::test]
    async fn upload_error_prefers_backend_detail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, b"# notes").unwrap();

        let mut backend = FakeChat::answering("", &[]);
        backend.ingest = Err(ApiError::Status {
            status: 400,
            detail: Some("No content extracted from file.".into()),
        });
        let chat = ChatSession::new(Arc::new(backend));
        assert!(chat.upload_document(&[path.clone()]).await.is_err());
        assert_eq!(
            chat.upload_status(),
            DocumentUploadStatus::Error {
                message: "No content extracted from file.".into()
            }
        );

        let mut backend = FakeChat::answering("", &[]);
        backend.ingest = Err(ApiError::Transport("connection refused".into()));
        let chat = ChatSession::new(Arc::new(backend));
        assert!(chat.upload_document(&[path]).await.is_err());
        assert_eq!(
            chat.upload_status(),
            DocumentUploadStatus::Error {
                message: UPLOAD_ERROR.into()
            }
        );
    }
}
